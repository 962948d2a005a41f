//!
//! # Controller context
//!
//! Dependencies of the reconcilers, built once at startup and shared.
//!
use std::sync::Arc;

use eventing_metadata::channel::ChannelSpec;
use eventing_metadata::topic::TopicSpec;

use crate::config::{ControllerConfig, SubscriptionMode};
use crate::controllers::channel::{
    LoggingSubscriberActions, SharedSubscriberActions, StoreSubscriberActions,
};
use crate::monitoring::{
    LoggingEventRecorder, LoggingStatsReporter, SharedEventRecorder, SharedStatsReporter,
};
use crate::store::{IdentityIndex, MetadataClient, SharedClient};

use super::{SharedClock, SystemClock};

pub type SharedContext<C> = Arc<Context<C>>;

#[derive(Debug)]
pub struct Context<C> {
    client: SharedClient<C>,
    channels: IdentityIndex<ChannelSpec>,
    topics: IdentityIndex<TopicSpec>,
    recorder: SharedEventRecorder,
    stats: SharedStatsReporter,
    clock: SharedClock,
    subscriber_actions: SharedSubscriberActions,
    config: ControllerConfig,
}

impl<C> Context<C>
where
    C: MetadataClient + 'static,
{
    pub fn builder(config: ControllerConfig, client: SharedClient<C>) -> ContextBuilder<C> {
        ContextBuilder {
            config,
            client,
            recorder: None,
            stats: None,
            clock: None,
            subscriber_actions: None,
        }
    }

    pub fn client(&self) -> &SharedClient<C> {
        &self.client
    }

    /// cache of channels, written by the dispatcher
    pub fn channels(&self) -> &IdentityIndex<ChannelSpec> {
        &self.channels
    }

    pub fn topics(&self) -> &IdentityIndex<TopicSpec> {
        &self.topics
    }

    pub fn recorder(&self) -> &SharedEventRecorder {
        &self.recorder
    }

    pub fn stats(&self) -> &SharedStatsReporter {
        &self.stats
    }

    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    pub fn subscriber_actions(&self) -> &SharedSubscriberActions {
        &self.subscriber_actions
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }
}

pub struct ContextBuilder<C> {
    config: ControllerConfig,
    client: SharedClient<C>,
    recorder: Option<SharedEventRecorder>,
    stats: Option<SharedStatsReporter>,
    clock: Option<SharedClock>,
    subscriber_actions: Option<SharedSubscriberActions>,
}

impl<C> ContextBuilder<C>
where
    C: MetadataClient + 'static,
{
    pub fn recorder(mut self, recorder: SharedEventRecorder) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn stats(mut self, stats: SharedStatsReporter) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn clock(mut self, clock: SharedClock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// overrides the actions selected by `config.subscriptions`
    pub fn subscriber_actions(mut self, actions: SharedSubscriberActions) -> Self {
        self.subscriber_actions = Some(actions);
        self
    }

    pub fn build(self) -> SharedContext<C> {
        let recorder = self.recorder.unwrap_or_else(LoggingEventRecorder::shared);
        let stats = self.stats.unwrap_or_else(LoggingStatsReporter::shared);
        let clock = self.clock.unwrap_or_else(SystemClock::shared);

        let subscriber_actions = match self.subscriber_actions {
            Some(actions) => actions,
            None => select_subscriber_actions(&self.config, self.client.clone(), recorder.clone()),
        };

        Arc::new(Context {
            client: self.client,
            channels: IdentityIndex::new(),
            topics: IdentityIndex::new(),
            recorder,
            stats,
            clock,
            subscriber_actions,
            config: self.config,
        })
    }
}

fn select_subscriber_actions<C>(
    config: &ControllerConfig,
    client: SharedClient<C>,
    recorder: SharedEventRecorder,
) -> SharedSubscriberActions
where
    C: MetadataClient + 'static,
{
    match config.subscriptions {
        SubscriptionMode::Log => Arc::new(LoggingSubscriberActions),
        SubscriptionMode::Store => Arc::new(StoreSubscriberActions::new(
            client,
            recorder,
            config.agent_name.clone(),
            config.default_secret.clone(),
        )),
    }
}

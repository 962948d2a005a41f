use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use eventing_metadata::channel::{ChannelObj, SubscriberSpec, SubscriberStatus};
use eventing_metadata::core::{ObjectKey, SecretKeySelector, is_controlled_by};
use eventing_metadata::subscription::{PullSubscriptionObj, PullSubscriptionSpec};

use crate::monitoring::{EventType, SharedEventRecorder, reasons};
use crate::resources::{SubscriptionArgs, generate_subscription_name, get_labels, make_subscription};
use crate::store::{MetadataClient, SharedClient, StoreError};

pub type SharedSubscriberActions = Arc<dyn SubscriberActions>;

/// Side effects for a single subscriber of a channel
#[async_trait]
pub trait SubscriberActions: Debug + Send + Sync {
    async fn create(&self, channel: &ChannelObj, subscriber: &SubscriberSpec)
    -> Result<(), StoreError>;

    async fn update(&self, channel: &ChannelObj, subscriber: &SubscriberSpec)
    -> Result<(), StoreError>;

    async fn delete(
        &self,
        channel: &ChannelObj,
        subscriber: &SubscriberStatus,
    ) -> Result<(), StoreError>;
}

/// Only reports what would be done
#[derive(Debug, Default)]
pub struct LoggingSubscriberActions;

#[async_trait]
impl SubscriberActions for LoggingSubscriberActions {
    async fn create(
        &self,
        channel: &ChannelObj,
        subscriber: &SubscriberSpec,
    ) -> Result<(), StoreError> {
        let name = generate_subscription_name(channel.name(), &subscriber.uid);
        info!(channel = %channel.key(), "will create subscription {name}");
        Ok(())
    }

    async fn update(
        &self,
        channel: &ChannelObj,
        subscriber: &SubscriberSpec,
    ) -> Result<(), StoreError> {
        let name = generate_subscription_name(channel.name(), &subscriber.uid);
        info!(channel = %channel.key(), "will update subscription {name}");
        Ok(())
    }

    async fn delete(
        &self,
        channel: &ChannelObj,
        subscriber: &SubscriberStatus,
    ) -> Result<(), StoreError> {
        let name = generate_subscription_name(channel.name(), &subscriber.uid);
        info!(channel = %channel.key(), "will delete subscription {name}");
        Ok(())
    }
}

/// Manages pull subscriptions owned by the channel in the store
#[derive(Debug)]
pub struct StoreSubscriberActions<C> {
    client: SharedClient<C>,
    recorder: SharedEventRecorder,
    agent_name: String,
    default_secret: SecretKeySelector,
}

impl<C> StoreSubscriberActions<C>
where
    C: MetadataClient,
{
    pub fn new(
        client: SharedClient<C>,
        recorder: SharedEventRecorder,
        agent_name: String,
        default_secret: SecretKeySelector,
    ) -> Self {
        Self {
            client,
            recorder,
            agent_name,
            default_secret,
        }
    }

    fn desired(
        &self,
        channel: &ChannelObj,
        subscriber: &SubscriberSpec,
    ) -> PullSubscriptionObj {
        make_subscription(SubscriptionArgs {
            owner: channel,
            project: channel.spec.project.clone(),
            secret: channel
                .spec
                .secret
                .clone()
                .unwrap_or_else(|| self.default_secret.clone()),
            topic: channel.status.topic_id.clone().unwrap_or_default(),
            subscriber,
            labels: get_labels(&self.agent_name, channel.name()),
        })
    }

    fn subscription_key(channel: &ChannelObj, subscriber_uid: &str) -> ObjectKey {
        ObjectKey::new(
            channel.namespace(),
            generate_subscription_name(channel.name(), subscriber_uid),
        )
    }

    fn record(&self, channel: &ChannelObj, reason: &str, message: String) {
        self.recorder
            .record(&channel.object_ref(), EventType::Normal, reason, &message);
    }
}

#[async_trait]
impl<C> SubscriberActions for StoreSubscriberActions<C>
where
    C: MetadataClient + 'static,
{
    async fn create(
        &self,
        channel: &ChannelObj,
        subscriber: &SubscriberSpec,
    ) -> Result<(), StoreError> {
        let desired = self.desired(channel, subscriber);
        let key = desired.key();
        match self.client.create_item(desired).await {
            Ok(_) => {
                self.record(
                    channel,
                    reasons::SUBSCRIPTION_CREATED,
                    format!("Created PullSubscription {:?}", key.name),
                );
                Ok(())
            }
            Err(err) if err.is_already_exists() => {
                // left behind by an earlier attempt
                let existing = self
                    .client
                    .retrieve_item::<PullSubscriptionSpec>(&key)
                    .await?;
                if is_controlled_by(&existing.metadata, channel.uid()) {
                    debug!(%key, "subscription already exists");
                    Ok(())
                } else {
                    Err(err)
                }
            }
            Err(err) => Err(err),
        }
    }

    async fn update(
        &self,
        channel: &ChannelObj,
        subscriber: &SubscriberSpec,
    ) -> Result<(), StoreError> {
        let desired = self.desired(channel, subscriber);
        let key = desired.key();
        let mut existing = match self.client.retrieve_item::<PullSubscriptionSpec>(&key).await {
            Ok(existing) => existing,
            Err(err) if err.is_not_found() => return self.create(channel, subscriber).await,
            Err(err) => return Err(err),
        };

        if existing.spec == desired.spec {
            return Ok(());
        }

        existing.spec = desired.spec;
        self.client.update_spec(existing).await?;
        self.record(
            channel,
            reasons::SUBSCRIPTION_UPDATED,
            format!("Updated PullSubscription {:?}", key.name),
        );
        Ok(())
    }

    async fn delete(
        &self,
        channel: &ChannelObj,
        subscriber: &SubscriberStatus,
    ) -> Result<(), StoreError> {
        let key = Self::subscription_key(channel, &subscriber.uid);
        match self
            .client
            .delete_item::<PullSubscriptionSpec>(&key)
            .await
        {
            Ok(()) => {
                self.record(
                    channel,
                    reasons::SUBSCRIPTION_DELETED,
                    format!("Deleted PullSubscription {:?}", key.name),
                );
                Ok(())
            }
            Err(err) if err.is_not_found() => Ok(()),
            Err(err) => Err(err),
        }
    }
}

//!
//! # Test fixtures
//!
//! Fixed clock, recording event sink, fault injecting store and a harness
//! wiring them into a context.
//!
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use futures_util::stream::BoxStream;

use eventing_metadata::channel::{ChannelObj, ChannelSpec, SubscriberSpec, SubscriberStatus};
use eventing_metadata::core::{
    LabelSelector, MetadataStoreObject, ObjectKey, ObjectMeta, ObjectReference, Spec, WatchEvent,
};
use eventing_metadata::topic::TopicSpec;

use crate::config::ControllerConfig;
use crate::controllers::channel::{ChannelReconciler, SubscriberActions};
use crate::core::{Clock, Context, SharedContext};
use crate::monitoring::{EventRecorder, EventType, HistogramStatsReporter};
use crate::store::{MemoryClient, MetadataClient, StoreError};

#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn shared() -> Arc<Self> {
        let start = Utc
            .timestamp_opt(1_700_000_000, 0)
            .single()
            .expect("valid time");
        Arc::new(Self {
            now: Mutex::new(start),
        })
    }

    pub fn advance(&self, by: ChronoDuration) {
        let mut now = self.now.lock().expect("clock lock");
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock lock")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    pub object: ObjectReference,
    pub event_type: EventType,
    pub reason: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct RecordingEventRecorder {
    events: Mutex<Vec<RecordedEvent>>,
}

impl RecordingEventRecorder {
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().expect("events lock").clone()
    }

    pub fn reasons(&self) -> Vec<String> {
        self.events().into_iter().map(|event| event.reason).collect()
    }
}

impl EventRecorder for RecordingEventRecorder {
    fn record(&self, object: &ObjectReference, event_type: EventType, reason: &str, message: &str) {
        self.events.lock().expect("events lock").push(RecordedEvent {
            object: object.clone(),
            event_type,
            reason: reason.to_owned(),
            message: message.to_owned(),
        });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Retrieve,
    List,
    Create,
    UpdateStatus,
    UpdateSpec,
    Delete,
}

/// Memory store that can fail or race selected calls
#[derive(Debug)]
pub struct FaultyClient {
    inner: MemoryClient,
    faults: Mutex<HashSet<(Op, &'static str)>>,
    bump_status: Mutex<HashSet<&'static str>>,
    calls: Mutex<HashMap<(Op, &'static str), usize>>,
}

impl FaultyClient {
    pub fn new(inner: MemoryClient) -> Self {
        Self {
            inner,
            faults: Mutex::new(HashSet::new()),
            bump_status: Mutex::new(HashSet::new()),
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// next `op` on `kind` fails with `Unavailable`
    pub fn fail_next(&self, op: Op, kind: &'static str) {
        self.faults.lock().expect("faults lock").insert((op, kind));
    }

    /// next status write on `kind` races with another writer and conflicts
    pub fn bump_before_status(&self, kind: &'static str) {
        self.bump_status.lock().expect("bump lock").insert(kind);
    }

    pub fn calls(&self, op: Op, kind: &'static str) -> usize {
        self.calls
            .lock()
            .expect("calls lock")
            .get(&(op, kind))
            .copied()
            .unwrap_or(0)
    }

    fn enter(&self, op: Op, kind: &'static str) -> Result<(), StoreError> {
        *self
            .calls
            .lock()
            .expect("calls lock")
            .entry((op, kind))
            .or_default() += 1;

        if self.faults.lock().expect("faults lock").remove(&(op, kind)) {
            let reason = format!("injected {op:?} failure for {kind}");
            Err(StoreError::Unavailable(reason))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl MetadataClient for FaultyClient {
    async fn retrieve_item<S>(&self, key: &ObjectKey) -> Result<MetadataStoreObject<S>, StoreError>
    where
        S: Spec,
    {
        self.enter(Op::Retrieve, S::KIND)?;
        self.inner.retrieve_item(key).await
    }

    async fn retrieve_items<S>(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> Result<Vec<MetadataStoreObject<S>>, StoreError>
    where
        S: Spec,
    {
        self.enter(Op::List, S::KIND)?;
        self.inner.retrieve_items(namespace, selector).await
    }

    async fn create_item<S>(
        &self,
        value: MetadataStoreObject<S>,
    ) -> Result<MetadataStoreObject<S>, StoreError>
    where
        S: Spec,
    {
        self.enter(Op::Create, S::KIND)?;
        self.inner.create_item(value).await
    }

    async fn update_status<S>(
        &self,
        value: MetadataStoreObject<S>,
    ) -> Result<MetadataStoreObject<S>, StoreError>
    where
        S: Spec,
    {
        self.enter(Op::UpdateStatus, S::KIND)?;
        let bump = self.bump_status.lock().expect("bump lock").remove(S::KIND);
        if bump {
            let current = self.inner.retrieve_item::<S>(&value.key()).await?;
            self.inner.update_status(current).await?;
        }
        self.inner.update_status(value).await
    }

    async fn update_spec<S>(
        &self,
        value: MetadataStoreObject<S>,
    ) -> Result<MetadataStoreObject<S>, StoreError>
    where
        S: Spec,
    {
        self.enter(Op::UpdateSpec, S::KIND)?;
        self.inner.update_spec(value).await
    }

    async fn delete_item<S>(&self, key: &ObjectKey) -> Result<(), StoreError>
    where
        S: Spec,
    {
        self.enter(Op::Delete, S::KIND)?;
        self.inner.delete_item::<S>(key).await
    }

    async fn watch_stream<S>(&self) -> BoxStream<'static, Result<WatchEvent<S>, StoreError>>
    where
        S: Spec,
    {
        self.inner.watch_stream().await
    }
}

/// Succeeds for every subscriber except the listed uids
#[derive(Debug, Default)]
pub struct FailingSubscriberActions {
    failing: HashSet<String>,
    calls: Mutex<Vec<(&'static str, String)>>,
}

impl FailingSubscriberActions {
    pub fn failing<'a>(uids: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            failing: uids.into_iter().map(str::to_owned).collect(),
            calls: Mutex::new(vec![]),
        }
    }

    /// (action, uid) in call order
    pub fn calls(&self) -> Vec<(&'static str, String)> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn act(&self, action: &'static str, uid: &str) -> Result<(), StoreError> {
        self.calls
            .lock()
            .expect("calls lock")
            .push((action, uid.to_owned()));
        if self.failing.contains(uid) {
            Err(StoreError::Unavailable(format!("{action} {uid} failed")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SubscriberActions for FailingSubscriberActions {
    async fn create(
        &self,
        _channel: &ChannelObj,
        subscriber: &SubscriberSpec,
    ) -> Result<(), StoreError> {
        self.act("create", &subscriber.uid)
    }

    async fn update(
        &self,
        _channel: &ChannelObj,
        subscriber: &SubscriberSpec,
    ) -> Result<(), StoreError> {
        self.act("update", &subscriber.uid)
    }

    async fn delete(
        &self,
        _channel: &ChannelObj,
        subscriber: &SubscriberStatus,
    ) -> Result<(), StoreError> {
        self.act("delete", &subscriber.uid)
    }
}

/// channel outside of any store, with uid and generation set
pub fn channel_with_subscribers(name: &str, subscribers: Vec<SubscriberSpec>) -> ChannelObj {
    let mut meta = ObjectMeta::new(name, "default");
    meta.uid = format!("{name}-uid");
    meta.generation = 1;
    ChannelObj::with_spec(
        "default",
        name,
        ChannelSpec::new("my-project").with_subscribers(subscribers),
    )
    .with_meta(meta)
}

pub struct TestHarness {
    pub ctx: SharedContext<FaultyClient>,
    pub client: Arc<FaultyClient>,
    pub clock: Arc<FixedClock>,
    pub recorder: Arc<RecordingEventRecorder>,
    pub stats: Arc<HistogramStatsReporter>,
}

impl TestHarness {
    pub async fn new() -> Self {
        Self::with_config(ControllerConfig::default()).await
    }

    pub async fn with_config(config: ControllerConfig) -> Self {
        Self::build(config, None).await
    }

    pub async fn with_actions(actions: Arc<dyn SubscriberActions>) -> Self {
        Self::build(ControllerConfig::default(), Some(actions)).await
    }

    async fn build(config: ControllerConfig, actions: Option<Arc<dyn SubscriberActions>>) -> Self {
        let clock = FixedClock::shared();
        let client = Arc::new(FaultyClient::new(MemoryClient::with_clock(clock.clone())));
        let recorder = Arc::new(RecordingEventRecorder::default());
        let stats = HistogramStatsReporter::shared();

        let mut builder = Context::builder(config, client.clone())
            .clock(clock.clone())
            .recorder(recorder.clone())
            .stats(stats.clone());
        if let Some(actions) = actions {
            builder = builder.subscriber_actions(actions);
        }

        Self {
            ctx: builder.build(),
            client,
            clock,
            recorder,
            stats,
        }
    }

    pub fn reconciler(&self) -> ChannelReconciler<FaultyClient> {
        ChannelReconciler::new(self.ctx.clone())
    }

    /// stored in namespace `default`, not yet visible in the indexes
    pub async fn create_channel(&self, name: &str, spec: ChannelSpec) -> ChannelObj {
        self.client
            .create_item(ChannelObj::with_spec("default", name, spec))
            .await
            .expect("channel created")
    }

    pub async fn stored_channel(&self, name: &str) -> ChannelObj {
        self.client
            .retrieve_item::<ChannelSpec>(&ObjectKey::new("default", name))
            .await
            .expect("channel exists")
    }

    /// load the indexes from the store, the way the dispatcher does on start
    pub async fn sync(&self) {
        let channels = self
            .client
            .retrieve_items::<ChannelSpec>("", &LabelSelector::default())
            .await
            .expect("channels");
        self.ctx.channels().sync_all(channels).await;

        let topics = self
            .client
            .retrieve_items::<TopicSpec>("", &LabelSelector::default())
            .await
            .expect("topics");
        self.ctx.topics().sync_all(topics).await;
    }
}

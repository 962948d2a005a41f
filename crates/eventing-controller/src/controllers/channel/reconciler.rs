use tracing::{debug, error, info, instrument, warn};

use eventing_metadata::channel::ChannelObj;
use eventing_metadata::core::ObjectKey;

use crate::core::SharedContext;
use crate::error::ReconcileError;
use crate::monitoring::{EventType, reasons};
use crate::resources::generate_topic_id;
use crate::store::{IndexError, MetadataClient};

use super::{ensure_topic, propagate_ready, sync_subscribers, update_status};

const FAILED_CREATE_REASON: &str = "FailedCreate";
const FAILED_CREATE_MESSAGE: &str = "Error when attempting to create Topic.";

/// Converges a single channel towards its spec
#[derive(Debug)]
pub struct ChannelReconciler<C> {
    ctx: SharedContext<C>,
}

impl<C> Clone for ChannelReconciler<C> {
    fn clone(&self) -> Self {
        Self {
            ctx: self.ctx.clone(),
        }
    }
}

impl<C> ChannelReconciler<C>
where
    C: MetadataClient + 'static,
{
    pub fn new(ctx: SharedContext<C>) -> Self {
        Self { ctx }
    }

    /// Reconcile the channel identified by `key` (`namespace/name`).
    ///
    /// Malformed keys, missing channels and channels being deleted are not
    /// errors since retrying can't change the outcome.
    #[instrument(skip(self))]
    pub async fn reconcile(&self, key: &str) -> Result<(), ReconcileError> {
        let key: ObjectKey = match key.parse() {
            Ok(key) => key,
            Err(err) => {
                error!(%err, "invalid resource key");
                return Ok(());
            }
        };

        let cached = match self.ctx.channels().get(&key).await {
            Ok(channel) => channel,
            Err(IndexError::NotFound(_)) => {
                debug!(%key, "channel no longer exists");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };

        if cached.is_being_deleted() {
            debug!(%key, "channel is being deleted");
            return Ok(());
        }

        // cache entries are shared, work on an owned copy
        let original = ChannelObj::clone(&cached);
        let mut channel = original.clone();

        let result = self.reconcile_channel(&mut channel).await;
        if result.is_ok() {
            channel.status.observed_generation = channel.metadata.generation;
        }

        if channel.status != original.status {
            match update_status(&self.ctx, &channel).await {
                Ok(_) => {
                    if result.is_ok() {
                        self.record(
                            &channel,
                            EventType::Normal,
                            reasons::UPDATED,
                            format!("Updated Channel {:?}", channel.name()),
                        );
                    }
                }
                Err(err) => {
                    warn!(%key, %err, "failed to update channel status");
                    self.record(
                        &channel,
                        EventType::Warning,
                        reasons::UPDATE_FAILED,
                        format!(
                            "Failed to update status for Channel {:?}: {err}",
                            channel.name()
                        ),
                    );
                    return Err(err);
                }
            }
        }

        if let Err(err) = result {
            self.record(
                &channel,
                EventType::Warning,
                reasons::INTERNAL_ERROR,
                err.to_string(),
            );
            return Err(err);
        }

        info!(%key, "reconciled");
        Ok(())
    }

    async fn reconcile_channel(&self, channel: &mut ChannelObj) -> Result<(), ReconcileError> {
        let now = self.ctx.clock().now();
        channel.status.initialize_conditions(now);

        if channel.status.topic_id.is_none() {
            channel.status.topic_id = Some(generate_topic_id(channel.name(), channel.uid()));
        }

        let topic = match ensure_topic(&self.ctx, channel).await {
            Ok(topic) => topic,
            Err(err) => {
                channel
                    .status
                    .mark_no_topic(FAILED_CREATE_REASON, FAILED_CREATE_MESSAGE, now);
                return Err(err);
            }
        };

        propagate_ready(topic.status.ready_condition(), &mut channel.status, now);
        let address = topic.status.address.as_ref().map(|addr| addr.url.as_str());
        channel.status.set_address(address, now);

        sync_subscribers(self.ctx.subscriber_actions().as_ref(), channel).await
    }

    fn record(&self, channel: &ChannelObj, event_type: EventType, reason: &str, message: String) {
        self.ctx
            .recorder()
            .record(&channel.object_ref(), event_type, reason, &message);
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use chrono::Duration as ChronoDuration;

    use eventing_metadata::channel::{
        CHANNEL_CONDITION_ADDRESSABLE, CHANNEL_CONDITION_TOPIC_READY, ChannelSpec, SubscriberSpec,
        SubscriberStatus,
    };
    use eventing_metadata::condition::CONDITION_READY;
    use eventing_metadata::core::{LabelSelector, ObjectKey, Spec};
    use eventing_metadata::subscription::PullSubscriptionSpec;
    use eventing_metadata::topic::TopicSpec;
    use eventing_types::defaults::CHANNEL_KIND;

    use crate::config::{ControllerConfig, SubscriptionMode};
    use crate::core::Clock;
    use crate::error::ReconcileError;
    use crate::fixture::{FailingSubscriberActions, Op, TestHarness};
    use crate::monitoring::{EventType, reasons};
    use crate::resources::generate_topic_id;
    use crate::store::{IndexError, MetadataClient};

    const KEY: &str = "default/orders";

    async fn topics(harness: &TestHarness) -> Vec<eventing_metadata::topic::TopicObj> {
        harness
            .client
            .retrieve_items::<TopicSpec>("default", &LabelSelector::default())
            .await
            .expect("topics")
    }

    #[fluvio_future::test]
    async fn test_new_channel_gets_topic() {
        let harness = TestHarness::new().await;
        let channel = harness.create_channel("orders", ChannelSpec::new("proj")).await;
        harness.sync().await;

        harness.reconciler().reconcile(KEY).await.expect("reconciled");

        let topics = topics(&harness).await;
        assert_eq!(topics.len(), 1);
        assert_eq!(topics[0].name(), "orders");
        assert_eq!(
            topics[0].spec.topic,
            generate_topic_id("orders", channel.uid())
        );

        let stored = harness.stored_channel("orders").await;
        let status = &stored.status;
        assert_eq!(
            status.topic_id.as_deref(),
            Some(generate_topic_id("orders", channel.uid()).as_str())
        );
        assert_eq!(status.observed_generation, 1);
        assert!(status.subscribers.is_empty());
        assert!(status.address.is_none());
        assert!(
            status
                .get_condition(CHANNEL_CONDITION_TOPIC_READY)
                .expect("topic ready")
                .is_unknown()
        );
        let addressable = status
            .get_condition(CHANNEL_CONDITION_ADDRESSABLE)
            .expect("addressable");
        assert!(addressable.is_false());
        assert_eq!(addressable.reason(), "EmptyAddress");
        assert!(!status.is_ready());

        assert_eq!(
            harness.recorder.reasons(),
            vec![reasons::TOPIC_CREATED, reasons::UPDATED]
        );
    }

    #[fluvio_future::test]
    async fn test_unchanged_channel_is_not_written() {
        let harness = TestHarness::new().await;
        harness.create_channel("orders", ChannelSpec::new("proj")).await;
        harness.sync().await;

        let reconciler = harness.reconciler();
        reconciler.reconcile(KEY).await.expect("first");
        let first = harness.stored_channel("orders").await;

        // cache caught up
        harness.sync().await;
        harness.clock.advance(ChronoDuration::seconds(10));
        reconciler.reconcile(KEY).await.expect("second");
        reconciler.reconcile(KEY).await.expect("third");

        assert_eq!(harness.client.calls(Op::UpdateStatus, ChannelSpec::KIND), 1);
        assert_eq!(harness.client.calls(Op::Create, TopicSpec::KIND), 1);
        assert_eq!(harness.stored_channel("orders").await, first);
    }

    #[fluvio_future::test]
    async fn test_stale_cache_skips_write() {
        let harness = TestHarness::new().await;
        harness.create_channel("orders", ChannelSpec::new("proj")).await;
        harness.sync().await;

        let reconciler = harness.reconciler();
        reconciler.reconcile(KEY).await.expect("first");
        // index still holds the channel without status
        reconciler.reconcile(KEY).await.expect("second");

        assert_eq!(harness.client.calls(Op::UpdateStatus, ChannelSpec::KIND), 1);
        assert_eq!(harness.client.calls(Op::Create, TopicSpec::KIND), 1);
    }

    #[fluvio_future::test]
    async fn test_ready_topic_makes_channel_ready() {
        let harness = TestHarness::new().await;
        harness.create_channel("orders", ChannelSpec::new("proj")).await;
        harness.sync().await;
        let reconciler = harness.reconciler();
        reconciler.reconcile(KEY).await.expect("first");

        // topic controller reports the topic ready
        let mut topic = harness
            .client
            .retrieve_item::<TopicSpec>(&ObjectKey::new("default", "orders"))
            .await
            .expect("topic");
        let now = harness.clock.now();
        topic.status.initialize_conditions(now);
        topic.status.mark_topic_exists(now);
        topic.status.mark_publisher_deployed(now);
        topic.status.set_address(Some("http://orders.default.svc"));
        harness.client.update_status(topic).await.expect("topic status");

        harness.sync().await;
        harness.clock.advance(ChronoDuration::seconds(2));
        reconciler.reconcile(KEY).await.expect("second");

        let stored = harness.stored_channel("orders").await;
        assert!(stored.status.is_ready());
        assert_eq!(
            stored.status.address.as_ref().map(|addr| addr.url.as_str()),
            Some("http://orders.default.svc")
        );
        assert_eq!(harness.stats.count(CHANNEL_KIND), 1);
        assert_eq!(
            harness.stats.value_at_quantile(CHANNEL_KIND, 0.5),
            Some(2000)
        );

        // stays ready, latency not reported twice
        harness.sync().await;
        reconciler.reconcile(KEY).await.expect("third");
        assert_eq!(harness.stats.count(CHANNEL_KIND), 1);
    }

    #[fluvio_future::test]
    async fn test_not_ready_topic_propagates() {
        let harness = TestHarness::new().await;
        harness.create_channel("orders", ChannelSpec::new("proj")).await;
        harness.sync().await;
        let reconciler = harness.reconciler();
        reconciler.reconcile(KEY).await.expect("first");

        let mut topic = harness
            .client
            .retrieve_item::<TopicSpec>(&ObjectKey::new("default", "orders"))
            .await
            .expect("topic");
        let now = harness.clock.now();
        topic.status.initialize_conditions(now);
        topic.status.mark_no_topic("TopicDeleted", "topic was deleted", now);
        harness.client.update_status(topic).await.expect("topic status");

        harness.sync().await;
        reconciler.reconcile(KEY).await.expect("second");

        let stored = harness.stored_channel("orders").await;
        let cond = stored
            .status
            .get_condition(CHANNEL_CONDITION_TOPIC_READY)
            .expect("topic ready");
        assert!(cond.is_false());
        assert_eq!(cond.reason(), "TopicDeleted");
        let ready = stored.status.get_condition(CONDITION_READY).expect("ready");
        assert!(ready.is_false());
    }

    #[fluvio_future::test]
    async fn test_topic_create_failure() {
        let harness = TestHarness::new().await;
        harness.create_channel("orders", ChannelSpec::new("proj")).await;
        harness.sync().await;

        harness.client.fail_next(Op::Create, TopicSpec::KIND);
        let err = harness
            .reconciler()
            .reconcile(KEY)
            .await
            .expect_err("create fails");
        assert!(matches!(err, ReconcileError::Store(_)));

        let stored = harness.stored_channel("orders").await;
        let cond = stored
            .status
            .get_condition(CHANNEL_CONDITION_TOPIC_READY)
            .expect("topic ready");
        assert!(cond.is_false());
        assert_eq!(cond.reason(), "FailedCreate");
        assert_eq!(cond.message(), "Error when attempting to create Topic.");
        assert_eq!(stored.status.observed_generation, 0);
        let events = harness.recorder.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].reason, reasons::INTERNAL_ERROR);
        assert_eq!(events[0].event_type, EventType::Warning);
        assert_eq!(events[0].object.name, "orders");
        assert!(events[0].message.contains("unavailable"));
    }

    #[fluvio_future::test]
    async fn test_conflict_then_retry() {
        let harness = TestHarness::new().await;
        harness.create_channel("orders", ChannelSpec::new("proj")).await;
        harness.sync().await;

        harness.client.bump_before_status(ChannelSpec::KIND);
        let reconciler = harness.reconciler();
        let err = reconciler.reconcile(KEY).await.expect_err("conflict");
        assert!(err.is_conflict());
        assert_eq!(harness.recorder.reasons(), vec![
            reasons::TOPIC_CREATED,
            reasons::UPDATE_FAILED
        ]);

        reconciler.reconcile(KEY).await.expect("retried");
        let stored = harness.stored_channel("orders").await;
        assert_eq!(stored.status.observed_generation, 1);
        assert_eq!(harness.client.calls(Op::Create, TopicSpec::KIND), 1);
    }

    #[fluvio_future::test]
    async fn test_skipped_keys() {
        let harness = TestHarness::new().await;
        harness.sync().await;
        let reconciler = harness.reconciler();

        reconciler.reconcile("a/b/c").await.expect("malformed key");
        reconciler.reconcile("default/missing").await.expect("not found");
        assert_eq!(harness.client.calls(Op::List, TopicSpec::KIND), 0);
    }

    #[fluvio_future::test]
    async fn test_deleting_channel_is_skipped() {
        let harness = TestHarness::new().await;
        let mut channel = harness.create_channel("orders", ChannelSpec::new("proj")).await;
        channel.metadata.deletion_timestamp = Some(harness.clock.now());
        harness.client.update_spec(channel).await.expect("marked");
        harness.sync().await;

        harness.reconciler().reconcile(KEY).await.expect("skipped");
        assert!(topics(&harness).await.is_empty());
        assert_eq!(harness.client.calls(Op::UpdateStatus, ChannelSpec::KIND), 0);
    }

    #[fluvio_future::test]
    async fn test_unsynced_index_is_retried() {
        let harness = TestHarness::new().await;
        harness.create_channel("orders", ChannelSpec::new("proj")).await;

        let err = harness
            .reconciler()
            .reconcile(KEY)
            .await
            .expect_err("not synced");
        assert!(matches!(err, ReconcileError::Index(IndexError::NotSynced)));
    }

    #[fluvio_future::test]
    async fn test_subscriber_failure_still_persists_status() {
        let actions = Arc::new(FailingSubscriberActions::failing(["b"]));
        let harness = TestHarness::with_actions(actions.clone()).await;
        harness
            .create_channel(
                "orders",
                ChannelSpec::new("proj").with_subscribers(vec![
                    SubscriberSpec::new("a", 1),
                    SubscriberSpec::new("b", 1),
                ]),
            )
            .await;
        harness.sync().await;

        let err = harness
            .reconciler()
            .reconcile(KEY)
            .await
            .expect_err("b fails");
        assert!(matches!(err, ReconcileError::Subscriber { .. }));

        let stored = harness.stored_channel("orders").await;
        assert_eq!(
            stored.status.subscribers,
            vec![SubscriberStatus::new("a", 1)]
        );
        assert_eq!(stored.status.observed_generation, 0);
        assert!(stored.status.topic_id.is_some());
        assert_eq!(
            actions.calls(),
            vec![("create", "a".to_owned()), ("create", "b".to_owned())]
        );
        assert_eq!(
            harness.recorder.reasons(),
            vec![reasons::TOPIC_CREATED, reasons::INTERNAL_ERROR]
        );
    }

    #[fluvio_future::test]
    async fn test_store_backed_subscriptions() {
        let config = ControllerConfig {
            subscriptions: SubscriptionMode::Store,
            ..Default::default()
        };
        let harness = TestHarness::with_config(config).await;
        let channel = harness
            .create_channel(
                "orders",
                ChannelSpec::new("proj").with_subscribers(vec![
                    SubscriberSpec::new("a", 1).with_subscriber_uri("http://first"),
                ]),
            )
            .await;
        harness.sync().await;
        let reconciler = harness.reconciler();
        let sub_key = ObjectKey::new("default", "cre-sub-orders-a");

        reconciler.reconcile(KEY).await.expect("created");
        let sub = harness
            .client
            .retrieve_item::<PullSubscriptionSpec>(&sub_key)
            .await
            .expect("subscription");
        assert_eq!(sub.spec.sink.as_deref(), Some("http://first"));
        assert_eq!(sub.spec.topic, generate_topic_id("orders", channel.uid()));
        assert_eq!(
            harness.stored_channel("orders").await.status.subscribers,
            vec![SubscriberStatus::new("a", 1)]
        );

        // subscriber changed
        let mut stored = harness.stored_channel("orders").await;
        stored.spec.subscribers =
            vec![SubscriberSpec::new("a", 2).with_subscriber_uri("http://second")];
        harness.client.update_spec(stored).await.expect("spec");
        harness.sync().await;

        reconciler.reconcile(KEY).await.expect("updated");
        let sub = harness
            .client
            .retrieve_item::<PullSubscriptionSpec>(&sub_key)
            .await
            .expect("subscription");
        assert_eq!(sub.spec.sink.as_deref(), Some("http://second"));
        assert_eq!(sub.spec.subscriber_generation, 2);
        let stored = harness.stored_channel("orders").await;
        assert_eq!(
            stored.status.subscribers,
            vec![SubscriberStatus::new("a", 2)]
        );
        assert_eq!(stored.status.observed_generation, 2);

        // subscriber removed
        let mut stored = harness.stored_channel("orders").await;
        stored.spec.subscribers = vec![];
        harness.client.update_spec(stored).await.expect("spec");
        harness.sync().await;

        reconciler.reconcile(KEY).await.expect("deleted");
        let err = harness
            .client
            .retrieve_item::<PullSubscriptionSpec>(&sub_key)
            .await
            .expect_err("gone");
        assert!(err.is_not_found());
        let stored = harness.stored_channel("orders").await;
        assert!(stored.status.subscribers.is_empty());

        let recorded = harness.recorder.reasons();
        assert!(recorded.iter().any(|r| r == reasons::SUBSCRIPTION_CREATED));
        assert!(recorded.iter().any(|r| r == reasons::SUBSCRIPTION_UPDATED));
        assert!(recorded.iter().any(|r| r == reasons::SUBSCRIPTION_DELETED));
    }
}

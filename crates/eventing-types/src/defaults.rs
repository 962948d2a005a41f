use std::time::Duration;

/// Name the controller uses for labels and events
pub const CONTROLLER_AGENT_NAME: &str = "cloud-run-events-channel-controller";

/// Name used in the readiness latency reports
pub const CHANNEL_KIND: &str = "Channel";

pub const LABEL_CONTROLLER: &str = "events.cloud.run/controller";
pub const LABEL_CHANNEL: &str = "events.cloud.run/channel";

/// Annotation that selects how messages are delivered to a subscriber
pub const PUBSUB_MODE_ANNOTATION: &str = "pubsub.cloud.run/mode";
pub const PUBSUB_MODE_CLOUD_EVENTS_BINARY: &str = "CloudEventsBinary";

// Credentials used when a channel doesn't name its own secret
pub const DEFAULT_SECRET_NAME: &str = "google-cloud-key";
pub const DEFAULT_SECRET_KEY: &str = "key.json";

pub const TOPIC_NAME_PREFIX: &str = "cre-chan";
pub const SUBSCRIPTION_NAME_PREFIX: &str = "cre-sub";

pub const DEFAULT_WORKERS: usize = 2;
pub const DEFAULT_RESYNC_INTERVAL: Duration = Duration::from_secs(300);

// requeue backoff for failed reconciles
pub const REQUEUE_BACKOFF_FACTOR: f64 = 2.0;
pub const REQUEUE_BACKOFF_MIN_DURATION: Duration = Duration::from_millis(5);
pub const REQUEUE_BACKOFF_MAX_DURATION: Duration = Duration::from_secs(1000);

pub const CONFIG_FILE_NAME: &str = "controller.toml";

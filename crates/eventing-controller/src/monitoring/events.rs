use std::fmt;
use std::fmt::Debug;
use std::sync::Arc;

use tracing::{info, warn};

use eventing_metadata::core::ObjectReference;

pub type SharedEventRecorder = Arc<dyn EventRecorder>;

pub mod reasons {
    pub const TOPIC_CREATED: &str = "TopicCreated";
    pub const UPDATED: &str = "Updated";
    pub const UPDATE_FAILED: &str = "UpdateFailed";
    pub const INTERNAL_ERROR: &str = "InternalError";
    pub const SUBSCRIPTION_CREATED: &str = "SubscriptionCreated";
    pub const SUBSCRIPTION_UPDATED: &str = "SubscriptionUpdated";
    pub const SUBSCRIPTION_DELETED: &str = "SubscriptionDeleted";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Normal,
    Warning,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Normal => write!(f, "Normal"),
            Self::Warning => write!(f, "Warning"),
        }
    }
}

/// Best effort sink for user visible events about an object.
/// Recording never fails from the caller's point of view.
pub trait EventRecorder: Debug + Send + Sync {
    fn record(&self, object: &ObjectReference, type_: EventType, reason: &str, message: &str);
}

/// writes events to the log
#[derive(Debug, Default)]
pub struct LoggingEventRecorder;

impl LoggingEventRecorder {
    pub fn shared() -> SharedEventRecorder {
        Arc::new(Self)
    }
}

impl EventRecorder for LoggingEventRecorder {
    fn record(&self, object: &ObjectReference, type_: EventType, reason: &str, message: &str) {
        match type_ {
            EventType::Normal => info!(%object, reason, message, "event"),
            EventType::Warning => warn!(%object, reason, message, "event"),
        }
    }
}

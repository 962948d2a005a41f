use thiserror::Error;

use eventing_metadata::core::ObjectKey;
use eventing_types::Uid;

use crate::store::{IndexError, StoreError};

pub use crate::monitoring::StatsError;

/// Failure of a single reconcile, always retried by the worker
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("index error: {0}")]
    Index(#[from] IndexError),
    #[error("topic {topic} exists but is not controlled by channel {channel}")]
    TopicNotOwned { channel: ObjectKey, topic: ObjectKey },
    #[error("unable to sync subscriber {uid}: {source}")]
    Subscriber {
        uid: Uid,
        #[source]
        source: StoreError,
    },
}

impl ReconcileError {
    /// concurrent writer changed the object first
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Store(err) if err.is_conflict())
    }
}

use chrono::{DateTime, Utc};

use eventing_metadata::channel::ChannelStatus;
use eventing_metadata::condition::{Condition, ConditionStatus};

/// What a child's `Ready` condition means for the parent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Propagation {
    Ready,
    Operating { reason: String, message: String },
    NotReady { reason: String, message: String },
    /// child has not reported yet
    Unchanged,
}

impl Propagation {
    pub fn from_condition(child: Option<&Condition>) -> Self {
        let Some(cond) = child else {
            return Self::Unchanged;
        };
        match cond.status {
            ConditionStatus::True => Self::Ready,
            ConditionStatus::Unknown => Self::Operating {
                reason: cond.reason().to_owned(),
                message: cond.message().to_owned(),
            },
            ConditionStatus::False => Self::NotReady {
                reason: cond.reason().to_owned(),
                message: cond.message().to_owned(),
            },
        }
    }

    pub fn apply_to<T: ReadinessTarget>(&self, target: &mut T, now: DateTime<Utc>) {
        match self {
            Self::Ready => target.mark_ready(now),
            Self::Operating { reason, message } => target.mark_operating(reason, message, now),
            Self::NotReady { reason, message } => target.mark_not_ready(reason, message, now),
            Self::Unchanged => {}
        }
    }
}

/// Parent condition that tracks an owned child
pub trait ReadinessTarget {
    fn mark_ready(&mut self, now: DateTime<Utc>);
    fn mark_operating(&mut self, reason: &str, message: &str, now: DateTime<Utc>);
    fn mark_not_ready(&mut self, reason: &str, message: &str, now: DateTime<Utc>);
}

/// the channel's topic condition
impl ReadinessTarget for ChannelStatus {
    fn mark_ready(&mut self, now: DateTime<Utc>) {
        self.mark_topic_ready(now);
    }

    fn mark_operating(&mut self, reason: &str, message: &str, now: DateTime<Utc>) {
        self.mark_topic_operating(reason, message, now);
    }

    fn mark_not_ready(&mut self, reason: &str, message: &str, now: DateTime<Utc>) {
        self.mark_no_topic(reason, message, now);
    }
}

/// copy a child's `Ready` condition onto the parent
pub fn propagate_ready<T: ReadinessTarget>(
    child: Option<&Condition>,
    parent: &mut T,
    now: DateTime<Utc>,
) {
    Propagation::from_condition(child).apply_to(parent, now);
}

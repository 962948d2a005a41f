use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use eventing_types::{Generation, TopicId, Uid};

use crate::condition::{CONDITION_READY, Condition, ConditionSet, get_condition};
use crate::core::Addressable;

/// Topic owned by the channel exists and is ready
pub const CHANNEL_CONDITION_TOPIC_READY: &str = "TopicReady";

/// Channel has a url events can be sent to
pub const CHANNEL_CONDITION_ADDRESSABLE: &str = "Addressable";

pub const CHANNEL_CONDITION_SET: ConditionSet = ConditionSet::living(
    CONDITION_READY,
    &[CHANNEL_CONDITION_TOPIC_READY, CHANNEL_CONDITION_ADDRESSABLE],
);

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChannelStatus {
    pub observed_generation: Generation,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Addressable>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic_id: Option<TopicId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subscribers: Vec<SubscriberStatus>,
}

impl ChannelStatus {
    pub fn get_condition(&self, type_: &str) -> Option<&Condition> {
        get_condition(&self.conditions, type_)
    }

    pub fn is_ready(&self) -> bool {
        self.get_condition(CONDITION_READY)
            .map(|cond| cond.is_true())
            .unwrap_or(false)
    }

    pub fn initialize_conditions(&mut self, now: DateTime<Utc>) {
        CHANNEL_CONDITION_SET
            .manage(&mut self.conditions, now)
            .initialize();
    }

    pub fn mark_topic_ready(&mut self, now: DateTime<Utc>) {
        CHANNEL_CONDITION_SET
            .manage(&mut self.conditions, now)
            .mark_true(CHANNEL_CONDITION_TOPIC_READY);
    }

    /// topic exists but is still being provisioned
    pub fn mark_topic_operating(&mut self, reason: &str, message: &str, now: DateTime<Utc>) {
        CHANNEL_CONDITION_SET
            .manage(&mut self.conditions, now)
            .mark_unknown(CHANNEL_CONDITION_TOPIC_READY, reason, message);
    }

    pub fn mark_no_topic(&mut self, reason: &str, message: &str, now: DateTime<Utc>) {
        CHANNEL_CONDITION_SET
            .manage(&mut self.conditions, now)
            .mark_false(CHANNEL_CONDITION_TOPIC_READY, reason, message);
    }

    /// an empty or missing url leaves the channel unaddressable
    pub fn set_address(&mut self, url: Option<&str>, now: DateTime<Utc>) {
        let mut manager = CHANNEL_CONDITION_SET.manage(&mut self.conditions, now);
        match url.filter(|url| !url.is_empty()) {
            Some(url) => {
                self.address = Some(Addressable::new(url));
                manager.mark_true(CHANNEL_CONDITION_ADDRESSABLE);
            }
            None => {
                self.address = None;
                manager.mark_false(
                    CHANNEL_CONDITION_ADDRESSABLE,
                    "EmptyAddress",
                    "address is not available",
                );
            }
        }
    }
}

/// Generation of a subscriber that was last synced to its subscription
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberStatus {
    pub uid: Uid,
    #[serde(default)]
    pub observed_generation: Generation,
}

impl SubscriberStatus {
    pub fn new(uid: impl Into<Uid>, observed_generation: Generation) -> Self {
        Self {
            uid: uid.into(),
            observed_generation,
        }
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use eventing_types::{ProjectId, TopicId};

use crate::condition::{CONDITION_READY, Condition, ConditionSet, get_condition};
use crate::core::Addressable;

pub const TOPIC_CONDITION_READY: &str = CONDITION_READY;

/// topic exists in the messaging backend
pub const TOPIC_CONDITION_TOPIC_EXISTS: &str = "TopicExists";

pub const TOPIC_CONDITION_PUBLISHER_READY: &str = "PublisherReady";

pub const TOPIC_CONDITION_SET: ConditionSet = ConditionSet::living(
    TOPIC_CONDITION_READY,
    &[TOPIC_CONDITION_TOPIC_EXISTS, TOPIC_CONDITION_PUBLISHER_READY],
);

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TopicStatus {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Addressable>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ProjectId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic_id: Option<TopicId>,
}

impl TopicStatus {
    pub fn get_condition(&self, type_: &str) -> Option<&Condition> {
        get_condition(&self.conditions, type_)
    }

    /// `Ready` condition, absent until the topic controller has seen the topic
    pub fn ready_condition(&self) -> Option<&Condition> {
        self.get_condition(TOPIC_CONDITION_READY)
    }

    pub fn is_ready(&self) -> bool {
        self.ready_condition()
            .map(|cond| cond.is_true())
            .unwrap_or(false)
    }

    pub fn initialize_conditions(&mut self, now: DateTime<Utc>) {
        TOPIC_CONDITION_SET
            .manage(&mut self.conditions, now)
            .initialize();
    }

    pub fn mark_topic_exists(&mut self, now: DateTime<Utc>) {
        TOPIC_CONDITION_SET
            .manage(&mut self.conditions, now)
            .mark_true(TOPIC_CONDITION_TOPIC_EXISTS);
    }

    pub fn mark_no_topic(&mut self, reason: &str, message: &str, now: DateTime<Utc>) {
        TOPIC_CONDITION_SET
            .manage(&mut self.conditions, now)
            .mark_false(TOPIC_CONDITION_TOPIC_EXISTS, reason, message);
    }

    pub fn mark_publisher_deployed(&mut self, now: DateTime<Utc>) {
        TOPIC_CONDITION_SET
            .manage(&mut self.conditions, now)
            .mark_true(TOPIC_CONDITION_PUBLISHER_READY);
    }

    pub fn mark_publisher_deploying(&mut self, reason: &str, message: &str, now: DateTime<Utc>) {
        TOPIC_CONDITION_SET
            .manage(&mut self.conditions, now)
            .mark_unknown(TOPIC_CONDITION_PUBLISHER_READY, reason, message);
    }

    pub fn set_address(&mut self, url: Option<&str>) {
        self.address = url.filter(|url| !url.is_empty()).map(Addressable::new);
    }
}

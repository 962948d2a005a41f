use serde::{Deserialize, Serialize};

use eventing_types::defaults::{PUBSUB_MODE_ANNOTATION, PUBSUB_MODE_CLOUD_EVENTS_BINARY};
use eventing_types::{Generation, ProjectId, TopicId};

use crate::core::{ObjectMeta, SecretKeySelector};

/// Pulls messages from a topic and delivers them to a sink
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullSubscriptionSpec {
    #[serde(default)]
    pub project: ProjectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<SecretKeySelector>,
    pub topic: TopicId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sink: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
    /// generation of the channel subscriber this was built from
    #[serde(default)]
    pub subscriber_generation: Generation,
}

impl PullSubscriptionSpec {
    /// Admission defaults: delivery mode is binary CloudEvents unless set
    pub fn set_defaults(meta: &mut ObjectMeta) {
        meta.annotations
            .entry(PUBSUB_MODE_ANNOTATION.to_owned())
            .or_insert_with(|| PUBSUB_MODE_CLOUD_EVENTS_BINARY.to_owned());
    }
}

use serde::{Deserialize, Serialize};

use eventing_types::{ProjectId, TopicId};

use crate::core::SecretKeySelector;

/// Pub/Sub topic backing a channel
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicSpec {
    #[serde(default)]
    pub project: ProjectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<SecretKeySelector>,
    pub topic: TopicId,
}

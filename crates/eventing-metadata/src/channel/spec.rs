use serde::{Deserialize, Serialize};

use eventing_types::{Generation, ProjectId, Uid};

use crate::core::SecretKeySelector;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSpec {
    #[serde(default)]
    pub project: ProjectId,
    /// credentials used by the owned topic and subscriptions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<SecretKeySelector>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subscribers: Vec<SubscriberSpec>,
}

impl ChannelSpec {
    pub fn new(project: impl Into<ProjectId>) -> Self {
        Self {
            project: project.into(),
            ..Default::default()
        }
    }

    pub fn with_secret(mut self, secret: SecretKeySelector) -> Self {
        self.secret = Some(secret);
        self
    }

    pub fn with_subscribers(mut self, subscribers: Vec<SubscriberSpec>) -> Self {
        self.subscribers = subscribers;
        self
    }
}

/// One consumer of the channel, identified by the uid of its subscription request
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberSpec {
    pub uid: Uid,
    #[serde(default)]
    pub generation: Generation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscriber_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_uri: Option<String>,
}

impl SubscriberSpec {
    pub fn new(uid: impl Into<Uid>, generation: Generation) -> Self {
        Self {
            uid: uid.into(),
            generation,
            ..Default::default()
        }
    }

    pub fn with_subscriber_uri(mut self, uri: impl Into<String>) -> Self {
        self.subscriber_uri = Some(uri.into());
        self
    }

    pub fn with_reply_uri(mut self, uri: impl Into<String>) -> Self {
        self.reply_uri = Some(uri.into());
        self
    }
}

use std::fs::read_to_string;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

use eventing_metadata::channel::ChannelObj;
use eventing_metadata::topic::TopicObj;

use super::MetadataClient;

/// Resources loaded into the store at startup in local mode
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LocalManifest {
    pub channels: Vec<ChannelObj>,
    pub topics: Vec<TopicObj>,
}

impl LocalManifest {
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = read_to_string(path)
            .with_context(|| format!("unable to read manifest {}", path.display()))?;
        Self::load_str(&content)
    }

    pub fn load_str(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// topics first so channels find them on their first reconcile
    pub async fn seed<C: MetadataClient>(self, client: &C) -> Result<()> {
        info!(
            topics = self.topics.len(),
            channels = self.channels.len(),
            "seeding store"
        );
        for topic in self.topics {
            client.create_item(topic).await?;
        }
        for channel in self.channels {
            client.create_item(channel).await?;
        }
        Ok(())
    }
}

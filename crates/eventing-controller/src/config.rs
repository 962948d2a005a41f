//!
//! # Controller configuration
//!
//! Defaults, overlaid by an optional TOML file, overlaid by command line flags.
//!
use std::collections::BTreeSet;
use std::time::Duration;

use adaptive_backoff::prelude::{BackoffBuilder, ExponentialBackoff, ExponentialBackoffBuilder};
use anyhow::Result;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use eventing_metadata::core::SecretKeySelector;
use eventing_types::defaults::{
    CONTROLLER_AGENT_NAME, DEFAULT_RESYNC_INTERVAL, DEFAULT_SECRET_KEY, DEFAULT_SECRET_NAME,
    DEFAULT_WORKERS, REQUEUE_BACKOFF_FACTOR, REQUEUE_BACKOFF_MAX_DURATION,
    REQUEUE_BACKOFF_MIN_DURATION,
};

/// How subscriber changes are carried out
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionMode {
    /// only log the actions that would be taken
    #[default]
    Log,
    /// create, update and delete owned subscriptions in the store
    Store,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequeueConfig {
    #[serde(with = "humantime_serde")]
    pub min: Duration,
    #[serde(with = "humantime_serde")]
    pub max: Duration,
    pub factor: f64,
}

impl Default for RequeueConfig {
    fn default() -> Self {
        Self {
            min: REQUEUE_BACKOFF_MIN_DURATION,
            max: REQUEUE_BACKOFF_MAX_DURATION,
            factor: REQUEUE_BACKOFF_FACTOR,
        }
    }
}

impl RequeueConfig {
    pub fn backoff(&self) -> Result<ExponentialBackoff> {
        ExponentialBackoffBuilder::default()
            .factor(self.factor)
            .min(self.min)
            .max(self.max)
            .build()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// namespace to watch, empty for all
    pub namespace: String,
    pub workers: usize,
    /// used in labels and as the event source
    pub agent_name: String,
    pub subscriptions: SubscriptionMode,
    pub requeue: RequeueConfig,
    /// credentials for channels that don't name their own
    pub default_secret: SecretKeySelector,
    #[serde(with = "humantime_serde")]
    pub resync_interval: Duration,
    /// components to start, empty starts all
    pub white_list: BTreeSet<String>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            namespace: String::new(),
            workers: DEFAULT_WORKERS,
            agent_name: CONTROLLER_AGENT_NAME.to_owned(),
            subscriptions: SubscriptionMode::default(),
            requeue: RequeueConfig::default(),
            default_secret: SecretKeySelector::new(DEFAULT_SECRET_NAME, DEFAULT_SECRET_KEY),
            resync_interval: DEFAULT_RESYNC_INTERVAL,
            white_list: BTreeSet::new(),
        }
    }
}

//!
//! # CLI for the channel controller
//!
//! Parameters are overwritten in the following sequence:
//!     1) default values
//!     2) configuration file, if provided
//!     3) cli parameters
//!
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use humantime_serde::re::humantime::parse_duration;
use tracing::debug;

use eventing_types::config_file::SaveLoadConfig;
use eventing_types::print_cli_err;

use crate::config::{ControllerConfig, SubscriptionMode};

/// cli options
#[derive(Debug, Parser)]
#[command(name = "channel-controller", about = "Channel reconciliation controller")]
pub struct ControllerOpt {
    /// path to a TOML configuration file
    #[arg(short = 'c', long, value_name = "config path", env = "CHANNEL_CONTROLLER_CONFIG")]
    config: Option<PathBuf>,

    /// namespace to watch, all namespaces if omitted
    #[arg(short = 'n', long = "namespace", value_name = "namespace")]
    namespace: Option<String>,

    /// number of concurrent reconcile workers
    #[arg(long)]
    workers: Option<usize>,

    /// how subscribers are synced
    #[arg(long, value_enum)]
    subscriptions: Option<SubscriptionMode>,

    /// interval between full resyncs, e.g. "5m"
    #[arg(long, value_parser = parse_duration)]
    resync_interval: Option<Duration>,

    /// YAML manifest of channels and topics to seed the store with
    #[arg(long, value_name = "manifest path")]
    local: Option<PathBuf>,

    /// only allow white list of controllers
    #[arg(long)]
    white_list: Vec<String>,
}

impl ControllerOpt {
    pub fn local_manifest(&self) -> Option<&PathBuf> {
        self.local.as_ref()
    }

    #[allow(clippy::wrong_self_convention)]
    pub fn as_controller_config(&self) -> Result<ControllerConfig> {
        let mut config = match &self.config {
            Some(path) => ControllerConfig::load_from(path)
                .with_context(|| format!("unable to load config from {}", path.display()))?,
            None => ControllerConfig::default(),
        };

        if let Some(namespace) = &self.namespace {
            config.namespace = namespace.clone();
        }

        if let Some(workers) = self.workers {
            config.workers = workers;
        }

        if let Some(mode) = self.subscriptions {
            config.subscriptions = mode;
        }

        if let Some(interval) = self.resync_interval {
            config.resync_interval = interval;
        }

        if !self.white_list.is_empty() {
            config.white_list = self.white_list.iter().cloned().collect();
        }

        debug!(?config, "controller config");
        Ok(config)
    }

    pub fn parse_cli_or_exit(&self) -> ControllerConfig {
        match self.as_controller_config() {
            Err(err) => {
                print_cli_err!(format!("{err:#}"));
                process::exit(-1);
            }
            Ok(config) => config,
        }
    }
}

#[cfg(test)]
mod test {
    use std::io::Write;
    use std::time::Duration;

    use clap::{CommandFactory, Parser};

    use crate::config::SubscriptionMode;

    use super::ControllerOpt;

    #[test]
    fn test_defaults() {
        let opt = ControllerOpt::parse_from(["channel-controller"]);
        let config = opt.as_controller_config().expect("config");
        assert_eq!(config, Default::default());
        assert!(opt.local_manifest().is_none());
    }

    #[test]
    fn test_flags_override_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        let contents = "namespace = \"from-file\"\nworkers = 8\nsubscriptions = \"store\"";
        writeln!(file, "{contents}").expect("written");

        let path = file.path().to_string_lossy().to_string();
        let opt = ControllerOpt::parse_from([
            "channel-controller",
            "--config",
            &path,
            "--workers",
            "3",
            "--resync-interval",
            "30s",
            "--white-list",
            "channel",
        ]);
        let config = opt.as_controller_config().expect("config");

        assert_eq!(config.namespace, "from-file");
        assert_eq!(config.workers, 3);
        assert_eq!(config.subscriptions, SubscriptionMode::Store);
        assert_eq!(config.resync_interval, Duration::from_secs(30));
        assert!(config.white_list.contains("channel"));
    }

    #[test]
    fn test_missing_config_file() {
        let opt =
            ControllerOpt::parse_from(["channel-controller", "-c", "/nonexistent/controller.toml"]);
        assert!(opt.as_controller_config().is_err());
    }

    #[test]
    fn test_subscription_mode_flag() {
        let opt = ControllerOpt::parse_from(["channel-controller", "--subscriptions", "store"]);
        let config = opt.as_controller_config().expect("config");
        assert_eq!(config.subscriptions, SubscriptionMode::Store);
    }

    #[test]
    fn test_every_flag_has_help() {
        let command = ControllerOpt::command();
        for arg in command.get_arguments() {
            let help = arg.get_help().map(|help| help.to_string()).unwrap_or_default();
            assert!(!help.is_empty(), "no help for {}", arg.get_id());
        }

        let namespace = command
            .get_arguments()
            .find(|arg| arg.get_id() == "namespace")
            .expect("namespace arg");
        assert_eq!(
            namespace.get_help().map(|help| help.to_string()).as_deref(),
            Some("namespace to watch, all namespaces if omitted")
        );
    }
}

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hdrhistogram::Histogram;
use thiserror::Error;
use tracing::info;

pub type SharedStatsReporter = Arc<dyn StatsReporter>;

// significant figures kept by the latency histograms
const HIST_PRECISION: u8 = 3;

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("unable to create histogram: {0}")]
    Creation(String),
    #[error("unable to record {value}ms for {kind}: {reason}")]
    Record {
        kind: String,
        value: u64,
        reason: String,
    },
    #[error("stats lock poisoned")]
    Poisoned,
}

/// Sink for readiness latency measurements
pub trait StatsReporter: Debug + Send + Sync {
    fn report_ready(
        &self,
        kind: &str,
        namespace: &str,
        name: &str,
        duration: Duration,
    ) -> Result<(), StatsError>;
}

#[derive(Debug, Default)]
pub struct LoggingStatsReporter;

impl LoggingStatsReporter {
    pub fn shared() -> SharedStatsReporter {
        Arc::new(Self)
    }
}

impl StatsReporter for LoggingStatsReporter {
    fn report_ready(
        &self,
        kind: &str,
        namespace: &str,
        name: &str,
        duration: Duration,
    ) -> Result<(), StatsError> {
        info!(kind, namespace, name, ?duration, "ready latency");
        Ok(())
    }
}

/// Latency quantiles for one kind, in milliseconds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatencySummary {
    pub kind: String,
    pub count: u64,
    pub p50: u64,
    pub p90: u64,
    pub p99: u64,
    pub max: u64,
}

/// Keeps a latency histogram in milliseconds per kind
#[derive(Debug, Default)]
pub struct HistogramStatsReporter {
    histograms: Mutex<HashMap<String, Histogram<u64>>>,
}

impl HistogramStatsReporter {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn count(&self, kind: &str) -> u64 {
        self.histograms
            .lock()
            .map(|histograms| histograms.get(kind).map_or(0, Histogram::len))
            .unwrap_or(0)
    }

    /// latency in milliseconds at `quantile` (0.0..=1.0)
    pub fn value_at_quantile(&self, kind: &str, quantile: f64) -> Option<u64> {
        let histograms = self.histograms.lock().ok()?;
        let hist = histograms.get(kind)?;
        if hist.is_empty() {
            None
        } else {
            Some(hist.value_at_quantile(quantile))
        }
    }

    /// quantiles of every kind with at least one sample, sorted by kind
    pub fn summary(&self) -> Vec<LatencySummary> {
        let Ok(histograms) = self.histograms.lock() else {
            return vec![];
        };
        let mut summary: Vec<LatencySummary> = histograms
            .iter()
            .filter(|(_, hist)| !hist.is_empty())
            .map(|(kind, hist)| LatencySummary {
                kind: kind.clone(),
                count: hist.len(),
                p50: hist.value_at_quantile(0.5),
                p90: hist.value_at_quantile(0.9),
                p99: hist.value_at_quantile(0.99),
                max: hist.max(),
            })
            .collect();
        summary.sort_by(|a, b| a.kind.cmp(&b.kind));
        summary
    }

    pub fn log_summary(&self) {
        for latency in self.summary() {
            info!(
                kind = %latency.kind,
                count = latency.count,
                p50_ms = latency.p50,
                p90_ms = latency.p90,
                p99_ms = latency.p99,
                max_ms = latency.max,
                "ready latency summary"
            );
        }
    }
}

impl StatsReporter for HistogramStatsReporter {
    fn report_ready(
        &self,
        kind: &str,
        namespace: &str,
        name: &str,
        duration: Duration,
    ) -> Result<(), StatsError> {
        let value = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        let mut histograms = self.histograms.lock().map_err(|_| StatsError::Poisoned)?;

        let hist = match histograms.entry(kind.to_owned()) {
            std::collections::hash_map::Entry::Occupied(entry) => entry.into_mut(),
            std::collections::hash_map::Entry::Vacant(entry) => entry.insert(
                Histogram::new(HIST_PRECISION)
                    .map_err(|err| StatsError::Creation(err.to_string()))?,
            ),
        };

        hist.record(value).map_err(|err| StatsError::Record {
            kind: kind.to_owned(),
            value,
            reason: err.to_string(),
        })?;

        info!(kind, namespace, name, latency_ms = value, "ready latency");
        Ok(())
    }
}

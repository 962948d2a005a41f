use std::fmt::Debug;
use std::sync::Arc;

use chrono::{DateTime, Utc};

pub type SharedClock = Arc<dyn Clock>;

/// Source of wall clock time for condition transitions and readiness latency
pub trait Clock: Debug + Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl SystemClock {
    pub fn shared() -> SharedClock {
        Arc::new(Self)
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

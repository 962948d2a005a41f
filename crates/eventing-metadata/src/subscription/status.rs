use serde::{Deserialize, Serialize};

use crate::condition::{CONDITION_READY, Condition, get_condition};

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PullSubscriptionStatus {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
}

impl PullSubscriptionStatus {
    pub fn is_ready(&self) -> bool {
        get_condition(&self.conditions, CONDITION_READY)
            .map(|cond| cond.is_true())
            .unwrap_or(false)
    }
}

//!
//! # Status conditions
//!
//! A condition is a named, three-valued observation with a machine readable
//! reason and a human readable message. A [`ConditionSet`] ties a set of
//! dependent conditions to one "happy" condition that summarizes them.
//!
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const CONDITION_READY: &str = "Ready";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionStatus {
    True,
    False,
    #[default]
    Unknown,
}

impl fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::True => write!(f, "True"),
            Self::False => write!(f, "False"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: ConditionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<DateTime<Utc>>,
}

impl Condition {
    pub fn new(type_: impl Into<String>, status: ConditionStatus) -> Self {
        Self {
            type_: type_.into(),
            status,
            ..Default::default()
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>, message: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self.message = Some(message.into());
        self
    }

    pub fn is_true(&self) -> bool {
        self.status == ConditionStatus::True
    }

    pub fn is_false(&self) -> bool {
        self.status == ConditionStatus::False
    }

    pub fn is_unknown(&self) -> bool {
        self.status == ConditionStatus::Unknown
    }

    pub fn reason(&self) -> &str {
        self.reason.as_deref().unwrap_or_default()
    }

    pub fn message(&self) -> &str {
        self.message.as_deref().unwrap_or_default()
    }

    /// same observation, ignoring transition time
    fn same_as(&self, other: &Self) -> bool {
        self.type_ == other.type_
            && self.status == other.status
            && self.reason == other.reason
            && self.message == other.message
    }
}

/// Happy condition plus the dependents it summarizes
#[derive(Debug, Clone, Copy)]
pub struct ConditionSet {
    happy: &'static str,
    dependents: &'static [&'static str],
}

impl ConditionSet {
    pub const fn living(happy: &'static str, dependents: &'static [&'static str]) -> Self {
        Self { happy, dependents }
    }

    pub fn manage<'a>(
        &'a self,
        conditions: &'a mut Vec<Condition>,
        now: DateTime<Utc>,
    ) -> ConditionManager<'a> {
        ConditionManager {
            set: self,
            conditions,
            now,
        }
    }
}

pub fn get_condition<'a>(conditions: &'a [Condition], type_: &str) -> Option<&'a Condition> {
    conditions.iter().find(|cond| cond.type_ == type_)
}

/// Mutates a condition list according to its set.
///
/// Conditions are kept sorted by type and `last_transition_time` only moves
/// when the status of a condition flips, so re-applying the same marks yields
/// an identical list.
pub struct ConditionManager<'a> {
    set: &'a ConditionSet,
    conditions: &'a mut Vec<Condition>,
    now: DateTime<Utc>,
}

impl ConditionManager<'_> {
    pub fn get(&self, type_: &str) -> Option<&Condition> {
        get_condition(self.conditions, type_)
    }

    pub fn is_happy(&self) -> bool {
        self.get(self.set.happy)
            .map(|cond| cond.is_true())
            .unwrap_or(false)
    }

    /// Adds the happy condition and dependents where missing.
    /// Missing dependents start as `True` when the set is already happy.
    pub fn initialize(&mut self) {
        let happy = match self.get(self.set.happy) {
            Some(cond) => cond.status,
            None => {
                self.set(Condition::new(self.set.happy, ConditionStatus::Unknown));
                ConditionStatus::Unknown
            }
        };

        let initial = if happy == ConditionStatus::True {
            ConditionStatus::True
        } else {
            ConditionStatus::Unknown
        };

        for dependent in self.set.dependents {
            if self.get(dependent).is_none() {
                self.set(Condition::new(*dependent, initial));
            }
        }
    }

    pub fn set(&mut self, mut cond: Condition) {
        match self
            .conditions
            .iter_mut()
            .find(|existing| existing.type_ == cond.type_)
        {
            Some(existing) => {
                if existing.same_as(&cond) {
                    return;
                }
                cond.last_transition_time = if existing.status == cond.status {
                    existing.last_transition_time
                } else {
                    Some(self.now)
                };
                *existing = cond;
            }
            None => {
                cond.last_transition_time = Some(self.now);
                self.conditions.push(cond);
                self.conditions.sort_by(|a, b| a.type_.cmp(&b.type_));
            }
        }
    }

    pub fn mark_true(&mut self, type_: &str) {
        self.set(Condition::new(type_, ConditionStatus::True));
        self.recompute_happy();
    }

    pub fn mark_false(&mut self, type_: &str, reason: &str, message: &str) {
        let condition = Condition::new(type_, ConditionStatus::False);
        self.set(condition.with_reason(reason, message));
        self.recompute_happy();
    }

    pub fn mark_unknown(&mut self, type_: &str, reason: &str, message: &str) {
        let condition = Condition::new(type_, ConditionStatus::Unknown);
        self.set(condition.with_reason(reason, message));
        self.recompute_happy();
    }

    /// first false dependent wins, then all true, otherwise first unknown
    fn recompute_happy(&mut self) {
        let dependents: Vec<Condition> = self
            .set
            .dependents
            .iter()
            .map(|dep| {
                self.get(dep)
                    .cloned()
                    .unwrap_or_else(|| Condition::new(*dep, ConditionStatus::Unknown))
            })
            .collect();

        let happy = self.set.happy;
        let summary = if let Some(failed) = dependents.iter().find(|cond| cond.is_false()) {
            Condition::new(happy, ConditionStatus::False)
                .with_reason(failed.reason(), failed.message())
        } else if dependents.iter().all(|cond| cond.is_true()) {
            Condition::new(happy, ConditionStatus::True)
        } else {
            match dependents.iter().find(|cond| cond.is_unknown()) {
                Some(pending) => Condition {
                    reason: pending.reason.clone(),
                    message: pending.message.clone(),
                    ..Condition::new(happy, ConditionStatus::Unknown)
                },
                None => Condition::new(happy, ConditionStatus::Unknown),
            }
        };

        self.set(summary);
    }
}

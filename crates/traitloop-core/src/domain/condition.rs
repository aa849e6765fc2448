//! Condition - Reconcile 結果のステータス表現
//!
//! Trait には "Synced" 型の Condition がちょうど 1 つ存在し、
//! 各 pass がそれを上書きします。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Condition type written by every reconcile pass.
pub const TYPE_SYNCED: &str = "Synced";

/// Reason of a successful pass.
pub const REASON_RECONCILE_SUCCESS: &str = "ReconcileSuccess";

/// Reason of a failed pass.
pub const REASON_RECONCILE_ERROR: &str = "ReconcileError";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

/// Condition は直近の pass の結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: String,
    pub status: ConditionStatus,
    pub last_transition_time: DateTime<Utc>,
    pub reason: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl Condition {
    /// Synced=True. Clears any previous error message.
    pub fn reconcile_success() -> Self {
        Self {
            condition_type: TYPE_SYNCED.to_string(),
            status: ConditionStatus::True,
            last_transition_time: Utc::now(),
            reason: REASON_RECONCILE_SUCCESS.to_string(),
            message: String::new(),
        }
    }

    /// Synced=False with the error as message.
    pub fn reconcile_error(err: &dyn std::error::Error) -> Self {
        Self {
            condition_type: TYPE_SYNCED.to_string(),
            status: ConditionStatus::False,
            last_transition_time: Utc::now(),
            reason: REASON_RECONCILE_ERROR.to_string(),
            message: err.to_string(),
        }
    }

    /// Equal ignoring `last_transition_time`.
    pub fn equal(&self, other: &Condition) -> bool {
        self.condition_type == other.condition_type
            && self.status == other.status
            && self.reason == other.reason
            && self.message == other.message
    }

    pub fn is_success(&self) -> bool {
        self.status == ConditionStatus::True
    }
}

/// ConditionedStatus は Condition の集合（type ごとに 1 つ）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConditionedStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

impl ConditionedStatus {
    pub fn get_condition(&self, condition_type: &str) -> Option<&Condition> {
        self.conditions
            .iter()
            .find(|c| c.condition_type == condition_type)
    }

    /// Set conditions, replacing any existing condition of the same type.
    ///
    /// An existing condition that is `equal` to the new one is kept as is,
    /// so its transition time does not move.
    pub fn set_conditions(&mut self, conditions: impl IntoIterator<Item = Condition>) {
        for new in conditions {
            match self
                .conditions
                .iter_mut()
                .find(|c| c.condition_type == new.condition_type)
            {
                Some(existing) if existing.equal(&new) => {}
                Some(existing) => *existing = new,
                None => self.conditions.push(new),
            }
        }
    }
}

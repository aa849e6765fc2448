//! Events - 運用者向けイベント
//!
//! Reconcile の結果は Condition と同時に Event としても記録されます。

use serde::{Deserialize, Serialize};

/// Event reasons emitted by the reconciler.
pub mod reason {
    pub const CANNOT_GET_WORKLOAD: &str = "CannotGetWorkload";
    pub const CANNOT_GET_TRANSLATION: &str = "CannotGetTranslation";
    pub const CANNOT_MODIFY_TRANSLATION: &str = "CannotModifyTranslation";
    pub const CANNOT_APPLY_MODIFICATION: &str = "CannotApplyModification";
    pub const TRANSLATION_MODIFIED: &str = "TranslationModified";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Normal,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub severity: Severity,
    pub reason: String,
    pub message: String,
}

impl Event {
    pub fn normal(reason: &str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Normal,
            reason: reason.to_string(),
            message: message.into(),
        }
    }

    /// A warning whose message is the error text.
    pub fn warning(reason: &str, err: &dyn std::error::Error) -> Self {
        Self {
            severity: Severity::Warning,
            reason: reason.to_string(),
            message: err.to_string(),
        }
    }
}

//! Errors - エラー型と分類
//!
//! - `StoreError`: ストア（collaborator）の読み書き失敗
//! - `ModifyError`: Modifier / Accessor の失敗（データ・ロジックの失敗）
//! - `ReconcileError`: pass のステップ別にラップしたエラー

use thiserror::Error;

use super::ids::{ObjectKey, Uid};
use super::kind::Kind;

pub const ERR_GET_TRAIT: &str = "cannot get trait";
pub const ERR_GET_WORKLOAD: &str = "cannot get workload reference by trait";
pub const ERR_GET_TRANSLATION: &str = "cannot get translation for workload reference in trait";
pub const ERR_MODIFY_TRANSLATION: &str = "cannot apply trait modification to translation";
pub const ERR_APPLY_MODIFICATION: &str = "cannot apply trait modification";
pub const ERR_UPDATE_STATUS: &str = "cannot update trait status";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{kind} {key} not found")]
    NotFound { kind: Kind, key: ObjectKey },

    #[error("{kind} {key} already exists")]
    AlreadyExists { kind: Kind, key: ObjectKey },

    #[error("{kind} {key} has been modified: expected resource version {expected}, found {actual}")]
    Conflict {
        kind: Kind,
        key: ObjectKey,
        expected: u64,
        actual: u64,
    },

    #[error("existing object is not controlled by UID {uid}")]
    NotControllable { uid: Uid },

    #[error("operation timed out")]
    Timeout,

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("invalid object: {0}")]
    Invalid(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

#[derive(Debug, Error)]
pub enum ModifyError {
    #[error("field {path:?} not found")]
    FieldNotFound { path: String },

    #[error("cannot decode {what}: {source}")]
    Decode {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    /// The pass deadline passed while the modifier ran.
    #[error("operation timed out")]
    Timeout,

    #[error("{0}")]
    Other(String),
}

/// ReconcileError はステップ固有の固定メッセージで元のエラーを包む
///
/// Display は `"<prefix>: <cause>"`。Condition の message にそのまま入ります。
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("cannot get trait: {0}")]
    GetTrait(#[source] StoreError),

    #[error("cannot get workload reference by trait: {0}")]
    GetWorkload(#[source] StoreError),

    #[error("cannot get translation for workload reference in trait: {0}")]
    GetTranslation(#[source] StoreError),

    #[error("cannot apply trait modification to translation: {0}")]
    Modify(#[source] ModifyError),

    #[error("cannot apply trait modification: {0}")]
    Apply(#[source] StoreError),

    #[error("cannot update trait status: {0}")]
    UpdateStatus(#[source] StoreError),
}

impl ReconcileError {
    /// The fixed message for the failed step.
    pub fn prefix(&self) -> &'static str {
        match self {
            ReconcileError::GetTrait(_) => ERR_GET_TRAIT,
            ReconcileError::GetWorkload(_) => ERR_GET_WORKLOAD,
            ReconcileError::GetTranslation(_) => ERR_GET_TRANSLATION,
            ReconcileError::Modify(_) => ERR_MODIFY_TRANSLATION,
            ReconcileError::Apply(_) => ERR_APPLY_MODIFICATION,
            ReconcileError::UpdateStatus(_) => ERR_UPDATE_STATUS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reconcile_error_display_is_prefix_and_cause() {
        let cause = StoreError::Unavailable("connection refused".to_string());
        let err = ReconcileError::GetWorkload(cause.clone());
        assert_eq!(err.to_string(), format!("{}: {}", err.prefix(), cause));
    }

    #[test]
    fn not_found_is_detected() {
        let err = StoreError::NotFound {
            kind: Kind::new("v1", "Object"),
            key: ObjectKey::new("ns", "w1"),
        };
        assert!(err.is_not_found());
        assert!(!StoreError::Timeout.is_not_found());
        assert_eq!(err.to_string(), "v1, Kind=Object ns/w1 not found");
    }
}

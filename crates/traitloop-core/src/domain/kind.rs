//! Kind - オブジェクト種別（apiVersion + kind）
//!
//! Reconciler はコンパイル時の型ではなく、実行時に渡される Kind で
//! Trait / Workload / Translation を区別します。

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind identifies a type of object in the store.
///
/// # 命名規約
/// - `api_version`: `{group}/{version}` または `{version}`（例: `apps/v1`, `v1`）
/// - `kind`: 先頭大文字の英数字（例: `Deployment`）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kind {
    api_version: String,
    kind: String,
}

/// KindError は Kind の検証エラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KindError {
    #[error("kind must not be empty")]
    EmptyKind,

    #[error("kind {0:?} must start with an uppercase letter and contain only alphanumerics")]
    InvalidKind(String),

    #[error("api version {0:?} must be of the form group/version or version")]
    InvalidApiVersion(String),
}

impl Kind {
    pub fn new(api_version: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            api_version: api_version.into(),
            kind: kind.into(),
        }
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Check the naming rules. Called once when a reconciler is built.
    pub fn validate(&self) -> Result<(), KindError> {
        let mut chars = self.kind.chars();
        match chars.next() {
            None => return Err(KindError::EmptyKind),
            Some(c) if !c.is_ascii_uppercase() => {
                return Err(KindError::InvalidKind(self.kind.clone()));
            }
            Some(_) => {}
        }
        if !chars.all(|c| c.is_ascii_alphanumeric()) {
            return Err(KindError::InvalidKind(self.kind.clone()));
        }

        let segments: Vec<&str> = self.api_version.split('/').collect();
        let valid = match segments.as_slice() {
            [version] => is_version(version),
            [group, version] => is_group(group) && is_version(version),
            _ => false,
        };
        if !valid {
            return Err(KindError::InvalidApiVersion(self.api_version.clone()));
        }
        Ok(())
    }
}

fn is_version(s: &str) -> bool {
    s.starts_with('v') && s.len() > 1 && s.chars().all(|c| c.is_ascii_alphanumeric())
}

fn is_group(s: &str) -> bool {
    !s.is_empty()
        && !s.starts_with('.')
        && !s.ends_with('.')
        && s
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '-')
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, Kind={}", self.api_version, self.kind)
    }
}

//! Config - Reconciler / Controller の設定
//!
//! すべてシステム全体の設定で、pass ごとには変えられません。
//! JSON では Duration を `*_secs` / `*_ms` の整数で表します。

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::queue::RetryPolicy;

pub const DEFAULT_SHORT_WAIT: Duration = Duration::from_secs(30);
pub const DEFAULT_LONG_WAIT: Duration = Duration::from_secs(60);
pub const DEFAULT_RECONCILE_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Timing of reconcile passes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Requeue delay after waiting or failed passes.
    #[serde(with = "secs", rename = "short_wait_secs")]
    pub short_wait: Duration,

    /// Requeue delay after a fully successful pass.
    #[serde(with = "secs", rename = "long_wait_secs")]
    pub long_wait: Duration,

    /// Budget for one whole pass, status write included.
    #[serde(with = "secs", rename = "timeout_secs")]
    pub timeout: Duration,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            short_wait: DEFAULT_SHORT_WAIT,
            long_wait: DEFAULT_LONG_WAIT,
            timeout: DEFAULT_RECONCILE_TIMEOUT,
        }
    }
}

impl ReconcilerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("short_wait", self.short_wait),
            ("long_wait", self.long_wait),
            ("timeout", self.timeout),
        ] {
            if value.is_zero() {
                return Err(ConfigError::Invalid(format!("{name} must be greater than zero")));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Number of concurrent workers (distinct traits reconciled in parallel).
    pub workers: usize,

    /// Backoff for passes that return an error.
    pub retry: RetryPolicy,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            retry: RetryPolicy::default(),
        }
    }
}

impl ControllerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::Invalid("workers must be greater than zero".to_string()));
        }
        if self.retry.multiplier < 1.0 {
            return Err(ConfigError::Invalid(
                "retry.multiplier must be at least 1.0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Config はプロセス全体の設定ファイル
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub reconciler: ReconcilerConfig,
    pub controller: ControllerConfig,
}

impl Config {
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.reconciler.validate()?;
        self.controller.validate()
    }
}

/// Duration <-> whole seconds.
pub(crate) mod secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

/// Duration <-> milliseconds.
pub(crate) mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

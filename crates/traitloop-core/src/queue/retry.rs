//! Retry policy: decides per-key backoff delays after failed passes.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Exponential backoff for keys whose pass returned an error.
///
/// delay = base_delay * multiplier^(failures - 1), capped at max_delay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Delay after the first failure.
    #[serde(with = "crate::app::config::millis", rename = "base_delay_ms")]
    pub base_delay: Duration,

    /// Backoff multiplier.
    pub multiplier: f64,

    /// Upper bound for any delay.
    #[serde(with = "crate::app::config::millis", rename = "max_delay_ms")]
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(5),
            multiplier: 2.0,
            max_delay: Duration::from_secs(1000),
        }
    }
}

impl RetryPolicy {
    /// Calculate the delay before the next attempt.
    ///
    /// # Arguments
    /// * `failures` - Number of consecutive failures so far (1-indexed).
    ///
    /// Example with base_delay=5ms, multiplier=2.0:
    /// - failure 1: 5ms
    /// - failure 2: 10ms
    /// - failure 3: 20ms
    pub fn next_delay(&self, failures: u32) -> Duration {
        let exponent = i32::try_from(failures.saturating_sub(1)).unwrap_or(i32::MAX);
        let delay_secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        if !delay_secs.is_finite() || delay_secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(delay_secs)
    }
}

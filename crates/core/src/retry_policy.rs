// SPDX-License-Identifier: MIT

//! Retry/backoff policy (§3) shared by the retry executor and the config loader.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_interval_sec: u64,
    pub backoff_multiplier: f64,
    pub per_attempt_timeout_sec: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_interval_sec: 30,
            backoff_multiplier: 2.0,
            per_attempt_timeout_sec: 10,
        }
    }
}

impl RetryPolicy {
    /// Delay before attempt `attempt` (1-indexed; attempt 1 never waits).
    ///
    /// `base_interval_sec * backoff_multiplier^(attempt-2)` for `attempt >= 2`.
    pub fn delay_before_attempt(&self, attempt: u32) -> Duration {
        if attempt < 2 {
            return Duration::ZERO;
        }
        let exp = (attempt - 2) as i32;
        let secs = self.base_interval_sec as f64 * self.backoff_multiplier.powi(exp);
        Duration::from_secs_f64(secs.max(0.0))
    }

    pub fn per_attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.per_attempt_timeout_sec)
    }
}

#[cfg(test)]
#[path = "retry_policy_tests.rs"]
mod tests;

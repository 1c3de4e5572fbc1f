//! Backoff policy for correlating a freshly dispatched run.
//!
//! A run may take a few seconds to appear in the listing API after the
//! dispatch was accepted, so an empty correlation result is retried with
//! exponential backoff before it is reported as not found.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How long to keep listing runs before a dispatch counts as lost.
///
/// Attempt `n` (1-based) is followed by a pause of
/// `initial_delay_ms * backoff_multiplier^(n-1)`, never above `max_delay_ms`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Runs listings to try, the first one included
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Pause after the first empty listing
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,

    /// Upper bound for any single pause
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

// Six listings spread over roughly 25 seconds
fn default_max_attempts() -> u32 {
    6
}
fn default_initial_delay() -> u64 {
    1_000
}
fn default_max_delay() -> u64 {
    10_000
}
fn default_backoff_multiplier() -> f64 {
    2.0
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl RetryPolicy {
    /// List runs once and report a miss straight away
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Relist up to `max_attempts` times without pausing
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay_ms: 0,
            max_delay_ms: 0,
            backoff_multiplier: 1.0,
        }
    }

    /// Pause after the given empty listing (1-based)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let millis = (self.initial_delay_ms as f64 * self.backoff_multiplier.powi(exponent))
            .min(self.max_delay_ms as f64);
        Duration::from_millis(millis as u64)
    }

    /// Whether another listing is allowed after `attempt` came back empty
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Sum of all pauses when every listing comes back empty
    pub fn worst_case_wait(&self) -> Duration {
        (1..self.max_attempts)
            .map(|attempt| self.delay_for_attempt(attempt))
            .sum()
    }
}

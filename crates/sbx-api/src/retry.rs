//! Retry schedule for transient failures

use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use serde::{Deserialize, Serialize};

const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_INITIAL_BACKOFF_MS: u64 = 250;

/// How many times a request is attempted and how long to wait in between.
///
/// Waits start at `initial_backoff_ms` and double after every retry, with no
/// jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Wait before the first retry
    pub initial_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff_ms: DEFAULT_INITIAL_BACKOFF_MS,
        }
    }
}

impl RetryPolicy {
    /// Attempts, never fewer than one
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// A fresh backoff sequence for one logical request
    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(self.initial_backoff_ms))
            .with_multiplier(2.0)
            .with_randomization_factor(0.0)
            .with_max_interval(Duration::from_secs(3600))
            .with_max_elapsed_time(None)
            .build()
    }

    /// The waits between consecutive attempts
    pub fn delays(&self) -> Vec<Duration> {
        let mut backoff = self.backoff();
        (1..self.attempts())
            .map_while(|_| backoff.next_backoff())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_schedule_doubles_from_250ms() {
        let millis: Vec<u128> = RetryPolicy::default()
            .delays()
            .iter()
            .map(Duration::as_millis)
            .collect();
        assert_eq!(millis, vec![250, 500, 1000, 2000]);
    }

    #[test]
    fn test_single_attempt_has_no_waits() {
        let policy = RetryPolicy {
            max_attempts: 1,
            ..RetryPolicy::default()
        };
        assert!(policy.delays().is_empty());
    }

    #[test]
    fn test_zero_attempts_still_tries_once() {
        let policy = RetryPolicy {
            max_attempts: 0,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.attempts(), 1);
    }
}

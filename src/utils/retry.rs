//! Retry utilities for transient I/O failures
//!
//! Exponential backoff with an optional jitter, usable around any async call
//! whose error type implements [`Retryable`].

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::duration_serde::duration;
use crate::errors::Retryable;

/// Exponential backoff policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Delay before the first retry
    #[serde(with = "duration")]
    pub base_delay: Duration,
    /// Growth factor applied per attempt
    pub multiplier: f64,
    /// Upper bound for any single delay
    #[serde(with = "duration")]
    pub max_delay: Duration,
    /// Add up to 25% random jitter to each delay
    #[serde(default = "default_jitter")]
    pub jitter: bool,
}

fn default_jitter() -> bool {
    true
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            multiplier: 2.0,
            max_delay: Duration::from_secs(5),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, multiplier: f64) -> Self {
        Self {
            max_attempts,
            base_delay,
            multiplier,
            ..Self::default()
        }
    }

    /// Single attempt, no retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay to wait after the given failed attempt (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponential = self.base_delay.as_millis() as f64
            * self.multiplier.powi(attempt.saturating_sub(1) as i32);
        let delay_ms = exponential.min(self.max_delay.as_millis() as f64) as u64;

        let final_delay = if self.jitter && delay_ms > 0 {
            // Up to 25% on top to spread out concurrent retries
            delay_ms + rand::rng().random_range(0..=delay_ms / 4)
        } else {
            delay_ms
        };

        Duration::from_millis(final_delay)
    }
}

/// Execute an operation with retry logic
///
/// Non-retryable errors are returned immediately; retryable ones are
/// retried until `max_attempts` is reached and the last error is returned.
pub async fn with_retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    mut operation: F,
    operation_name: &str,
) -> Result<T, E>
where
    E: Retryable + std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    debug!(
                        "Operation '{}' succeeded on attempt {}/{}",
                        operation_name, attempt, max_attempts
                    );
                }
                return Ok(result);
            }
            Err(err) if !err.is_retryable() => {
                debug!(
                    "Operation '{}' failed with non-retryable error: {}",
                    operation_name, err
                );
                return Err(err);
            }
            Err(err) if attempt >= max_attempts => {
                warn!(
                    "Operation '{}' failed after {} attempts: {}",
                    operation_name, max_attempts, err
                );
                return Err(err);
            }
            Err(err) => {
                let delay = policy.delay_for(attempt);
                warn!(
                    "Operation '{}' failed on attempt {}/{}, retrying in {:?}: {}",
                    operation_name, attempt, max_attempts, delay, err
                );
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded exponential backoff for transient runtime errors.

use std::time::Duration;

/// Retry budget: `attempts` total tries, delay doubling from `initial`
/// up to `max` between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub initial: Duration,
    pub max: Duration,
}

impl RetryPolicy {
    /// Inspect-after-create window: 3 attempts, 200 ms → 1 s.
    pub fn create_window() -> Self {
        Self {
            attempts: 3,
            initial: Duration::from_millis(200),
            max: Duration::from_secs(1),
        }
    }

    /// Apply action retries: 3 attempts, 500 ms → 4 s.
    pub fn apply_action() -> Self {
        Self {
            attempts: 3,
            initial: Duration::from_millis(500),
            max: Duration::from_secs(4),
        }
    }

    pub fn next_delay(&self, current: Duration) -> Duration {
        (current * 2).min(self.max)
    }
}

/// Run `op` up to `policy.attempts` times, sleeping between tries while
/// `should_retry` says the error is worth another attempt.
pub async fn with_backoff<T, E, F, Fut, R>(
    policy: RetryPolicy,
    should_retry: R,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let mut delay = policy.initial;
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < policy.attempts && should_retry(&err) => {
                tracing::debug!(attempt, error = %err, "retrying after transient error");
                tokio::time::sleep(delay).await;
                delay = policy.next_delay(delay);
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;

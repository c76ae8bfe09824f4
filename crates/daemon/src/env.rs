// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::time::Duration;

use crate::lifecycle::LifecycleError;

/// Database connection string. Required.
pub fn database_url() -> Result<String, LifecycleError> {
    std::env::var("DATABASE_URL")
        .ok()
        .filter(|s| !s.is_empty())
        .ok_or(LifecycleError::MissingDatabaseUrl)
}

/// HTTP listener port for the out-of-scope API layer (default 8080).
pub fn port() -> u16 {
    std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8080)
}

/// Status poll interval override, mainly for tests.
pub fn poll_interval() -> Option<Duration> {
    std::env::var("DEVARCH_POLL_INTERVAL_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Shutdown drain timeout (default 30s, configurable via
/// `DEVARCH_DRAIN_TIMEOUT_MS`).
pub fn drain_timeout() -> Duration {
    std::env::var("DEVARCH_DRAIN_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(30))
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;

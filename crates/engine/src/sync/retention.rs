// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daily metrics retention, guarded so at most one process runs it per
//! window across restarts.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use devarch_store::LAST_DAILY_CLEANUP;
use tokio_util::sync::CancellationToken;

use super::StatusSync;
use crate::error::EngineError;

/// Metrics older than this are purged.
pub const METRICS_RETENTION: Duration = Duration::from_secs(7 * 24 * 3600);

/// Cleanup runs at most once per window.
pub const CLEANUP_WINDOW: Duration = Duration::from_secs(24 * 3600);

const CHECK_INTERVAL: Duration = Duration::from_secs(3600);

/// Advisory-lock key for the retention task.
const RETENTION_LOCK: &str = "retention:metrics";

/// Whether a cleanup is due given the last completed run.
pub fn cleanup_due(last: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match last {
        None => true,
        Some(last) => now - last >= ChronoDuration::from_std(CLEANUP_WINDOW).unwrap_or_default(),
    }
}

impl StatusSync {
    pub(super) async fn retention_loop(self: Arc<Self>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(CHECK_INTERVAL) => {
                    if let Err(err) = self.retention_tick().await {
                        tracing::warn!(error = %err, "metrics retention failed");
                    }
                }
            }
        }
    }

    pub(super) async fn retention_tick(&self) -> Result<(), EngineError> {
        let now = Utc::now();
        let last = self.store.get_sync_timestamp(LAST_DAILY_CLEANUP).await?;
        if !cleanup_due(last, now) {
            return Ok(());
        }

        // The advisory lock keeps concurrent processes from doubling
        // up; the sync_state row keeps restarts honest.
        let Some(lock) = self.store.try_advisory_lock(RETENTION_LOCK).await? else {
            return Ok(());
        };

        let result = self.run_cleanup(now).await;
        if let Err(err) = lock.release().await {
            tracing::warn!(error = %err, "failed to release retention lock");
        }
        result
    }

    async fn run_cleanup(&self, now: chrono::DateTime<Utc>) -> Result<(), EngineError> {
        let cutoff = now
            - ChronoDuration::from_std(METRICS_RETENTION)
                .unwrap_or_else(|_| ChronoDuration::days(7));
        let removed = self.store.purge_metrics_before(cutoff).await?;
        self.store.set_sync_timestamp(LAST_DAILY_CLEANUP, now).await?;
        tracing::info!(removed, %cutoff, "metrics retention complete");
        Ok(())
    }
}

#[cfg(test)]
#[path = "retention_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Small durable key→timestamp store.
//!
//! Keeps the last-completed cleanup epoch across restarts so the daily
//! retention task fires at most once per window.

use chrono::{DateTime, Utc};

use crate::error::{SqlxResultExt, StoreError};
use crate::Store;

/// Key of the last completed daily metrics cleanup.
pub const LAST_DAILY_CLEANUP: &str = "last_daily_cleanup";

impl Store {
    pub async fn get_sync_timestamp(
        &self,
        key: &str,
    ) -> Result<Option<DateTime<Utc>>, StoreError> {
        let row: Option<(DateTime<Utc>,)> =
            sqlx::query_as("SELECT value_timestamp FROM sync_state WHERE key = $1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await
                .map_store("sync state")?;
        Ok(row.map(|(ts,)| ts))
    }

    pub async fn set_sync_timestamp(
        &self,
        key: &str,
        value: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO sync_state (key, value_timestamp)
             VALUES ($1, $2)
             ON CONFLICT (key) DO UPDATE SET value_timestamp = EXCLUDED.value_timestamp",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_store("sync state")?;
        Ok(())
    }
}

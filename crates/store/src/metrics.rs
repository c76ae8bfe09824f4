// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container metrics: high-churn appends with age-based retention.

use chrono::{DateTime, Utc};
use devarch_core::InstanceId;
use sqlx::FromRow;

use crate::error::{SqlxResultExt, StoreError};
use crate::Store;

/// One metrics observation.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSample {
    pub cpu_pct: f64,
    pub mem_used_mb: f64,
    pub mem_limit_mb: f64,
    pub net_rx: i64,
    pub net_tx: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct MetricsRow {
    pub id: i64,
    pub service_instance_id: i64,
    pub cpu_pct: f64,
    pub mem_used_mb: f64,
    pub mem_limit_mb: f64,
    pub net_rx: i64,
    pub net_tx: i64,
    pub recorded_at: DateTime<Utc>,
}

impl Store {
    pub async fn append_metrics(
        &self,
        instance_pk: InstanceId,
        sample: &MetricsSample,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO container_metrics
                 (service_instance_id, cpu_pct, mem_used_mb, mem_limit_mb, net_rx, net_tx)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(instance_pk.as_i64())
        .bind(sample.cpu_pct)
        .bind(sample.mem_used_mb)
        .bind(sample.mem_limit_mb)
        .bind(sample.net_rx)
        .bind(sample.net_tx)
        .execute(&self.pool)
        .await
        .map_store("metrics")?;
        Ok(())
    }

    /// Latest samples for an instance, newest first.
    pub async fn recent_metrics(
        &self,
        instance_pk: InstanceId,
        limit: i64,
    ) -> Result<Vec<MetricsRow>, StoreError> {
        sqlx::query_as::<_, MetricsRow>(
            "SELECT * FROM container_metrics
             WHERE service_instance_id = $1
             ORDER BY recorded_at DESC
             LIMIT $2",
        )
        .bind(instance_pk.as_i64())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_store("metrics")
    }

    /// Retention: delete samples recorded before the cutoff. Returns the
    /// number of rows removed.
    pub async fn purge_metrics_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM container_metrics WHERE recorded_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_store("metrics")?;
        Ok(result.rows_affected())
    }
}

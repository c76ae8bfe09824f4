// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container state cache: the database shadow of the runtime.

use chrono::{DateTime, Utc};
use devarch_core::{InstanceId, StackId};
use sqlx::FromRow;

use crate::error::{SqlxResultExt, StoreError};
use crate::Store;

/// One state-cache row, keyed by instance.
#[derive(Debug, Clone, FromRow)]
pub struct ContainerStateRow {
    pub service_instance_id: i64,
    pub container_id: Option<String>,
    pub status: String,
    pub health_status: Option<String>,
    pub restart_count: i64,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub exit_code: Option<i64>,
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Store {
    /// Upsert a state-cache row. The `updated_at` guard makes writes
    /// monotonic: an older observation never overwrites a newer one.
    pub async fn upsert_container_state(&self, row: &ContainerStateRow) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO container_state
                 (service_instance_id, container_id, status, health_status, restart_count,
                  started_at, finished_at, exit_code, error, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             ON CONFLICT (service_instance_id) DO UPDATE SET
                 container_id = EXCLUDED.container_id,
                 status = EXCLUDED.status,
                 health_status = EXCLUDED.health_status,
                 restart_count = EXCLUDED.restart_count,
                 started_at = EXCLUDED.started_at,
                 finished_at = EXCLUDED.finished_at,
                 exit_code = EXCLUDED.exit_code,
                 error = EXCLUDED.error,
                 updated_at = EXCLUDED.updated_at
             WHERE container_state.updated_at <= EXCLUDED.updated_at",
        )
        .bind(row.service_instance_id)
        .bind(&row.container_id)
        .bind(&row.status)
        .bind(&row.health_status)
        .bind(row.restart_count)
        .bind(row.started_at)
        .bind(row.finished_at)
        .bind(row.exit_code)
        .bind(&row.error)
        .bind(row.updated_at)
        .execute(&self.pool)
        .await
        .map_store("container state")?;
        Ok(())
    }

    pub async fn get_container_state(
        &self,
        instance_pk: InstanceId,
    ) -> Result<Option<ContainerStateRow>, StoreError> {
        sqlx::query_as::<_, ContainerStateRow>(
            "SELECT * FROM container_state WHERE service_instance_id = $1",
        )
        .bind(instance_pk.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_store("container state")
    }

    /// State-cache rows for every active instance of a stack.
    pub async fn stack_container_states(
        &self,
        stack_id: StackId,
    ) -> Result<Vec<ContainerStateRow>, StoreError> {
        sqlx::query_as::<_, ContainerStateRow>(
            "SELECT cs.* FROM container_state cs
             JOIN service_instances si ON si.id = cs.service_instance_id
             WHERE si.stack_id = $1 AND si.deleted_at IS NULL
             ORDER BY si.instance_id",
        )
        .bind(stack_id.as_i64())
        .fetch_all(&self.pool)
        .await
        .map_store("container states")
    }

    pub async fn delete_container_state(&self, instance_pk: InstanceId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM container_state WHERE service_instance_id = $1")
            .bind(instance_pk.as_i64())
            .execute(&self.pool)
            .await
            .map_store("container state")?;
        Ok(())
    }

    /// Startup reconcile: drop cache rows for instances whose containers
    /// no longer exist. `live` holds the instance ids still present.
    pub async fn prune_container_states(&self, live: &[i64]) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "DELETE FROM container_state WHERE NOT (service_instance_id = ANY($1))",
        )
        .bind(live)
        .execute(&self.pool)
        .await
        .map_store("container state")?;
        Ok(result.rows_affected())
    }
}

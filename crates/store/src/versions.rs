// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only config version audit log.

use chrono::{DateTime, Utc};
use devarch_core::{canonical_json, InstanceId, ServiceId};
use sqlx::FromRow;

use crate::error::{SqlxResultExt, StoreError};
use crate::Store;

/// One audit row; exactly one subject id is set.
#[derive(Debug, Clone, FromRow)]
pub struct ConfigVersion {
    pub id: i64,
    pub service_id: Option<i64>,
    pub service_instance_id: Option<i64>,
    pub version: i64,
    pub config_snapshot: serde_json::Value,
    pub change_summary: String,
    pub created_at: DateTime<Utc>,
}

impl Store {
    /// Versions for a template, newest first.
    pub async fn template_versions(&self, id: ServiceId) -> Result<Vec<ConfigVersion>, StoreError> {
        sqlx::query_as::<_, ConfigVersion>(
            "SELECT * FROM service_config_versions
             WHERE service_id = $1 ORDER BY version DESC",
        )
        .bind(id.as_i64())
        .fetch_all(&self.pool)
        .await
        .map_store("config versions")
    }

    /// Versions for an instance, newest first.
    pub async fn instance_versions(
        &self,
        id: InstanceId,
    ) -> Result<Vec<ConfigVersion>, StoreError> {
        sqlx::query_as::<_, ConfigVersion>(
            "SELECT * FROM service_config_versions
             WHERE service_instance_id = $1 ORDER BY version DESC",
        )
        .bind(id.as_i64())
        .fetch_all(&self.pool)
        .await
        .map_store("config versions")
    }

    /// Append a version row snapshotting the instance's effective spec,
    /// within the caller's transaction so the snapshot includes the edit
    /// being committed.
    pub(crate) async fn record_instance_version(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        instance_pk: InstanceId,
        summary: &str,
    ) -> Result<(), StoreError> {
        let instance = sqlx::query_as::<_, crate::instances::ServiceInstance>(
            "SELECT * FROM service_instances WHERE id = $1",
        )
        .bind(instance_pk.as_i64())
        .fetch_one(&mut **tx)
        .await
        .map_store(&format!("instance {instance_pk}"))?;

        let resolved = crate::effective::resolve_instance_spec(&mut **tx, instance).await?;
        let snapshot: serde_json::Value =
            serde_json::from_str(&canonical_json(&resolved.effective)).unwrap_or_default();

        sqlx::query(
            "INSERT INTO service_config_versions
                 (service_instance_id, version, config_snapshot, change_summary)
             VALUES ($1,
                     COALESCE((SELECT MAX(version) FROM service_config_versions
                               WHERE service_instance_id = $1), 0) + 1,
                     $2, $3)",
        )
        .bind(instance_pk.as_i64())
        .bind(snapshot)
        .bind(summary)
        .execute(&mut **tx)
        .await
        .map_store("config version")?;
        Ok(())
    }

    /// Append a version row snapshotting the template's own spec.
    pub(crate) async fn record_template_version(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        service_id: ServiceId,
        summary: &str,
    ) -> Result<(), StoreError> {
        let spec = crate::templates::load_template_spec(&mut **tx, service_id.as_i64()).await?;
        let snapshot = serde_json::to_value(&spec).unwrap_or_default();

        sqlx::query(
            "INSERT INTO service_config_versions
                 (service_id, version, config_snapshot, change_summary)
             VALUES ($1,
                     COALESCE((SELECT MAX(version) FROM service_config_versions
                               WHERE service_id = $1), 0) + 1,
                     $2, $3)",
        )
        .bind(service_id.as_i64())
        .bind(snapshot)
        .bind(summary)
        .execute(&mut **tx)
        .await
        .map_store("config version")?;
        Ok(())
    }
}

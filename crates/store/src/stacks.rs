// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stack CRUD, soft-delete lifecycle, clone, and rename.

use chrono::{DateTime, Utc};
use devarch_core::StackId;
use sqlx::FromRow;

use crate::error::{SqlxResultExt, StoreError};
use crate::Store;

/// One stack row.
#[derive(Debug, Clone, FromRow)]
pub struct Stack {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub network_name: Option<String>,
    pub enabled: bool,
    pub row_version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Stack {
    pub fn stack_id(&self) -> StackId {
        StackId::new(self.id)
    }

    /// Runtime network for this stack, defaulted when unset.
    pub fn network(&self) -> String {
        self.network_name
            .clone()
            .unwrap_or_else(|| devarch_core::default_network_name(&self.name))
    }
}

/// Fields for stack creation.
#[derive(Debug, Clone, Default)]
pub struct NewStack {
    pub name: String,
    pub description: String,
    pub network_name: Option<String>,
}

/// Updatable stack fields, applied under optimistic concurrency.
#[derive(Debug, Clone, Default)]
pub struct StackUpdate {
    pub description: Option<String>,
    pub network_name: Option<Option<String>>,
    pub enabled: Option<bool>,
}

impl Store {
    /// Create a stack. The active-name partial unique index rejects
    /// duplicates among non-deleted stacks only.
    pub async fn create_stack(&self, new: &NewStack) -> Result<Stack, StoreError> {
        sqlx::query_as::<_, Stack>(
            "INSERT INTO stacks (name, description, network_name)
             VALUES ($1, $2, $3)
             RETURNING *",
        )
        .bind(&new.name)
        .bind(&new.description)
        .bind(&new.network_name)
        .fetch_one(&self.pool)
        .await
        .map_store(&format!("stack {}", new.name))
    }

    /// Fetch an active (non-deleted) stack by name.
    pub async fn get_stack(&self, name: &str) -> Result<Stack, StoreError> {
        sqlx::query_as::<_, Stack>(
            "SELECT * FROM stacks WHERE name = $1 AND deleted_at IS NULL",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_store(&format!("stack {name}"))
    }

    /// Fetch any stack row by id, deleted or not.
    pub async fn get_stack_by_id(&self, id: StackId) -> Result<Stack, StoreError> {
        sqlx::query_as::<_, Stack>("SELECT * FROM stacks WHERE id = $1")
            .bind(id.as_i64())
            .fetch_one(&self.pool)
            .await
            .map_store(&format!("stack {id}"))
    }

    /// All active stacks, by name.
    pub async fn list_stacks(&self) -> Result<Vec<Stack>, StoreError> {
        sqlx::query_as::<_, Stack>(
            "SELECT * FROM stacks WHERE deleted_at IS NULL ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_store("stacks")
    }

    /// Soft-deleted stacks, most recently deleted first.
    pub async fn list_trash(&self) -> Result<Vec<Stack>, StoreError> {
        sqlx::query_as::<_, Stack>(
            "SELECT * FROM stacks WHERE deleted_at IS NOT NULL ORDER BY deleted_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_store("trash")
    }

    /// Apply updates under optimistic concurrency. A row-version mismatch
    /// surfaces as Conflict so the caller can refetch.
    pub async fn update_stack(
        &self,
        id: StackId,
        update: &StackUpdate,
        expected_version: i64,
    ) -> Result<Stack, StoreError> {
        let result = sqlx::query_as::<_, Stack>(
            "UPDATE stacks SET
                 description = COALESCE($3, description),
                 network_name = CASE WHEN $4 THEN $5 ELSE network_name END,
                 enabled = COALESCE($6, enabled),
                 row_version = row_version + 1,
                 updated_at = now()
             WHERE id = $1 AND row_version = $2 AND deleted_at IS NULL
             RETURNING *",
        )
        .bind(id.as_i64())
        .bind(expected_version)
        .bind(&update.description)
        .bind(update.network_name.is_some())
        .bind(update.network_name.clone().flatten())
        .bind(update.enabled)
        .fetch_optional(&self.pool)
        .await
        .map_store(&format!("stack {id}"))?;

        match result {
            Some(stack) => Ok(stack),
            None => {
                // Distinguish a concurrent edit from a missing row.
                self.get_stack_by_id(id).await?;
                Err(StoreError::Conflict(format!("stack {id} was modified concurrently")))
            }
        }
    }

    pub async fn set_stack_enabled(&self, id: StackId, enabled: bool) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE stacks SET enabled = $2, row_version = row_version + 1, updated_at = now()
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id.as_i64())
        .bind(enabled)
        .execute(&self.pool)
        .await
        .map_store(&format!("stack {id}"))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("stack {id}")));
        }
        Ok(())
    }

    /// Soft-delete: tombstones the name (partial unique index) so a new
    /// stack of the same name can be created immediately.
    pub async fn soft_delete_stack(&self, id: StackId) -> Result<Stack, StoreError> {
        sqlx::query_as::<_, Stack>(
            "UPDATE stacks SET deleted_at = now(), updated_at = now()
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING *",
        )
        .bind(id.as_i64())
        .fetch_one(&self.pool)
        .await
        .map_store(&format!("stack {id}"))
    }

    /// Restore from trash. The partial unique index rejects the restore
    /// when an active stack already holds the name.
    pub async fn restore_stack(&self, id: StackId) -> Result<Stack, StoreError> {
        sqlx::query_as::<_, Stack>(
            "UPDATE stacks SET deleted_at = NULL, updated_at = now()
             WHERE id = $1 AND deleted_at IS NOT NULL
             RETURNING *",
        )
        .bind(id.as_i64())
        .fetch_one(&self.pool)
        .await
        .map_store(&format!("stack {id}"))
    }

    /// Hard delete; FK cascade removes instances, overlays, state cache,
    /// and metrics.
    pub async fn purge_stack(&self, id: StackId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM stacks WHERE id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await
            .map_store(&format!("stack {id}"))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("stack {id}")));
        }
        Ok(())
    }

    /// Rename an active stack and re-derive every instance's container
    /// name. The caller must first verify no live containers exist under
    /// the old name.
    pub async fn rename_stack(
        &self,
        id: StackId,
        new_name: &str,
        expected_version: i64,
    ) -> Result<Stack, StoreError> {
        let mut tx = self.pool.begin().await?;

        let stack = sqlx::query_as::<_, Stack>(
            "UPDATE stacks SET name = $3, row_version = row_version + 1, updated_at = now()
             WHERE id = $1 AND row_version = $2 AND deleted_at IS NULL
             RETURNING *",
        )
        .bind(id.as_i64())
        .bind(expected_version)
        .bind(new_name)
        .fetch_optional(&mut *tx)
        .await
        .map_store(&format!("stack {new_name}"))?
        .ok_or_else(|| StoreError::Conflict(format!("stack {id} was modified concurrently")))?;

        let slugs: Vec<(i64, String)> = sqlx::query_as(
            "SELECT id, instance_id FROM service_instances
             WHERE stack_id = $1 AND deleted_at IS NULL",
        )
        .bind(id.as_i64())
        .fetch_all(&mut *tx)
        .await
        .map_store("instances")?;

        for (instance_pk, slug) in slugs {
            let container_name = devarch_core::container_name(new_name, &slug)?;
            sqlx::query(
                "UPDATE service_instances SET container_name = $2, updated_at = now()
                 WHERE id = $1",
            )
            .bind(instance_pk)
            .bind(&container_name)
            .execute(&mut *tx)
            .await
            .map_store("instance")?;
        }

        tx.commit().await?;
        Ok(stack)
    }

    /// Deep-copy a stack under a new name: the stack row, all active
    /// instances, and every overlay collection, atomically.
    pub async fn clone_stack(&self, source: StackId, new_name: &str) -> Result<Stack, StoreError> {
        let mut tx = self.pool.begin().await?;

        let stack = sqlx::query_as::<_, Stack>(
            "INSERT INTO stacks (name, description, network_name, enabled)
             SELECT $2, description, NULL, enabled
             FROM stacks WHERE id = $1 AND deleted_at IS NULL
             RETURNING *",
        )
        .bind(source.as_i64())
        .bind(new_name)
        .fetch_optional(&mut *tx)
        .await
        .map_store(&format!("stack {new_name}"))?
        .ok_or_else(|| StoreError::NotFound(format!("stack {source}")))?;

        let instances: Vec<(i64, String)> = sqlx::query_as(
            "SELECT id, instance_id FROM service_instances
             WHERE stack_id = $1 AND deleted_at IS NULL
             ORDER BY id",
        )
        .bind(source.as_i64())
        .fetch_all(&mut *tx)
        .await
        .map_store("instances")?;

        for (source_pk, slug) in instances {
            let container_name = devarch_core::container_name(new_name, &slug)?;
            let (new_pk,): (i64,) = sqlx::query_as(
                "INSERT INTO service_instances
                     (stack_id, instance_id, template_service_id, container_name,
                      image_name, image_tag, restart_policy, command, user_spec, enabled)
                 SELECT $2, instance_id, template_service_id, $3,
                        image_name, image_tag, restart_policy, command, user_spec, enabled
                 FROM service_instances WHERE id = $1
                 RETURNING id",
            )
            .bind(source_pk)
            .bind(stack.id)
            .bind(&container_name)
            .fetch_one(&mut *tx)
            .await
            .map_store("instance")?;

            copy_overlays(&mut tx, source_pk, new_pk).await?;
        }

        tx.commit().await?;
        Ok(stack)
    }
}

/// Copy every overlay collection from one instance to another.
async fn copy_overlays(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    source_pk: i64,
    dest_pk: i64,
) -> Result<(), StoreError> {
    const COPIES: &[&str] = &[
        "INSERT INTO instance_ports
             (service_instance_id, host_ip, host_port, container_port, protocol, tombstone)
         SELECT $2, host_ip, host_port, container_port, protocol, tombstone
         FROM instance_ports WHERE service_instance_id = $1",
        "INSERT INTO instance_volumes
             (service_instance_id, source, target, read_only, tombstone)
         SELECT $2, source, target, read_only, tombstone
         FROM instance_volumes WHERE service_instance_id = $1",
        "INSERT INTO instance_env_vars (service_instance_id, key, value, tombstone)
         SELECT $2, key, value, tombstone
         FROM instance_env_vars WHERE service_instance_id = $1",
        "INSERT INTO instance_labels (service_instance_id, key, value, tombstone)
         SELECT $2, key, value, tombstone
         FROM instance_labels WHERE service_instance_id = $1",
        "INSERT INTO instance_domains (service_instance_id, domain, container_port, tombstone)
         SELECT $2, domain, container_port, tombstone
         FROM instance_domains WHERE service_instance_id = $1",
        "INSERT INTO instance_healthchecks
             (service_instance_id, disabled, test, interval_secs, timeout_secs, retries,
              start_period_secs)
         SELECT $2, disabled, test, interval_secs, timeout_secs, retries, start_period_secs
         FROM instance_healthchecks WHERE service_instance_id = $1",
        "INSERT INTO instance_dependencies (service_instance_id, depends_on, condition, tombstone)
         SELECT $2, depends_on, condition, tombstone
         FROM instance_dependencies WHERE service_instance_id = $1",
        "INSERT INTO instance_config_files (service_instance_id, file_path, content, tombstone)
         SELECT $2, file_path, content, tombstone
         FROM instance_config_files WHERE service_instance_id = $1",
    ];

    for sql in COPIES {
        sqlx::query(sql)
            .bind(source_pk)
            .bind(dest_pk)
            .execute(&mut **tx)
            .await
            .map_store("overlay copy")?;
    }
    Ok(())
}

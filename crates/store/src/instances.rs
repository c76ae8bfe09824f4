// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Service instance CRUD and scalar overrides.

use chrono::{DateTime, Utc};
use devarch_core::{InstanceId, ServiceId, StackId};
use sqlx::FromRow;

use crate::error::{SqlxResultExt, StoreError};
use crate::Store;

/// One service instance row. Scalar override columns are the instance's
/// overlay over the template's scalar fields; NULL inherits.
#[derive(Debug, Clone, FromRow)]
pub struct ServiceInstance {
    pub id: i64,
    pub stack_id: i64,
    pub instance_id: String,
    pub template_service_id: Option<i64>,
    pub container_name: String,
    pub image_name: Option<String>,
    pub image_tag: Option<String>,
    pub restart_policy: Option<String>,
    pub command: Option<String>,
    pub user_spec: Option<String>,
    pub enabled: bool,
    pub row_version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ServiceInstance {
    pub fn instance_pk(&self) -> InstanceId {
        InstanceId::new(self.id)
    }

    pub fn stack_pk(&self) -> StackId {
        StackId::new(self.stack_id)
    }

    pub fn template_id(&self) -> Option<ServiceId> {
        self.template_service_id.map(ServiceId::new)
    }
}

/// Fields for instance creation.
#[derive(Debug, Clone, Default)]
pub struct NewInstance {
    pub instance_id: String,
    pub template_service_id: Option<ServiceId>,
    pub enabled: bool,
}

/// Scalar overlay fields; `Some(None)` clears an override back to
/// inheriting the template.
#[derive(Debug, Clone, Default)]
pub struct InstanceOverrides {
    pub image_name: Option<Option<String>>,
    pub image_tag: Option<Option<String>>,
    pub restart_policy: Option<Option<String>>,
    pub command: Option<Option<String>>,
    pub user_spec: Option<Option<String>>,
}

impl Store {
    /// Add an instance to an active stack. The container name is derived
    /// here and never changes except through stack rename.
    pub async fn create_instance(
        &self,
        stack_id: StackId,
        new: &NewInstance,
    ) -> Result<ServiceInstance, StoreError> {
        let stack = self.get_stack_by_id(stack_id).await?;
        if stack.deleted_at.is_some() {
            return Err(StoreError::NotFound(format!("stack {stack_id}")));
        }
        let container_name = devarch_core::container_name(&stack.name, &new.instance_id)?;

        sqlx::query_as::<_, ServiceInstance>(
            "INSERT INTO service_instances
                 (stack_id, instance_id, template_service_id, container_name, enabled)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING *",
        )
        .bind(stack_id.as_i64())
        .bind(&new.instance_id)
        .bind(new.template_service_id.map(ServiceId::as_i64))
        .bind(&container_name)
        .bind(new.enabled)
        .fetch_one(&self.pool)
        .await
        .map_store(&format!("instance {}", new.instance_id))
    }

    /// Fetch an active instance by stack and slug.
    pub async fn get_instance(
        &self,
        stack_id: StackId,
        slug: &str,
    ) -> Result<ServiceInstance, StoreError> {
        sqlx::query_as::<_, ServiceInstance>(
            "SELECT * FROM service_instances
             WHERE stack_id = $1 AND instance_id = $2 AND deleted_at IS NULL",
        )
        .bind(stack_id.as_i64())
        .bind(slug)
        .fetch_one(&self.pool)
        .await
        .map_store(&format!("instance {slug}"))
    }

    /// Active instances of a stack, by slug.
    pub async fn list_instances(&self, stack_id: StackId) -> Result<Vec<ServiceInstance>, StoreError> {
        sqlx::query_as::<_, ServiceInstance>(
            "SELECT * FROM service_instances
             WHERE stack_id = $1 AND deleted_at IS NULL
             ORDER BY instance_id",
        )
        .bind(stack_id.as_i64())
        .fetch_all(&self.pool)
        .await
        .map_store("instances")
    }

    /// Apply scalar overrides under optimistic concurrency and record a
    /// config version.
    pub async fn update_instance_overrides(
        &self,
        instance_pk: InstanceId,
        overrides: &InstanceOverrides,
        expected_version: i64,
    ) -> Result<ServiceInstance, StoreError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, ServiceInstance>(
            "UPDATE service_instances SET
                 image_name = CASE WHEN $3 THEN $4 ELSE image_name END,
                 image_tag = CASE WHEN $5 THEN $6 ELSE image_tag END,
                 restart_policy = CASE WHEN $7 THEN $8 ELSE restart_policy END,
                 command = CASE WHEN $9 THEN $10 ELSE command END,
                 user_spec = CASE WHEN $11 THEN $12 ELSE user_spec END,
                 row_version = row_version + 1,
                 updated_at = now()
             WHERE id = $1 AND row_version = $2 AND deleted_at IS NULL
             RETURNING *",
        )
        .bind(instance_pk.as_i64())
        .bind(expected_version)
        .bind(overrides.image_name.is_some())
        .bind(overrides.image_name.clone().flatten())
        .bind(overrides.image_tag.is_some())
        .bind(overrides.image_tag.clone().flatten())
        .bind(overrides.restart_policy.is_some())
        .bind(overrides.restart_policy.clone().flatten())
        .bind(overrides.command.is_some())
        .bind(overrides.command.clone().flatten())
        .bind(overrides.user_spec.is_some())
        .bind(overrides.user_spec.clone().flatten())
        .fetch_optional(&mut *tx)
        .await
        .map_store(&format!("instance {instance_pk}"))?;

        let instance = match updated {
            Some(instance) => instance,
            None => {
                tx.rollback().await?;
                return Err(StoreError::Conflict(format!(
                    "instance {instance_pk} was modified concurrently"
                )));
            }
        };

        self.record_instance_version(&mut tx, instance_pk, "scalar overrides changed")
            .await?;
        tx.commit().await?;
        Ok(instance)
    }

    pub async fn set_instance_enabled(
        &self,
        instance_pk: InstanceId,
        enabled: bool,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE service_instances
             SET enabled = $2, row_version = row_version + 1, updated_at = now()
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(instance_pk.as_i64())
        .bind(enabled)
        .execute(&self.pool)
        .await
        .map_store(&format!("instance {instance_pk}"))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("instance {instance_pk}")));
        }
        Ok(())
    }

    /// Soft-delete an instance; the next plan proposes a DELETE action
    /// for its container.
    pub async fn soft_delete_instance(&self, instance_pk: InstanceId) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE service_instances SET deleted_at = now(), updated_at = now()
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(instance_pk.as_i64())
        .execute(&self.pool)
        .await
        .map_store(&format!("instance {instance_pk}"))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("instance {instance_pk}")));
        }
        Ok(())
    }

    /// Resolve `(stack label, instance label)` from a live container to
    /// the instance row, as status sync needs.
    pub async fn resolve_instance(
        &self,
        stack_name: &str,
        slug: &str,
    ) -> Result<Option<InstanceId>, StoreError> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT si.id FROM service_instances si
             JOIN stacks s ON s.id = si.stack_id
             WHERE s.name = $1 AND si.instance_id = $2
               AND si.deleted_at IS NULL AND s.deleted_at IS NULL",
        )
        .bind(stack_name)
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_store("instance")?;
        Ok(row.map(|(id,)| InstanceId::new(id)))
    }

    /// Effective host-port bindings of enabled, active instances outside
    /// the given stack, restricted to the ports of interest. Template
    /// rows count unless the instance overlays the same key.
    pub async fn host_port_conflicts(
        &self,
        exclude_stack: StackId,
        host_ports: &[i32],
    ) -> Result<Vec<(String, String, i32)>, StoreError> {
        if host_ports.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_as(
            "SELECT s.name, si.instance_id, ip.host_port
             FROM instance_ports ip
             JOIN service_instances si ON si.id = ip.service_instance_id
             JOIN stacks s ON s.id = si.stack_id
             WHERE NOT ip.tombstone AND ip.host_port = ANY($2)
               AND si.enabled AND si.deleted_at IS NULL
               AND s.enabled AND s.deleted_at IS NULL AND s.id <> $1
             UNION
             SELECT s.name, si.instance_id, sp.host_port
             FROM service_ports sp
             JOIN service_instances si ON si.template_service_id = sp.service_id
             JOIN stacks s ON s.id = si.stack_id
             WHERE sp.host_port = ANY($2)
               AND si.enabled AND si.deleted_at IS NULL
               AND s.enabled AND s.deleted_at IS NULL AND s.id <> $1
               AND NOT EXISTS (
                   SELECT 1 FROM instance_ports ip2
                   WHERE ip2.service_instance_id = si.id
                     AND ip2.container_port = sp.container_port
                     AND ip2.protocol = sp.protocol
               )",
        )
        .bind(exclude_stack.as_i64())
        .bind(host_ports)
        .fetch_all(&self.pool)
        .await
        .map_store("port bindings")
    }
}

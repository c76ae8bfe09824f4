// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-instance overlay collections.
//!
//! Each collection is replaced wholesale inside a transaction that also
//! bumps the instance row version and appends a config version row. A
//! tombstoned row is the stored form of the `__delete__` marker: it
//! removes the template's entry of the same key at resolve time.

use devarch_core::spec::{
    ConfigFile, Dependency, DependsCondition, DomainRoute, EnvVar, Healthcheck,
    HealthcheckOverlay, LabelPair, OverlayEntry, OverlaySpec, PortBinding, Protocol,
    VolumeMount, DELETE_MARKER,
};
use devarch_core::InstanceId;
use sqlx::PgConnection;

use crate::error::{SqlxResultExt, StoreError};
use crate::Store;

/// One overlay row: the entry plus its tombstone flag.
#[derive(Debug, Clone)]
pub struct OverlayRow<T> {
    pub item: T,
    pub tombstone: bool,
}

impl<T> OverlayRow<T> {
    pub fn set(item: T) -> Self {
        Self { item, tombstone: false }
    }

    pub fn delete(item: T) -> Self {
        Self { item, tombstone: true }
    }
}

macro_rules! replace_collection {
    ($name:ident, $ty:ty, $summary:literal, $delete_sql:literal, $insert:ident) => {
        pub async fn $name(
            &self,
            instance_pk: InstanceId,
            rows: Vec<OverlayRow<$ty>>,
        ) -> Result<(), StoreError> {
            let mut tx = self.pool.begin().await?;
            self.touch_instance(&mut tx, instance_pk).await?;
            sqlx::query($delete_sql)
                .bind(instance_pk.as_i64())
                .execute(&mut *tx)
                .await
                .map_store("overlay")?;
            for row in &rows {
                $insert(&mut tx, instance_pk.as_i64(), row).await?;
            }
            self.record_instance_version(&mut tx, instance_pk, $summary).await?;
            tx.commit().await?;
            Ok(())
        }
    };
}

impl Store {
    /// Bump the row version of an active instance, failing NotFound for
    /// deleted or missing rows.
    pub(crate) async fn touch_instance(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        instance_pk: InstanceId,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE service_instances
             SET row_version = row_version + 1, updated_at = now()
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(instance_pk.as_i64())
        .execute(&mut **tx)
        .await
        .map_store("instance")?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("instance {instance_pk}")));
        }
        Ok(())
    }

    replace_collection!(
        replace_instance_ports,
        PortBinding,
        "ports changed",
        "DELETE FROM instance_ports WHERE service_instance_id = $1",
        insert_port
    );

    replace_collection!(
        replace_instance_volumes,
        VolumeMount,
        "volumes changed",
        "DELETE FROM instance_volumes WHERE service_instance_id = $1",
        insert_volume
    );

    replace_collection!(
        replace_instance_env_vars,
        EnvVar,
        "env vars changed",
        "DELETE FROM instance_env_vars WHERE service_instance_id = $1",
        insert_env_var
    );

    replace_collection!(
        replace_instance_labels,
        LabelPair,
        "labels changed",
        "DELETE FROM instance_labels WHERE service_instance_id = $1",
        insert_label
    );

    replace_collection!(
        replace_instance_domains,
        DomainRoute,
        "domains changed",
        "DELETE FROM instance_domains WHERE service_instance_id = $1",
        insert_domain
    );

    replace_collection!(
        replace_instance_dependencies,
        Dependency,
        "dependencies changed",
        "DELETE FROM instance_dependencies WHERE service_instance_id = $1",
        insert_dependency
    );

    replace_collection!(
        replace_instance_config_files,
        ConfigFile,
        "config files changed",
        "DELETE FROM instance_config_files WHERE service_instance_id = $1",
        insert_config_file
    );

    /// Replace the healthcheck overlay; `None` clears it back to
    /// inheriting the template's.
    pub async fn set_instance_healthcheck(
        &self,
        instance_pk: InstanceId,
        overlay: Option<HealthcheckOverlay>,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        self.touch_instance(&mut tx, instance_pk).await?;
        sqlx::query("DELETE FROM instance_healthchecks WHERE service_instance_id = $1")
            .bind(instance_pk.as_i64())
            .execute(&mut *tx)
            .await
            .map_store("healthcheck")?;
        if let Some(hc) = &overlay {
            sqlx::query(
                "INSERT INTO instance_healthchecks
                     (service_instance_id, disabled, test, interval_secs, timeout_secs,
                      retries, start_period_secs)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(instance_pk.as_i64())
            .bind(hc.disabled)
            .bind(hc.check.as_ref().map(|c| c.test.clone()))
            .bind(hc.check.as_ref().map(|c| c.interval_secs as i32))
            .bind(hc.check.as_ref().map(|c| c.timeout_secs as i32))
            .bind(hc.check.as_ref().map(|c| c.retries as i32))
            .bind(hc.check.as_ref().map(|c| c.start_period_secs as i32))
            .execute(&mut *tx)
            .await
            .map_store("healthcheck")?;
        }
        self.record_instance_version(&mut tx, instance_pk, "healthcheck changed").await?;
        tx.commit().await?;
        Ok(())
    }
}

async fn insert_port(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    instance_pk: i64,
    row: &OverlayRow<PortBinding>,
) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO instance_ports
             (service_instance_id, host_ip, host_port, container_port, protocol, tombstone)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(instance_pk)
    .bind(&row.item.host_ip)
    .bind(row.item.host_port.map(i32::from))
    .bind(i32::from(row.item.container_port))
    .bind(row.item.protocol.as_str())
    .bind(row.tombstone)
    .execute(&mut **tx)
    .await
    .map_store("port")?;
    Ok(())
}

async fn insert_volume(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    instance_pk: i64,
    row: &OverlayRow<VolumeMount>,
) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO instance_volumes
             (service_instance_id, source, target, read_only, tombstone)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(instance_pk)
    .bind(&row.item.source)
    .bind(&row.item.target)
    .bind(row.item.read_only)
    .bind(row.tombstone)
    .execute(&mut **tx)
    .await
    .map_store("volume")?;
    Ok(())
}

async fn insert_env_var(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    instance_pk: i64,
    row: &OverlayRow<EnvVar>,
) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO instance_env_vars (service_instance_id, key, value, tombstone)
         VALUES ($1, $2, $3, $4)",
    )
    .bind(instance_pk)
    .bind(&row.item.key)
    .bind(&row.item.value)
    .bind(row.tombstone)
    .execute(&mut **tx)
    .await
    .map_store("env var")?;
    Ok(())
}

async fn insert_label(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    instance_pk: i64,
    row: &OverlayRow<LabelPair>,
) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO instance_labels (service_instance_id, key, value, tombstone)
         VALUES ($1, $2, $3, $4)",
    )
    .bind(instance_pk)
    .bind(&row.item.key)
    .bind(&row.item.value)
    .bind(row.tombstone)
    .execute(&mut **tx)
    .await
    .map_store("label")?;
    Ok(())
}

async fn insert_domain(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    instance_pk: i64,
    row: &OverlayRow<DomainRoute>,
) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO instance_domains (service_instance_id, domain, container_port, tombstone)
         VALUES ($1, $2, $3, $4)",
    )
    .bind(instance_pk)
    .bind(&row.item.domain)
    .bind(row.item.container_port.map(i32::from))
    .bind(row.tombstone)
    .execute(&mut **tx)
    .await
    .map_store("domain")?;
    Ok(())
}

async fn insert_dependency(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    instance_pk: i64,
    row: &OverlayRow<Dependency>,
) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO instance_dependencies (service_instance_id, depends_on, condition, tombstone)
         VALUES ($1, $2, $3, $4)",
    )
    .bind(instance_pk)
    .bind(&row.item.depends_on)
    .bind(row.item.condition.as_str())
    .bind(row.tombstone)
    .execute(&mut **tx)
    .await
    .map_store("dependency")?;
    Ok(())
}

async fn insert_config_file(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    instance_pk: i64,
    row: &OverlayRow<ConfigFile>,
) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO instance_config_files (service_instance_id, file_path, content, tombstone)
         VALUES ($1, $2, $3, $4)",
    )
    .bind(instance_pk)
    .bind(&row.item.file_path)
    .bind(&row.item.content)
    .bind(row.tombstone)
    .execute(&mut **tx)
    .await
    .map_store("config file")?;
    Ok(())
}

/// Load an instance's full overlay from its child tables.
pub(crate) async fn load_overlay_spec(
    conn: &mut PgConnection,
    instance_pk: i64,
) -> Result<OverlaySpec, StoreError> {
    let mut overlay = OverlaySpec::default();

    let ports: Vec<(Option<String>, Option<i32>, i32, String, bool)> = sqlx::query_as(
        "SELECT host_ip, host_port, container_port, protocol, tombstone
         FROM instance_ports WHERE service_instance_id = $1",
    )
    .bind(instance_pk)
    .fetch_all(&mut *conn)
    .await
    .map_store("ports")?;
    for (host_ip, host_port, container_port, protocol, tombstone) in ports {
        let binding = PortBinding {
            host_ip,
            host_port: host_port.map(|p| p as u16),
            container_port: container_port as u16,
            protocol: Protocol::parse(&protocol).unwrap_or_default(),
        };
        overlay.ports.push(if tombstone {
            OverlayEntry::Delete((binding.container_port, binding.protocol))
        } else {
            OverlayEntry::Set(binding)
        });
    }

    let volumes: Vec<(String, String, bool, bool)> = sqlx::query_as(
        "SELECT source, target, read_only, tombstone
         FROM instance_volumes WHERE service_instance_id = $1",
    )
    .bind(instance_pk)
    .fetch_all(&mut *conn)
    .await
    .map_store("volumes")?;
    for (source, target, read_only, tombstone) in volumes {
        overlay.volumes.push(if tombstone {
            OverlayEntry::Delete(target)
        } else {
            OverlayEntry::Set(VolumeMount { source, target, read_only })
        });
    }

    let env_vars: Vec<(String, String, bool)> = sqlx::query_as(
        "SELECT key, value, tombstone FROM instance_env_vars WHERE service_instance_id = $1",
    )
    .bind(instance_pk)
    .fetch_all(&mut *conn)
    .await
    .map_store("env vars")?;
    for (key, value, tombstone) in env_vars {
        overlay.env_vars.push(if tombstone || value == DELETE_MARKER {
            OverlayEntry::Delete(key)
        } else {
            OverlayEntry::Set(EnvVar { key, value })
        });
    }

    let labels: Vec<(String, String, bool)> = sqlx::query_as(
        "SELECT key, value, tombstone FROM instance_labels WHERE service_instance_id = $1",
    )
    .bind(instance_pk)
    .fetch_all(&mut *conn)
    .await
    .map_store("labels")?;
    for (key, value, tombstone) in labels {
        overlay.labels.push(if tombstone || value == DELETE_MARKER {
            OverlayEntry::Delete(key)
        } else {
            OverlayEntry::Set(LabelPair { key, value })
        });
    }

    let domains: Vec<(String, Option<i32>, bool)> = sqlx::query_as(
        "SELECT domain, container_port, tombstone
         FROM instance_domains WHERE service_instance_id = $1",
    )
    .bind(instance_pk)
    .fetch_all(&mut *conn)
    .await
    .map_store("domains")?;
    for (domain, container_port, tombstone) in domains {
        overlay.domains.push(if tombstone {
            OverlayEntry::Delete(domain)
        } else {
            OverlayEntry::Set(DomainRoute { domain, container_port: container_port.map(|p| p as u16) })
        });
    }

    let healthcheck: Option<(bool, Option<String>, Option<i32>, Option<i32>, Option<i32>, Option<i32>)> =
        sqlx::query_as(
            "SELECT disabled, test, interval_secs, timeout_secs, retries, start_period_secs
             FROM instance_healthchecks WHERE service_instance_id = $1",
        )
        .bind(instance_pk)
        .fetch_optional(&mut *conn)
        .await
        .map_store("healthcheck")?;
    if let Some((disabled, test, interval, timeout, retries, start_period)) = healthcheck {
        let check = test.map(|test| Healthcheck {
            test,
            interval_secs: interval.unwrap_or(30) as u32,
            timeout_secs: timeout.unwrap_or(5) as u32,
            retries: retries.unwrap_or(3) as u32,
            start_period_secs: start_period.unwrap_or(0) as u32,
        });
        overlay.healthcheck = Some(HealthcheckOverlay { disabled, check });
    }

    let dependencies: Vec<(String, String, bool)> = sqlx::query_as(
        "SELECT depends_on, condition, tombstone
         FROM instance_dependencies WHERE service_instance_id = $1",
    )
    .bind(instance_pk)
    .fetch_all(&mut *conn)
    .await
    .map_store("dependencies")?;
    for (depends_on, condition, tombstone) in dependencies {
        overlay.dependencies.push(if tombstone {
            OverlayEntry::Delete(depends_on)
        } else {
            OverlayEntry::Set(Dependency {
                depends_on,
                condition: DependsCondition::parse(&condition).unwrap_or_default(),
            })
        });
    }

    let config_files: Vec<(String, String, bool)> = sqlx::query_as(
        "SELECT file_path, content, tombstone
         FROM instance_config_files WHERE service_instance_id = $1",
    )
    .bind(instance_pk)
    .fetch_all(&mut *conn)
    .await
    .map_store("config files")?;
    for (file_path, content, tombstone) in config_files {
        overlay.config_files.push(if tombstone {
            OverlayEntry::Delete(file_path)
        } else {
            OverlayEntry::Set(ConfigFile { file_path, content })
        });
    }

    Ok(overlay)
}

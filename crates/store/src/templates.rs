// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Template services: upsert-by-name (importer entry point), retrieval,
//! and full spec loading.

use chrono::{DateTime, Utc};
use devarch_core::spec::{
    ConfigFile, Dependency, DependsCondition, DomainRoute, EnvVar, Healthcheck, LabelPair,
    PortBinding, Protocol, RestartPolicy, ServiceSpec, VolumeMount,
};
use devarch_core::{CategoryId, ConfigStatus, ServiceId};
use sqlx::{FromRow, PgConnection};

use crate::error::{SqlxResultExt, StoreError};
use crate::Store;

/// One template service row.
#[derive(Debug, Clone, FromRow)]
pub struct TemplateService {
    pub id: i64,
    pub name: String,
    pub category_id: Option<i64>,
    pub image_name: String,
    pub image_tag: String,
    pub restart_policy: String,
    pub command: Option<String>,
    pub user_spec: Option<String>,
    pub enabled: bool,
    pub config_status: String,
    pub row_version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TemplateService {
    pub fn service_id(&self) -> ServiceId {
        ServiceId::new(self.id)
    }

    pub fn status(&self) -> ConfigStatus {
        ConfigStatus::parse(&self.config_status).unwrap_or(ConfigStatus::Broken)
    }
}

/// Full template payload for upsert, as produced by the compose importer.
#[derive(Debug, Clone, Default)]
pub struct NewTemplate {
    pub name: String,
    pub category_id: Option<CategoryId>,
    pub enabled: bool,
    pub spec: ServiceSpec,
}

impl Store {
    /// Insert or update a template by unique name, replacing its child
    /// collections and recording a config version.
    pub async fn upsert_template(&self, new: &NewTemplate) -> Result<TemplateService, StoreError> {
        let mut tx = self.pool.begin().await?;

        let template = sqlx::query_as::<_, TemplateService>(
            "INSERT INTO services
                 (name, category_id, image_name, image_tag, restart_policy, command,
                  user_spec, enabled)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             ON CONFLICT (name) DO UPDATE SET
                 category_id = EXCLUDED.category_id,
                 image_name = EXCLUDED.image_name,
                 image_tag = EXCLUDED.image_tag,
                 restart_policy = EXCLUDED.restart_policy,
                 command = EXCLUDED.command,
                 user_spec = EXCLUDED.user_spec,
                 enabled = EXCLUDED.enabled,
                 row_version = services.row_version + 1,
                 updated_at = now()
             RETURNING *",
        )
        .bind(&new.name)
        .bind(new.category_id.map(CategoryId::as_i64))
        .bind(&new.spec.image_name)
        .bind(&new.spec.image_tag)
        .bind(new.spec.restart_policy.as_str())
        .bind(&new.spec.command)
        .bind(&new.spec.user_spec)
        .bind(new.enabled)
        .fetch_one(&mut *tx)
        .await
        .map_store(&format!("template {}", new.name))?;

        replace_template_children(&mut tx, template.id, &new.spec).await?;
        self.record_template_version(&mut tx, ServiceId::new(template.id), "imported").await?;

        tx.commit().await?;
        Ok(template)
    }

    pub async fn get_template(&self, id: ServiceId) -> Result<TemplateService, StoreError> {
        sqlx::query_as::<_, TemplateService>("SELECT * FROM services WHERE id = $1")
            .bind(id.as_i64())
            .fetch_one(&self.pool)
            .await
            .map_store(&format!("template {id}"))
    }

    pub async fn get_template_by_name(&self, name: &str) -> Result<TemplateService, StoreError> {
        sqlx::query_as::<_, TemplateService>("SELECT * FROM services WHERE name = $1")
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_store(&format!("template {name}"))
    }

    pub async fn list_templates(&self) -> Result<Vec<TemplateService>, StoreError> {
        sqlx::query_as::<_, TemplateService>("SELECT * FROM services ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_store("templates")
    }

    pub async fn set_template_status(
        &self,
        id: ServiceId,
        status: ConfigStatus,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE services SET config_status = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id.as_i64())
        .bind(status.as_str())
        .execute(&self.pool)
        .await
        .map_store(&format!("template {id}"))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("template {id}")));
        }
        Ok(())
    }

    /// Load a template's full spec (scalars plus child collections).
    pub async fn template_spec(&self, id: ServiceId) -> Result<ServiceSpec, StoreError> {
        let mut conn = self.pool.acquire().await?;
        load_template_spec(&mut conn, id.as_i64()).await
    }
}

/// Replace every child collection of a template from a full spec.
async fn replace_template_children(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    service_id: i64,
    spec: &ServiceSpec,
) -> Result<(), StoreError> {
    const WIPES: &[&str] = &[
        "DELETE FROM service_ports WHERE service_id = $1",
        "DELETE FROM service_volumes WHERE service_id = $1",
        "DELETE FROM service_env_vars WHERE service_id = $1",
        "DELETE FROM service_labels WHERE service_id = $1",
        "DELETE FROM service_domains WHERE service_id = $1",
        "DELETE FROM service_healthchecks WHERE service_id = $1",
        "DELETE FROM service_dependencies WHERE service_id = $1",
        "DELETE FROM service_config_files WHERE service_id = $1",
    ];
    for sql in WIPES {
        sqlx::query(sql).bind(service_id).execute(&mut **tx).await.map_store("template")?;
    }

    for port in &spec.ports {
        sqlx::query(
            "INSERT INTO service_ports (service_id, host_ip, host_port, container_port, protocol)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(service_id)
        .bind(&port.host_ip)
        .bind(port.host_port.map(i32::from))
        .bind(i32::from(port.container_port))
        .bind(port.protocol.as_str())
        .execute(&mut **tx)
        .await
        .map_store("template port")?;
    }
    for volume in &spec.volumes {
        sqlx::query(
            "INSERT INTO service_volumes (service_id, source, target, read_only)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(service_id)
        .bind(&volume.source)
        .bind(&volume.target)
        .bind(volume.read_only)
        .execute(&mut **tx)
        .await
        .map_store("template volume")?;
    }
    for env in &spec.env_vars {
        sqlx::query("INSERT INTO service_env_vars (service_id, key, value) VALUES ($1, $2, $3)")
            .bind(service_id)
            .bind(&env.key)
            .bind(&env.value)
            .execute(&mut **tx)
            .await
            .map_store("template env var")?;
    }
    for label in &spec.labels {
        sqlx::query("INSERT INTO service_labels (service_id, key, value) VALUES ($1, $2, $3)")
            .bind(service_id)
            .bind(&label.key)
            .bind(&label.value)
            .execute(&mut **tx)
            .await
            .map_store("template label")?;
    }
    for domain in &spec.domains {
        sqlx::query(
            "INSERT INTO service_domains (service_id, domain, container_port) VALUES ($1, $2, $3)",
        )
        .bind(service_id)
        .bind(&domain.domain)
        .bind(domain.container_port.map(i32::from))
        .execute(&mut **tx)
        .await
        .map_store("template domain")?;
    }
    if let Some(hc) = &spec.healthcheck {
        sqlx::query(
            "INSERT INTO service_healthchecks
                 (service_id, test, interval_secs, timeout_secs, retries, start_period_secs)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(service_id)
        .bind(&hc.test)
        .bind(hc.interval_secs as i32)
        .bind(hc.timeout_secs as i32)
        .bind(hc.retries as i32)
        .bind(hc.start_period_secs as i32)
        .execute(&mut **tx)
        .await
        .map_store("template healthcheck")?;
    }
    for dep in &spec.dependencies {
        sqlx::query(
            "INSERT INTO service_dependencies (service_id, depends_on, condition)
             VALUES ($1, $2, $3)",
        )
        .bind(service_id)
        .bind(&dep.depends_on)
        .bind(dep.condition.as_str())
        .execute(&mut **tx)
        .await
        .map_store("template dependency")?;
    }
    for file in &spec.config_files {
        sqlx::query(
            "INSERT INTO service_config_files (service_id, file_path, content)
             VALUES ($1, $2, $3)",
        )
        .bind(service_id)
        .bind(&file.file_path)
        .bind(&file.content)
        .execute(&mut **tx)
        .await
        .map_store("template config file")?;
    }

    Ok(())
}

/// Load a template's spec from its row and child tables.
pub(crate) async fn load_template_spec(
    conn: &mut PgConnection,
    service_id: i64,
) -> Result<ServiceSpec, StoreError> {
    let (image_name, image_tag, restart_policy, command, user_spec): (
        String,
        String,
        String,
        Option<String>,
        Option<String>,
    ) = sqlx::query_as(
        "SELECT image_name, image_tag, restart_policy, command, user_spec
         FROM services WHERE id = $1",
    )
    .bind(service_id)
    .fetch_one(&mut *conn)
    .await
    .map_store(&format!("template {service_id}"))?;

    let mut spec = ServiceSpec {
        image_name,
        image_tag,
        restart_policy: RestartPolicy::parse(&restart_policy).unwrap_or_default(),
        command,
        user_spec,
        ..Default::default()
    };

    let ports: Vec<(Option<String>, Option<i32>, i32, String)> = sqlx::query_as(
        "SELECT host_ip, host_port, container_port, protocol
         FROM service_ports WHERE service_id = $1",
    )
    .bind(service_id)
    .fetch_all(&mut *conn)
    .await
    .map_store("template ports")?;
    spec.ports = ports
        .into_iter()
        .map(|(host_ip, host_port, container_port, protocol)| PortBinding {
            host_ip,
            host_port: host_port.map(|p| p as u16),
            container_port: container_port as u16,
            protocol: Protocol::parse(&protocol).unwrap_or_default(),
        })
        .collect();

    let volumes: Vec<(String, String, bool)> = sqlx::query_as(
        "SELECT source, target, read_only FROM service_volumes WHERE service_id = $1",
    )
    .bind(service_id)
    .fetch_all(&mut *conn)
    .await
    .map_store("template volumes")?;
    spec.volumes = volumes
        .into_iter()
        .map(|(source, target, read_only)| VolumeMount { source, target, read_only })
        .collect();

    let env_vars: Vec<(String, String)> =
        sqlx::query_as("SELECT key, value FROM service_env_vars WHERE service_id = $1")
            .bind(service_id)
            .fetch_all(&mut *conn)
            .await
            .map_store("template env vars")?;
    spec.env_vars = env_vars.into_iter().map(|(key, value)| EnvVar { key, value }).collect();

    let labels: Vec<(String, String)> =
        sqlx::query_as("SELECT key, value FROM service_labels WHERE service_id = $1")
            .bind(service_id)
            .fetch_all(&mut *conn)
            .await
            .map_store("template labels")?;
    spec.labels = labels.into_iter().map(|(key, value)| LabelPair { key, value }).collect();

    let domains: Vec<(String, Option<i32>)> = sqlx::query_as(
        "SELECT domain, container_port FROM service_domains WHERE service_id = $1",
    )
    .bind(service_id)
    .fetch_all(&mut *conn)
    .await
    .map_store("template domains")?;
    spec.domains = domains
        .into_iter()
        .map(|(domain, container_port)| DomainRoute {
            domain,
            container_port: container_port.map(|p| p as u16),
        })
        .collect();

    let healthcheck: Option<(String, i32, i32, i32, i32)> = sqlx::query_as(
        "SELECT test, interval_secs, timeout_secs, retries, start_period_secs
         FROM service_healthchecks WHERE service_id = $1",
    )
    .bind(service_id)
    .fetch_optional(&mut *conn)
    .await
    .map_store("template healthcheck")?;
    spec.healthcheck = healthcheck.map(|(test, interval, timeout, retries, start_period)| {
        Healthcheck {
            test,
            interval_secs: interval as u32,
            timeout_secs: timeout as u32,
            retries: retries as u32,
            start_period_secs: start_period as u32,
        }
    });

    let dependencies: Vec<(String, String)> = sqlx::query_as(
        "SELECT depends_on, condition FROM service_dependencies WHERE service_id = $1",
    )
    .bind(service_id)
    .fetch_all(&mut *conn)
    .await
    .map_store("template dependencies")?;
    spec.dependencies = dependencies
        .into_iter()
        .map(|(depends_on, condition)| Dependency {
            depends_on,
            condition: DependsCondition::parse(&condition).unwrap_or_default(),
        })
        .collect();

    let config_files: Vec<(String, String)> = sqlx::query_as(
        "SELECT file_path, content FROM service_config_files WHERE service_id = $1",
    )
    .bind(service_id)
    .fetch_all(&mut *conn)
    .await
    .map_store("template config files")?;
    spec.config_files = config_files
        .into_iter()
        .map(|(file_path, content)| ConfigFile { file_path, content })
        .collect();

    Ok(spec)
}

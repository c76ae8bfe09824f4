// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Effective-config retrieval: one code path returning the template plus
//! all overlay rows for an instance, resolved and hashed.

use devarch_core::spec::{OverlaySpec, RestartPolicy, ServiceSpec};
use devarch_core::{resolve, spec_hash, EffectiveSpec, StackId};
use sqlx::PgConnection;

use crate::error::StoreError;
use crate::instances::ServiceInstance;
use crate::overlays::load_overlay_spec;
use crate::templates::load_template_spec;
use crate::Store;

/// An instance with its resolved effective config.
#[derive(Debug, Clone)]
pub struct ResolvedInstance {
    pub instance: ServiceInstance,
    pub effective: EffectiveSpec,
    pub spec_hash: String,
}

impl Store {
    /// Resolve one instance's effective config.
    pub async fn effective_config(
        &self,
        stack_id: StackId,
        slug: &str,
    ) -> Result<ResolvedInstance, StoreError> {
        let instance = self.get_instance(stack_id, slug).await?;
        let mut conn = self.pool.acquire().await?;
        resolve_instance_spec(&mut conn, instance).await
    }

    /// Resolve every active, enabled instance of a stack, ordered by
    /// slug. This is the plan engine's desired-state load.
    pub async fn effective_configs_for_stack(
        &self,
        stack_id: StackId,
    ) -> Result<Vec<ResolvedInstance>, StoreError> {
        let instances = self.list_instances(stack_id).await?;
        let mut conn = self.pool.acquire().await?;
        let mut resolved = Vec::with_capacity(instances.len());
        for instance in instances {
            if !instance.enabled {
                continue;
            }
            resolved.push(resolve_instance_spec(&mut conn, instance).await?);
        }
        Ok(resolved)
    }
}

/// Resolve template + overlay into the effective spec, inside one
/// connection so transactional callers see their own writes.
pub(crate) async fn resolve_instance_spec(
    conn: &mut PgConnection,
    instance: ServiceInstance,
) -> Result<ResolvedInstance, StoreError> {
    let template = match instance.template_service_id {
        Some(service_id) => load_template_spec(conn, service_id).await?,
        // Template-less instances resolve from their overlay alone.
        None => ServiceSpec::default(),
    };

    let mut overlay: OverlaySpec = load_overlay_spec(conn, instance.id).await?;
    overlay.image_name = instance.image_name.clone().or(overlay.image_name);
    overlay.image_tag = instance.image_tag.clone().or(overlay.image_tag);
    overlay.restart_policy = instance
        .restart_policy
        .as_deref()
        .and_then(RestartPolicy::parse)
        .or(overlay.restart_policy);
    overlay.command = instance.command.clone().or(overlay.command);
    overlay.user_spec = instance.user_spec.clone().or(overlay.user_spec);

    let effective = resolve(&template, &overlay);
    let hash = spec_hash(&effective);
    Ok(ResolvedInstance { instance, effective, spec_hash: hash })
}

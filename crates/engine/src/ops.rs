// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stack-level operations outside the plan/apply pipeline: network
//! management, bulk start/stop/restart, soft-delete teardown, compose
//! rendering, and the status rollup.

use std::collections::HashMap;
use std::sync::Arc;

use devarch_core::Clock;
use devarch_runtime::{
    ContainerFilter, ContainerRuntime, NetworkInfo, RemoveOptions, RuntimeError, RuntimeInfo,
    StopOptions,
};
use devarch_store::CategoryRollup;
use serde::Serialize;

use crate::error::EngineError;
use crate::plan::{order_actions, ActionKind, PlanAction};
use crate::{Reconciler, StatusMessage};

/// `GET /status` payload: counts, per-category rollup, runtime identity.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub stacks: usize,
    pub instances: usize,
    pub running_containers: usize,
    pub categories: Vec<CategoryReport>,
    pub runtime: RuntimeIdentity,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryReport {
    pub name: String,
    pub display_name: String,
    pub startup_order: i32,
    pub services: i64,
    pub enabled_services: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RuntimeIdentity {
    pub name: String,
    pub version: String,
    pub operating_system: String,
}

/// Create the network when missing; an existing one is left untouched.
pub(crate) async fn ensure_network(
    runtime: &Arc<dyn ContainerRuntime>,
    name: &str,
) -> Result<(), EngineError> {
    match runtime.inspect_network(name).await {
        Ok(_) => Ok(()),
        Err(RuntimeError::NotFound(_)) => {
            tracing::info!(network = %name, "creating stack network");
            match runtime.create_network(name, "bridge").await {
                // Lost a create race; the network exists either way.
                Ok(()) | Err(RuntimeError::Conflict(_)) => Ok(()),
                Err(err) => Err(err.into()),
            }
        }
        Err(err) => Err(err.into()),
    }
}

impl<C: Clock> Reconciler<C> {
    /// Network details for a stack.
    pub async fn stack_network(&self, stack_name: &str) -> Result<NetworkInfo, EngineError> {
        let stack = self.store().get_stack(stack_name).await?;
        Ok(self.runtime().inspect_network(&stack.network()).await?)
    }

    /// Create the stack's network outside of apply.
    pub async fn create_stack_network(&self, stack_name: &str) -> Result<(), EngineError> {
        let stack = self.store().get_stack(stack_name).await?;
        ensure_network(self.runtime(), &stack.network()).await
    }

    /// Remove the stack's network; fails while containers are attached.
    pub async fn remove_stack_network(&self, stack_name: &str) -> Result<(), EngineError> {
        let stack = self.store().get_stack(stack_name).await?;
        Ok(self.runtime().remove_network(&stack.network()).await?)
    }

    /// Start every existing container of the stack in dependency order.
    pub async fn start_stack(&self, stack_name: &str) -> Result<(), EngineError> {
        let stack = self.store().get_stack(stack_name).await?;
        let snapshot = self.world_snapshot(&stack).await?;

        let actions: Vec<PlanAction> = snapshot
            .desired
            .iter()
            .map(|d| PlanAction {
                kind: ActionKind::Noop,
                instance_pk: Some(d.instance_pk),
                instance: d.slug.clone(),
                container_name: d.container_name.clone(),
                container_id: None,
                spec_hash: None,
                reason: String::new(),
            })
            .collect();
        let deps: HashMap<String, Vec<devarch_core::Dependency>> = snapshot
            .desired
            .iter()
            .map(|d| (d.slug.clone(), d.spec.dependencies.clone()))
            .collect();
        let ordered = order_actions(actions, &deps)?;

        for action in &ordered {
            let live = snapshot
                .live
                .iter()
                .find(|l| l.matches(&action.instance, &action.container_name));
            if let Some(container) = live {
                if !container.status.is_running() {
                    self.runtime().start_container(&container.id).await?;
                }
            }
        }
        self.broadcaster().publish(&StatusMessage::changed(stack.name.clone(), None));
        Ok(())
    }

    /// Stop every container of the stack, dependents first.
    pub async fn stop_stack(&self, stack_name: &str) -> Result<(), EngineError> {
        let stack = self.store().get_stack(stack_name).await?;
        let snapshot = self.world_snapshot(&stack).await?;

        let deps: HashMap<String, Vec<devarch_core::Dependency>> = snapshot
            .desired
            .iter()
            .map(|d| (d.slug.clone(), d.spec.dependencies.clone()))
            .collect();
        let slugs: Vec<String> = snapshot.desired.iter().map(|d| d.slug.clone()).collect();
        let forward = crate::plan::topo_order(&slugs, &deps)?;

        let position: HashMap<&str, usize> =
            forward.iter().enumerate().map(|(i, s)| (s.as_str(), i)).collect();
        let mut live = snapshot.live.clone();
        // Dependents (late in forward order) stop first.
        live.sort_by_key(|c| {
            std::cmp::Reverse(
                c.slug
                    .as_deref()
                    .and_then(|s| position.get(s).copied())
                    .unwrap_or(usize::MAX),
            )
        });

        for container in &live {
            if container.status.is_running() {
                self.runtime().stop_container(&container.id, &StopOptions::default()).await?;
            }
        }
        self.broadcaster().publish(&StatusMessage::changed(stack.name.clone(), None));
        Ok(())
    }

    pub async fn restart_stack(&self, stack_name: &str) -> Result<(), EngineError> {
        self.stop_stack(stack_name).await?;
        self.start_stack(stack_name).await
    }

    /// Soft-delete teardown: stop and remove every container carrying
    /// the stack's label, then remove the network. NotFound along the
    /// way is idempotent success.
    pub async fn teardown_stack(&self, stack_name: &str) -> Result<(), EngineError> {
        let containers = self
            .runtime()
            .list_containers(&ContainerFilter::stack(stack_name))
            .await?;
        for container in &containers {
            match self.runtime().stop_container(&container.id, &StopOptions::default()).await {
                Ok(()) | Err(RuntimeError::NotFound(_)) => {}
                Err(err) => return Err(err.into()),
            }
            match self
                .runtime()
                .remove_container(
                    &container.id,
                    &RemoveOptions { force: true, remove_volumes: false },
                )
                .await
            {
                Ok(()) | Err(RuntimeError::NotFound(_)) => {}
                Err(err) => return Err(err.into()),
            }
        }

        // The stack row may already be tombstoned; fall back to the
        // derived network name.
        let network = match self.store().get_stack(stack_name).await {
            Ok(stack) => stack.network(),
            Err(err) if err.is_not_found() => devarch_core::default_network_name(stack_name),
            Err(err) => return Err(err.into()),
        };
        match self.runtime().remove_network(&network).await {
            Ok(()) | Err(RuntimeError::NotFound(_)) => {}
            Err(err) => return Err(err.into()),
        }
        self.broadcaster().publish(&StatusMessage::changed(stack_name.to_string(), None));
        Ok(())
    }

    /// Rename guard plus rename: refused while live containers exist
    /// under the old name.
    pub async fn rename_stack(
        &self,
        stack_name: &str,
        new_name: &str,
    ) -> Result<devarch_store::Stack, EngineError> {
        let stack = self.store().get_stack(stack_name).await?;
        let live = self
            .runtime()
            .list_containers(&ContainerFilter::stack(stack_name))
            .await?;
        if !live.is_empty() {
            return Err(EngineError::Validation(format!(
                "stack {stack_name} has {} live containers; stop and remove them before renaming",
                live.len()
            )));
        }
        Ok(self
            .store()
            .rename_stack(stack.stack_id(), new_name, stack.row_version)
            .await?)
    }

    /// Render the resolved stack as a compose-style document.
    pub async fn render_compose(&self, stack_name: &str) -> Result<String, EngineError> {
        let stack = self.store().get_stack(stack_name).await?;
        let resolved = self.store().effective_configs_for_stack(stack.stack_id()).await?;
        let services: Vec<(String, devarch_core::EffectiveSpec)> = resolved
            .into_iter()
            .map(|r| (r.instance.container_name.clone(), r.effective))
            .collect();
        devarch_core::compose::render_stack(&stack.network(), &services)
            .map_err(|e| EngineError::Validation(format!("compose rendering failed: {e}")))
    }

    /// Counts, per-category rollup, and runtime identity.
    pub async fn status(&self) -> Result<StatusReport, EngineError> {
        let stacks = self.store().list_stacks().await?;
        let mut instances = 0usize;
        for stack in &stacks {
            instances += self.store().list_instances(stack.stack_id()).await?.len();
        }
        let running = self
            .runtime()
            .list_containers(&ContainerFilter::managed())
            .await?
            .iter()
            .filter(|c| c.status.is_running())
            .count();
        let rollup = self.store().category_rollup().await?;
        let info: RuntimeInfo = self.runtime().info().await?;

        Ok(StatusReport {
            stacks: stacks.len(),
            instances,
            running_containers: running,
            categories: rollup.into_iter().map(CategoryReport::from).collect(),
            runtime: RuntimeIdentity {
                name: info.name,
                version: info.version,
                operating_system: info.operating_system,
            },
        })
    }
}

impl From<CategoryRollup> for CategoryReport {
    fn from(rollup: CategoryRollup) -> Self {
        Self {
            name: rollup.name,
            display_name: rollup.display_name,
            startup_order: rollup.startup_order,
            services: rollup.services,
            enabled_services: rollup.enabled_services,
        }
    }
}

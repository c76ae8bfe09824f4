// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plan computation: desired state vs live runtime state.

mod diff;
mod order;
mod state_hash;
mod validate;

pub(crate) use diff::{diff, DesiredInstance, LiveContainer};
pub(crate) use order::{order_actions, topo_order};
pub(crate) use state_hash::{state_hash, StateHashEntry};
pub(crate) use validate::validate_stack;

use std::collections::HashMap;

use devarch_core::{Clock, InstanceId, StackId};
use devarch_runtime::ContainerFilter;
use devarch_store::ResolvedInstance;
use serde::Serialize;
use uuid::Uuid;

use crate::error::EngineError;
use crate::plan_store::PLAN_TTL;
use crate::Reconciler;

/// What Apply will do for one instance or orphan container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActionKind {
    Create,
    Recreate,
    Update,
    Noop,
    Delete,
}

impl ActionKind {
    pub fn is_executed(self) -> bool {
        !matches!(self, ActionKind::Noop)
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ActionKind::Create => "CREATE",
            ActionKind::Recreate => "RECREATE",
            ActionKind::Update => "UPDATE",
            ActionKind::Noop => "NOOP",
            ActionKind::Delete => "DELETE",
        };
        f.write_str(s)
    }
}

/// One ordered plan entry.
#[derive(Debug, Clone, Serialize)]
pub struct PlanAction {
    pub kind: ActionKind,
    /// Desired instance this action reconciles; `None` for orphan
    /// containers being deleted.
    #[serde(skip)]
    pub instance_pk: Option<InstanceId>,
    /// Instance slug, or the container name for orphans.
    pub instance: String,
    pub container_name: String,
    /// Live container id, when one exists.
    pub container_id: Option<String>,
    /// Target spec hash for create-side actions.
    pub spec_hash: Option<String>,
    pub reason: String,
}

/// An issued plan, bound to the state it was computed from.
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub token: Uuid,
    #[serde(skip)]
    pub stack_id: StackId,
    pub stack_name: String,
    pub state_hash: String,
    pub actions: Vec<PlanAction>,
    pub expires_at_ms: u64,
}

impl Plan {
    /// Actions Apply will actually execute (everything but NOOP).
    pub fn executable(&self) -> impl Iterator<Item = &PlanAction> {
        self.actions.iter().filter(|a| a.kind.is_executed())
    }

    pub fn is_empty(&self) -> bool {
        self.executable().count() == 0
    }
}

impl<C: Clock> Reconciler<C> {
    /// Compute a plan for a stack and issue a token for it.
    pub async fn plan(&self, stack_name: &str) -> Result<Plan, EngineError> {
        let stack = self.store().get_stack(stack_name).await?;
        let snapshot = self.world_snapshot(&stack).await?;

        validate_stack(&snapshot.desired)?;
        self.validate_cross_stack_ports(&stack, &snapshot.desired).await?;

        let actions = diff(
            &snapshot.desired,
            &snapshot.live,
            self.runtime().supports_in_place_update(),
        );
        let deps: HashMap<String, Vec<devarch_core::Dependency>> = snapshot
            .desired
            .iter()
            .map(|d| (d.slug.clone(), d.spec.dependencies.clone()))
            .collect();
        let actions = order_actions(actions, &deps)?;

        let plan = Plan {
            token: Uuid::new_v4(),
            stack_id: stack.stack_id(),
            stack_name: stack.name.clone(),
            state_hash: snapshot.hash,
            actions,
            expires_at_ms: self.clock.epoch_ms() + PLAN_TTL.as_millis() as u64,
        };
        self.plans.insert(plan.clone());
        tracing::info!(
            stack = %stack.name,
            token = %plan.token,
            actions = plan.actions.len(),
            executable = plan.executable().count(),
            "plan issued"
        );
        Ok(plan)
    }

    /// Desired and live state plus the state hash binding them.
    pub(crate) async fn world_snapshot(
        &self,
        stack: &devarch_store::Stack,
    ) -> Result<WorldSnapshot, EngineError> {
        // A disabled stack has no desired containers; planning it
        // proposes teardown of whatever is still live.
        let resolved = if stack.enabled {
            self.store().effective_configs_for_stack(stack.stack_id()).await?
        } else {
            Vec::new()
        };
        let desired: Vec<DesiredInstance> = resolved.into_iter().map(DesiredInstance::from).collect();

        let live_rows = self
            .runtime()
            .list_containers(&ContainerFilter::stack(&stack.name))
            .await?;
        let live: Vec<LiveContainer> = live_rows.into_iter().map(LiveContainer::from).collect();

        let hash = state_hash(&hash_entries(&desired, &live));
        Ok(WorldSnapshot { desired, live, hash })
    }

    async fn validate_cross_stack_ports(
        &self,
        stack: &devarch_store::Stack,
        desired: &[DesiredInstance],
    ) -> Result<(), EngineError> {
        let host_ports: Vec<i32> = desired
            .iter()
            .flat_map(|d| d.spec.host_ports().map(|(_, port)| i32::from(port)))
            .collect();
        let conflicts = self
            .store()
            .host_port_conflicts(stack.stack_id(), &host_ports)
            .await?;
        if let Some((other_stack, other_instance, port)) = conflicts.first() {
            return Err(EngineError::Validation(format!(
                "host port {port} is already bound by instance {other_instance} of stack {other_stack}"
            )));
        }
        Ok(())
    }
}

pub(crate) struct WorldSnapshot {
    pub desired: Vec<DesiredInstance>,
    pub live: Vec<LiveContainer>,
    pub hash: String,
}

/// State-hash entries: every desired instance with its observed runtime
/// state, plus orphan live containers.
pub(crate) fn hash_entries(
    desired: &[DesiredInstance],
    live: &[LiveContainer],
) -> Vec<StateHashEntry> {
    let mut entries: Vec<StateHashEntry> = desired
        .iter()
        .map(|d| {
            let observed = live
                .iter()
                .find(|l| l.matches(&d.slug, &d.container_name));
            StateHashEntry {
                instance: d.slug.clone(),
                runtime_state: observed
                    .map(|l| format!("{}:{}", l.status, l.spec_hash.as_deref().unwrap_or("")))
                    .unwrap_or_else(|| "absent".to_string()),
                target_hash: d.spec_hash.clone(),
            }
        })
        .collect();

    for orphan in live.iter().filter(|l| {
        !desired.iter().any(|d| l.matches(&d.slug, &d.container_name))
    }) {
        entries.push(StateHashEntry {
            instance: orphan.name.clone(),
            runtime_state: orphan.status.to_string(),
            target_hash: "-".to_string(),
        });
    }

    entries
}

impl From<ResolvedInstance> for DesiredInstance {
    fn from(resolved: ResolvedInstance) -> Self {
        DesiredInstance {
            instance_pk: resolved.instance.instance_pk(),
            slug: resolved.instance.instance_id.clone(),
            container_name: resolved.instance.container_name.clone(),
            spec: resolved.effective,
            spec_hash: resolved.spec_hash,
        }
    }
}

impl From<devarch_runtime::ContainerSummary> for LiveContainer {
    fn from(summary: devarch_runtime::ContainerSummary) -> Self {
        let identity = devarch_core::labels::parse_managed_labels(&summary.labels);
        LiveContainer {
            id: summary.id,
            name: summary.name,
            slug: identity.as_ref().map(|i| i.instance_slug.clone()),
            spec_hash: identity.and_then(|i| i.spec_hash),
            status: summary.status,
            image: summary.image,
        }
    }
}

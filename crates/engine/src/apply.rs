// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plan execution under per-stack mutual exclusion.
//!
//! Forward-reconciling: a fatal error halts execution, completed work
//! stays in place, and re-planning proposes the residual actions. No
//! automatic rollback.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use devarch_core::{labels, Clock, StackId};
use devarch_runtime::{
    with_backoff, ContainerDetails, CreateRequest, RemoveOptions, RetryPolicy, RuntimeError,
    StopOptions,
};
use devarch_store::{AdvisoryLock, ContainerStateRow, Stack};
use serde::Serialize;
use uuid::Uuid;

use crate::error::EngineError;
use crate::health::{wait_healthy, HEALTH_WAIT};
use crate::plan::{ActionKind, DesiredInstance, Plan, PlanAction};
use crate::{ops, StatusMessage};
use crate::{Reconciler, LOCK_WAIT};

const LOCK_POLL: Duration = Duration::from_millis(500);

/// Structured outcome of one Apply, success or not.
#[derive(Debug, Clone, Serialize)]
pub struct ApplyResult {
    pub ok: bool,
    /// Instances reconciled, in execution order.
    pub completed: Vec<String>,
    /// Instance whose action halted execution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<C: Clock> Reconciler<C> {
    /// Execute a previously issued plan.
    ///
    /// Rejections before any action runs: unknown or expired token, a
    /// state hash that no longer matches the world (stale plan), or
    /// lock contention past the wait budget (busy).
    pub async fn apply(&self, stack_name: &str, token: Uuid) -> Result<ApplyResult, EngineError> {
        let stack = self.store().get_stack(stack_name).await?;
        let plan = self.plans.get(token)?;
        if plan.stack_id != stack.stack_id() {
            return Err(EngineError::PlanUnknown);
        }

        // Re-fingerprint the world exactly as Plan did; any mutation in
        // between (operator edit, status-sync observation of a state
        // change) rejects the plan before anything executes.
        let snapshot = self.world_snapshot(&stack).await?;
        if snapshot.hash != plan.state_hash {
            tracing::info!(stack = %stack.name, token = %token, "rejecting stale plan");
            return Err(EngineError::StalePlan);
        }

        let lock = self.acquire_stack_lock(stack.stack_id()).await?;
        let outcome = self.execute_plan(&stack, &plan, snapshot.desired).await;
        if let Err(err) = lock.release().await {
            tracing::warn!(stack = %stack.name, error = %err, "failed to release stack lock");
        }

        let result = outcome?;
        if result.ok {
            self.plans.invalidate(token);
        }
        tracing::info!(
            stack = %stack.name,
            ok = result.ok,
            completed = result.completed.len(),
            failed_at = result.failed_at.as_deref().unwrap_or("-"),
            "apply finished"
        );
        Ok(result)
    }

    async fn acquire_stack_lock(&self, stack_id: StackId) -> Result<AdvisoryLock, EngineError> {
        let deadline = tokio::time::Instant::now() + LOCK_WAIT;
        loop {
            if let Some(lock) = self.store().try_lock_stack(stack_id).await? {
                return Ok(lock);
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(EngineError::Busy(format!(
                    "another apply holds the lock for stack {stack_id}"
                )));
            }
            tokio::time::sleep(LOCK_POLL).await;
        }
    }

    async fn execute_plan(
        &self,
        stack: &Stack,
        plan: &Plan,
        desired: Vec<DesiredInstance>,
    ) -> Result<ApplyResult, EngineError> {
        let network = stack.network();
        ops::ensure_network(self.runtime(), &network).await?;

        let by_slug: HashMap<&str, &DesiredInstance> =
            desired.iter().map(|d| (d.slug.as_str(), d)).collect();

        let mut completed = Vec::new();
        for action in plan.executable() {
            let attempt = with_backoff(
                RetryPolicy::apply_action(),
                |e: &EngineError| e.kind().is_retryable(),
                || self.run_action(stack, &network, action, &by_slug),
            )
            .await;

            match attempt {
                Ok(()) => completed.push(action.instance.clone()),
                Err(err) => {
                    tracing::error!(
                        stack = %stack.name,
                        instance = %action.instance,
                        kind = %action.kind,
                        error = %err,
                        "apply halted"
                    );
                    return Ok(ApplyResult {
                        ok: false,
                        completed,
                        failed_at: Some(action.instance.clone()),
                        error: Some(err.to_string()),
                    });
                }
            }
        }

        Ok(ApplyResult { ok: true, completed, failed_at: None, error: None })
    }

    async fn run_action(
        &self,
        stack: &Stack,
        network: &str,
        action: &PlanAction,
        desired: &HashMap<&str, &DesiredInstance>,
    ) -> Result<(), EngineError> {
        tracing::debug!(
            stack = %stack.name,
            instance = %action.instance,
            kind = %action.kind,
            reason = %action.reason,
            "executing action"
        );
        match action.kind {
            ActionKind::Delete => self.delete_container(stack, action).await,
            ActionKind::Create => {
                let want = desired
                    .get(action.instance.as_str())
                    .ok_or_else(|| EngineError::Validation(format!(
                        "plan action references unknown instance {}",
                        action.instance
                    )))?;
                self.create_and_start(stack, network, want).await
            }
            // The runtime adapter never supports in-place update, so
            // UPDATE executes as RECREATE; the diff already demoted the
            // kind unless the capability bit was set.
            ActionKind::Recreate | ActionKind::Update => {
                let want = desired
                    .get(action.instance.as_str())
                    .ok_or_else(|| EngineError::Validation(format!(
                        "plan action references unknown instance {}",
                        action.instance
                    )))?;
                self.delete_container(stack, action).await?;
                self.create_and_start(stack, network, want).await
            }
            ActionKind::Noop => Ok(()),
        }
    }

    /// Stop (grace, then kill) and remove. NotFound at any step is
    /// idempotent success: the desired end state is absence.
    async fn delete_container(&self, stack: &Stack, action: &PlanAction) -> Result<(), EngineError> {
        let target = action
            .container_id
            .clone()
            .unwrap_or_else(|| action.container_name.clone());

        match self.runtime().stop_container(&target, &StopOptions::default()).await {
            Ok(()) | Err(RuntimeError::NotFound(_)) => {}
            Err(err) => return Err(err.into()),
        }
        match self
            .runtime()
            .remove_container(&target, &RemoveOptions { force: true, remove_volumes: false })
            .await
        {
            Ok(()) | Err(RuntimeError::NotFound(_)) => {}
            Err(err) => return Err(err.into()),
        }

        if let Some(instance_pk) = action.instance_pk {
            self.store().delete_container_state(instance_pk).await?;
        }
        self.broadcaster()
            .publish(&StatusMessage::changed(stack.name.clone(), Some(action.instance.clone())));
        Ok(())
    }

    async fn create_and_start(
        &self,
        stack: &Stack,
        network: &str,
        want: &DesiredInstance,
    ) -> Result<(), EngineError> {
        let request = CreateRequest {
            name: want.container_name.clone(),
            spec: want.spec.clone(),
            extra_labels: labels::managed_labels(&stack.name, &want.slug, &want.spec_hash),
            network: network.to_string(),
            network_alias: Some(want.slug.clone()),
        };
        let id = match self.runtime().create_container(&request).await {
            Ok(id) => id,
            Err(RuntimeError::Conflict(_)) => {
                // A previous attempt left a container under this name;
                // replace it so create stays retryable.
                let _ = self
                    .runtime()
                    .remove_container(
                        &request.name,
                        &RemoveOptions { force: true, remove_volumes: false },
                    )
                    .await;
                self.runtime().create_container(&request).await?
            }
            Err(err) => return Err(err.into()),
        };
        self.record_progress(want, &id, "created").await?;

        // Health-gated edges: the dependency must pass its probe before
        // this dependent starts.
        for dep in &want.spec.dependencies {
            if dep.condition == devarch_core::DependsCondition::ServiceHealthy {
                let dep_name = devarch_core::container_name(&stack.name, &dep.depends_on)
                    .map_err(|e| EngineError::Validation(e.to_string()))?;
                wait_healthy(self.runtime(), &dep_name, HEALTH_WAIT).await?;
            }
        }

        self.runtime().start_container(&id).await?;
        let details = self.runtime().inspect_after_create(&id).await?;
        self.record_started(want, &details).await?;
        self.broadcaster()
            .publish(&StatusMessage::changed(stack.name.clone(), Some(want.slug.clone())));
        Ok(())
    }

    /// Authoritative progress write after container creation.
    async fn record_progress(
        &self,
        want: &DesiredInstance,
        container_id: &str,
        status: &str,
    ) -> Result<(), EngineError> {
        self.store()
            .upsert_container_state(&ContainerStateRow {
                service_instance_id: want.instance_pk.as_i64(),
                container_id: Some(container_id.to_string()),
                status: status.to_string(),
                health_status: None,
                restart_count: 0,
                started_at: None,
                finished_at: None,
                exit_code: None,
                error: None,
                updated_at: Utc::now(),
            })
            .await?;
        Ok(())
    }

    async fn record_started(
        &self,
        want: &DesiredInstance,
        details: &ContainerDetails,
    ) -> Result<(), EngineError> {
        self.store()
            .upsert_container_state(&ContainerStateRow {
                service_instance_id: want.instance_pk.as_i64(),
                container_id: Some(details.id.clone()),
                status: details.status.as_str().to_string(),
                health_status: Some(details.health.as_str().to_string()),
                restart_count: details.restart_count,
                started_at: details.started_at,
                finished_at: details.finished_at,
                exit_code: details.exit_code,
                error: details.error.clone(),
                updated_at: Utc::now(),
            })
            .await?;
        Ok(())
    }
}

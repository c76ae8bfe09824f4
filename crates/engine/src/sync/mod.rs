// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status sync: the background supervisor keeping the state cache and
//! metrics aligned with the runtime.
//!
//! One supervisor owns a poll loop, an event tail, and the daily
//! retention task, all under a shared cancelation token. State-cache
//! writes are serialized per service by an in-process mutex so a later
//! wall-clock observation always wins; the database's monotonic
//! `updated_at` guard backs that up across processes.

mod events;
mod poll;
mod retention;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use devarch_core::InstanceId;
use devarch_runtime::{ContainerDetails, ContainerFilter, ContainerRuntime};
use devarch_store::{ContainerStateRow, Store};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::broadcast::{Broadcaster, StatusMessage};
use crate::error::EngineError;

/// Poll cadence for the list/stats tick.
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Background status synchronizer.
pub struct StatusSync {
    store: Store,
    runtime: Arc<dyn ContainerRuntime>,
    broadcaster: Broadcaster,
    poll_interval: Duration,
    per_service: Mutex<HashMap<i64, Arc<tokio::sync::Mutex<()>>>>,
}

impl StatusSync {
    pub fn new(store: Store, runtime: Arc<dyn ContainerRuntime>, broadcaster: Broadcaster) -> Self {
        Self {
            store,
            runtime,
            broadcaster,
            poll_interval: POLL_INTERVAL,
            per_service: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Run until canceled. Owns the poll loop, event tail, and
    /// retention task.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        if let Err(err) = self.startup_reconcile().await {
            tracing::warn!(error = %err, "startup reconcile failed");
        }

        let poll = tokio::spawn(self.clone().poll_loop(cancel.clone()));
        let events = tokio::spawn(self.clone().event_loop(cancel.clone()));
        let retention = tokio::spawn(self.clone().retention_loop(cancel.clone()));
        let _ = tokio::join!(poll, events, retention);
        tracing::info!("status sync stopped");
    }

    /// First tick: reconcile the cache to the live truth, removing
    /// stale rows for containers that no longer exist.
    async fn startup_reconcile(&self) -> Result<(), EngineError> {
        let containers = self.runtime.list_containers(&ContainerFilter::managed()).await?;
        let mut live_instances = Vec::new();
        for summary in &containers {
            if let Some(identity) = devarch_core::labels::parse_managed_labels(&summary.labels) {
                if let Some(pk) = self
                    .store
                    .resolve_instance(&identity.stack_name, &identity.instance_slug)
                    .await?
                {
                    live_instances.push(pk.as_i64());
                }
            }
        }
        let pruned = self.store.prune_container_states(&live_instances).await?;
        if pruned > 0 {
            tracing::info!(pruned, "removed stale state cache rows");
            self.broadcaster.publish(&StatusMessage::global());
        }
        Ok(())
    }

    /// Serialize state-cache writes per service.
    async fn service_guard(&self, pk: InstanceId) -> tokio::sync::OwnedMutexGuard<()> {
        let mutex = {
            let mut map = self.per_service.lock();
            map.entry(pk.as_i64())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };
        mutex.lock_owned().await
    }

    /// Upsert the cache from inspected details and publish when the
    /// observable status changed.
    async fn refresh_instance(
        &self,
        stack_name: &str,
        slug: &str,
        pk: InstanceId,
        details: &ContainerDetails,
    ) -> Result<(), EngineError> {
        let _guard = self.service_guard(pk).await;

        let previous = self.store.get_container_state(pk).await?;
        let row = ContainerStateRow {
            service_instance_id: pk.as_i64(),
            container_id: Some(details.id.clone()),
            status: details.status.as_str().to_string(),
            health_status: Some(details.health.as_str().to_string()),
            restart_count: details.restart_count,
            started_at: details.started_at,
            finished_at: details.finished_at,
            exit_code: details.exit_code,
            error: details.error.clone(),
            updated_at: Utc::now(),
        };
        self.store.upsert_container_state(&row).await?;

        let changed = previous
            .map(|p| p.status != row.status || p.health_status != row.health_status)
            .unwrap_or(true);
        if changed {
            self.broadcaster
                .publish(&StatusMessage::changed(stack_name.to_string(), Some(slug.to_string())));
        }
        Ok(())
    }
}

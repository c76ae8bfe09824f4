// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: startup wiring, supervised workers, graceful
//! shutdown.

use std::sync::Arc;

use devarch_engine::sync::StatusSync;
use devarch_engine::{Broadcaster, Reconciler};
use devarch_runtime::{ContainerRuntime, OciRuntime, RuntimeError};
use devarch_store::{Store, StoreError};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::env;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("DATABASE_URL is not set")]
    MissingDatabaseUrl,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// A wired control plane with its background workers running.
pub struct Daemon {
    pub reconciler: Reconciler,
    pub broadcaster: Broadcaster,
    cancel: CancellationToken,
    sync_task: tokio::task::JoinHandle<()>,
}

impl Daemon {
    /// Connect everything, run migrations, verify runtime liveness, and
    /// start the status sync supervisor.
    pub async fn start() -> Result<Self, LifecycleError> {
        let store = Store::connect(&env::database_url()?).await?;
        store.migrate().await?;

        let runtime: Arc<dyn ContainerRuntime> = Arc::new(OciRuntime::connect()?);
        runtime.ping().await?;
        let info = runtime.info().await?;
        tracing::info!(
            runtime = %info.name,
            version = %info.version,
            containers = info.containers,
            "runtime connected"
        );

        let broadcaster = Broadcaster::new();
        let reconciler = Reconciler::new(store.clone(), runtime.clone(), broadcaster.clone());

        let mut sync = StatusSync::new(store, runtime, broadcaster.clone());
        if let Some(interval) = env::poll_interval() {
            sync = sync.with_poll_interval(interval);
        }

        let cancel = CancellationToken::new();
        let sync_task = tokio::spawn(Arc::new(sync).run(cancel.clone()));

        Ok(Self { reconciler, broadcaster, cancel, sync_task })
    }

    /// Cancel the workers and join them within the drain timeout.
    pub async fn shutdown(self) {
        tracing::info!("shutting down");
        self.cancel.cancel();
        if tokio::time::timeout(env::drain_timeout(), self.sync_task).await.is_err() {
            tracing::warn!("status sync did not stop within the drain timeout");
        }
        self.broadcaster.shutdown();
    }
}

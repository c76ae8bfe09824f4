// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduled poll loop: refresh every managed container's cached state
//! and append one metrics sample per running container.

use std::sync::Arc;

use devarch_runtime::ContainerFilter;
use devarch_store::MetricsSample;
use tokio_util::sync::CancellationToken;

use super::StatusSync;
use crate::error::EngineError;

impl StatusSync {
    pub(super) async fn poll_loop(self: Arc<Self>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.poll_interval) => {
                    if let Err(err) = self.poll_tick().await {
                        tracing::warn!(error = %err, "status poll tick failed");
                    }
                }
            }
        }
    }

    pub(super) async fn poll_tick(&self) -> Result<(), EngineError> {
        let containers = self.runtime.list_containers(&ContainerFilter::managed()).await?;

        for summary in containers {
            let Some(identity) = devarch_core::labels::parse_managed_labels(&summary.labels) else {
                continue;
            };
            let Some(pk) = self
                .store
                .resolve_instance(&identity.stack_name, &identity.instance_slug)
                .await?
            else {
                // Label points at a deleted instance; apply will reap it.
                continue;
            };

            let details = match self.runtime.inspect_container(&summary.id).await {
                Ok(details) => details,
                Err(err) if err.is_not_found() => continue, // raced a removal
                Err(err) => return Err(err.into()),
            };

            self.refresh_instance(&identity.stack_name, &identity.instance_slug, pk, &details)
                .await?;

            if details.status.is_running() {
                if let Err(err) = self.sample_metrics(pk, &summary.id).await {
                    tracing::debug!(container = %summary.name, error = %err, "stats sample failed");
                }
            }
        }
        Ok(())
    }

    async fn sample_metrics(
        &self,
        pk: devarch_core::InstanceId,
        container_id: &str,
    ) -> Result<(), EngineError> {
        if let Some(sample) = self.runtime.stats_once(container_id).await? {
            self.store
                .append_metrics(
                    pk,
                    &MetricsSample {
                        cpu_pct: sample.cpu_pct,
                        mem_used_mb: sample.mem_used_mb,
                        mem_limit_mb: sample.mem_limit_mb,
                        net_rx: sample.net_rx,
                        net_tx: sample.net_tx,
                    },
                )
                .await?;
        }
        Ok(())
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Health-gated dependency waits during Apply.

use std::sync::Arc;
use std::time::Duration;

use devarch_core::HealthState;
use devarch_runtime::ContainerRuntime;

use crate::error::EngineError;

/// Overall budget for one `service_healthy` dependency edge.
pub const HEALTH_WAIT: Duration = Duration::from_secs(60);

const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Poll until the container's health probe passes. Containers without a
/// probe count as healthy once running. Exceeding the budget is Fatal
/// to the apply.
pub async fn wait_healthy(
    runtime: &Arc<dyn ContainerRuntime>,
    container_name: &str,
    timeout: Duration,
) -> Result<(), EngineError> {
    let wait = async {
        loop {
            let details = runtime.inspect_container(container_name).await?;
            match details.health {
                HealthState::Healthy => return Ok(()),
                HealthState::None if details.status.is_running() => return Ok(()),
                state => {
                    tracing::debug!(container = %container_name, health = %state, "waiting for health");
                }
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    };

    match tokio::time::timeout(timeout, wait).await {
        Ok(result) => result,
        Err(_) => Err(EngineError::HealthTimeout {
            container: container_name.to_string(),
            timeout,
        }),
    }
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod tests;

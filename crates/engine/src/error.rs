// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine errors, classified into the shared taxonomy.

use devarch_core::ErrorKind;
use devarch_runtime::RuntimeError;
use devarch_store::StoreError;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("cyclic dependencies among instances: {}", .0.join(" -> "))]
    CyclicDependencies(Vec<String>),

    #[error("unknown plan token")]
    PlanUnknown,

    #[error("plan expired; re-plan and retry")]
    PlanExpired,

    #[error("stale plan: state changed since it was computed")]
    StalePlan,

    #[error("busy: {0}")]
    Busy(String),

    #[error("container {container} not healthy within {timeout:?}")]
    HealthTimeout { container: String, timeout: Duration },
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Store(err) => err.kind(),
            EngineError::Runtime(err) => err.kind(),
            EngineError::Validation(_) | EngineError::CyclicDependencies(_) => {
                ErrorKind::ValidationFailed
            }
            EngineError::PlanUnknown => ErrorKind::NotFound,
            EngineError::PlanExpired | EngineError::StalePlan => ErrorKind::Conflict,
            EngineError::Busy(_) => ErrorKind::Busy,
            EngineError::HealthTimeout { .. } => ErrorKind::Fatal,
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;

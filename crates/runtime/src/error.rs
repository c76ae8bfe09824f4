// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime adapter errors and their classification.

use devarch_core::ErrorKind;
use thiserror::Error;

/// Errors from container runtime operations.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("no container runtime socket found (set CONTAINER_HOST or start the runtime)")]
    SocketNotFound,

    #[error("runtime unreachable: {0}")]
    Unavailable(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("transient runtime error: {0}")]
    Transient(String),

    #[error("runtime error: {0}")]
    Fatal(String),

    #[error("operation timed out after {0:?}")]
    Deadline(std::time::Duration),
}

impl RuntimeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RuntimeError::SocketNotFound | RuntimeError::Unavailable(_) => {
                ErrorKind::RuntimeUnavailable
            }
            RuntimeError::NotFound(_) => ErrorKind::NotFound,
            RuntimeError::Conflict(_) => ErrorKind::Conflict,
            RuntimeError::Unauthorized(_) => ErrorKind::Fatal,
            RuntimeError::Transient(_) | RuntimeError::Deadline(_) => ErrorKind::Transient,
            RuntimeError::Fatal(_) => ErrorKind::Fatal,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RuntimeError::NotFound(_))
    }

    /// Errors worth retrying in general.
    pub fn is_transient(&self) -> bool {
        self.kind().is_retryable()
    }

    /// Inspect-after-create treats NotFound as transient: the runtime has
    /// an eventual-consistency window before a new container is visible.
    pub fn retryable_after_create(&self) -> bool {
        self.is_transient() || self.is_not_found()
    }
}

impl From<bollard::errors::Error> for RuntimeError {
    fn from(err: bollard::errors::Error) -> Self {
        match err {
            bollard::errors::Error::DockerResponseServerError { status_code, message } => {
                classify_status(status_code, message)
            }
            bollard::errors::Error::RequestTimeoutError => {
                RuntimeError::Transient("request timed out".to_string())
            }
            other => RuntimeError::Unavailable(other.to_string()),
        }
    }
}

/// Map an HTTP status from the runtime API to a typed error.
pub(crate) fn classify_status(status_code: u16, message: String) -> RuntimeError {
    match status_code {
        404 => RuntimeError::NotFound(message),
        409 => RuntimeError::Conflict(message),
        401 | 403 => RuntimeError::Unauthorized(message),
        500..=599 => RuntimeError::Transient(message),
        _ => RuntimeError::Fatal(message),
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;

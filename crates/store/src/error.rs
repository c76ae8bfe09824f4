// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store errors and sqlx error bridging.

use devarch_core::ErrorKind;
use thiserror::Error;

/// Errors from desired-state store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid reference: {0}")]
    InvalidReference(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::NotFound(_) => ErrorKind::NotFound,
            StoreError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            StoreError::InvalidReference(_) => ErrorKind::InvalidReference,
            StoreError::Conflict(_) => ErrorKind::Conflict,
            StoreError::Validation(_) => ErrorKind::ValidationFailed,
            StoreError::Database(_) => ErrorKind::Fatal,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

impl From<devarch_core::NameError> for StoreError {
    fn from(err: devarch_core::NameError) -> Self {
        StoreError::Validation(err.to_string())
    }
}

/// Classify database errors from constraint violations.
///
/// PostgreSQL error codes: 23505 unique violation, 23503 foreign key
/// violation.
pub(crate) trait SqlxResultExt<T> {
    fn map_store(self, what: &str) -> Result<T, StoreError>;
}

impl<T> SqlxResultExt<T> for Result<T, sqlx::Error> {
    fn map_store(self, what: &str) -> Result<T, StoreError> {
        self.map_err(|err| classify(err, what))
    }
}

pub(crate) fn classify(err: sqlx::Error, what: &str) -> StoreError {
    match &err {
        sqlx::Error::RowNotFound => StoreError::NotFound(what.to_string()),
        sqlx::Error::Database(db) => match db.code().as_deref() {
            Some("23505") => StoreError::AlreadyExists(what.to_string()),
            Some("23503") => StoreError::InvalidReference(what.to_string()),
            _ => StoreError::Database(err),
        },
        _ => StoreError::Database(err),
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session-scoped advisory locks.
//!
//! Advisory locks are per-connection in PostgreSQL, so a lock pins a
//! dedicated pooled connection for its lifetime. Key strings are hashed
//! server-side with `hashtext`, namespaced to avoid collisions with
//! other subsystems.

use devarch_core::StackId;
use sqlx::pool::PoolConnection;
use sqlx::{Connection, Postgres};

use crate::error::StoreError;
use crate::Store;

/// A held advisory lock. Release it explicitly with [`AdvisoryLock::release`];
/// dropping it instead closes the pinned connection so the server frees
/// the lock rather than returning a poisoned connection to the pool.
pub struct AdvisoryLock {
    conn: Option<PoolConnection<Postgres>>,
    key: String,
}

impl AdvisoryLock {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub async fn release(mut self) -> Result<(), StoreError> {
        if let Some(mut conn) = self.conn.take() {
            sqlx::query("SELECT pg_advisory_unlock(hashtext($1))")
                .bind(&self.key)
                .execute(&mut *conn)
                .await?;
        }
        Ok(())
    }
}

impl Drop for AdvisoryLock {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            let key = self.key.clone();
            tracing::warn!(%key, "advisory lock dropped without release; closing connection");
            let pg = conn.detach();
            tokio::spawn(async move {
                let _ = pg.close().await;
            });
        }
    }
}

impl Store {
    /// Try to take the advisory lock for a key. Returns `None` when
    /// another session holds it.
    pub async fn try_advisory_lock(&self, key: &str) -> Result<Option<AdvisoryLock>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let (locked,): (bool,) = sqlx::query_as("SELECT pg_try_advisory_lock(hashtext($1))")
            .bind(key)
            .fetch_one(&mut *conn)
            .await?;
        if locked {
            Ok(Some(AdvisoryLock { conn: Some(conn), key: key.to_string() }))
        } else {
            Ok(None)
        }
    }

    /// Apply's per-stack mutual exclusion lock.
    pub async fn try_lock_stack(&self, stack_id: StackId) -> Result<Option<AdvisoryLock>, StoreError> {
        self.try_advisory_lock(&stack_lock_key(stack_id)).await
    }
}

/// Advisory-lock key namespace for stacks.
pub fn stack_lock_key(stack_id: StackId) -> String {
    format!("stack:{stack_id}")
}

#[cfg(test)]
#[path = "locks_tests.rs"]
mod tests;

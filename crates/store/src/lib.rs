// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! devarch-store: typed accessor over the PostgreSQL desired-state model.
//!
//! Thin data layer: every multi-row edit runs in a transaction, soft
//! deletes coordinate with partial unique indexes so names are reusable
//! immediately, and any template or overlay change appends a config
//! version row snapshotting the effective spec.

mod categories;
mod effective;
mod error;
mod instances;
mod locks;
mod metrics;
mod overlays;
mod stacks;
mod state_cache;
mod sync_state;
mod templates;
mod versions;

pub use categories::{Category, CategoryRollup, NewCategory};
pub use effective::ResolvedInstance;
pub use error::StoreError;
pub use instances::{InstanceOverrides, NewInstance, ServiceInstance};
pub use locks::{stack_lock_key, AdvisoryLock};
pub use metrics::{MetricsRow, MetricsSample};
pub use overlays::OverlayRow;
pub use stacks::{NewStack, Stack, StackUpdate};
pub use state_cache::ContainerStateRow;
pub use sync_state::LAST_DAILY_CLEANUP;
pub use templates::{NewTemplate, TemplateService};
pub use versions::ConfigVersion;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

/// Embedded schema migrations, applied at startup.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Handle to the desired-state database. Cheap to clone.
#[derive(Clone)]
pub struct Store {
    pool: PgPool,
}

impl Store {
    /// Connect with a bounded pool.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply pending schema migrations.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(sqlx::Error::Migrate(Box::new(e))))?;
        tracing::info!("database schema up to date");
        Ok(())
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! devarch-engine: the reconciliation core.
//!
//! [`Reconciler`] computes deterministic plans (diff of desired vs live
//! state, dependency-ordered, bound to a state hash and a short-lived
//! token) and applies them under per-stack mutual exclusion with
//! partial-failure recovery. [`sync::StatusSync`] keeps the state cache
//! and metrics fresh and fans out invalidations through [`Broadcaster`].

mod apply;
mod broadcast;
mod error;
mod health;
mod ops;
mod plan;
mod plan_store;
pub mod sync;

pub use apply::ApplyResult;
pub use broadcast::{Broadcaster, StatusMessage, Subscription, SUBSCRIBER_CAPACITY};
pub use error::EngineError;
pub use ops::{CategoryReport, RuntimeIdentity, StatusReport};
pub use plan::{ActionKind, Plan, PlanAction};
pub use plan_store::{PlanStore, PLAN_TTL};

use std::sync::Arc;
use std::time::Duration;

use devarch_core::{Clock, SystemClock};
use devarch_runtime::ContainerRuntime;
use devarch_store::Store;

/// How long Apply waits for the per-stack advisory lock before giving
/// up with Busy.
pub const LOCK_WAIT: Duration = Duration::from_secs(300);

/// The plan/apply engine, shared by every caller.
#[derive(Clone)]
pub struct Reconciler<C: Clock = SystemClock> {
    store: Store,
    runtime: Arc<dyn ContainerRuntime>,
    plans: Arc<PlanStore<C>>,
    broadcaster: Broadcaster,
    clock: C,
}

impl Reconciler<SystemClock> {
    pub fn new(store: Store, runtime: Arc<dyn ContainerRuntime>, broadcaster: Broadcaster) -> Self {
        Self::with_clock(store, runtime, broadcaster, SystemClock)
    }
}

impl<C: Clock> Reconciler<C> {
    pub fn with_clock(
        store: Store,
        runtime: Arc<dyn ContainerRuntime>,
        broadcaster: Broadcaster,
        clock: C,
    ) -> Self {
        Self {
            store,
            runtime,
            plans: Arc::new(PlanStore::new(clock.clone())),
            broadcaster,
            clock,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn runtime(&self) -> &Arc<dyn ContainerRuntime> {
        &self.runtime
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! devarch-runtime: typed adapter over the local OCI-compatible runtime.
//!
//! The [`ContainerRuntime`] trait is the seam the engine and status sync
//! depend on; [`OciRuntime`] implements it over the runtime's
//! HTTP-over-UNIX-socket API, and [`FakeRuntime`] (behind the
//! `test-support` feature) implements it in memory for tests.

mod client;
mod convert;
mod error;
mod retry;
mod socket;
mod types;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeRuntime, RuntimeCall};

pub use client::OciRuntime;
pub use error::RuntimeError;
pub use retry::{with_backoff, RetryPolicy};
pub use socket::discover_socket;
pub use types::{
    ContainerDetails, ContainerFilter, ContainerSummary, CreateRequest, EventAction, EventFilter,
    LogOptions, NetworkInfo, RemoveOptions, RuntimeEvent, RuntimeInfo, StatsSample, StopOptions,
};

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;

/// Stream of fallible items produced by the runtime.
pub type RuntimeStream<T> = BoxStream<'static, Result<T, RuntimeError>>;

/// Typed operations the control plane needs from a container runtime.
///
/// Unary calls are bounded by the implementation's deadline; streams end
/// when dropped by the consumer.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Liveness probe.
    async fn ping(&self) -> Result<(), RuntimeError>;

    /// Runtime identity (name, version, container count).
    async fn info(&self) -> Result<RuntimeInfo, RuntimeError>;

    async fn list_containers(
        &self,
        filter: &ContainerFilter,
    ) -> Result<Vec<ContainerSummary>, RuntimeError>;

    async fn inspect_container(&self, id: &str) -> Result<ContainerDetails, RuntimeError>;

    /// Create a container and return its runtime id.
    async fn create_container(&self, req: &CreateRequest) -> Result<String, RuntimeError>;

    async fn start_container(&self, id: &str) -> Result<(), RuntimeError>;

    async fn stop_container(&self, id: &str, opts: &StopOptions) -> Result<(), RuntimeError>;

    async fn kill_container(&self, id: &str) -> Result<(), RuntimeError>;

    async fn remove_container(&self, id: &str, opts: &RemoveOptions) -> Result<(), RuntimeError>;

    async fn create_network(&self, name: &str, driver: &str) -> Result<(), RuntimeError>;

    async fn inspect_network(&self, name: &str) -> Result<NetworkInfo, RuntimeError>;

    async fn remove_network(&self, name: &str) -> Result<(), RuntimeError>;

    /// One decoded stats sample per tick until the consumer drops the stream.
    async fn stats(&self, id: &str) -> Result<RuntimeStream<StatsSample>, RuntimeError>;

    /// Server-pushed runtime events matching the filter.
    async fn events(&self, filter: &EventFilter) -> Result<RuntimeStream<RuntimeEvent>, RuntimeError>;

    /// Raw log bytes.
    async fn logs(&self, id: &str, opts: &LogOptions) -> Result<RuntimeStream<Vec<u8>>, RuntimeError>;

    /// Whether mutable-field container updates can be applied in place.
    /// The plan engine demotes UPDATE to RECREATE when false.
    fn supports_in_place_update(&self) -> bool {
        false
    }

    /// Single stats sample, used by the poll loop.
    async fn stats_once(&self, id: &str) -> Result<Option<StatsSample>, RuntimeError> {
        let mut stream = self.stats(id).await?;
        stream.next().await.transpose()
    }

    /// Inspect right after create.
    ///
    /// The runtime has an eventual-consistency window where a freshly
    /// created container is not yet visible; NotFound here is retried as
    /// Transient with bounded backoff.
    async fn inspect_after_create(&self, id: &str) -> Result<ContainerDetails, RuntimeError> {
        let policy = RetryPolicy::create_window();
        let mut delay = policy.initial;
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.inspect_container(id).await {
                Ok(details) => return Ok(details),
                Err(err) if attempt < policy.attempts && err.retryable_after_create() => {
                    tracing::debug!(%id, attempt, error = %err, "inspect after create retrying");
                    tokio::time::sleep(delay).await;
                    delay = policy.next_delay(delay);
                }
                Err(err) => return Err(err),
            }
        }
    }
}

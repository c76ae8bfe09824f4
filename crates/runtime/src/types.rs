// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed request/response shapes for the runtime adapter.

use chrono::{DateTime, Utc};
use devarch_core::{ContainerStatus, EffectiveSpec, HealthState};
use std::collections::HashMap;
use std::time::Duration;

/// Runtime identity reported by `info`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeInfo {
    pub name: String,
    pub version: String,
    pub operating_system: String,
    pub containers: i64,
}

/// Filter for `list_containers`.
#[derive(Debug, Clone, Default)]
pub struct ContainerFilter {
    /// Include stopped containers.
    pub all: bool,
    /// Label filters, `key` or `key=value` form.
    pub labels: Vec<String>,
    /// Keep only containers whose name starts with this prefix.
    pub name_prefix: Option<String>,
}

impl ContainerFilter {
    /// Containers managed by the given stack, running or not.
    pub fn stack(stack_name: &str) -> Self {
        Self {
            all: true,
            labels: vec![format!("{}={}", devarch_core::LABEL_STACK, stack_name)],
            name_prefix: Some(format!("{}-", stack_name)),
        }
    }

    /// All containers managed by this control plane.
    pub fn managed() -> Self {
        Self {
            all: true,
            labels: vec![devarch_core::LABEL_STACK.to_string()],
            name_prefix: None,
        }
    }
}

/// One row from `list_containers`.
#[derive(Debug, Clone, Default)]
pub struct ContainerSummary {
    pub id: String,
    pub name: String,
    pub image: String,
    pub status: ContainerStatus,
    pub status_text: String,
    pub labels: HashMap<String, String>,
}

/// Full container state from `inspect_container`.
#[derive(Debug, Clone, Default)]
pub struct ContainerDetails {
    pub id: String,
    pub name: String,
    pub image: String,
    pub status: ContainerStatus,
    pub health: HealthState,
    pub restart_count: i64,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub exit_code: Option<i64>,
    pub error: Option<String>,
    pub labels: HashMap<String, String>,
    pub env: Vec<String>,
    pub network_mode: Option<String>,
}

/// Everything needed to create one container.
#[derive(Debug, Clone)]
pub struct CreateRequest {
    pub name: String,
    pub spec: EffectiveSpec,
    /// Control-plane identity labels, merged over the spec's own labels.
    pub extra_labels: HashMap<String, String>,
    /// Stack network the container joins.
    pub network: String,
    /// DNS alias on the stack network (the instance slug).
    pub network_alias: Option<String>,
}

/// Graceful-stop options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopOptions {
    /// Grace period before the runtime escalates to SIGKILL.
    pub grace: Duration,
}

impl Default for StopOptions {
    fn default() -> Self {
        Self { grace: Duration::from_secs(10) }
    }
}

/// Removal options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoveOptions {
    pub force: bool,
    pub remove_volumes: bool,
}

/// Filter for the `events` stream.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Label filters, `key` or `key=value` form.
    pub labels: Vec<String>,
}

impl EventFilter {
    pub fn managed() -> Self {
        Self { labels: vec![devarch_core::LABEL_STACK.to_string()] }
    }
}

/// What happened to a container, decoded from the event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventAction {
    Start,
    Die,
    HealthStatus(HealthState),
    Oom,
    Other(String),
}

/// One event from the runtime's event stream.
#[derive(Debug, Clone)]
pub struct RuntimeEvent {
    pub container_id: String,
    pub action: EventAction,
    pub attributes: HashMap<String, String>,
    pub at: Option<DateTime<Utc>>,
}

/// Options for the `logs` byte stream.
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    pub follow: bool,
    pub timestamps: bool,
    /// Only the last N lines when set.
    pub tail: Option<u32>,
}

/// One decoded stats sample.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatsSample {
    pub cpu_pct: f64,
    pub mem_used_mb: f64,
    pub mem_limit_mb: f64,
    pub net_rx: i64,
    pub net_tx: i64,
}

/// Network details from `inspect_network`.
#[derive(Debug, Clone, Default)]
pub struct NetworkInfo {
    pub id: String,
    pub name: String,
    pub driver: String,
    pub labels: HashMap<String, String>,
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Conversions between the adapter's typed shapes and the runtime API's
//! wire models.

use std::collections::HashMap;

use bollard::container::{Config, NetworkingConfig};
use bollard::models::{
    ContainerInspectResponse, ContainerStateStatusEnum, EndpointSettings, EventMessage,
    EventMessageTypeEnum, HealthConfig, HealthStatusEnum, HostConfig,
    PortBinding as ApiPortBinding, RestartPolicy as ApiRestartPolicy, RestartPolicyNameEnum,
};
use chrono::{DateTime, Utc};
use devarch_core::{ContainerStatus, HealthState, RestartPolicy};

use crate::types::{
    ContainerDetails, ContainerSummary, CreateRequest, EventAction, RuntimeEvent, StatsSample,
};

const NANOS_PER_SEC: i64 = 1_000_000_000;
const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Build the runtime's container creation body from a typed request.
pub(crate) fn container_config(req: &CreateRequest) -> Config<String> {
    let spec = &req.spec;

    let mut labels: HashMap<String, String> = spec
        .labels
        .iter()
        .map(|l| (l.key.clone(), l.value.clone()))
        .collect();
    labels.extend(req.extra_labels.clone());

    let env: Vec<String> = spec
        .env_vars
        .iter()
        .map(|e| format!("{}={}", e.key, e.value))
        .collect();

    let mut exposed_ports: HashMap<String, HashMap<(), ()>> = HashMap::new();
    let mut port_bindings: HashMap<String, Option<Vec<ApiPortBinding>>> = HashMap::new();
    for port in &spec.ports {
        let key = format!("{}/{}", port.container_port, port.protocol.as_str());
        exposed_ports.insert(key.clone(), HashMap::new());
        if let Some(host_port) = port.host_port {
            let bindings = port_bindings.entry(key).or_insert_with(|| Some(Vec::new()));
            if let Some(list) = bindings {
                list.push(ApiPortBinding {
                    host_ip: port.host_ip.clone(),
                    host_port: Some(host_port.to_string()),
                });
            }
        }
    }

    let binds: Vec<String> = spec
        .volumes
        .iter()
        .map(|v| {
            if v.read_only {
                format!("{}:{}:ro", v.source, v.target)
            } else {
                format!("{}:{}", v.source, v.target)
            }
        })
        .collect();

    let host_config = HostConfig {
        binds: (!binds.is_empty()).then_some(binds),
        port_bindings: (!port_bindings.is_empty()).then_some(port_bindings),
        restart_policy: Some(ApiRestartPolicy {
            name: Some(restart_policy_name(spec.restart_policy)),
            maximum_retry_count: None,
        }),
        network_mode: Some(req.network.clone()),
        ..Default::default()
    };

    let endpoint = EndpointSettings {
        aliases: req.network_alias.clone().map(|a| vec![a]),
        ..Default::default()
    };

    Config {
        image: Some(spec.image_ref()),
        cmd: spec
            .command
            .clone()
            .map(|c| vec!["/bin/sh".to_string(), "-c".to_string(), c]),
        user: spec.user_spec.clone(),
        env: Some(env),
        labels: Some(labels),
        exposed_ports: (!exposed_ports.is_empty()).then_some(exposed_ports),
        healthcheck: spec.healthcheck.as_ref().map(health_config),
        host_config: Some(host_config),
        networking_config: Some(NetworkingConfig {
            endpoints_config: HashMap::from([(req.network.clone(), endpoint)]),
        }),
        ..Default::default()
    }
}

fn health_config(hc: &devarch_core::Healthcheck) -> HealthConfig {
    HealthConfig {
        test: Some(vec!["CMD-SHELL".to_string(), hc.test.clone()]),
        interval: Some(i64::from(hc.interval_secs) * NANOS_PER_SEC),
        timeout: Some(i64::from(hc.timeout_secs) * NANOS_PER_SEC),
        retries: Some(i64::from(hc.retries)),
        start_period: Some(i64::from(hc.start_period_secs) * NANOS_PER_SEC),
        ..Default::default()
    }
}

fn restart_policy_name(policy: RestartPolicy) -> RestartPolicyNameEnum {
    match policy {
        RestartPolicy::No => RestartPolicyNameEnum::NO,
        RestartPolicy::Always => RestartPolicyNameEnum::ALWAYS,
        RestartPolicy::UnlessStopped => RestartPolicyNameEnum::UNLESS_STOPPED,
        RestartPolicy::OnFailure => RestartPolicyNameEnum::ON_FAILURE,
    }
}

/// Map one `list_containers` row.
pub(crate) fn summary_from(api: bollard::models::ContainerSummary) -> ContainerSummary {
    ContainerSummary {
        id: api.id.unwrap_or_default(),
        name: api
            .names
            .unwrap_or_default()
            .first()
            .map(|n| n.trim_start_matches('/').to_string())
            .unwrap_or_default(),
        image: api.image.unwrap_or_default(),
        status: ContainerStatus::parse(api.state.as_deref().unwrap_or("")),
        status_text: api.status.unwrap_or_default(),
        labels: api.labels.unwrap_or_default(),
    }
}

/// Map a full inspect response.
pub(crate) fn details_from(api: ContainerInspectResponse) -> ContainerDetails {
    let state = api.state.unwrap_or_default();
    let config = api.config.unwrap_or_default();

    ContainerDetails {
        id: api.id.unwrap_or_default(),
        name: api
            .name
            .map(|n| n.trim_start_matches('/').to_string())
            .unwrap_or_default(),
        image: config.image.clone().unwrap_or_default(),
        status: state
            .status
            .map(status_from_enum)
            .unwrap_or(ContainerStatus::Unknown),
        health: state
            .health
            .and_then(|h| h.status)
            .map(health_from_enum)
            .unwrap_or(HealthState::None),
        restart_count: api.restart_count.unwrap_or(0),
        started_at: state.started_at.as_deref().and_then(parse_runtime_time),
        finished_at: state.finished_at.as_deref().and_then(parse_runtime_time),
        exit_code: state.exit_code,
        error: state.error.filter(|e| !e.is_empty()),
        labels: config.labels.unwrap_or_default(),
        env: config.env.unwrap_or_default(),
        network_mode: api.host_config.and_then(|hc| hc.network_mode),
    }
}

fn status_from_enum(status: ContainerStateStatusEnum) -> ContainerStatus {
    match status {
        ContainerStateStatusEnum::CREATED => ContainerStatus::Created,
        ContainerStateStatusEnum::RUNNING => ContainerStatus::Running,
        ContainerStateStatusEnum::PAUSED => ContainerStatus::Paused,
        ContainerStateStatusEnum::RESTARTING => ContainerStatus::Restarting,
        ContainerStateStatusEnum::REMOVING => ContainerStatus::Removing,
        ContainerStateStatusEnum::EXITED => ContainerStatus::Exited,
        ContainerStateStatusEnum::DEAD => ContainerStatus::Dead,
        _ => ContainerStatus::Unknown,
    }
}

fn health_from_enum(health: HealthStatusEnum) -> HealthState {
    match health {
        HealthStatusEnum::STARTING => HealthState::Starting,
        HealthStatusEnum::HEALTHY => HealthState::Healthy,
        HealthStatusEnum::UNHEALTHY => HealthState::Unhealthy,
        _ => HealthState::None,
    }
}

/// The runtime reports zero timestamps as year one; treat those as unset.
fn parse_runtime_time(raw: &str) -> Option<DateTime<Utc>> {
    if raw.is_empty() || raw.starts_with("0001-") {
        return None;
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Decode one event message; returns `None` for non-container events.
pub(crate) fn event_from(api: EventMessage) -> Option<RuntimeEvent> {
    if api.typ != Some(EventMessageTypeEnum::CONTAINER) {
        return None;
    }
    let actor = api.actor.unwrap_or_default();
    Some(RuntimeEvent {
        container_id: actor.id.unwrap_or_default(),
        action: parse_action(api.action.as_deref().unwrap_or("")),
        attributes: actor.attributes.unwrap_or_default(),
        at: api.time.and_then(|t| DateTime::from_timestamp(t, 0)),
    })
}

/// Decode a container event action string. Health transitions arrive as
/// `health_status: healthy`.
pub(crate) fn parse_action(action: &str) -> EventAction {
    match action {
        "start" => EventAction::Start,
        "die" => EventAction::Die,
        "oom" => EventAction::Oom,
        other if other.starts_with("health_status") => {
            let status = other.split(':').nth(1).map(str::trim).unwrap_or("");
            EventAction::HealthStatus(HealthState::parse(status))
        }
        other => EventAction::Other(other.to_string()),
    }
}

/// CPU percentage from consecutive usage counters, the way the runtime's
/// own CLI computes it.
pub(crate) fn cpu_percent(
    cpu_total: u64,
    precpu_total: u64,
    system: Option<u64>,
    presystem: Option<u64>,
    online_cpus: Option<u64>,
) -> f64 {
    let cpu_delta = cpu_total.saturating_sub(precpu_total) as f64;
    let system_delta = match (system, presystem) {
        (Some(cur), Some(pre)) if cur > pre => (cur - pre) as f64,
        _ => return 0.0,
    };
    let online = online_cpus.unwrap_or(1).max(1) as f64;
    cpu_delta / system_delta * online * 100.0
}

/// Decode one stats tick.
pub(crate) fn stats_sample(stats: &bollard::container::Stats) -> StatsSample {
    let cpu_pct = cpu_percent(
        stats.cpu_stats.cpu_usage.total_usage,
        stats.precpu_stats.cpu_usage.total_usage,
        stats.cpu_stats.system_cpu_usage,
        stats.precpu_stats.system_cpu_usage,
        stats.cpu_stats.online_cpus,
    );
    let (net_rx, net_tx) = stats
        .networks
        .as_ref()
        .map(|nets| {
            nets.values().fold((0i64, 0i64), |(rx, tx), n| {
                (rx + n.rx_bytes as i64, tx + n.tx_bytes as i64)
            })
        })
        .unwrap_or((0, 0));

    StatsSample {
        cpu_pct,
        mem_used_mb: stats.memory_stats.usage.unwrap_or(0) as f64 / BYTES_PER_MB,
        mem_limit_mb: stats.memory_stats.limit.unwrap_or(0) as f64 / BYTES_PER_MB,
        net_rx,
        net_tx,
    }
}

#[cfg(test)]
#[path = "convert_tests.rs"]
mod tests;

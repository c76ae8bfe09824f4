// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read-only compose-style rendering of a resolved stack.
//!
//! Operators inspect a stack as a familiar compose document; this is an
//! output format only, never parsed back.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::spec::{DependsCondition, EffectiveSpec, Healthcheck};

#[derive(Debug, Serialize)]
pub struct ComposeDocument {
    pub services: BTreeMap<String, ComposeService>,
    pub networks: BTreeMap<String, ComposeNetwork>,
}

#[derive(Debug, Serialize)]
pub struct ComposeService {
    pub image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    pub restart: String,
    pub container_name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub healthcheck: Option<ComposeHealthcheck>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub depends_on: BTreeMap<String, ComposeDependsOn>,
    pub networks: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ComposeHealthcheck {
    pub test: Vec<String>,
    pub interval: String,
    pub timeout: String,
    pub retries: u32,
    pub start_period: String,
}

#[derive(Debug, Serialize)]
pub struct ComposeDependsOn {
    pub condition: String,
}

#[derive(Debug, Serialize)]
pub struct ComposeNetwork {
    pub name: String,
    pub driver: String,
}

/// Render the effective specs of a stack as a compose-style YAML document.
///
/// `services` pairs each instance's container name with its resolved spec.
pub fn render_stack(
    network_name: &str,
    services: &[(String, EffectiveSpec)],
) -> Result<String, serde_yaml::Error> {
    let doc = ComposeDocument {
        services: services
            .iter()
            .map(|(name, spec)| (name.clone(), compose_service(name, spec, network_name)))
            .collect(),
        networks: BTreeMap::from([(
            "default".to_string(),
            ComposeNetwork {
                name: network_name.to_string(),
                driver: "bridge".to_string(),
            },
        )]),
    };
    serde_yaml::to_string(&doc)
}

fn compose_service(container_name: &str, spec: &EffectiveSpec, network: &str) -> ComposeService {
    ComposeService {
        image: spec.image_ref(),
        command: spec.command.clone(),
        user: spec.user_spec.clone(),
        restart: spec.restart_policy.as_str().to_string(),
        container_name: container_name.to_string(),
        ports: spec.ports.iter().map(port_string).collect(),
        volumes: spec
            .volumes
            .iter()
            .map(|v| {
                if v.read_only {
                    format!("{}:{}:ro", v.source, v.target)
                } else {
                    format!("{}:{}", v.source, v.target)
                }
            })
            .collect(),
        environment: spec
            .env_vars
            .iter()
            .map(|e| (e.key.clone(), e.value.clone()))
            .collect(),
        labels: spec
            .labels
            .iter()
            .map(|l| (l.key.clone(), l.value.clone()))
            .collect(),
        healthcheck: spec.healthcheck.as_ref().map(compose_healthcheck),
        depends_on: spec
            .dependencies
            .iter()
            .map(|d| {
                (
                    d.depends_on.clone(),
                    ComposeDependsOn {
                        condition: match d.condition {
                            DependsCondition::ServiceStarted => "service_started".to_string(),
                            DependsCondition::ServiceHealthy => "service_healthy".to_string(),
                        },
                    },
                )
            })
            .collect(),
        networks: vec![network.to_string()],
    }
}

fn compose_healthcheck(hc: &Healthcheck) -> ComposeHealthcheck {
    ComposeHealthcheck {
        test: vec!["CMD-SHELL".to_string(), hc.test.clone()],
        interval: format!("{}s", hc.interval_secs),
        timeout: format!("{}s", hc.timeout_secs),
        retries: hc.retries,
        start_period: format!("{}s", hc.start_period_secs),
    }
}

fn port_string(p: &crate::spec::PortBinding) -> String {
    let proto = p.protocol.as_str();
    match (p.host_ip.as_deref(), p.host_port) {
        (Some(ip), Some(hp)) => format!("{}:{}:{}/{}", ip, hp, p.container_port, proto),
        (None, Some(hp)) => format!("{}:{}/{}", hp, p.container_port, proto),
        _ => format!("{}/{}", p.container_port, proto),
    }
}

#[cfg(test)]
#[path = "compose_tests.rs"]
mod tests;

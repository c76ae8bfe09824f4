// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container spec model: templates, per-instance overlays, effective specs.
//!
//! A template carries a full [`ServiceSpec`]; an instance carries an
//! [`OverlaySpec`] whose entries win over the template's rows of the same
//! key. All keyed collections share one merge implementation through the
//! [`Overlayable`] trait, so ports, volumes, env vars, labels, domains,
//! dependencies, and config files behave identically.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sentinel value an overlay row carries to remove the template's entry
/// instead of replacing it.
pub const DELETE_MARKER: &str = "__delete__";

/// Validation state of an imported template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigStatus {
    Imported,
    Validated,
    Modified,
    Broken,
}

impl ConfigStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ConfigStatus::Imported => "imported",
            ConfigStatus::Validated => "validated",
            ConfigStatus::Modified => "modified",
            ConfigStatus::Broken => "broken",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "imported" => Some(ConfigStatus::Imported),
            "validated" => Some(ConfigStatus::Validated),
            "modified" => Some(ConfigStatus::Modified),
            "broken" => Some(ConfigStatus::Broken),
            _ => None,
        }
    }
}

/// Container restart policy, runtime-neutral.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RestartPolicy {
    No,
    Always,
    #[default]
    UnlessStopped,
    OnFailure,
}

impl RestartPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            RestartPolicy::No => "no",
            RestartPolicy::Always => "always",
            RestartPolicy::UnlessStopped => "unless-stopped",
            RestartPolicy::OnFailure => "on-failure",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "no" | "" => Some(RestartPolicy::No),
            "always" => Some(RestartPolicy::Always),
            "unless-stopped" => Some(RestartPolicy::UnlessStopped),
            "on-failure" => Some(RestartPolicy::OnFailure),
            _ => None,
        }
    }
}

/// Layer-4 protocol of a published port.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
}

impl Protocol {
    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "tcp" | "" => Some(Protocol::Tcp),
            "udp" => Some(Protocol::Udp),
            _ => None,
        }
    }
}

/// A published port. Keyed by `(container_port, protocol)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortBinding {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_port: Option<u16>,
    pub container_port: u16,
    pub protocol: Protocol,
}

/// A volume or bind mount. Keyed by `target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeMount {
    pub source: String,
    pub target: String,
    pub read_only: bool,
}

/// An environment variable. Keyed by `key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub key: String,
    pub value: String,
}

/// A container label set by the operator. Keyed by `key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelPair {
    pub key: String,
    pub value: String,
}

/// A reverse-proxy domain mapping. Keyed by `domain`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRoute {
    pub domain: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_port: Option<u16>,
}

/// Health probe definition (`CMD-SHELL` form).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Healthcheck {
    pub test: String,
    pub interval_secs: u32,
    pub timeout_secs: u32,
    pub retries: u32,
    pub start_period_secs: u32,
}

/// Overlay form of a healthcheck: present replaces the template's wholesale;
/// `disabled` removes it from the effective spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthcheckOverlay {
    pub disabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check: Option<Healthcheck>,
}

/// Startup condition on a dependency edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependsCondition {
    #[default]
    ServiceStarted,
    ServiceHealthy,
}

impl DependsCondition {
    pub fn as_str(self) -> &'static str {
        match self {
            DependsCondition::ServiceStarted => "service_started",
            DependsCondition::ServiceHealthy => "service_healthy",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "service_started" | "" => Some(DependsCondition::ServiceStarted),
            "service_healthy" => Some(DependsCondition::ServiceHealthy),
            _ => None,
        }
    }
}

/// A dependency on another instance (by slug) within the same stack.
/// Keyed by `depends_on`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub depends_on: String,
    pub condition: DependsCondition,
}

/// A file materialized into the container filesystem. Keyed by `file_path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub file_path: String,
    pub content: String,
}

/// Full spec carried by a template service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSpec {
    pub image_name: String,
    pub image_tag: String,
    pub restart_policy: RestartPolicy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_spec: Option<String>,
    pub ports: Vec<PortBinding>,
    pub volumes: Vec<VolumeMount>,
    pub env_vars: Vec<EnvVar>,
    pub labels: Vec<LabelPair>,
    pub domains: Vec<DomainRoute>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub healthcheck: Option<Healthcheck>,
    pub dependencies: Vec<Dependency>,
    pub config_files: Vec<ConfigFile>,
}

/// Per-instance overlay. A `None` scalar or an absent collection entry
/// inherits from the template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlaySpec {
    pub image_name: Option<String>,
    pub image_tag: Option<String>,
    pub restart_policy: Option<RestartPolicy>,
    pub command: Option<String>,
    pub user_spec: Option<String>,
    pub ports: Vec<OverlayEntry<PortBinding>>,
    pub volumes: Vec<OverlayEntry<VolumeMount>>,
    pub env_vars: Vec<OverlayEntry<EnvVar>>,
    pub labels: Vec<OverlayEntry<LabelPair>>,
    pub domains: Vec<OverlayEntry<DomainRoute>>,
    pub healthcheck: Option<HealthcheckOverlay>,
    pub dependencies: Vec<OverlayEntry<Dependency>>,
    pub config_files: Vec<OverlayEntry<ConfigFile>>,
}

/// One overlay row: either a replacement/addition or an explicit removal
/// of the template entry with the same key (the `__delete__` marker).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayEntry<T: Overlayable> {
    Set(T),
    Delete(T::Key),
}

/// Keyed-collection behavior shared by every overlayable child collection.
pub trait Overlayable {
    type Key: Ord + Clone + std::fmt::Debug;

    fn key(&self) -> Self::Key;
}

impl Overlayable for PortBinding {
    type Key = (u16, Protocol);

    fn key(&self) -> Self::Key {
        (self.container_port, self.protocol)
    }
}

impl Overlayable for VolumeMount {
    type Key = String;

    fn key(&self) -> Self::Key {
        self.target.clone()
    }
}

impl Overlayable for EnvVar {
    type Key = String;

    fn key(&self) -> Self::Key {
        self.key.clone()
    }
}

impl Overlayable for LabelPair {
    type Key = String;

    fn key(&self) -> Self::Key {
        self.key.clone()
    }
}

impl Overlayable for DomainRoute {
    type Key = String;

    fn key(&self) -> Self::Key {
        self.domain.clone()
    }
}

impl Overlayable for Dependency {
    type Key = String;

    fn key(&self) -> Self::Key {
        self.depends_on.clone()
    }
}

impl Overlayable for ConfigFile {
    type Key = String;

    fn key(&self) -> Self::Key {
        self.file_path.clone()
    }
}

/// Merge a template collection with its overlay entries.
///
/// Overlay `Set` replaces the template entry of the same key or adds a new
/// one; `Delete` removes it. The result is sorted by key, which fixes the
/// canonical order regardless of row insertion order.
pub fn merge_collection<T>(base: &[T], overlay: &[OverlayEntry<T>]) -> Vec<T>
where
    T: Overlayable + Clone,
{
    let mut merged: BTreeMap<T::Key, T> = base.iter().map(|item| (item.key(), item.clone())).collect();
    for entry in overlay {
        match entry {
            OverlayEntry::Set(item) => {
                merged.insert(item.key(), item.clone());
            }
            OverlayEntry::Delete(key) => {
                merged.remove(key);
            }
        }
    }
    merged.into_values().collect()
}

/// Canonical merge of a template and an instance overlay.
///
/// Field order here is the canonical serialization order; collections are
/// key-sorted by [`merge_collection`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveSpec {
    pub image_name: String,
    pub image_tag: String,
    pub restart_policy: RestartPolicy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_spec: Option<String>,
    pub ports: Vec<PortBinding>,
    pub volumes: Vec<VolumeMount>,
    pub env_vars: Vec<EnvVar>,
    pub labels: Vec<LabelPair>,
    pub domains: Vec<DomainRoute>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub healthcheck: Option<Healthcheck>,
    pub dependencies: Vec<Dependency>,
    pub config_files: Vec<ConfigFile>,
}

impl EffectiveSpec {
    /// `image_name:image_tag` as the runtime expects it.
    pub fn image_ref(&self) -> String {
        if self.image_tag.is_empty() {
            self.image_name.clone()
        } else {
            format!("{}:{}", self.image_name, self.image_tag)
        }
    }

    /// Host ports this spec publishes, for collision validation.
    pub fn host_ports(&self) -> impl Iterator<Item = (Option<&str>, u16)> {
        self.ports
            .iter()
            .filter_map(|p| p.host_port.map(|hp| (p.host_ip.as_deref(), hp)))
    }
}

#[cfg(test)]
#[path = "spec_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory [`ContainerRuntime`] for tests.
//!
//! Mirrors the real runtime's observable behavior: create/start/stop
//! transitions, label-filtered listing, NotFound/Conflict errors, and
//! scripted failures (missing images, containers that never go healthy).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use futures_util::stream;
use parking_lot::Mutex;

use devarch_core::{ContainerStatus, HealthState};

use crate::error::RuntimeError;
use crate::types::{
    ContainerDetails, ContainerFilter, ContainerSummary, CreateRequest, EventFilter, LogOptions,
    NetworkInfo, RemoveOptions, RuntimeEvent, RuntimeInfo, StatsSample, StopOptions,
};
use crate::{ContainerRuntime, RuntimeStream};

/// A recorded call, for asserting ordering in tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeCall {
    Create(String),
    Start(String),
    Stop(String),
    Kill(String),
    Remove(String),
    CreateNetwork(String),
    RemoveNetwork(String),
}

#[derive(Debug, Clone)]
struct FakeContainer {
    id: String,
    name: String,
    image: String,
    labels: HashMap<String, String>,
    env: Vec<String>,
    status: ContainerStatus,
    health: HealthState,
    has_healthcheck: bool,
}

#[derive(Default)]
struct FakeState {
    containers: HashMap<String, FakeContainer>,
    networks: HashMap<String, String>,
    calls: Vec<RuntimeCall>,
    missing_images: HashSet<String>,
    never_healthy: HashSet<String>,
    stats: HashMap<String, StatsSample>,
    scripted_events: Vec<RuntimeEvent>,
    next_id: u64,
}

/// In-memory runtime double.
#[derive(Clone, Default)]
pub struct FakeRuntime {
    state: Arc<Mutex<FakeState>>,
    supports_update: bool,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advertise in-place update capability (the real adapter never does).
    pub fn with_in_place_update(mut self) -> Self {
        self.supports_update = true;
        self
    }

    /// Creating a container from this image fails with a Fatal error.
    pub fn fail_image(&self, image: &str) {
        self.state.lock().missing_images.insert(image.to_string());
    }

    /// This container name reports Unhealthy forever after start.
    pub fn never_healthy(&self, name: &str) {
        self.state.lock().never_healthy.insert(name.to_string());
    }

    /// Fix the stats sample returned for a container.
    pub fn set_stats(&self, name: &str, sample: StatsSample) {
        self.state.lock().stats.insert(name.to_string(), sample);
    }

    /// Queue events for the next `events` subscriber.
    pub fn push_event(&self, event: RuntimeEvent) {
        self.state.lock().scripted_events.push(event);
    }

    /// Calls recorded so far, in order.
    pub fn calls(&self) -> Vec<RuntimeCall> {
        self.state.lock().calls.clone()
    }

    /// Names of containers currently present, sorted.
    pub fn container_names(&self) -> Vec<String> {
        let mut names: Vec<String> =
            self.state.lock().containers.values().map(|c| c.name.clone()).collect();
        names.sort();
        names
    }

    /// Names of networks currently present, sorted.
    pub fn network_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.lock().networks.keys().cloned().collect();
        names.sort();
        names
    }

    /// Look up a container by name.
    pub fn container(&self, name: &str) -> Option<ContainerDetails> {
        let state = self.state.lock();
        state.containers.values().find(|c| c.name == name).map(details_of)
    }

    fn resolve<'a>(
        state: &'a mut FakeState,
        id_or_name: &str,
    ) -> Result<&'a mut FakeContainer, RuntimeError> {
        let key = state
            .containers
            .iter()
            .find(|(id, c)| id.as_str() == id_or_name || c.name == id_or_name)
            .map(|(id, _)| id.clone());
        match key {
            Some(key) => state
                .containers
                .get_mut(&key)
                .ok_or_else(|| RuntimeError::NotFound(id_or_name.to_string())),
            None => Err(RuntimeError::NotFound(id_or_name.to_string())),
        }
    }
}

fn details_of(container: &FakeContainer) -> ContainerDetails {
    ContainerDetails {
        id: container.id.clone(),
        name: container.name.clone(),
        image: container.image.clone(),
        status: container.status,
        health: container.health,
        restart_count: 0,
        started_at: container.status.is_running().then(Utc::now),
        finished_at: None,
        exit_code: matches!(container.status, ContainerStatus::Exited).then_some(0),
        error: None,
        labels: container.labels.clone(),
        env: container.env.clone(),
        network_mode: None,
    }
}

fn matches_labels(labels: &HashMap<String, String>, filters: &[String]) -> bool {
    filters.iter().all(|f| match f.split_once('=') {
        Some((key, value)) => labels.get(key).is_some_and(|v| v == value),
        None => labels.contains_key(f.as_str()),
    })
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn ping(&self) -> Result<(), RuntimeError> {
        Ok(())
    }

    async fn info(&self) -> Result<RuntimeInfo, RuntimeError> {
        let state = self.state.lock();
        Ok(RuntimeInfo {
            name: "fake-runtime".into(),
            version: "0.0.0".into(),
            operating_system: "test".into(),
            containers: state.containers.len() as i64,
        })
    }

    async fn list_containers(
        &self,
        filter: &ContainerFilter,
    ) -> Result<Vec<ContainerSummary>, RuntimeError> {
        let state = self.state.lock();
        let mut rows: Vec<ContainerSummary> = state
            .containers
            .values()
            .filter(|c| filter.all || c.status.is_running())
            .filter(|c| matches_labels(&c.labels, &filter.labels))
            .filter(|c| {
                filter
                    .name_prefix
                    .as_deref()
                    .map(|p| c.name.starts_with(p))
                    .unwrap_or(true)
            })
            .map(|c| ContainerSummary {
                id: c.id.clone(),
                name: c.name.clone(),
                image: c.image.clone(),
                status: c.status,
                status_text: c.status.as_str().to_string(),
                labels: c.labels.clone(),
            })
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerDetails, RuntimeError> {
        let mut state = self.state.lock();
        let container = FakeRuntime::resolve(&mut state, id)?;
        Ok(details_of(container))
    }

    async fn create_container(&self, req: &CreateRequest) -> Result<String, RuntimeError> {
        let mut state = self.state.lock();
        state.calls.push(RuntimeCall::Create(req.name.clone()));

        let image = req.spec.image_ref();
        if state.missing_images.contains(&image) {
            return Err(RuntimeError::Fatal(format!("no such image: {image}")));
        }
        if state.containers.values().any(|c| c.name == req.name) {
            return Err(RuntimeError::Conflict(format!("name {} already in use", req.name)));
        }
        if !state.networks.contains_key(&req.network) {
            return Err(RuntimeError::NotFound(format!("network {} not found", req.network)));
        }

        state.next_id += 1;
        let id = format!("fake-{:08x}", state.next_id);
        let mut labels: HashMap<String, String> = req
            .spec
            .labels
            .iter()
            .map(|l| (l.key.clone(), l.value.clone()))
            .collect();
        labels.extend(req.extra_labels.clone());
        let env = req
            .spec
            .env_vars
            .iter()
            .map(|e| format!("{}={}", e.key, e.value))
            .collect();
        state.containers.insert(
            id.clone(),
            FakeContainer {
                id: id.clone(),
                name: req.name.clone(),
                image,
                labels,
                env,
                status: ContainerStatus::Created,
                health: HealthState::None,
                has_healthcheck: req.spec.healthcheck.is_some(),
            },
        );
        Ok(id)
    }

    async fn start_container(&self, id: &str) -> Result<(), RuntimeError> {
        let mut state = self.state.lock();
        let never_healthy = state.never_healthy.clone();
        let container = FakeRuntime::resolve(&mut state, id)?;
        container.status = ContainerStatus::Running;
        container.health = if !container.has_healthcheck {
            HealthState::None
        } else if never_healthy.contains(&container.name) {
            HealthState::Unhealthy
        } else {
            HealthState::Healthy
        };
        let name = container.name.clone();
        state.calls.push(RuntimeCall::Start(name));
        Ok(())
    }

    async fn stop_container(&self, id: &str, _opts: &StopOptions) -> Result<(), RuntimeError> {
        let mut state = self.state.lock();
        let container = FakeRuntime::resolve(&mut state, id)?;
        container.status = ContainerStatus::Exited;
        container.health = HealthState::None;
        let name = container.name.clone();
        state.calls.push(RuntimeCall::Stop(name));
        Ok(())
    }

    async fn kill_container(&self, id: &str) -> Result<(), RuntimeError> {
        let mut state = self.state.lock();
        let container = FakeRuntime::resolve(&mut state, id)?;
        container.status = ContainerStatus::Exited;
        let name = container.name.clone();
        state.calls.push(RuntimeCall::Kill(name));
        Ok(())
    }

    async fn remove_container(&self, id: &str, _opts: &RemoveOptions) -> Result<(), RuntimeError> {
        let mut state = self.state.lock();
        let key = state
            .containers
            .iter()
            .find(|(cid, c)| cid.as_str() == id || c.name == id)
            .map(|(cid, _)| cid.clone());
        match key {
            Some(key) => {
                if let Some(removed) = state.containers.remove(&key) {
                    state.calls.push(RuntimeCall::Remove(removed.name));
                }
                Ok(())
            }
            None => Err(RuntimeError::NotFound(id.to_string())),
        }
    }

    async fn create_network(&self, name: &str, driver: &str) -> Result<(), RuntimeError> {
        let mut state = self.state.lock();
        if state.networks.contains_key(name) {
            return Err(RuntimeError::Conflict(format!("network {name} already exists")));
        }
        state.networks.insert(name.to_string(), driver.to_string());
        state.calls.push(RuntimeCall::CreateNetwork(name.to_string()));
        Ok(())
    }

    async fn inspect_network(&self, name: &str) -> Result<NetworkInfo, RuntimeError> {
        let state = self.state.lock();
        state
            .networks
            .get(name)
            .map(|driver| NetworkInfo {
                id: format!("net-{name}"),
                name: name.to_string(),
                driver: driver.clone(),
                labels: HashMap::new(),
            })
            .ok_or_else(|| RuntimeError::NotFound(name.to_string()))
    }

    async fn remove_network(&self, name: &str) -> Result<(), RuntimeError> {
        let mut state = self.state.lock();
        if state.networks.remove(name).is_none() {
            return Err(RuntimeError::NotFound(name.to_string()));
        }
        state.calls.push(RuntimeCall::RemoveNetwork(name.to_string()));
        Ok(())
    }

    async fn stats(&self, id: &str) -> Result<RuntimeStream<StatsSample>, RuntimeError> {
        let mut state = self.state.lock();
        let container = FakeRuntime::resolve(&mut state, id)?;
        let name = container.name.clone();
        let sample = state.stats.get(&name).copied().unwrap_or_default();
        Ok(Box::pin(stream::iter(vec![Ok(sample)])))
    }

    async fn events(
        &self,
        _filter: &EventFilter,
    ) -> Result<RuntimeStream<RuntimeEvent>, RuntimeError> {
        let events: Vec<Result<RuntimeEvent, RuntimeError>> =
            self.state.lock().scripted_events.drain(..).map(Ok).collect();
        Ok(Box::pin(stream::iter(events)))
    }

    async fn logs(
        &self,
        _id: &str,
        _opts: &LogOptions,
    ) -> Result<RuntimeStream<Vec<u8>>, RuntimeError> {
        Ok(Box::pin(stream::empty()))
    }

    fn supports_in_place_update(&self) -> bool {
        self.supports_update
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;

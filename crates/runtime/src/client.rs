// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bollard-backed implementation of [`ContainerRuntime`].

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use bollard::container::{
    CreateContainerOptions, KillContainerOptions, ListContainersOptions, LogsOptions,
    RemoveContainerOptions, StatsOptions, StopContainerOptions,
};
use bollard::network::{CreateNetworkOptions, InspectNetworkOptions};
use bollard::system::EventsOptions;
use bollard::Docker;
use futures_util::StreamExt;

use crate::convert;
use crate::error::RuntimeError;
use crate::socket::discover_socket;
use crate::types::{
    ContainerDetails, ContainerFilter, ContainerSummary, CreateRequest, EventFilter, LogOptions,
    NetworkInfo, RemoveOptions, RuntimeEvent, RuntimeInfo, StatsSample, StopOptions,
};
use crate::{ContainerRuntime, RuntimeStream};

/// Default deadline for unary runtime calls.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(30);

/// Typed client over the runtime's HTTP-over-UNIX-socket API.
///
/// `Clone` is cheap: the underlying client is connection-pooled and
/// shared.
#[derive(Clone)]
pub struct OciRuntime {
    docker: Docker,
    deadline: Duration,
}

impl OciRuntime {
    /// Connect via socket discovery (`CONTAINER_HOST`, well-known paths,
    /// rootless path).
    pub fn connect() -> Result<Self, RuntimeError> {
        let socket = discover_socket()?;
        Self::connect_at(&socket)
    }

    /// Connect to an explicit socket path.
    pub fn connect_at(socket: &Path) -> Result<Self, RuntimeError> {
        let addr = socket.to_string_lossy();
        let docker = Docker::connect_with_unix(
            &addr,
            DEFAULT_DEADLINE.as_secs(),
            bollard::API_DEFAULT_VERSION,
        )
        .map_err(|e| RuntimeError::Unavailable(e.to_string()))?;
        tracing::info!(socket = %addr, "connected to container runtime");
        Ok(Self { docker, deadline: DEFAULT_DEADLINE })
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Bound a unary call by the configured deadline.
    async fn deadlined<T>(
        &self,
        fut: impl std::future::Future<Output = Result<T, bollard::errors::Error>>,
    ) -> Result<T, RuntimeError> {
        match tokio::time::timeout(self.deadline, fut).await {
            Ok(result) => result.map_err(RuntimeError::from),
            Err(_) => Err(RuntimeError::Deadline(self.deadline)),
        }
    }
}

fn label_filters(labels: &[String]) -> HashMap<String, Vec<String>> {
    let mut filters = HashMap::new();
    if !labels.is_empty() {
        filters.insert("label".to_string(), labels.to_vec());
    }
    filters
}

#[async_trait]
impl ContainerRuntime for OciRuntime {
    async fn ping(&self) -> Result<(), RuntimeError> {
        self.deadlined(self.docker.ping()).await.map(|_| ())
    }

    async fn info(&self) -> Result<RuntimeInfo, RuntimeError> {
        let info = self.deadlined(self.docker.info()).await?;
        Ok(RuntimeInfo {
            name: info.name.unwrap_or_default(),
            version: info.server_version.unwrap_or_default(),
            operating_system: info.operating_system.unwrap_or_default(),
            containers: info.containers.unwrap_or(0),
        })
    }

    async fn list_containers(
        &self,
        filter: &ContainerFilter,
    ) -> Result<Vec<ContainerSummary>, RuntimeError> {
        let options = ListContainersOptions::<String> {
            all: filter.all,
            filters: label_filters(&filter.labels),
            ..Default::default()
        };
        let rows = self.deadlined(self.docker.list_containers(Some(options))).await?;
        let mut summaries: Vec<ContainerSummary> =
            rows.into_iter().map(convert::summary_from).collect();
        if let Some(prefix) = &filter.name_prefix {
            summaries.retain(|c| c.name.starts_with(prefix));
        }
        Ok(summaries)
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerDetails, RuntimeError> {
        let response = self.deadlined(self.docker.inspect_container(id, None)).await?;
        Ok(convert::details_from(response))
    }

    async fn create_container(&self, req: &CreateRequest) -> Result<String, RuntimeError> {
        let options = CreateContainerOptions { name: req.name.clone(), platform: None };
        let config = convert::container_config(req);
        let created = self
            .deadlined(self.docker.create_container(Some(options), config))
            .await?;
        tracing::debug!(name = %req.name, id = %created.id, "container created");
        Ok(created.id)
    }

    async fn start_container(&self, id: &str) -> Result<(), RuntimeError> {
        self.deadlined(
            self.docker
                .start_container(id, None::<bollard::container::StartContainerOptions<String>>),
        )
        .await
    }

    async fn stop_container(&self, id: &str, opts: &StopOptions) -> Result<(), RuntimeError> {
        let options = StopContainerOptions { t: opts.grace.as_secs() as i64 };
        self.deadlined(self.docker.stop_container(id, Some(options))).await
    }

    async fn kill_container(&self, id: &str) -> Result<(), RuntimeError> {
        let options = KillContainerOptions { signal: "SIGKILL".to_string() };
        self.deadlined(self.docker.kill_container(id, Some(options))).await
    }

    async fn remove_container(&self, id: &str, opts: &RemoveOptions) -> Result<(), RuntimeError> {
        let options = RemoveContainerOptions {
            force: opts.force,
            v: opts.remove_volumes,
            link: false,
        };
        self.deadlined(self.docker.remove_container(id, Some(options))).await
    }

    async fn create_network(&self, name: &str, driver: &str) -> Result<(), RuntimeError> {
        let options = CreateNetworkOptions {
            name: name.to_string(),
            driver: driver.to_string(),
            ..Default::default()
        };
        self.deadlined(self.docker.create_network(options)).await.map(|_| ())
    }

    async fn inspect_network(&self, name: &str) -> Result<NetworkInfo, RuntimeError> {
        let options = InspectNetworkOptions::<String> { verbose: false, ..Default::default() };
        let network = self
            .deadlined(self.docker.inspect_network(name, Some(options)))
            .await?;
        Ok(NetworkInfo {
            id: network.id.unwrap_or_default(),
            name: network.name.unwrap_or_default(),
            driver: network.driver.unwrap_or_default(),
            labels: network.labels.unwrap_or_default(),
        })
    }

    async fn remove_network(&self, name: &str) -> Result<(), RuntimeError> {
        self.deadlined(self.docker.remove_network(name)).await
    }

    async fn stats(&self, id: &str) -> Result<RuntimeStream<StatsSample>, RuntimeError> {
        let options = StatsOptions { stream: true, one_shot: false };
        let stream = self
            .docker
            .stats(id, Some(options))
            .map(|item| {
                item.map(|stats| convert::stats_sample(&stats))
                    .map_err(RuntimeError::from)
            })
            .boxed();
        Ok(stream)
    }

    async fn events(
        &self,
        filter: &EventFilter,
    ) -> Result<RuntimeStream<RuntimeEvent>, RuntimeError> {
        let mut filters = label_filters(&filter.labels);
        filters.insert("type".to_string(), vec!["container".to_string()]);
        let options = EventsOptions::<String> { filters, ..Default::default() };
        let stream = self
            .docker
            .events(Some(options))
            .filter_map(|item| async move {
                match item {
                    Ok(message) => convert::event_from(message).map(Ok),
                    Err(err) => Some(Err(RuntimeError::from(err))),
                }
            })
            .boxed();
        Ok(stream)
    }

    async fn logs(
        &self,
        id: &str,
        opts: &LogOptions,
    ) -> Result<RuntimeStream<Vec<u8>>, RuntimeError> {
        let options = LogsOptions::<String> {
            follow: opts.follow,
            stdout: true,
            stderr: true,
            timestamps: opts.timestamps,
            tail: opts.tail.map(|n| n.to_string()).unwrap_or_else(|| "all".to_string()),
            ..Default::default()
        };
        let stream = self
            .docker
            .logs(id, Some(options))
            .map(|item| {
                item.map(|chunk| chunk.into_bytes().to_vec())
                    .map_err(RuntimeError::from)
            })
            .boxed();
        Ok(stream)
    }

    fn supports_in_place_update(&self) -> bool {
        // The targeted runtimes recreate on any change; keep the diff
        // algebra closed by never surfacing UPDATE.
        false
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use devarch_core::{EffectiveSpec, Healthcheck};
use devarch_runtime::{ContainerRuntime, CreateRequest, FakeRuntime};

fn probe() -> Healthcheck {
    Healthcheck { test: "true".into(), interval_secs: 1, timeout_secs: 1, retries: 1, start_period_secs: 0 }
}

async fn started(fake: &FakeRuntime, name: &str, healthcheck: Option<Healthcheck>) {
    let req = CreateRequest {
        name: name.to_string(),
        spec: EffectiveSpec {
            image_name: "app".into(),
            image_tag: "1".into(),
            healthcheck,
            ..Default::default()
        },
        extra_labels: Default::default(),
        network: "net".into(),
        network_alias: None,
    };
    let id = fake.create_container(&req).await.unwrap();
    fake.start_container(&id).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn healthy_container_passes_immediately() {
    let fake = FakeRuntime::new();
    fake.create_network("net", "bridge").await.unwrap();
    started(&fake, "c1", Some(probe())).await;

    let runtime: Arc<dyn ContainerRuntime> = Arc::new(fake);
    wait_healthy(&runtime, "c1", HEALTH_WAIT).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn probeless_running_container_counts_as_healthy() {
    let fake = FakeRuntime::new();
    fake.create_network("net", "bridge").await.unwrap();
    started(&fake, "c1", None).await;

    let runtime: Arc<dyn ContainerRuntime> = Arc::new(fake);
    wait_healthy(&runtime, "c1", HEALTH_WAIT).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn unhealthy_container_times_out_fatally() {
    let fake = FakeRuntime::new();
    fake.create_network("net", "bridge").await.unwrap();
    fake.never_healthy("c1");
    started(&fake, "c1", Some(probe())).await;

    let runtime: Arc<dyn ContainerRuntime> = Arc::new(fake);
    let err = wait_healthy(&runtime, "c1", Duration::from_secs(5)).await.unwrap_err();
    assert!(matches!(err, EngineError::HealthTimeout { .. }));
    assert_eq!(err.kind(), devarch_core::ErrorKind::Fatal);
}

#[tokio::test(start_paused = true)]
async fn missing_container_surfaces_runtime_error() {
    let fake = FakeRuntime::new();
    let runtime: Arc<dyn ContainerRuntime> = Arc::new(fake);
    let err = wait_healthy(&runtime, "ghost", Duration::from_secs(5)).await.unwrap_err();
    assert!(matches!(err, EngineError::Runtime(_)));
}

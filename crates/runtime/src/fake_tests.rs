// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use devarch_core::{EffectiveSpec, Healthcheck};

fn request(name: &str, image: &str) -> CreateRequest {
    CreateRequest {
        name: name.to_string(),
        spec: EffectiveSpec {
            image_name: image.to_string(),
            image_tag: "1".into(),
            ..Default::default()
        },
        extra_labels: devarch_core::labels::managed_labels("s", name, "h"),
        network: "net".into(),
        network_alias: None,
    }
}

async fn fake_with_network() -> FakeRuntime {
    let fake = FakeRuntime::new();
    fake.create_network("net", "bridge").await.unwrap();
    fake
}

#[tokio::test]
async fn create_start_stop_remove_lifecycle() {
    let fake = fake_with_network().await;
    let id = fake.create_container(&request("c1", "app")).await.unwrap();

    let details = fake.inspect_container(&id).await.unwrap();
    assert_eq!(details.status, devarch_core::ContainerStatus::Created);

    fake.start_container(&id).await.unwrap();
    assert_eq!(
        fake.inspect_container(&id).await.unwrap().status,
        devarch_core::ContainerStatus::Running
    );

    fake.stop_container(&id, &StopOptions::default()).await.unwrap();
    assert_eq!(
        fake.inspect_container(&id).await.unwrap().status,
        devarch_core::ContainerStatus::Exited
    );

    fake.remove_container(&id, &RemoveOptions::default()).await.unwrap();
    assert!(fake.inspect_container(&id).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn create_requires_network() {
    let fake = FakeRuntime::new();
    let err = fake.create_container(&request("c1", "app")).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn duplicate_name_conflicts() {
    let fake = fake_with_network().await;
    fake.create_container(&request("c1", "app")).await.unwrap();
    let err = fake.create_container(&request("c1", "app")).await.unwrap_err();
    assert!(matches!(err, RuntimeError::Conflict(_)));
}

#[tokio::test]
async fn missing_image_is_fatal() {
    let fake = fake_with_network().await;
    fake.fail_image("ghost:1");
    let err = fake.create_container(&request("c1", "ghost")).await.unwrap_err();
    assert!(matches!(err, RuntimeError::Fatal(_)));
}

#[tokio::test]
async fn list_filters_by_label_and_prefix() {
    let fake = fake_with_network().await;
    fake.create_container(&request("s-a", "app")).await.unwrap();
    let mut other = request("x-b", "app");
    other.extra_labels = devarch_core::labels::managed_labels("other", "b", "h");
    fake.create_container(&other).await.unwrap();

    let filter = ContainerFilter {
        all: true,
        labels: vec![format!("{}=s", devarch_core::LABEL_STACK)],
        name_prefix: Some("s-".into()),
    };
    let rows = fake.list_containers(&filter).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, "s-a");
}

#[tokio::test]
async fn healthcheck_containers_report_health_after_start() {
    let fake = fake_with_network().await;
    let mut req = request("c1", "app");
    req.spec.healthcheck = Some(Healthcheck {
        test: "true".into(),
        interval_secs: 1,
        timeout_secs: 1,
        retries: 1,
        start_period_secs: 0,
    });
    let id = fake.create_container(&req).await.unwrap();
    fake.start_container(&id).await.unwrap();
    assert_eq!(
        fake.inspect_container(&id).await.unwrap().health,
        devarch_core::HealthState::Healthy
    );
}

#[tokio::test]
async fn never_healthy_containers_stay_unhealthy() {
    let fake = fake_with_network().await;
    let mut req = request("c1", "app");
    req.spec.healthcheck = Some(Healthcheck {
        test: "false".into(),
        interval_secs: 1,
        timeout_secs: 1,
        retries: 1,
        start_period_secs: 0,
    });
    fake.never_healthy("c1");
    let id = fake.create_container(&req).await.unwrap();
    fake.start_container(&id).await.unwrap();
    assert_eq!(
        fake.inspect_container(&id).await.unwrap().health,
        devarch_core::HealthState::Unhealthy
    );
}

#[tokio::test]
async fn records_calls_in_order() {
    let fake = fake_with_network().await;
    let id = fake.create_container(&request("c1", "app")).await.unwrap();
    fake.start_container(&id).await.unwrap();
    fake.stop_container(&id, &StopOptions::default()).await.unwrap();
    fake.remove_container(&id, &RemoveOptions::default()).await.unwrap();
    assert_eq!(
        fake.calls(),
        vec![
            RuntimeCall::CreateNetwork("net".into()),
            RuntimeCall::Create("c1".into()),
            RuntimeCall::Start("c1".into()),
            RuntimeCall::Stop("c1".into()),
            RuntimeCall::Remove("c1".into()),
        ]
    );
}

#[tokio::test]
async fn stats_once_returns_configured_sample() {
    let fake = fake_with_network().await;
    let id = fake.create_container(&request("c1", "app")).await.unwrap();
    fake.set_stats("c1", StatsSample { cpu_pct: 12.5, ..Default::default() });
    let sample = fake.stats_once(&id).await.unwrap().unwrap();
    assert_eq!(sample.cpu_pct, 12.5);
}

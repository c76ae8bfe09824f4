// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store integration tests against live PostgreSQL.
//!
//! Run with a scratch database:
//! `DATABASE_URL=postgres://localhost/devarch_test cargo test -p devarch-store -- --ignored`

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use devarch_core::spec::{EnvVar, HealthcheckOverlay, ServiceSpec};
use devarch_store::{
    NewInstance, NewStack, NewTemplate, OverlayRow, StackUpdate, Store, StoreError,
};

async fn store() -> Store {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must point at a test database");
    let store = Store::connect(&url).await.expect("connect");
    store.migrate().await.expect("migrate");
    store
}

fn unique(prefix: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .subsec_nanos();
    format!("{prefix}-{nanos:x}")
}

#[tokio::test]
#[ignore = "requires a PostgreSQL server (DATABASE_URL)"]
async fn soft_deleted_stack_name_is_reusable() {
    let store = store().await;
    let name = unique("reuse");

    let first = store
        .create_stack(&NewStack { name: name.clone(), ..Default::default() })
        .await
        .unwrap();
    store.soft_delete_stack(first.stack_id()).await.unwrap();

    // Same name again, while the tombstoned row still exists.
    let second = store
        .create_stack(&NewStack { name: name.clone(), ..Default::default() })
        .await
        .unwrap();
    assert_ne!(first.id, second.id);

    // Restoring the first now conflicts on the unique index.
    let err = store.restore_stack(first.stack_id()).await.unwrap_err();
    assert!(matches!(err, StoreError::AlreadyExists(_)), "got {err:?}");
}

#[tokio::test]
#[ignore = "requires a PostgreSQL server (DATABASE_URL)"]
async fn duplicate_active_stack_name_conflicts() {
    let store = store().await;
    let name = unique("dup");
    store.create_stack(&NewStack { name: name.clone(), ..Default::default() }).await.unwrap();
    let err = store
        .create_stack(&NewStack { name, ..Default::default() })
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::AlreadyExists(_)));
}

#[tokio::test]
#[ignore = "requires a PostgreSQL server (DATABASE_URL)"]
async fn optimistic_update_detects_concurrent_edit() {
    let store = store().await;
    let stack = store
        .create_stack(&NewStack { name: unique("occ"), ..Default::default() })
        .await
        .unwrap();

    let update = StackUpdate { description: Some("first".into()), ..Default::default() };
    let updated = store.update_stack(stack.stack_id(), &update, stack.row_version).await.unwrap();
    assert_eq!(updated.row_version, stack.row_version + 1);

    // Replaying with the stale version loses the race.
    let err = store
        .update_stack(stack.stack_id(), &update, stack.row_version)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));
}

#[tokio::test]
#[ignore = "requires a PostgreSQL server (DATABASE_URL)"]
async fn overlay_env_wins_in_effective_config() {
    let store = store().await;

    let template = store
        .upsert_template(&NewTemplate {
            name: unique("postgres"),
            enabled: true,
            spec: ServiceSpec {
                image_name: "postgres".into(),
                image_tag: "16".into(),
                env_vars: vec![EnvVar {
                    key: "POSTGRES_PASSWORD".into(),
                    value: "devarch".into(),
                }],
                ..Default::default()
            },
            ..Default::default()
        })
        .await
        .unwrap();

    let stack = store
        .create_stack(&NewStack { name: unique("db-stack"), ..Default::default() })
        .await
        .unwrap();
    let instance = store
        .create_instance(
            stack.stack_id(),
            &NewInstance {
                instance_id: "pg1".into(),
                template_service_id: Some(template.service_id()),
                enabled: true,
            },
        )
        .await
        .unwrap();

    let before = store.effective_config(stack.stack_id(), "pg1").await.unwrap();
    store
        .replace_instance_env_vars(
            instance.instance_pk(),
            vec![OverlayRow::set(EnvVar { key: "POSTGRES_PASSWORD".into(), value: "secret".into() })],
        )
        .await
        .unwrap();
    let after = store.effective_config(stack.stack_id(), "pg1").await.unwrap();

    let pw = after
        .effective
        .env_vars
        .iter()
        .find(|e| e.key == "POSTGRES_PASSWORD")
        .unwrap();
    assert_eq!(pw.value, "secret");
    assert_ne!(before.spec_hash, after.spec_hash);

    // Each overlay edit appended an audit version.
    let versions = store.instance_versions(instance.instance_pk()).await.unwrap();
    assert!(!versions.is_empty());
    assert_eq!(versions[0].version, versions.len() as i64);
}

#[tokio::test]
#[ignore = "requires a PostgreSQL server (DATABASE_URL)"]
async fn disabled_healthcheck_overlay_removes_template_probe() {
    let store = store().await;
    let template = store
        .upsert_template(&NewTemplate {
            name: unique("probe"),
            enabled: true,
            spec: ServiceSpec {
                image_name: "app".into(),
                image_tag: "1".into(),
                healthcheck: Some(devarch_core::Healthcheck {
                    test: "true".into(),
                    interval_secs: 5,
                    timeout_secs: 3,
                    retries: 3,
                    start_period_secs: 0,
                }),
                ..Default::default()
            },
            ..Default::default()
        })
        .await
        .unwrap();

    let stack = store
        .create_stack(&NewStack { name: unique("hc"), ..Default::default() })
        .await
        .unwrap();
    let instance = store
        .create_instance(
            stack.stack_id(),
            &NewInstance {
                instance_id: "a".into(),
                template_service_id: Some(template.service_id()),
                enabled: true,
            },
        )
        .await
        .unwrap();

    store
        .set_instance_healthcheck(
            instance.instance_pk(),
            Some(HealthcheckOverlay { disabled: true, check: None }),
        )
        .await
        .unwrap();

    let resolved = store.effective_config(stack.stack_id(), "a").await.unwrap();
    assert!(resolved.effective.healthcheck.is_none());
}

#[tokio::test]
#[ignore = "requires a PostgreSQL server (DATABASE_URL)"]
async fn clone_copies_instances_and_overlays() {
    let store = store().await;
    let stack = store
        .create_stack(&NewStack { name: unique("src"), ..Default::default() })
        .await
        .unwrap();
    let instance = store
        .create_instance(
            stack.stack_id(),
            &NewInstance { instance_id: "web".into(), template_service_id: None, enabled: true },
        )
        .await
        .unwrap();
    store
        .update_instance_overrides(
            instance.instance_pk(),
            &devarch_store::InstanceOverrides {
                image_name: Some(Some("nginx".into())),
                image_tag: Some(Some("1.27".into())),
                ..Default::default()
            },
            instance.row_version,
        )
        .await
        .unwrap();
    store
        .replace_instance_env_vars(
            instance.instance_pk(),
            vec![OverlayRow::set(EnvVar { key: "MODE".into(), value: "prod".into() })],
        )
        .await
        .unwrap();

    let clone_name = unique("copy");
    let cloned = store.clone_stack(stack.stack_id(), &clone_name).await.unwrap();

    let resolved = store.effective_config(cloned.stack_id(), "web").await.unwrap();
    assert_eq!(resolved.effective.image_name, "nginx");
    assert_eq!(resolved.instance.container_name, format!("{clone_name}-web"));
    assert!(resolved.effective.env_vars.iter().any(|e| e.key == "MODE"));
}

#[tokio::test]
#[ignore = "requires a PostgreSQL server (DATABASE_URL)"]
async fn state_cache_updated_at_is_monotonic() {
    let store = store().await;
    let stack = store
        .create_stack(&NewStack { name: unique("cache"), ..Default::default() })
        .await
        .unwrap();
    let instance = store
        .create_instance(
            stack.stack_id(),
            &NewInstance { instance_id: "a".into(), template_service_id: None, enabled: true },
        )
        .await
        .unwrap();

    let newer = chrono::Utc::now();
    let older = newer - chrono::Duration::seconds(60);

    let mut row = devarch_store::ContainerStateRow {
        service_instance_id: instance.id,
        container_id: Some("c1".into()),
        status: "running".into(),
        health_status: None,
        restart_count: 0,
        started_at: None,
        finished_at: None,
        exit_code: None,
        error: None,
        updated_at: newer,
    };
    store.upsert_container_state(&row).await.unwrap();

    // A stale observation must not regress the row.
    row.status = "exited".into();
    row.updated_at = older;
    store.upsert_container_state(&row).await.unwrap();

    let cached = store.get_container_state(instance.instance_pk()).await.unwrap().unwrap();
    assert_eq!(cached.status, "running");
}

#[tokio::test]
#[ignore = "requires a PostgreSQL server (DATABASE_URL)"]
async fn advisory_lock_excludes_second_holder() {
    let store = store().await;
    let stack = store
        .create_stack(&NewStack { name: unique("lock"), ..Default::default() })
        .await
        .unwrap();

    let held = store.try_lock_stack(stack.stack_id()).await.unwrap();
    assert!(held.is_some());
    let contender = store.try_lock_stack(stack.stack_id()).await.unwrap();
    assert!(contender.is_none());

    held.unwrap().release().await.unwrap();
    let retry = store.try_lock_stack(stack.stack_id()).await.unwrap();
    assert!(retry.is_some());
    retry.unwrap().release().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a PostgreSQL server (DATABASE_URL)"]
async fn metrics_purge_removes_only_old_rows() {
    let store = store().await;
    let stack = store
        .create_stack(&NewStack { name: unique("metrics"), ..Default::default() })
        .await
        .unwrap();
    let instance = store
        .create_instance(
            stack.stack_id(),
            &NewInstance { instance_id: "a".into(), template_service_id: None, enabled: true },
        )
        .await
        .unwrap();

    store
        .append_metrics(instance.instance_pk(), &devarch_store::MetricsSample::default())
        .await
        .unwrap();

    let removed = store
        .purge_metrics_before(chrono::Utc::now() - chrono::Duration::days(7))
        .await
        .unwrap();
    let _ = removed; // fresh rows survive
    let recent = store.recent_metrics(instance.instance_pk(), 10).await.unwrap();
    assert_eq!(recent.len(), 1);

    let removed = store.purge_metrics_before(chrono::Utc::now()).await.unwrap();
    assert!(removed >= 1);
}

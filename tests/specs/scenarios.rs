// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end plan/apply scenarios with literal values.

use serial_test::serial;

use devarch_core::spec::{DependsCondition, Dependency, EnvVar};
use devarch_engine::{ActionKind, EngineError};
use devarch_store::{InstanceOverrides, OverlayRow};

use super::prelude::Harness;

#[tokio::test]
#[serial]
#[ignore = "requires a PostgreSQL server (DATABASE_URL)"]
async fn e1_create_and_apply() {
    let h = Harness::new().await;
    let template = h.postgres_template().await;
    let stack = h.stack("db-stack").await;
    let instance = h.instance(&stack, "pg1", Some(template.service_id())).await;

    let plan = h.reconciler.plan("db-stack").await.unwrap();
    let executable: Vec<_> = plan.executable().collect();
    assert_eq!(executable.len(), 1);
    assert_eq!(executable[0].kind, ActionKind::Create);
    assert_eq!(executable[0].container_name, "db-stack-pg1");

    let mut sub = h.broadcaster.subscribe();
    let result = h.reconciler.apply("db-stack", plan.token).await.unwrap();
    assert!(result.ok, "apply failed: {:?}", result.error);
    assert_eq!(result.completed, vec!["pg1".to_string()]);

    // Network and container exist on the runtime side.
    assert!(h.fake.network_names().contains(&"devarch-db-stack-net".to_string()));
    let container = h.fake.container("db-stack-pg1").expect("container exists");
    assert!(container.status.is_running());

    // State cache is authoritative progress.
    let cached = h
        .store
        .get_container_state(instance.instance_pk())
        .await
        .unwrap()
        .expect("state cached");
    assert!(matches!(cached.status.as_str(), "running" | "created" | "starting"));

    // Subscribers saw a status push.
    assert!(sub.rx.try_recv().is_ok());

    // Apply idempotence: a fresh plan proposes nothing.
    let replan = h.reconciler.plan("db-stack").await.unwrap();
    assert!(replan.is_empty(), "unexpected residual actions: {:?}", replan.actions);
}

#[tokio::test]
#[serial]
#[ignore = "requires a PostgreSQL server (DATABASE_URL)"]
async fn plan_is_idempotent_on_an_unchanged_world() {
    let h = Harness::new().await;
    let template = h.postgres_template().await;
    let stack = h.stack("db-stack").await;
    h.instance(&stack, "pg1", Some(template.service_id())).await;

    let first = h.reconciler.plan("db-stack").await.unwrap();
    let second = h.reconciler.plan("db-stack").await.unwrap();

    assert_eq!(first.state_hash, second.state_hash);
    let kinds = |p: &devarch_engine::Plan| {
        p.actions.iter().map(|a| (a.kind, a.instance.clone())).collect::<Vec<_>>()
    };
    assert_eq!(kinds(&first), kinds(&second));
    assert_ne!(first.token, second.token);
}

#[tokio::test]
#[serial]
#[ignore = "requires a PostgreSQL server (DATABASE_URL)"]
async fn e2_overlay_wins_and_forces_recreate() {
    let h = Harness::new().await;
    let template = h.postgres_template().await;
    let stack = h.stack("db-stack").await;
    let instance = h.instance(&stack, "pg1", Some(template.service_id())).await;

    let plan = h.reconciler.plan("db-stack").await.unwrap();
    let before = h.store.effective_config(stack.stack_id(), "pg1").await.unwrap();
    h.reconciler.apply("db-stack", plan.token).await.unwrap();

    h.store
        .replace_instance_env_vars(
            instance.instance_pk(),
            vec![OverlayRow::set(EnvVar {
                key: "POSTGRES_PASSWORD".into(),
                value: "secret".into(),
            })],
        )
        .await
        .unwrap();

    let after = h.store.effective_config(stack.stack_id(), "pg1").await.unwrap();
    let pw = after.effective.env_vars.iter().find(|e| e.key == "POSTGRES_PASSWORD").unwrap();
    assert_eq!(pw.value, "secret");
    assert_ne!(before.spec_hash, after.spec_hash);

    let plan = h.reconciler.plan("db-stack").await.unwrap();
    let executable: Vec<_> = plan.executable().collect();
    assert_eq!(executable.len(), 1);
    assert_eq!(executable[0].kind, ActionKind::Recreate);

    let result = h.reconciler.apply("db-stack", plan.token).await.unwrap();
    assert!(result.ok);

    let container = h.fake.container("db-stack-pg1").unwrap();
    assert!(container.env.contains(&"POSTGRES_PASSWORD=secret".to_string()));
}

#[tokio::test]
#[serial]
#[ignore = "requires a PostgreSQL server (DATABASE_URL)"]
async fn e3_stale_plan_is_rejected_without_side_effects() {
    let h = Harness::new().await;
    let template = h.postgres_template().await;
    let stack = h.stack("db-stack").await;
    h.instance(&stack, "pg1", Some(template.service_id())).await;

    let plan = h.reconciler.plan("db-stack").await.unwrap();

    // Mutation between Plan and Apply.
    let pg2 = h.instance(&stack, "pg2", None).await;
    h.store
        .update_instance_overrides(
            pg2.instance_pk(),
            &InstanceOverrides {
                image_name: Some(Some("redis".into())),
                image_tag: Some(Some("7".into())),
                ..Default::default()
            },
            pg2.row_version,
        )
        .await
        .unwrap();

    let err = h.reconciler.apply("db-stack", plan.token).await.unwrap_err();
    assert!(matches!(err, EngineError::StalePlan));
    assert_eq!(err.kind().http_status(), 409);

    // World unchanged: nothing was created.
    assert!(h.fake.container_names().is_empty());
}

#[tokio::test]
#[serial]
#[ignore = "requires a PostgreSQL server (DATABASE_URL)"]
async fn e4_partial_failure_leaves_completed_work_and_replans_residual() {
    let h = Harness::new().await;
    let stack = h.stack("web").await;

    for slug in ["a", "b"] {
        let instance = h.instance(&stack, slug, None).await;
        h.store
            .update_instance_overrides(
                instance.instance_pk(),
                &InstanceOverrides {
                    image_name: Some(Some("app".into())),
                    image_tag: Some(Some("1".into())),
                    ..Default::default()
                },
                instance.row_version,
            )
            .await
            .unwrap();
    }
    let c = h.instance(&stack, "c", None).await;
    h.store
        .update_instance_overrides(
            c.instance_pk(),
            &InstanceOverrides {
                image_name: Some(Some("ghost".into())),
                image_tag: Some(Some("1".into())),
                ..Default::default()
            },
            c.row_version,
        )
        .await
        .unwrap();
    let c = h.store.get_instance(stack.stack_id(), "c").await.unwrap();
    h.store
        .replace_instance_dependencies(
            c.instance_pk(),
            vec![OverlayRow::set(Dependency {
                depends_on: "b".into(),
                condition: DependsCondition::ServiceHealthy,
            })],
        )
        .await
        .unwrap();
    h.fake.fail_image("ghost:1");

    let plan = h.reconciler.plan("web").await.unwrap();
    let result = h.reconciler.apply("web", plan.token).await.unwrap();

    assert!(!result.ok);
    assert_eq!(result.completed, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(result.failed_at.as_deref(), Some("c"));
    assert!(result.error.unwrap().contains("ghost"));

    // Completed work stays; re-plan proposes only the residual.
    assert_eq!(h.fake.container_names(), vec!["web-a".to_string(), "web-b".to_string()]);
    let replan = h.reconciler.plan("web").await.unwrap();
    let residual: Vec<_> = replan.executable().collect();
    assert_eq!(residual.len(), 1);
    assert_eq!(residual[0].instance, "c");

    // Fixing the image completes the stack.
    let c = h.store.get_instance(stack.stack_id(), "c").await.unwrap();
    h.store
        .update_instance_overrides(
            c.instance_pk(),
            &InstanceOverrides { image_name: Some(Some("app".into())), ..Default::default() },
            c.row_version,
        )
        .await
        .unwrap();
    let plan = h.reconciler.plan("web").await.unwrap();
    let result = h.reconciler.apply("web", plan.token).await.unwrap();
    assert!(result.ok);
    assert_eq!(
        h.fake.container_names(),
        vec!["web-a".to_string(), "web-b".to_string(), "web-c".to_string()]
    );
}

#[tokio::test]
#[serial]
#[ignore = "requires a PostgreSQL server (DATABASE_URL)"]
async fn e5_soft_delete_and_restore() {
    let h = Harness::new().await;
    let template = h.postgres_template().await;
    let stack = h.stack("db-stack").await;
    h.instance(&stack, "pg1", Some(template.service_id())).await;

    let plan = h.reconciler.plan("db-stack").await.unwrap();
    h.reconciler.apply("db-stack", plan.token).await.unwrap();
    assert!(!h.fake.container_names().is_empty());

    // Teardown then tombstone.
    h.reconciler.teardown_stack("db-stack").await.unwrap();
    h.store.soft_delete_stack(stack.stack_id()).await.unwrap();

    assert!(h.fake.container_names().is_empty());
    assert!(h.fake.network_names().is_empty());
    assert!(h.store.list_stacks().await.unwrap().is_empty());
    let trash = h.store.list_trash().await.unwrap();
    assert_eq!(trash.len(), 1);

    let restored = h.store.restore_stack(stack.stack_id()).await.unwrap();
    assert_eq!(restored.id, stack.id);
    assert!(h.store.get_stack("db-stack").await.is_ok());
}

#[tokio::test]
#[serial]
#[ignore = "requires a PostgreSQL server (DATABASE_URL)"]
async fn e6_port_collision_fails_validation_naming_both_instances() {
    let h = Harness::new().await;
    let template = h.postgres_template().await;
    let stack = h.stack("db-stack").await;
    h.instance(&stack, "pg1", Some(template.service_id())).await;
    h.instance(&stack, "pg2", Some(template.service_id())).await;

    let err = h.reconciler.plan("db-stack").await.unwrap_err();
    assert_eq!(err.kind().http_status(), 422);
    let message = err.to_string();
    assert!(message.contains("pg1"), "{message}");
    assert!(message.contains("pg2"), "{message}");
    assert!(message.contains("5432"), "{message}");
}

#[tokio::test]
#[serial]
#[ignore = "requires a PostgreSQL server (DATABASE_URL)"]
async fn compose_rendering_reflects_overlays() {
    let h = Harness::new().await;
    let template = h.postgres_template().await;
    let stack = h.stack("db-stack").await;
    let instance = h.instance(&stack, "pg1", Some(template.service_id())).await;
    h.store
        .replace_instance_env_vars(
            instance.instance_pk(),
            vec![OverlayRow::set(EnvVar { key: "POSTGRES_PASSWORD".into(), value: "secret".into() })],
        )
        .await
        .unwrap();

    let yaml = h.reconciler.render_compose("db-stack").await.unwrap();
    assert!(yaml.contains("db-stack-pg1"));
    assert!(yaml.contains("postgres:16"));
    assert!(yaml.contains("secret"));
    assert!(yaml.contains("devarch-db-stack-net"));
}

// Mutual exclusion across concurrent applies is covered at the store
// layer (advisory_lock_excludes_second_holder); driving two full applies
// here would spend the 5-minute lock wait budget.

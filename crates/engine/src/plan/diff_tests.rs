// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use devarch_core::spec::EffectiveSpec;

fn desired(slug: &str, hash: &str) -> DesiredInstance {
    DesiredInstance {
        instance_pk: InstanceId::new(1),
        slug: slug.to_string(),
        container_name: format!("s-{slug}"),
        spec: EffectiveSpec {
            image_name: "app".into(),
            image_tag: "1".into(),
            ..Default::default()
        },
        spec_hash: hash.to_string(),
    }
}

fn live(slug: &str, hash: Option<&str>, status: ContainerStatus) -> LiveContainer {
    LiveContainer {
        id: format!("id-{slug}"),
        name: format!("s-{slug}"),
        slug: Some(slug.to_string()),
        spec_hash: hash.map(String::from),
        status,
        image: "app:1".into(),
    }
}

#[test]
fn missing_container_is_create() {
    let actions = diff(&[desired("a", "h1")], &[], false);
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].kind, ActionKind::Create);
    assert_eq!(actions[0].container_name, "s-a");
    assert_eq!(actions[0].spec_hash.as_deref(), Some("h1"));
}

#[test]
fn matching_hash_running_is_noop() {
    let actions = diff(
        &[desired("a", "h1")],
        &[live("a", Some("h1"), ContainerStatus::Running)],
        false,
    );
    assert_eq!(actions[0].kind, ActionKind::Noop);
}

#[test]
fn matching_hash_but_stopped_is_recreate() {
    let actions = diff(
        &[desired("a", "h1")],
        &[live("a", Some("h1"), ContainerStatus::Exited)],
        false,
    );
    assert_eq!(actions[0].kind, ActionKind::Recreate);
}

#[test]
fn hash_drift_is_recreate_without_in_place_support() {
    let actions = diff(
        &[desired("a", "h2")],
        &[live("a", Some("h1"), ContainerStatus::Running)],
        false,
    );
    assert_eq!(actions[0].kind, ActionKind::Recreate);
}

#[test]
fn mutable_drift_is_update_when_supported() {
    // Same image, drifted hash: only mutable fields changed.
    let actions = diff(
        &[desired("a", "h2")],
        &[live("a", Some("h1"), ContainerStatus::Running)],
        true,
    );
    assert_eq!(actions[0].kind, ActionKind::Update);
}

#[test]
fn image_change_recreates_even_with_in_place_support() {
    let mut want = desired("a", "h2");
    want.spec.image_tag = "2".into();
    let actions = diff(
        &[want],
        &[live("a", Some("h1"), ContainerStatus::Running)],
        true,
    );
    assert_eq!(actions[0].kind, ActionKind::Recreate);
}

#[test]
fn missing_spec_label_is_recreate() {
    let actions = diff(
        &[desired("a", "h1")],
        &[live("a", None, ContainerStatus::Running)],
        false,
    );
    assert_eq!(actions[0].kind, ActionKind::Recreate);
    assert_eq!(actions[0].reason, "no recorded spec");
}

#[test]
fn orphan_container_is_delete() {
    let actions = diff(&[], &[live("gone", Some("h1"), ContainerStatus::Running)], false);
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].kind, ActionKind::Delete);
    assert_eq!(actions[0].container_id.as_deref(), Some("id-gone"));
}

#[test]
fn unlabeled_container_matches_by_name() {
    let unlabeled = LiveContainer {
        id: "id-x".into(),
        name: "s-a".into(),
        slug: None,
        spec_hash: None,
        status: ContainerStatus::Running,
        image: "app:1".into(),
    };
    let actions = diff(&[desired("a", "h1")], &[unlabeled], false);
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].kind, ActionKind::Recreate);
}

#[test]
fn mixed_world_produces_one_action_per_subject() {
    let actions = diff(
        &[desired("a", "h1"), desired("b", "h2")],
        &[
            live("a", Some("h1"), ContainerStatus::Running),
            live("c", Some("h3"), ContainerStatus::Running),
        ],
        false,
    );
    let kinds: Vec<ActionKind> = actions.iter().map(|a| a.kind).collect();
    assert_eq!(kinds, vec![ActionKind::Noop, ActionKind::Create, ActionKind::Delete]);
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::spec::{
    Dependency, DependsCondition, EnvVar, Healthcheck, HealthcheckOverlay, OverlayEntry,
    PortBinding, Protocol,
};
use proptest::prelude::*;

fn postgres_template() -> ServiceSpec {
    ServiceSpec {
        image_name: "postgres".into(),
        image_tag: "16".into(),
        env_vars: vec![
            EnvVar { key: "POSTGRES_PASSWORD".into(), value: "devarch".into() },
            EnvVar { key: "POSTGRES_USER".into(), value: "devarch".into() },
        ],
        ports: vec![PortBinding {
            host_ip: None,
            host_port: Some(5432),
            container_port: 5432,
            protocol: Protocol::Tcp,
        }],
        healthcheck: Some(Healthcheck {
            test: "pg_isready -U devarch".into(),
            interval_secs: 5,
            timeout_secs: 3,
            retries: 5,
            start_period_secs: 10,
        }),
        ..Default::default()
    }
}

#[test]
fn empty_overlay_inherits_template() {
    let template = postgres_template();
    let effective = resolve(&template, &OverlaySpec::default());
    assert_eq!(effective.image_name, "postgres");
    assert_eq!(effective.image_tag, "16");
    assert_eq!(effective.env_vars.len(), 2);
    assert!(effective.healthcheck.is_some());
}

#[test]
fn overlay_env_wins_over_template() {
    let template = postgres_template();
    let overlay = OverlaySpec {
        env_vars: vec![OverlayEntry::Set(EnvVar {
            key: "POSTGRES_PASSWORD".into(),
            value: "secret".into(),
        })],
        ..Default::default()
    };
    let effective = resolve(&template, &overlay);
    let pw = effective.env_vars.iter().find(|e| e.key == "POSTGRES_PASSWORD").unwrap();
    assert_eq!(pw.value, "secret");
    // Untouched keys inherited.
    assert!(effective.env_vars.iter().any(|e| e.key == "POSTGRES_USER"));
}

#[test]
fn overlay_scalar_replaces_when_set() {
    let template = postgres_template();
    let overlay = OverlaySpec { image_tag: Some("17".into()), ..Default::default() };
    let effective = resolve(&template, &overlay);
    assert_eq!(effective.image_tag, "17");
    assert_eq!(effective.image_name, "postgres");
}

#[test]
fn disabled_healthcheck_overlay_removes() {
    let template = postgres_template();
    let overlay = OverlaySpec {
        healthcheck: Some(HealthcheckOverlay { disabled: true, check: None }),
        ..Default::default()
    };
    assert!(resolve(&template, &overlay).healthcheck.is_none());
}

#[test]
fn empty_healthcheck_overlay_does_not_inherit() {
    // disabled: false with no check still replaces wholesale: the
    // template's probe must not leak through.
    let template = postgres_template();
    let overlay = OverlaySpec {
        healthcheck: Some(HealthcheckOverlay { disabled: false, check: None }),
        ..Default::default()
    };
    assert!(resolve(&template, &overlay).healthcheck.is_none());
}

#[test]
fn healthcheck_overlay_replaces_wholesale() {
    let template = postgres_template();
    let replacement = Healthcheck {
        test: "true".into(),
        interval_secs: 1,
        timeout_secs: 1,
        retries: 1,
        start_period_secs: 0,
    };
    let overlay = OverlaySpec {
        healthcheck: Some(HealthcheckOverlay { disabled: false, check: Some(replacement.clone()) }),
        ..Default::default()
    };
    assert_eq!(resolve(&template, &overlay).healthcheck, Some(replacement));
}

#[test]
fn overlay_changes_spec_hash() {
    let template = postgres_template();
    let base = resolve(&template, &OverlaySpec::default());
    let overlay = OverlaySpec {
        env_vars: vec![OverlayEntry::Set(EnvVar {
            key: "POSTGRES_PASSWORD".into(),
            value: "secret".into(),
        })],
        ..Default::default()
    };
    let changed = resolve(&template, &overlay);
    assert_ne!(spec_hash(&base), spec_hash(&changed));
}

#[test]
fn spec_hash_is_stable_across_runs() {
    let template = postgres_template();
    let a = spec_hash(&resolve(&template, &OverlaySpec::default()));
    let b = spec_hash(&resolve(&template, &OverlaySpec::default()));
    assert_eq!(a, b);
    assert_eq!(a.len(), 64);
    assert!(a.bytes().all(|b| b.is_ascii_hexdigit()));
}

#[test]
fn canonical_json_sorts_collections_by_key() {
    let template = ServiceSpec {
        image_name: "app".into(),
        image_tag: "1".into(),
        env_vars: vec![
            EnvVar { key: "Z".into(), value: "1".into() },
            EnvVar { key: "A".into(), value: "2".into() },
        ],
        ..Default::default()
    };
    let json = canonical_json(&resolve(&template, &OverlaySpec::default()));
    let z = json.find("\"Z\"").unwrap();
    let a = json.find("\"A\"").unwrap();
    assert!(a < z, "collections must serialize key-sorted: {json}");
}

#[test]
fn dependencies_merge_by_name() {
    let template = ServiceSpec {
        image_name: "app".into(),
        image_tag: "1".into(),
        dependencies: vec![Dependency {
            depends_on: "db".into(),
            condition: DependsCondition::ServiceStarted,
        }],
        ..Default::default()
    };
    let overlay = OverlaySpec {
        dependencies: vec![OverlayEntry::Set(Dependency {
            depends_on: "db".into(),
            condition: DependsCondition::ServiceHealthy,
        })],
        ..Default::default()
    };
    let effective = resolve(&template, &overlay);
    assert_eq!(effective.dependencies.len(), 1);
    assert_eq!(effective.dependencies[0].condition, DependsCondition::ServiceHealthy);
}

prop_compose! {
    fn arb_env()(key in "[A-Z][A-Z0-9_]{0,12}", value in "[a-z0-9]{0,16}") -> EnvVar {
        EnvVar { key, value }
    }
}

proptest! {
    // Hash must not depend on the insertion order of overlay rows.
    #[test]
    fn hash_ignores_overlay_insertion_order(mut entries in prop::collection::vec(arb_env(), 1..8)) {
        let template = postgres_template();
        let forward = OverlaySpec {
            env_vars: entries.iter().cloned().map(OverlayEntry::Set).collect(),
            ..Default::default()
        };
        entries.reverse();
        let reversed = OverlaySpec {
            env_vars: entries.iter().cloned().map(OverlayEntry::Set).collect(),
            ..Default::default()
        };
        // Last write wins per key, so restrict the property to distinct keys.
        let mut keys: Vec<_> = entries.iter().map(|e| e.key.clone()).collect();
        keys.sort();
        keys.dedup();
        prop_assume!(keys.len() == entries.len());

        let a = spec_hash(&resolve(&template, &forward));
        let b = spec_hash(&resolve(&template, &reversed));
        prop_assert_eq!(a, b);
    }
}

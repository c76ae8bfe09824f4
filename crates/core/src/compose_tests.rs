// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::spec::{Dependency, EffectiveSpec, EnvVar, PortBinding, Protocol, VolumeMount};

fn sample_spec() -> EffectiveSpec {
    EffectiveSpec {
        image_name: "postgres".into(),
        image_tag: "16".into(),
        ports: vec![PortBinding {
            host_ip: Some("127.0.0.1".into()),
            host_port: Some(5432),
            container_port: 5432,
            protocol: Protocol::Tcp,
        }],
        volumes: vec![VolumeMount {
            source: "pgdata".into(),
            target: "/var/lib/postgresql/data".into(),
            read_only: false,
        }],
        env_vars: vec![EnvVar { key: "POSTGRES_PASSWORD".into(), value: "devarch".into() }],
        dependencies: vec![Dependency {
            depends_on: "cache".into(),
            condition: crate::spec::DependsCondition::ServiceHealthy,
        }],
        ..Default::default()
    }
}

#[test]
fn renders_service_under_container_name() {
    let yaml = render_stack("devarch-db-stack-net", &[("db-stack-pg1".into(), sample_spec())])
        .unwrap();
    assert!(yaml.contains("db-stack-pg1"));
    assert!(yaml.contains("image: postgres:16"));
    assert!(yaml.contains("127.0.0.1:5432:5432/tcp"));
    assert!(yaml.contains("POSTGRES_PASSWORD"));
}

#[test]
fn renders_network_block() {
    let yaml = render_stack("devarch-db-stack-net", &[]).unwrap();
    assert!(yaml.contains("devarch-db-stack-net"));
    assert!(yaml.contains("driver: bridge"));
}

#[test]
fn renders_depends_on_condition() {
    let yaml =
        render_stack("net", &[("db-stack-pg1".into(), sample_spec())]).unwrap();
    assert!(yaml.contains("service_healthy"));
}

#[test]
fn read_only_volume_gets_ro_suffix() {
    let mut spec = sample_spec();
    spec.volumes[0].read_only = true;
    let yaml = render_stack("net", &[("svc".into(), spec)]).unwrap();
    assert!(yaml.contains(":ro"));
}

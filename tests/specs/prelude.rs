// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for spec scenarios.

use std::sync::Arc;

use devarch_core::spec::{EnvVar, Healthcheck, PortBinding, Protocol, ServiceSpec};
use devarch_engine::{Broadcaster, Reconciler};
use devarch_runtime::{ContainerRuntime, FakeRuntime};
use devarch_store::{NewInstance, NewStack, NewTemplate, ServiceInstance, Stack, Store};

/// One scenario's world: a scratch database and an in-memory runtime.
pub struct Harness {
    pub store: Store,
    pub fake: FakeRuntime,
    pub reconciler: Reconciler,
    pub broadcaster: Broadcaster,
}

impl Harness {
    /// Connect, migrate, and wipe the desired-state tables so each
    /// scenario starts from the spec's "empty database".
    pub async fn new() -> Self {
        let url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must point at a scratch PostgreSQL database");
        let store = Store::connect(&url).await.expect("connect");
        store.migrate().await.expect("migrate");
        sqlx::query("TRUNCATE stacks, services, categories, sync_state CASCADE")
            .execute(store.pool())
            .await
            .expect("truncate");

        let fake = FakeRuntime::new();
        let runtime: Arc<dyn ContainerRuntime> = Arc::new(fake.clone());
        let broadcaster = Broadcaster::new();
        let reconciler = Reconciler::new(store.clone(), runtime, broadcaster.clone());
        Self { store, fake, reconciler, broadcaster }
    }

    /// The spec's canonical "postgres" template.
    pub async fn postgres_template(&self) -> devarch_store::TemplateService {
        self.store
            .upsert_template(&NewTemplate {
                name: "postgres".into(),
                enabled: true,
                spec: ServiceSpec {
                    image_name: "postgres".into(),
                    image_tag: "16".into(),
                    env_vars: vec![EnvVar {
                        key: "POSTGRES_PASSWORD".into(),
                        value: "devarch".into(),
                    }],
                    ports: vec![PortBinding {
                        host_ip: None,
                        host_port: Some(5432),
                        container_port: 5432,
                        protocol: Protocol::Tcp,
                    }],
                    healthcheck: Some(Healthcheck {
                        test: "pg_isready -U postgres".into(),
                        interval_secs: 5,
                        timeout_secs: 3,
                        retries: 5,
                        start_period_secs: 5,
                    }),
                    ..Default::default()
                },
                ..Default::default()
            })
            .await
            .expect("upsert template")
    }

    pub async fn stack(&self, name: &str) -> Stack {
        self.store
            .create_stack(&NewStack { name: name.into(), ..Default::default() })
            .await
            .expect("create stack")
    }

    pub async fn instance(
        &self,
        stack: &Stack,
        slug: &str,
        template: Option<devarch_core::ServiceId>,
    ) -> ServiceInstance {
        self.store
            .create_instance(
                stack.stack_id(),
                &NewInstance {
                    instance_id: slug.into(),
                    template_service_id: template,
                    enabled: true,
                },
            )
            .await
            .expect("create instance")
    }
}

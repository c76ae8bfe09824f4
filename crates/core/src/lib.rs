// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! devarch-core: domain model for the DevArch control plane.
//!
//! Pure types and functions shared by the store, runtime adapter, and
//! reconciliation engine: identifiers, the container spec model, the
//! template/overlay resolver, canonical serialization and spec hashing,
//! label conventions, and the error taxonomy.

pub mod clock;
pub mod compose;
pub mod error;
pub mod id;
pub mod labels;
pub mod name;
pub mod resolve;
pub mod spec;
pub mod state;

pub use clock::{Clock, FakeClock, SystemClock};
pub use error::ErrorKind;
pub use id::{CategoryId, InstanceId, ServiceId, StackId};
pub use labels::{LABEL_INSTANCE, LABEL_SPEC, LABEL_STACK};
pub use name::{container_name, default_network_name, NameError};
pub use resolve::{canonical_json, resolve, spec_hash};
pub use spec::{
    ConfigFile, ConfigStatus, Dependency, DependsCondition, DomainRoute, EffectiveSpec, EnvVar,
    Healthcheck, HealthcheckOverlay, LabelPair, OverlayEntry, OverlaySpec, Overlayable,
    PortBinding, Protocol, RestartPolicy, ServiceSpec, VolumeMount, DELETE_MARKER,
};
pub use state::{ContainerStatus, HealthState};

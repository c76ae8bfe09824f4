// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn stale_plan_maps_to_conflict() {
    assert_eq!(EngineError::StalePlan.kind(), ErrorKind::Conflict);
    assert_eq!(EngineError::StalePlan.kind().http_status(), 409);
}

#[test]
fn plan_lookup_failures_split_not_found_and_conflict() {
    assert_eq!(EngineError::PlanUnknown.kind(), ErrorKind::NotFound);
    assert_eq!(EngineError::PlanExpired.kind(), ErrorKind::Conflict);
}

#[test]
fn cyclic_dependencies_are_validation_failures() {
    let err = EngineError::CyclicDependencies(vec!["a".into(), "b".into(), "a".into()]);
    assert_eq!(err.kind(), ErrorKind::ValidationFailed);
    assert!(err.to_string().contains("a -> b -> a"));
}

#[test]
fn health_timeout_is_fatal() {
    let err = EngineError::HealthTimeout {
        container: "db-stack-pg1".into(),
        timeout: Duration::from_secs(60),
    };
    assert_eq!(err.kind(), ErrorKind::Fatal);
}

#[test]
fn inner_error_kinds_pass_through() {
    let err = EngineError::from(StoreError::Conflict("edit race".into()));
    assert_eq!(err.kind(), ErrorKind::Conflict);
    let err = EngineError::from(RuntimeError::Transient("blip".into()));
    assert_eq!(err.kind(), ErrorKind::Transient);
}

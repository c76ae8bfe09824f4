// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use devarch_core::{FakeClock, StackId};
use std::time::Duration;

fn plan(clock: &FakeClock) -> Plan {
    Plan {
        token: Uuid::new_v4(),
        stack_id: StackId::new(1),
        stack_name: "db-stack".into(),
        state_hash: "h".into(),
        actions: Vec::new(),
        expires_at_ms: clock.epoch_ms() + PLAN_TTL.as_millis() as u64,
    }
}

#[test]
fn get_returns_inserted_plan() {
    let clock = FakeClock::new();
    let store = PlanStore::new(clock.clone());
    let plan = plan(&clock);
    store.insert(plan.clone());
    let fetched = store.get(plan.token).unwrap();
    assert_eq!(fetched.state_hash, plan.state_hash);
}

#[test]
fn unknown_token_is_distinct_from_expired() {
    let clock = FakeClock::new();
    let store = PlanStore::new(clock.clone());
    assert!(matches!(store.get(Uuid::new_v4()), Err(EngineError::PlanUnknown)));

    let plan = plan(&clock);
    store.insert(plan.clone());
    clock.advance(PLAN_TTL + Duration::from_secs(1));
    assert!(matches!(store.get(plan.token), Err(EngineError::PlanExpired)));
    // Once expired and evicted, the token is unknown.
    assert!(matches!(store.get(plan.token), Err(EngineError::PlanUnknown)));
}

#[test]
fn plan_is_valid_just_before_ttl() {
    let clock = FakeClock::new();
    let store = PlanStore::new(clock.clone());
    let plan = plan(&clock);
    store.insert(plan.clone());
    clock.advance(PLAN_TTL - Duration::from_secs(1));
    assert!(store.get(plan.token).is_ok());
}

#[test]
fn invalidate_removes_the_plan() {
    let clock = FakeClock::new();
    let store = PlanStore::new(clock.clone());
    let plan = plan(&clock);
    store.insert(plan.clone());
    store.invalidate(plan.token);
    assert!(matches!(store.get(plan.token), Err(EngineError::PlanUnknown)));
}

#[test]
fn insert_evicts_expired_entries() {
    let clock = FakeClock::new();
    let store = PlanStore::new(clock.clone());
    let old = plan(&clock);
    store.insert(old);
    clock.advance(PLAN_TTL + Duration::from_secs(1));
    store.insert(plan(&clock));
    assert_eq!(store.len(), 1);
}

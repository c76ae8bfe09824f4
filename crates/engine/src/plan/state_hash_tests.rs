// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn entry(instance: &str, state: &str, target: &str) -> StateHashEntry {
    StateHashEntry {
        instance: instance.to_string(),
        runtime_state: state.to_string(),
        target_hash: target.to_string(),
    }
}

#[test]
fn hash_is_order_independent() {
    let forward = vec![entry("a", "running:h1", "h1"), entry("b", "absent", "h2")];
    let reversed = vec![entry("b", "absent", "h2"), entry("a", "running:h1", "h1")];
    assert_eq!(state_hash(&forward), state_hash(&reversed));
}

#[test]
fn any_field_change_changes_the_hash() {
    let base = vec![entry("a", "running:h1", "h1")];
    let state_changed = vec![entry("a", "exited:h1", "h1")];
    let target_changed = vec![entry("a", "running:h1", "h2")];
    let instance_added = vec![entry("a", "running:h1", "h1"), entry("b", "absent", "h2")];

    let hash = state_hash(&base);
    assert_ne!(hash, state_hash(&state_changed));
    assert_ne!(hash, state_hash(&target_changed));
    assert_ne!(hash, state_hash(&instance_added));
}

#[test]
fn hash_is_stable_across_calls() {
    let entries = vec![entry("a", "running:h1", "h1")];
    assert_eq!(state_hash(&entries), state_hash(&entries));
    assert_eq!(state_hash(&entries).len(), 64);
}

#[test]
fn empty_world_hashes() {
    assert_eq!(state_hash(&[]).len(), 64);
    assert_ne!(state_hash(&[]), state_hash(&[entry("a", "absent", "h")]));
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn stack_lock_keys_are_namespaced() {
    assert_eq!(stack_lock_key(StackId::new(42)), "stack:42");
    assert_ne!(stack_lock_key(StackId::new(1)), stack_lock_key(StackId::new(2)));
}

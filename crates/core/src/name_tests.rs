// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn derives_stack_dash_instance() {
    assert_eq!(container_name("db-stack", "pg1").unwrap(), "db-stack-pg1");
}

#[test]
fn rejects_names_over_63_bytes() {
    let stack = "s".repeat(40);
    let instance = "i".repeat(40);
    match container_name(&stack, &instance) {
        Err(NameError::TooLong(name)) => assert!(name.len() > MAX_NAME_BYTES),
        other => panic!("expected TooLong, got {other:?}"),
    }
}

#[parameterized(
    uppercase = { "Db", "pg1" },
    underscore = { "db_stack", "pg1" },
    trailing_hyphen = { "db", "pg1-" },
    empty_instance_then_trailing_hyphen = { "db", "" },
)]
fn rejects_invalid_dns_labels(stack: &str, instance: &str) {
    assert!(matches!(
        container_name(stack, instance),
        Err(NameError::InvalidLabel(_))
    ));
}

#[test]
fn name_errors_classify_as_validation_failed() {
    let err = container_name("Db", "pg1").unwrap_err();
    assert_eq!(err.kind(), crate::error::ErrorKind::ValidationFailed);
}

#[test]
fn default_network_name_wraps_stack() {
    assert_eq!(default_network_name("db-stack"), "devarch-db-stack-net");
}

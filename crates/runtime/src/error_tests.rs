// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    missing = { 404, ErrorKind::NotFound },
    name_taken = { 409, ErrorKind::Conflict },
    denied = { 401, ErrorKind::Fatal },
    forbidden = { 403, ErrorKind::Fatal },
    server_error = { 500, ErrorKind::Transient },
    bad_gateway = { 502, ErrorKind::Transient },
    teapot = { 418, ErrorKind::Fatal },
)]
fn classifies_response_codes(status: u16, kind: ErrorKind) {
    assert_eq!(classify_status(status, String::new()).kind(), kind);
}

#[test]
fn socket_discovery_failure_is_unavailable() {
    assert_eq!(RuntimeError::SocketNotFound.kind(), ErrorKind::RuntimeUnavailable);
}

#[test]
fn not_found_is_retryable_only_after_create() {
    let err = RuntimeError::NotFound("c1".into());
    assert!(!err.is_transient());
    assert!(err.retryable_after_create());
}

#[test]
fn deadline_is_transient() {
    let err = RuntimeError::Deadline(std::time::Duration::from_secs(30));
    assert!(err.is_transient());
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn first_run_is_always_due() {
    assert!(cleanup_due(None, Utc::now()));
}

#[test]
fn recent_cleanup_is_not_due() {
    let now = Utc::now();
    assert!(!cleanup_due(Some(now - ChronoDuration::hours(23)), now));
}

#[test]
fn cleanup_is_due_after_the_window() {
    let now = Utc::now();
    assert!(cleanup_due(Some(now - ChronoDuration::hours(24)), now));
    assert!(cleanup_due(Some(now - ChronoDuration::days(3)), now));
}

#[test]
fn retention_window_is_seven_days() {
    assert_eq!(METRICS_RETENTION, Duration::from_secs(7 * 24 * 3600));
}

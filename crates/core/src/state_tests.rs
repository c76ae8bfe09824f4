// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    created = { "created", ContainerStatus::Created },
    running = { "running", ContainerStatus::Running },
    paused = { "paused", ContainerStatus::Paused },
    restarting = { "restarting", ContainerStatus::Restarting },
    removing = { "removing", ContainerStatus::Removing },
    exited = { "exited", ContainerStatus::Exited },
    dead = { "dead", ContainerStatus::Dead },
    garbage = { "warp-speed", ContainerStatus::Unknown },
)]
fn parses_runtime_status_strings(input: &str, expected: ContainerStatus) {
    assert_eq!(ContainerStatus::parse(input), expected);
}

#[test]
fn parse_and_as_str_round_trip() {
    for status in [
        ContainerStatus::Created,
        ContainerStatus::Running,
        ContainerStatus::Paused,
        ContainerStatus::Restarting,
        ContainerStatus::Removing,
        ContainerStatus::Exited,
        ContainerStatus::Dead,
    ] {
        assert_eq!(ContainerStatus::parse(status.as_str()), status);
    }
}

#[test]
fn restarting_counts_as_running() {
    assert!(ContainerStatus::Running.is_running());
    assert!(ContainerStatus::Restarting.is_running());
    assert!(!ContainerStatus::Exited.is_running());
}

#[parameterized(
    healthy = { "healthy", HealthState::Healthy },
    starting = { "starting", HealthState::Starting },
    unhealthy = { "unhealthy", HealthState::Unhealthy },
    absent = { "", HealthState::None },
)]
fn parses_health_strings(input: &str, expected: HealthState) {
    assert_eq!(HealthState::parse(input), expected);
}

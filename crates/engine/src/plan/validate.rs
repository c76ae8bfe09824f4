// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plan-time validation of a stack's desired state.

use std::collections::HashMap;

use super::diff::DesiredInstance;
use crate::error::EngineError;

/// Reject invalid desired state before any diffing: in-stack host port
/// collisions (naming both instances), oversized container names, and
/// dependencies on instances that will not exist.
pub fn validate_stack(desired: &[DesiredInstance]) -> Result<(), EngineError> {
    validate_names(desired)?;
    validate_ports(desired)?;
    validate_dependencies(desired)?;
    Ok(())
}

fn validate_names(desired: &[DesiredInstance]) -> Result<(), EngineError> {
    for instance in desired {
        if instance.container_name.len() > devarch_core::name::MAX_NAME_BYTES {
            return Err(EngineError::Validation(format!(
                "container name {} exceeds {} bytes",
                instance.container_name,
                devarch_core::name::MAX_NAME_BYTES
            )));
        }
    }
    Ok(())
}

/// `(host_ip, host_port)` must be unique across the stack; an unset
/// host ip binds all interfaces and collides with everything on the
/// same port.
fn validate_ports(desired: &[DesiredInstance]) -> Result<(), EngineError> {
    let mut seen: HashMap<u16, (&str, Option<&str>)> = HashMap::new();
    for instance in desired {
        for (host_ip, host_port) in instance.spec.host_ports() {
            if let Some((other, other_ip)) = seen.get(&host_port) {
                let distinct_ips = match (host_ip, other_ip) {
                    (Some(a), Some(b)) => a != *b,
                    _ => false,
                };
                if !distinct_ips {
                    return Err(EngineError::Validation(format!(
                        "host port {host_port} is declared by both {other} and {}",
                        instance.slug
                    )));
                }
            }
            seen.insert(host_port, (&instance.slug, host_ip));
        }
    }
    Ok(())
}

fn validate_dependencies(desired: &[DesiredInstance]) -> Result<(), EngineError> {
    for instance in desired {
        for dep in &instance.spec.dependencies {
            if dep.depends_on == instance.slug {
                return Err(EngineError::Validation(format!(
                    "instance {} depends on itself",
                    instance.slug
                )));
            }
            if !desired.iter().any(|d| d.slug == dep.depends_on) {
                return Err(EngineError::Validation(format!(
                    "instance {} depends on {}, which is missing or disabled",
                    instance.slug, dep.depends_on
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;

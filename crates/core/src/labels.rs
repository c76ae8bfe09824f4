// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container label conventions.
//!
//! The control plane stamps every container it creates with these labels
//! and reads them back for plan diffing and status sync.

use std::collections::HashMap;

/// Stack the container belongs to (stack name).
pub const LABEL_STACK: &str = "devarch.stack";
/// Instance slug within the stack.
pub const LABEL_INSTANCE: &str = "devarch.instance";
/// Hex SHA-256 of the canonical effective spec the container was created from.
pub const LABEL_SPEC: &str = "devarch.spec";

/// Labels written onto a managed container.
pub fn managed_labels(
    stack_name: &str,
    instance_slug: &str,
    spec_hash: &str,
) -> HashMap<String, String> {
    HashMap::from([
        (LABEL_STACK.to_string(), stack_name.to_string()),
        (LABEL_INSTANCE.to_string(), instance_slug.to_string()),
        (LABEL_SPEC.to_string(), spec_hash.to_string()),
    ])
}

/// Identity of a managed container, read back from its labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedIdentity {
    pub stack_name: String,
    pub instance_slug: String,
    pub spec_hash: Option<String>,
}

/// Parse the identity labels off a live container. Returns `None` for
/// containers the control plane does not manage.
pub fn parse_managed_labels(labels: &HashMap<String, String>) -> Option<ManagedIdentity> {
    let stack_name = labels.get(LABEL_STACK)?.clone();
    let instance_slug = labels.get(LABEL_INSTANCE)?.clone();
    Some(ManagedIdentity {
        stack_name,
        instance_slug,
        spec_hash: labels.get(LABEL_SPEC).cloned(),
    })
}

#[cfg(test)]
#[path = "labels_tests.rs"]
mod tests;

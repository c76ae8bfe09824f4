// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Effective-config resolution and spec hashing.
//!
//! `resolve` is a pure function of a template and its overlay; the result
//! serializes to a stable JSON form whose SHA-256 is the spec hash — the
//! state identity of an instance. The hash is stamped onto the live
//! container as the `devarch.spec` label and compared at plan time.

use sha2::{Digest, Sha256};

use crate::spec::{merge_collection, EffectiveSpec, OverlaySpec, ServiceSpec};

/// Merge a template and a per-instance overlay into the effective spec.
///
/// Scalar fields: overlay value replaces the template's when set.
/// Keyed collections: overlay entries replace, add, or delete by key.
/// Healthcheck: an overlay replaces wholesale; `disabled` removes it.
pub fn resolve(template: &ServiceSpec, overlay: &OverlaySpec) -> EffectiveSpec {
    // An overlay row replaces the template's probe wholesale, even when
    // it carries no check of its own; only an absent row inherits.
    let healthcheck = match &overlay.healthcheck {
        Some(hc) if hc.disabled => None,
        Some(hc) => hc.check.clone(),
        None => template.healthcheck.clone(),
    };

    EffectiveSpec {
        image_name: overlay
            .image_name
            .clone()
            .unwrap_or_else(|| template.image_name.clone()),
        image_tag: overlay
            .image_tag
            .clone()
            .unwrap_or_else(|| template.image_tag.clone()),
        restart_policy: overlay.restart_policy.unwrap_or(template.restart_policy),
        command: overlay.command.clone().or_else(|| template.command.clone()),
        user_spec: overlay
            .user_spec
            .clone()
            .or_else(|| template.user_spec.clone()),
        ports: merge_collection(&template.ports, &overlay.ports),
        volumes: merge_collection(&template.volumes, &overlay.volumes),
        env_vars: merge_collection(&template.env_vars, &overlay.env_vars),
        labels: merge_collection(&template.labels, &overlay.labels),
        domains: merge_collection(&template.domains, &overlay.domains),
        healthcheck,
        dependencies: merge_collection(&template.dependencies, &overlay.dependencies),
        config_files: merge_collection(&template.config_files, &overlay.config_files),
    }
}

/// Stable JSON form of an effective spec: struct fields in declaration
/// order, collections already key-sorted by the merge.
pub fn canonical_json(spec: &EffectiveSpec) -> String {
    // EffectiveSpec serialization is infallible: no maps with non-string
    // keys, no non-finite floats.
    serde_json::to_string(spec).unwrap_or_default()
}

/// Hex SHA-256 over the canonical JSON form.
pub fn spec_hash(spec: &EffectiveSpec) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_json(spec).as_bytes());
    hex_encode(&hasher.finalize())
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

#[cfg(test)]
#[path = "resolve_tests.rs"]
mod tests;

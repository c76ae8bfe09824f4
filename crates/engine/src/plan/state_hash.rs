// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! World fingerprint binding a plan to the state it was computed from.
//!
//! Apply recomputes this from the current world; a mismatch means
//! something changed between Plan and Apply and the plan is stale.

use sha2::{Digest, Sha256};

/// One instance's contribution to the state hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateHashEntry {
    /// Instance slug, or container name for orphans.
    pub instance: String,
    /// Observed runtime state, including the recorded spec label.
    pub runtime_state: String,
    /// Target spec hash, `-` for containers slated for deletion.
    pub target_hash: String,
}

/// Hash the ordered entries. Sorting happens here so callers need not
/// care about load order.
pub fn state_hash(entries: &[StateHashEntry]) -> String {
    let mut lines: Vec<String> = entries
        .iter()
        .map(|e| format!("{}|{}|{}", e.instance, e.runtime_state, e.target_hash))
        .collect();
    lines.sort_unstable();

    let mut hasher = Sha256::new();
    for line in &lines {
        hasher.update(line.as_bytes());
        hasher.update(b"\n");
    }
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

#[cfg(test)]
#[path = "state_hash_tests.rs"]
mod tests;

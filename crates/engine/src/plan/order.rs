// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dependency-correct action ordering.
//!
//! Deletes run first in reverse dependency order (dependents torn down
//! before their dependencies), then create-side actions in forward
//! order. Cycles are rejected.

use std::collections::{BTreeMap, HashMap, HashSet};

use devarch_core::Dependency;

use super::{ActionKind, PlanAction};
use crate::error::EngineError;

/// Order diffed actions by the stack's dependency edges.
pub fn order_actions(
    actions: Vec<PlanAction>,
    deps: &HashMap<String, Vec<Dependency>>,
) -> Result<Vec<PlanAction>, EngineError> {
    let create_side: Vec<&PlanAction> = actions
        .iter()
        .filter(|a| !matches!(a.kind, ActionKind::Delete))
        .collect();
    let slugs: Vec<String> = create_side.iter().map(|a| a.instance.clone()).collect();
    let forward = topo_order(&slugs, deps)?;
    let position: HashMap<&str, usize> =
        forward.iter().enumerate().map(|(i, s)| (s.as_str(), i)).collect();

    let mut deletes: Vec<PlanAction> = Vec::new();
    let mut rest: Vec<PlanAction> = Vec::new();
    for action in actions {
        if matches!(action.kind, ActionKind::Delete) {
            deletes.push(action);
        } else {
            rest.push(action);
        }
    }

    // Reverse order for teardown; orphans (no dependency info) go first,
    // ordered by name for determinism.
    deletes.sort_by(|a, b| {
        let pa = position.get(a.instance.as_str());
        let pb = position.get(b.instance.as_str());
        pb.cmp(&pa).then_with(|| a.container_name.cmp(&b.container_name))
    });

    rest.sort_by_key(|a| position.get(a.instance.as_str()).copied().unwrap_or(usize::MAX));

    deletes.extend(rest);
    Ok(deletes)
}

/// Kahn's algorithm over the instances present in the plan, with a
/// deterministic tie-break. Dependency edges to instances outside the
/// set (deleted, disabled) are ignored here; validation rejects the
/// ones that matter.
pub fn topo_order(
    slugs: &[String],
    deps: &HashMap<String, Vec<Dependency>>,
) -> Result<Vec<String>, EngineError> {
    let present: HashSet<&str> = slugs.iter().map(String::as_str).collect();

    // in-degree and reverse adjacency, keyed deterministically
    let mut in_degree: BTreeMap<&str, usize> = slugs.iter().map(|s| (s.as_str(), 0)).collect();
    let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for slug in slugs {
        for dep in deps.get(slug).into_iter().flatten() {
            if !present.contains(dep.depends_on.as_str()) {
                continue;
            }
            *in_degree.entry(slug.as_str()).or_default() += 1;
            dependents
                .entry(dep.depends_on.as_str())
                .or_default()
                .push(slug.as_str());
        }
    }

    let mut ready: Vec<&str> = in_degree
        .iter()
        .filter(|(_, d)| **d == 0)
        .map(|(s, _)| *s)
        .collect();
    ready.sort_unstable();

    let mut ordered = Vec::with_capacity(slugs.len());
    while let Some(next) = ready.first().copied() {
        ready.remove(0);
        ordered.push(next.to_string());
        for dependent in dependents.get(next).into_iter().flatten() {
            let degree = in_degree.entry(dependent).or_default();
            *degree -= 1;
            if *degree == 0 {
                let pos = ready.binary_search(dependent).unwrap_or_else(|p| p);
                ready.insert(pos, dependent);
            }
        }
    }

    if ordered.len() != slugs.len() {
        let mut cycle: Vec<String> = in_degree
            .iter()
            .filter(|(_, d)| **d > 0)
            .map(|(s, _)| s.to_string())
            .collect();
        cycle.sort();
        return Err(EngineError::CyclicDependencies(cycle));
    }

    Ok(ordered)
}

#[cfg(test)]
#[path = "order_tests.rs"]
mod tests;

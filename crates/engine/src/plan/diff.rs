// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Set difference between desired instances and live containers.

use devarch_core::{ContainerStatus, EffectiveSpec, InstanceId};

use super::{ActionKind, PlanAction};

/// One enabled, non-deleted instance with its resolved spec.
#[derive(Debug, Clone)]
pub struct DesiredInstance {
    pub instance_pk: InstanceId,
    pub slug: String,
    pub container_name: String,
    pub spec: EffectiveSpec,
    pub spec_hash: String,
}

/// One live container carrying the stack's label.
#[derive(Debug, Clone)]
pub struct LiveContainer {
    pub id: String,
    pub name: String,
    /// `devarch.instance` label.
    pub slug: Option<String>,
    /// `devarch.spec` label recorded at creation.
    pub spec_hash: Option<String>,
    pub status: ContainerStatus,
    pub image: String,
}

impl LiveContainer {
    /// Match by instance label first, falling back to the derived name.
    pub fn matches(&self, slug: &str, container_name: &str) -> bool {
        match &self.slug {
            Some(live_slug) => live_slug == slug,
            None => self.name == container_name,
        }
    }
}

/// Compute unordered actions. `supports_in_place` gates the UPDATE kind;
/// when false, mutable-only drift degrades to RECREATE so the action
/// algebra stays closed over what the runtime can execute.
pub fn diff(
    desired: &[DesiredInstance],
    live: &[LiveContainer],
    supports_in_place: bool,
) -> Vec<PlanAction> {
    let mut actions = Vec::new();

    for want in desired {
        let observed = live.iter().find(|l| l.matches(&want.slug, &want.container_name));
        let action = match observed {
            None => PlanAction {
                kind: ActionKind::Create,
                instance_pk: Some(want.instance_pk),
                instance: want.slug.clone(),
                container_name: want.container_name.clone(),
                container_id: None,
                spec_hash: Some(want.spec_hash.clone()),
                reason: "no live container".to_string(),
            },
            Some(have) => classify_existing(want, have, supports_in_place),
        };
        actions.push(action);
    }

    for have in live {
        let matched = desired.iter().any(|d| have.matches(&d.slug, &d.container_name));
        if !matched {
            actions.push(PlanAction {
                kind: ActionKind::Delete,
                instance_pk: None,
                instance: have.slug.clone().unwrap_or_else(|| have.name.clone()),
                container_name: have.name.clone(),
                container_id: Some(have.id.clone()),
                spec_hash: None,
                reason: "no matching instance".to_string(),
            });
        }
    }

    actions
}

fn classify_existing(
    want: &DesiredInstance,
    have: &LiveContainer,
    supports_in_place: bool,
) -> PlanAction {
    let base = PlanAction {
        kind: ActionKind::Noop,
        instance_pk: Some(want.instance_pk),
        instance: want.slug.clone(),
        container_name: want.container_name.clone(),
        container_id: Some(have.id.clone()),
        spec_hash: Some(want.spec_hash.clone()),
        reason: String::new(),
    };

    let recorded = have.spec_hash.as_deref();
    if recorded == Some(want.spec_hash.as_str()) {
        if have.status.is_running() {
            return PlanAction { reason: "spec unchanged".to_string(), ..base };
        }
        return PlanAction {
            kind: ActionKind::Recreate,
            reason: format!("container {} but should be running", have.status),
            ..base
        };
    }

    // Spec drift. Only mutable-field drift (labels, env) qualifies for
    // an in-place UPDATE, and only when the runtime can execute one; an
    // image change is always immutable.
    if supports_in_place && have.image == want.spec.image_ref() {
        return PlanAction {
            kind: ActionKind::Update,
            reason: "mutable fields changed".to_string(),
            ..base
        };
    }

    PlanAction {
        kind: ActionKind::Recreate,
        reason: match recorded {
            Some(_) => "spec changed".to_string(),
            None => "no recorded spec".to_string(),
        },
        ..base
    }
}

#[cfg(test)]
#[path = "diff_tests.rs"]
mod tests;

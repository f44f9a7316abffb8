//! Per-slot state artifacts.
//!
//! Every artifact assigns an explicit value to every path any slot has ever
//! tracked (the union domain). Switching between slots therefore never leaves
//! an object at whatever value the previous state happened to write, no
//! matter how the host resolves write-defaults.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::finding::Finding;
use crate::path::{resolve_path, PathKey};
use crate::scene::{NodeId, Scene};
use crate::slot::{Slot, SlotError, SlotStore};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledArtifact {
    pub slot_index: usize,
    pub assignments: BTreeMap<PathKey, bool>,
    pub blend_assignments: BTreeMap<PathKey, BTreeMap<String, f32>>,
}

impl CompiledArtifact {
    pub fn active_paths(&self) -> impl Iterator<Item = &PathKey> + '_ {
        self.assignments
            .iter()
            .filter(|(_, &active)| active)
            .map(|(p, _)| p)
    }
}

/// An artifact plus the findings raised while building it.
#[derive(Debug, Clone, PartialEq)]
pub struct Compiled {
    pub artifact: CompiledArtifact,
    pub findings: Vec<Finding>,
}

/// Every path tracked by any slot, configured or not.
pub fn union_tracked_paths(store: &SlotStore) -> BTreeSet<PathKey> {
    store
        .slots()
        .iter()
        .flat_map(|s| s.tracked.iter().cloned())
        .collect()
}

/// Continuous parameter names recorded by any slot, per domain path.
fn blend_domain(
    store: &SlotStore,
    domain: &BTreeSet<PathKey>,
) -> BTreeMap<PathKey, BTreeSet<String>> {
    let mut out: BTreeMap<PathKey, BTreeSet<String>> = BTreeMap::new();
    for slot in store.slots() {
        for state in &slot.states {
            if !domain.contains(&state.path) {
                continue;
            }
            for (name, value) in &state.continuous {
                if value.is_finite() {
                    out.entry(state.path.clone()).or_default().insert(name.clone());
                }
            }
        }
    }
    out
}

fn compile_slot(
    index: usize,
    slot: &Slot,
    domain: &BTreeSet<PathKey>,
    blends: &BTreeMap<PathKey, BTreeSet<String>>,
    scene: &Scene,
    root: NodeId,
) -> Compiled {
    let assignments = domain
        .iter()
        .map(|p| (p.clone(), slot.is_active(p)))
        .collect();

    let blend_assignments = blends
        .iter()
        .map(|(path, names)| {
            let recorded = if slot.configured {
                slot.state_for(path).map(|s| &s.continuous)
            } else {
                None
            };
            let values = names
                .iter()
                .map(|name| {
                    let value = recorded
                        .and_then(|c| c.get(name))
                        .copied()
                        .filter(|v| v.is_finite())
                        .unwrap_or(0.0);
                    (name.clone(), value)
                })
                .collect();
            (path.clone(), values)
        })
        .collect();

    let findings = slot
        .tracked
        .iter()
        .filter(|p| resolve_path(scene, root, p).is_none())
        .map(|p| Finding::missing_object(index, &slot.name, p))
        .collect();

    Compiled {
        artifact: CompiledArtifact {
            slot_index: index,
            assignments,
            blend_assignments,
        },
        findings,
    }
}

/// Compile slot `index` into a total assignment over the union domain.
///
/// A path is `true` only when the slot is configured and recorded it active;
/// everything else is `false`. Continuous parameters default to `0.0`.
/// Missing scene objects are reported but never change the assignment.
pub fn compile(
    store: &SlotStore,
    index: usize,
    scene: &Scene,
    root: NodeId,
) -> Result<Compiled, SlotError> {
    let slot = store
        .slot(index)
        .ok_or(SlotError::IndexOutOfRange { index })?;
    let domain = union_tracked_paths(store);
    let blends = blend_domain(store, &domain);
    Ok(compile_slot(index, slot, &domain, &blends, scene, root))
}

/// Compile every slot in index order.
pub fn compile_all(store: &SlotStore, scene: &Scene, root: NodeId) -> Vec<Compiled> {
    let domain = union_tracked_paths(store);
    let blends = blend_domain(store, &domain);
    let compiled: Vec<Compiled> = store
        .slots()
        .iter()
        .enumerate()
        .map(|(i, slot)| compile_slot(i, slot, &domain, &blends, scene, root))
        .collect();
    log::debug!(
        target: "compile",
        "compiled {} slots over {} paths",
        compiled.len(),
        domain.len()
    );
    compiled
}

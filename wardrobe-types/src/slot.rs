//! Persisted outfit slots for one avatar.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::finding::{Finding, FindingCode};
use crate::path::{resolve_path, PathKey};
use crate::scene::{NodeId, Scene};
use crate::{AssetRef, AvatarId};

/// Number of slots every store holds.
pub const SLOT_COUNT: usize = 6;

pub fn default_slot_name(index: usize) -> String {
    format!("Outfit {}", index + 1)
}

/// Recorded state of one tracked object at capture time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectState {
    pub path: PathKey,
    pub active: bool,
    /// Continuous parameters (blend weights) captured alongside visibility.
    #[serde(default)]
    pub continuous: BTreeMap<String, f32>,
}

impl ObjectState {
    pub fn new(path: impl Into<PathKey>, active: bool) -> Self {
        Self {
            path: path.into(),
            active,
            continuous: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub name: String,
    #[serde(default)]
    pub tracked: BTreeSet<PathKey>,
    #[serde(default)]
    pub states: Vec<ObjectState>,
    /// Distinguishes "empty" from "explicitly nothing active".
    #[serde(default)]
    pub configured: bool,
    #[serde(default)]
    pub icon: Option<AssetRef>,
}

impl Slot {
    pub fn empty(index: usize) -> Self {
        Self {
            name: default_slot_name(index),
            tracked: BTreeSet::new(),
            states: Vec::new(),
            configured: false,
            icon: None,
        }
    }

    pub fn state_for(&self, path: &PathKey) -> Option<&ObjectState> {
        self.states.iter().find(|s| &s.path == path)
    }

    /// Whether this slot records `path` as active. Unconfigured slots never do.
    pub fn is_active(&self, path: &PathKey) -> bool {
        self.configured && self.state_for(path).map(|s| s.active).unwrap_or(false)
    }

    /// Upgrade slots saved before tracked paths existed: derive `tracked` from
    /// the recorded states. Returns true if anything changed.
    pub fn migrate_legacy_states(&mut self) -> bool {
        if !self.tracked.is_empty() || self.states.is_empty() {
            return false;
        }
        self.tracked = self.states.iter().map(|s| s.path.clone()).collect();
        true
    }
}

/// Error from a slot store operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotError {
    IndexOutOfRange { index: usize },
    EmptyName { index: usize },
}

impl std::fmt::Display for SlotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IndexOutOfRange { index } => {
                write!(f, "slot index {} out of range (0..{})", index, SLOT_COUNT)
            }
            Self::EmptyName { index } => write!(f, "slot {} name cannot be empty", index),
        }
    }
}

impl std::error::Error for SlotError {}

/// Result of a capture. `resolved == 0` means nothing was saved.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureOutcome {
    pub slot: Slot,
    pub resolved: usize,
    pub findings: Vec<Finding>,
}

impl CaptureOutcome {
    pub fn is_saved(&self) -> bool {
        self.resolved > 0
    }
}

/// All outfit slots of one avatar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotStore {
    avatar: AvatarId,
    #[serde(default)]
    slots: Vec<Slot>,
    /// Preferred scan root, relative to the hierarchy root.
    #[serde(default)]
    root_hint: Option<PathKey>,
}

impl SlotStore {
    pub fn new(avatar: AvatarId) -> Self {
        Self {
            avatar,
            slots: (0..SLOT_COUNT).map(Slot::empty).collect(),
            root_hint: None,
        }
    }

    /// Build a store from loaded parts, repairing shape and legacy data.
    pub fn from_parts(avatar: AvatarId, slots: Vec<Slot>, root_hint: Option<PathKey>) -> Self {
        let mut store = Self {
            avatar,
            slots,
            root_hint,
        };
        store.repair();
        store
    }

    pub fn avatar(&self) -> &AvatarId {
        &self.avatar
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn slot(&self, index: usize) -> Option<&Slot> {
        self.slots.get(index)
    }

    pub fn root_hint(&self) -> Option<&PathKey> {
        self.root_hint.as_ref()
    }

    pub fn set_root_hint(&mut self, hint: Option<PathKey>) {
        self.root_hint = hint;
    }

    /// Indices of configured slots, ascending.
    pub fn configured_indices(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.configured)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn any_configured(&self) -> bool {
        self.slots.iter().any(|s| s.configured)
    }

    /// Repair to exactly [`SLOT_COUNT`] slots, each with a non-blank name.
    /// Returns true if the store changed.
    pub fn ensure_fixed_size(&mut self) -> bool {
        let mut changed = false;
        if self.slots.len() > SLOT_COUNT {
            self.slots.truncate(SLOT_COUNT);
            changed = true;
        }
        while self.slots.len() < SLOT_COUNT {
            self.slots.push(Slot::empty(self.slots.len()));
            changed = true;
        }
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if slot.name.trim().is_empty() {
                slot.name = default_slot_name(i);
                changed = true;
            }
        }
        changed
    }

    /// Shape repair plus legacy migration; safe to run on every load.
    pub fn repair(&mut self) -> bool {
        let mut changed = self.ensure_fixed_size();
        for slot in &mut self.slots {
            changed |= slot.migrate_legacy_states();
        }
        if changed {
            log::debug!(target: "slots", "repaired slot store for avatar {}", self.avatar);
        }
        changed
    }

    fn check_index(&self, index: usize) -> Result<(), SlotError> {
        if index < self.slots.len() {
            Ok(())
        } else {
            Err(SlotError::IndexOutOfRange { index })
        }
    }

    /// Record the current visibility of `tracked` into slot `index`, replacing
    /// whatever the slot held before.
    ///
    /// Paths that no longer resolve are dropped with a finding. If none
    /// resolve the slot reverts to unconfigured.
    pub fn capture<I>(
        &mut self,
        index: usize,
        scene: &Scene,
        root: NodeId,
        tracked: I,
    ) -> Result<CaptureOutcome, SlotError>
    where
        I: IntoIterator<Item = PathKey>,
    {
        self.check_index(index)?;
        let requested: BTreeSet<PathKey> = tracked.into_iter().collect();
        let slot_name = self.slots[index].name.clone();

        let mut findings = Vec::new();
        let mut states = Vec::new();
        for path in &requested {
            let node = resolve_path(scene, root, path).and_then(|id| scene.node(id));
            match node {
                Some(node) => states.push(ObjectState {
                    path: path.clone(),
                    active: node.active,
                    continuous: node
                        .blend_weights
                        .iter()
                        .filter(|(_, v)| v.is_finite())
                        .map(|(k, v)| (k.clone(), *v))
                        .collect(),
                }),
                None => findings.push(Finding::missing_object(index, &slot_name, path)),
            }
        }

        let slot = &mut self.slots[index];
        slot.tracked = states.iter().map(|s| s.path.clone()).collect();
        slot.configured = !states.is_empty();
        let resolved = states.len();
        slot.states = states;

        if resolved == 0 {
            findings.push(Finding::warning(
                FindingCode::NoResolvablePaths { slot: index },
                format!("{}: nothing saved, no tracked object could be found", slot_name),
            ));
            log::warn!(target: "slots", "capture into slot {} resolved no paths", index);
        } else {
            log::info!(
                target: "slots",
                "captured {} objects into slot {} ({} missing)",
                resolved,
                index,
                requested.len() - resolved
            );
        }

        Ok(CaptureOutcome {
            slot: slot.clone(),
            resolved,
            findings,
        })
    }

    pub fn clear(&mut self, index: usize) -> Result<(), SlotError> {
        self.check_index(index)?;
        let slot = &mut self.slots[index];
        slot.tracked.clear();
        slot.states.clear();
        slot.configured = false;
        slot.icon = None;
        log::info!(target: "slots", "cleared slot {}", index);
        Ok(())
    }

    pub fn rename(&mut self, index: usize, name: &str) -> Result<(), SlotError> {
        self.check_index(index)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(SlotError::EmptyName { index });
        }
        self.slots[index].name = name.to_string();
        Ok(())
    }

    pub fn set_icon(&mut self, index: usize, icon: Option<AssetRef>) -> Result<(), SlotError> {
        self.check_index(index)?;
        self.slots[index].icon = icon;
        Ok(())
    }
}

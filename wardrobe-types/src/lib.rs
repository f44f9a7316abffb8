//! # wardrobe-types
//!
//! Data model and pure compiler passes for the Wardrobe outfit compiler.
//! Nothing in this crate performs I/O: every operation is a function of its
//! explicit inputs, so the same store and scene always compile to the same layer.
//!
//! ## Pipeline
//!
//! scene snapshot ([`Scene`]) + [`SlotStore`]
//!   → [`artifact::compile`] (total per-slot assignments)
//!   → [`layer::synthesize`] (selector-driven state machine layer)
//!   → [`diagnostics::validate`] (cross-check against parameter/menu metadata)

pub mod artifact;
pub mod classifier;
pub mod diagnostics;
pub mod finding;
pub mod layer;
pub mod menu;
pub mod path;
pub mod scene;
pub mod slot;

pub use artifact::{compile, compile_all, union_tracked_paths, Compiled, CompiledArtifact};
pub use classifier::{
    collect_candidates, count_toggleable, is_likely_outfit_node, should_skip_subtree,
    suggest_root, Vocabulary,
};
pub use diagnostics::{validate, ValidationInput};
pub use finding::{Finding, FindingCode, Severity};
pub use layer::{
    install_layer, synthesize, vote_write_defaults, AnimatorState, Clip, Condition, Controller,
    Curve, CurveProperty, Layer, StateKind, SynthesisOptions, Transition, TransitionSource,
};
pub use menu::{build_menu, selector_parameter, Menu, MenuEntry, ParameterDecl, ParameterKind};
pub use path::{ambiguous_segments, compute_path, resolve_path, PathError, PathKey};
pub use scene::{NodeFlags, NodeId, Scene, SceneNode, SceneSnapshot};
pub use slot::{CaptureOutcome, ObjectState, Slot, SlotError, SlotStore, SLOT_COUNT};

/// Stable identity of the avatar a slot store belongs to.
///
/// GUID-like and independent of the avatar's display name, so renaming an
/// avatar in the scene never orphans its saved outfits.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct AvatarId(String);

impl AvatarId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AvatarId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque reference to an icon asset. Stored and forwarded, never interpreted.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct AssetRef(String);

impl AssetRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AssetRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

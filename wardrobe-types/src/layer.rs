//! Selector-driven state machine layer synthesis.
//!
//! The generated layer holds one state per configured slot plus a Neutral
//! entry state. An integer selector picks the state: `S == i` selects slot
//! `i`, `S == -1` returns to Neutral.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::artifact::CompiledArtifact;
use crate::menu::{ParameterDecl, NO_SELECTION};
use crate::path::PathKey;
use crate::slot::SlotStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisOptions {
    pub layer_name: String,
    pub parameter_name: String,
    pub neutral_name: String,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            layer_name: "Wardrobe".to_string(),
            parameter_name: "Wardrobe/Outfit".to_string(),
            neutral_name: "Neutral".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CurveProperty {
    IsActive,
    BlendWeight(String),
}

/// A constant-valued property curve on the object at `path`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    pub path: PathKey,
    pub property: CurveProperty,
    pub value: f32,
}

/// The state artifact the host plays while a state is active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    pub name: String,
    pub curves: Vec<Curve>,
}

impl Clip {
    pub fn from_artifact(name: impl Into<String>, artifact: &CompiledArtifact) -> Self {
        let mut curves: Vec<Curve> = artifact
            .assignments
            .iter()
            .map(|(path, &active)| Curve {
                path: path.clone(),
                property: CurveProperty::IsActive,
                value: if active { 1.0 } else { 0.0 },
            })
            .collect();
        for (path, params) in &artifact.blend_assignments {
            for (param, &value) in params {
                curves.push(Curve {
                    path: path.clone(),
                    property: CurveProperty::BlendWeight(param.clone()),
                    value,
                });
            }
        }
        curves.sort_by(|a, b| (&a.path, &a.property).cmp(&(&b.path, &b.property)));
        Self {
            name: name.into(),
            curves,
        }
    }

    pub fn value(&self, path: &PathKey, property: &CurveProperty) -> Option<f32> {
        self.curves
            .iter()
            .find(|c| &c.path == path && &c.property == property)
            .map(|c| c.value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateKind {
    Neutral,
    Slot(usize),
    /// A state that was not generated by this tool.
    External,
}

fn external_kind() -> StateKind {
    StateKind::External
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimatorState {
    pub name: String,
    #[serde(default = "external_kind")]
    pub kind: StateKind,
    pub write_defaults: bool,
    #[serde(default)]
    pub clip: Option<Clip>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionSource {
    AnyState,
    State(String),
}

/// Integer equality test on a parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub parameter: String,
    pub equals: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub source: TransitionSource,
    pub destination: String,
    pub conditions: Vec<Condition>,
    pub duration: f32,
    pub has_exit_time: bool,
    pub can_transition_to_self: bool,
}

impl Transition {
    fn instant(source: TransitionSource, destination: &str, parameter: &str, equals: i32) -> Self {
        Self {
            source,
            destination: destination.to_string(),
            conditions: vec![Condition {
                parameter: parameter.to_string(),
                equals,
            }],
            duration: 0.0,
            has_exit_time: false,
            can_transition_to_self: false,
        }
    }

    fn matches(&self, selector_name: &str, selector: i32) -> bool {
        self.conditions
            .iter()
            .all(|c| c.parameter == selector_name && c.equals == selector)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub name: String,
    /// Selector parameter the layer's conditions read.
    pub parameter: String,
    pub default_state: String,
    pub states: Vec<AnimatorState>,
    pub transitions: Vec<Transition>,
}

impl Layer {
    pub fn state(&self, name: &str) -> Option<&AnimatorState> {
        self.states.iter().find(|s| s.name == name)
    }

    pub fn state_for_slot(&self, index: usize) -> Option<&AnimatorState> {
        self.states.iter().find(|s| s.kind == StateKind::Slot(index))
    }

    pub fn slot_state_count(&self) -> usize {
        self.states
            .iter()
            .filter(|s| matches!(s.kind, StateKind::Slot(_)))
            .count()
    }

    /// State reached from `current` after one evaluation with the selector at
    /// `selector`. Any-state transitions are checked first; a transition back
    /// into the current state does not fire unless it allows self-transition.
    pub fn evaluate<'a>(&'a self, current: &'a str, selector: i32) -> &'a str {
        let fires = |t: &Transition| {
            t.matches(&self.parameter, selector)
                && (t.destination != current || t.can_transition_to_self)
        };
        let any_state = self
            .transitions
            .iter()
            .filter(|t| t.source == TransitionSource::AnyState)
            .find(|&t| fires(t));
        let direct = || {
            self.transitions
                .iter()
                .filter(|t| matches!(&t.source, TransitionSource::State(s) if s == current))
                .find(|&t| fires(t))
        };
        match any_state.or_else(direct) {
            Some(t) => t.destination.as_str(),
            None => current,
        }
    }
}

/// The host's state machine document: declared parameters plus layers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Controller {
    #[serde(default)]
    pub parameters: Vec<ParameterDecl>,
    #[serde(default)]
    pub layers: Vec<Layer>,
}

impl Controller {
    pub fn layer(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.name == name)
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterDecl> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

/// Write-default flag for newly generated states.
///
/// Majority vote over every state in every layer except `exclude_layer`
/// (the layer being regenerated). Ties and empty controllers vote off.
pub fn vote_write_defaults(existing: &Controller, exclude_layer: &str) -> bool {
    let (on, off) = existing
        .layers
        .iter()
        .filter(|l| l.name != exclude_layer)
        .flat_map(|l| l.states.iter())
        .fold((0usize, 0usize), |(on, off), s| {
            if s.write_defaults {
                (on + 1, off)
            } else {
                (on, off + 1)
            }
        });
    log::debug!(target: "synth", "write-default vote: {} on, {} off", on, off);
    on > off
}

fn unique_state_name(name: &str, index: usize, neutral: &str, used: &mut BTreeSet<String>) -> String {
    let base = name.trim();
    let mut candidate = if base.is_empty() {
        format!("Outfit #{}", index)
    } else if base == neutral || used.contains(base) {
        format!("{} #{}", base, index)
    } else {
        base.to_string()
    };
    // A user-chosen name may already look like a generated one.
    let stem = candidate.clone();
    let mut attempt = 2;
    while used.contains(&candidate) {
        candidate = format!("{}-{}", stem, attempt);
        attempt += 1;
    }
    used.insert(candidate.clone());
    candidate
}

/// Build the selector layer for every configured slot of `store`.
///
/// `artifacts` must contain the compiled artifact of each configured slot;
/// a configured slot without one is left out of the layer.
pub fn synthesize(
    store: &SlotStore,
    artifacts: &[CompiledArtifact],
    existing: &Controller,
    options: &SynthesisOptions,
) -> Layer {
    let write_defaults = vote_write_defaults(existing, &options.layer_name);
    let parameter = options.parameter_name.as_str();

    let mut used = BTreeSet::new();
    used.insert(options.neutral_name.clone());

    let mut states = vec![AnimatorState {
        name: options.neutral_name.clone(),
        kind: StateKind::Neutral,
        write_defaults,
        clip: None,
    }];

    for index in store.configured_indices() {
        let Some(artifact) = artifacts.iter().find(|a| a.slot_index == index) else {
            log::warn!(target: "synth", "no artifact for configured slot {}, skipping", index);
            continue;
        };
        let slot_name = store.slot(index).map(|s| s.name.as_str()).unwrap_or("");
        let name = unique_state_name(slot_name, index, &options.neutral_name, &mut used);
        let clip = Clip::from_artifact(format!("{} {}", options.layer_name, name), artifact);
        states.push(AnimatorState {
            name,
            kind: StateKind::Slot(index),
            write_defaults,
            clip: Some(clip),
        });
    }

    let selector_value = |state: &AnimatorState| match state.kind {
        StateKind::Slot(i) => i as i32,
        _ => NO_SELECTION,
    };

    let mut transitions = Vec::new();
    for state in states.iter().skip(1) {
        transitions.push(Transition::instant(
            TransitionSource::AnyState,
            &state.name,
            parameter,
            selector_value(state),
        ));
    }
    transitions.push(Transition::instant(
        TransitionSource::AnyState,
        &options.neutral_name,
        parameter,
        NO_SELECTION,
    ));

    for (i, from) in states.iter().enumerate() {
        for (j, to) in states.iter().enumerate() {
            if i == j {
                continue;
            }
            transitions.push(Transition::instant(
                TransitionSource::State(from.name.clone()),
                &to.name,
                parameter,
                selector_value(to),
            ));
        }
    }

    log::info!(
        target: "synth",
        "synthesized layer '{}': {} states, {} transitions, write defaults {}",
        options.layer_name,
        states.len(),
        transitions.len(),
        if write_defaults { "on" } else { "off" }
    );

    Layer {
        name: options.layer_name.clone(),
        parameter: options.parameter_name.clone(),
        default_state: options.neutral_name.clone(),
        states,
        transitions,
    }
}

/// Replace any layer named like `layer` and any parameter named like
/// `parameter`, keeping the position of the first existing match.
/// Installing the same layer twice leaves the controller unchanged.
pub fn install_layer(controller: &mut Controller, layer: Layer, parameter: ParameterDecl) {
    match controller.layers.iter().position(|l| l.name == layer.name) {
        Some(first) => {
            let name = layer.name.clone();
            controller.layers[first] = layer;
            let mut seen = 0usize;
            controller.layers.retain(|l| {
                if l.name != name {
                    return true;
                }
                seen += 1;
                seen == 1
            });
        }
        None => controller.layers.push(layer),
    }

    match controller.parameters.iter().position(|p| p.name == parameter.name) {
        Some(first) => {
            let name = parameter.name.clone();
            controller.parameters[first] = parameter;
            let mut seen = 0usize;
            controller.parameters.retain(|p| {
                if p.name != name {
                    return true;
                }
                seen += 1;
                seen == 1
            });
        }
        None => controller.parameters.push(parameter),
    }
}

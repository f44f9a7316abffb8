//! Structural cross-checks between the slot store and the metadata the host
//! owns (selector parameter, menu, generated layer).
//!
//! Every check runs regardless of earlier failures, so a single pass reports
//! everything the user needs to fix.

use std::collections::BTreeSet;

use crate::finding::{Finding, FindingCode};
use crate::layer::Layer;
use crate::menu::{Menu, ParameterDecl, ParameterKind};
use crate::path::{ambiguous_segments, resolve_path};
use crate::scene::{NodeId, Scene};
use crate::slot::SlotStore;

pub struct ValidationInput<'a> {
    pub store: &'a SlotStore,
    /// Name the selector parameter is expected to have.
    pub parameter_name: &'a str,
    pub selector: Option<&'a ParameterDecl>,
    pub menu: Option<&'a Menu>,
    pub layer: Option<&'a Layer>,
    /// Current scene and the anchor tracked paths are relative to.
    pub scene: Option<(&'a Scene, NodeId)>,
}

pub fn validate(input: &ValidationInput<'_>) -> Vec<Finding> {
    let mut findings = Vec::new();
    check_selector(input, &mut findings);
    check_menu(input, &mut findings);
    check_layer(input, &mut findings);
    if let Some((scene, root)) = input.scene {
        check_scene(input.store, scene, root, &mut findings);
    }
    log::debug!(target: "compile", "validation produced {} findings", findings.len());
    findings
}

fn check_selector(input: &ValidationInput<'_>, out: &mut Vec<Finding>) {
    match input.selector {
        None => out.push(Finding::error(
            FindingCode::SelectorMissing,
            format!("selector parameter '{}' is not declared", input.parameter_name),
        )),
        Some(param) if param.kind != ParameterKind::Int => out.push(Finding::error(
            FindingCode::SelectorWrongType,
            format!(
                "selector parameter '{}' must be Int, found {:?}",
                param.name, param.kind
            ),
        )),
        Some(_) => {}
    }
}

fn check_menu(input: &ValidationInput<'_>, out: &mut Vec<Finding>) {
    let empty = Menu::default();
    let menu = input.menu.unwrap_or(&empty);
    for index in input.store.configured_indices() {
        let Some(slot) = input.store.slot(index) else {
            continue;
        };
        let value = index as i32;
        if menu.entry_for(input.parameter_name, value).is_some() {
            continue;
        }
        match menu.entry_by_label(&slot.name) {
            Some(entry) if entry.parameter != input.parameter_name => out.push(Finding::error(
                FindingCode::MenuEntryWrongParameter { slot: index },
                format!(
                    "menu entry '{}' is bound to '{}' instead of '{}'",
                    entry.label, entry.parameter, input.parameter_name
                ),
            )),
            Some(entry) => out.push(Finding::warning(
                FindingCode::MenuEntryWrongValue { slot: index },
                format!(
                    "menu entry '{}' sets {} but slot {} expects {}",
                    entry.label, entry.value, index, value
                ),
            )),
            None => out.push(Finding::warning(
                FindingCode::MenuEntryMissing { slot: index },
                format!("no menu entry selects '{}' ({} = {})", slot.name, input.parameter_name, value),
            )),
        }
    }
}

fn check_layer(input: &ValidationInput<'_>, out: &mut Vec<Finding>) {
    if !input.store.any_configured() {
        return;
    }
    match input.layer {
        None => out.push(Finding::error(
            FindingCode::LayerMissing,
            "outfit layer has not been generated",
        )),
        Some(layer) if layer.slot_state_count() == 0 => out.push(Finding::warning(
            FindingCode::LayerEmpty,
            format!("layer '{}' has no outfit states; recompile", layer.name),
        )),
        Some(_) => {}
    }
}

fn check_scene(store: &SlotStore, scene: &Scene, root: NodeId, out: &mut Vec<Finding>) {
    for (index, slot) in store.slots().iter().enumerate() {
        let mut ambiguous = BTreeSet::new();
        for path in &slot.tracked {
            if resolve_path(scene, root, path).is_none() {
                out.push(Finding::missing_object(index, &slot.name, path));
                continue;
            }
            ambiguous.extend(ambiguous_segments(scene, root, path));
        }
        for path in ambiguous {
            out.push(Finding::info(
                FindingCode::AmbiguousName {
                    slot: index,
                    path: path.clone(),
                },
                format!(
                    "{}: several siblings are named like '{}', the first one is used",
                    slot.name, path
                ),
            ));
        }
    }
}

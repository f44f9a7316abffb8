//! Parameter and menu declarations handed to the host platform.

use serde::{Deserialize, Serialize};

use crate::layer::SynthesisOptions;
use crate::slot::SlotStore;
use crate::AssetRef;

/// Selector value meaning "no outfit override".
pub const NO_SELECTION: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParameterKind {
    Int,
    Float,
    Bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDecl {
    pub name: String,
    pub kind: ParameterKind,
    pub default_value: f32,
    /// Value survives between sessions on the host.
    #[serde(default)]
    pub saved: bool,
    #[serde(default)]
    pub synced: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuEntry {
    pub label: String,
    pub parameter: String,
    pub value: i32,
    #[serde(default)]
    pub icon: Option<AssetRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Menu {
    pub entries: Vec<MenuEntry>,
}

impl Menu {
    pub fn entry_by_label(&self, label: &str) -> Option<&MenuEntry> {
        self.entries.iter().find(|e| e.label == label)
    }

    /// Entry bound to `parameter` with `value`.
    pub fn entry_for(&self, parameter: &str, value: i32) -> Option<&MenuEntry> {
        self.entries
            .iter()
            .find(|e| e.parameter == parameter && e.value == value)
    }
}

/// The integer selector: defaults to "no selection", saved and synced.
pub fn selector_parameter(options: &SynthesisOptions) -> ParameterDecl {
    ParameterDecl {
        name: options.parameter_name.clone(),
        kind: ParameterKind::Int,
        default_value: NO_SELECTION as f32,
        saved: true,
        synced: true,
    }
}

/// One entry per configured slot in index order, plus an optional reset
/// entry bound to [`NO_SELECTION`].
pub fn build_menu(store: &SlotStore, options: &SynthesisOptions, reset_label: Option<&str>) -> Menu {
    let mut entries: Vec<MenuEntry> = store
        .slots()
        .iter()
        .enumerate()
        .filter(|(_, slot)| slot.configured)
        .map(|(index, slot)| MenuEntry {
            label: slot.name.clone(),
            parameter: options.parameter_name.clone(),
            value: index as i32,
            icon: slot.icon.clone(),
        })
        .collect();

    if let Some(label) = reset_label {
        entries.push(MenuEntry {
            label: label.to_string(),
            parameter: options.parameter_name.clone(),
            value: NO_SELECTION,
            icon: None,
        });
    }

    Menu { entries }
}

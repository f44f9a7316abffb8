//! All-or-nothing compilation of a slot store into host-ready output.
//!
//! [`compile_outfits`] produces every artifact in memory and touches nothing
//! external; [`apply_report`] is the single point where results reach the
//! host. A failed compile therefore never leaves a half-updated controller.

use std::fmt;

use wardrobe_types::finding::worst;
use wardrobe_types::{
    build_menu, compile, install_layer, selector_parameter, synthesize, validate, CompiledArtifact,
    Controller, Finding, Layer, Menu, NodeId, ParameterDecl, Scene, Severity, SlotError,
    SlotStore, SynthesisOptions, ValidationInput,
};

use crate::config::Config;
use crate::host::{HostResult, ParameterHost, StateMachineHost};

#[derive(Debug, Clone, PartialEq)]
pub enum CompileError {
    /// The anchor node passed as root is not part of the scene.
    RootNotInScene { root: NodeId },
    Slot(SlotError),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RootNotInScene { root } => write!(f, "root node {} is not in the scene", root),
            Self::Slot(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CompileError {}

impl From<SlotError> for CompileError {
    fn from(e: SlotError) -> Self {
        Self::Slot(e)
    }
}

/// Everything one compile produced.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileReport {
    pub options: SynthesisOptions,
    /// One artifact per slot, in index order.
    pub artifacts: Vec<CompiledArtifact>,
    pub layer: Layer,
    pub selector: ParameterDecl,
    pub menu: Menu,
    /// The existing controller with the generated layer and selector installed.
    pub controller: Controller,
    pub findings: Vec<Finding>,
}

impl CompileReport {
    pub fn worst(&self) -> Option<Severity> {
        worst(&self.findings)
    }

    pub fn has_errors(&self) -> bool {
        self.worst() == Some(Severity::Error)
    }
}

pub fn compile_outfits(
    store: &SlotStore,
    scene: &Scene,
    root: NodeId,
    existing: &Controller,
    config: &Config,
) -> Result<CompileReport, CompileError> {
    if !scene.contains(root) {
        return Err(CompileError::RootNotInScene { root });
    }
    let options = config.synthesis_options();

    let mut artifacts = Vec::with_capacity(store.slots().len());
    for index in 0..store.slots().len() {
        artifacts.push(compile(store, index, scene, root)?.artifact);
    }

    let layer = synthesize(store, &artifacts, existing, &options);
    let selector = selector_parameter(&options);
    let menu = build_menu(store, &options, config.reset_label());

    let mut controller = existing.clone();
    install_layer(&mut controller, layer.clone(), selector.clone());

    let findings = validate(&ValidationInput {
        store,
        parameter_name: &options.parameter_name,
        selector: controller.parameter(&options.parameter_name),
        menu: Some(&menu),
        layer: controller.layer(&options.layer_name),
        scene: Some((scene, root)),
    });

    for finding in &findings {
        match finding.severity {
            Severity::Error => log::error!(target: "compile", "{}", finding.message),
            Severity::Warning => log::warn!(target: "compile", "{}", finding.message),
            Severity::Info => log::info!(target: "compile", "{}", finding.message),
        }
    }
    log::info!(
        target: "compile",
        "compiled {} outfits for avatar {} ({} findings)",
        store.configured_indices().len(),
        store.avatar(),
        findings.len()
    );

    Ok(CompileReport {
        options,
        artifacts,
        layer,
        selector,
        menu,
        controller,
        findings,
    })
}

/// Hand a finished report to the host: selector first, then the layer that
/// reads it, then the menu that sets it.
///
/// If any step is rejected, the controller and menu the host had before the
/// call are put back and the rejection is returned.
pub fn apply_report<H>(host: &mut H, report: &CompileReport) -> HostResult
where
    H: StateMachineHost + ParameterHost,
{
    let previous_controller = host.controller()?;
    let previous_menu = host.current_menu()?;

    if let Err(e) = hand_over(host, report) {
        log::warn!(target: "compile", "host rejected update, rolling back: {}", e);
        if let Err(rollback) = host
            .restore_controller(&previous_controller)
            .and_then(|()| host.set_menu(previous_menu.as_ref()))
        {
            log::error!(target: "compile", "rollback failed: {}", rollback);
        }
        return Err(e);
    }
    log::debug!(target: "compile", "applied layer '{}' to host", report.layer.name);
    Ok(())
}

fn hand_over<H>(host: &mut H, report: &CompileReport) -> HostResult
where
    H: StateMachineHost + ParameterHost,
{
    host.declare_parameter(&report.selector)?;
    host.replace_layer(&report.layer)?;
    host.set_menu(Some(&report.menu))
}

//! Host collaborator traits: the seam between the compiler and the platform
//! that owns the state machine, parameters and menus.
//!
//! `StateMachineHost` and `ParameterHost` describe what the pipeline *means*
//! to hand over (replace a layer, declare a parameter, publish a menu)
//! independently of how a given editor stores it. [`MemoryHost`] keeps
//! everything in memory and records each call, for tests and the CLI.

use std::fmt;

use wardrobe_types::{Controller, Layer, Menu, ParameterDecl};

pub type HostResult<T = ()> = Result<T, HostError>;

/// Error reported by a host collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct HostError(pub String);

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for HostError {}

pub trait StateMachineHost {
    /// Current state machine document, used for the write-default vote.
    fn controller(&self) -> HostResult<Controller>;

    /// Replace the layer with the same name (or add it).
    fn replace_layer(&mut self, layer: &Layer) -> HostResult;

    /// Put back a document previously returned by [`controller`](Self::controller).
    fn restore_controller(&mut self, controller: &Controller) -> HostResult;
}

pub trait ParameterHost {
    /// Declare or redeclare a parameter by name.
    fn declare_parameter(&mut self, parameter: &ParameterDecl) -> HostResult;

    fn current_menu(&self) -> HostResult<Option<Menu>>;

    /// Publish `menu`, or remove the published one when `None`.
    fn set_menu(&mut self, menu: Option<&Menu>) -> HostResult;
}

/// An operation recorded by [`MemoryHost`].
#[derive(Debug, Clone, PartialEq)]
pub enum HostOp {
    ReplaceLayer { name: String, states: usize },
    RestoreController { layers: usize },
    DeclareParameter { name: String },
    SetMenu { entries: usize },
    RemoveMenu,
}

/// Host calls [`MemoryHost`] can be told to reject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCall {
    Controller,
    ReplaceLayer,
    RestoreController,
    DeclareParameter,
    CurrentMenu,
    SetMenu,
}

/// In-memory host that applies every call to its own controller and menu
/// and records it for assertions.
#[derive(Debug, Default, Clone)]
pub struct MemoryHost {
    controller: Controller,
    menu: Option<Menu>,
    ops: Vec<HostOp>,
    /// Failing call (`None`: every call) and its message. A failed call
    /// changes nothing.
    failure: Option<(Option<HostCall>, String)>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_controller(controller: Controller) -> Self {
        Self {
            controller,
            ..Self::default()
        }
    }

    pub fn current_controller(&self) -> &Controller {
        &self.controller
    }

    pub fn menu(&self) -> Option<&Menu> {
        self.menu.as_ref()
    }

    pub fn operations(&self) -> &[HostOp] {
        &self.ops
    }

    pub fn fail_with(&mut self, message: impl Into<String>) {
        self.failure = Some((None, message.into()));
    }

    /// Reject only `call`; everything else keeps working.
    pub fn fail_on(&mut self, call: HostCall, message: impl Into<String>) {
        self.failure = Some((Some(call), message.into()));
    }

    fn check(&self, call: HostCall) -> HostResult {
        match &self.failure {
            Some((None, msg)) => Err(HostError(msg.clone())),
            Some((Some(failing), msg)) if *failing == call => Err(HostError(msg.clone())),
            _ => Ok(()),
        }
    }
}

/// Put `item` at the position of the first element with the same key, drop
/// later duplicates, or append.
fn replace_by<T, K: PartialEq>(items: &mut Vec<T>, item: T, key: impl Fn(&T) -> K) {
    let k = key(&item);
    match items.iter().position(|i| key(i) == k) {
        Some(first) => {
            items[first] = item;
            let mut index = 0usize;
            items.retain(|i| {
                let keep = index <= first || key(i) != k;
                index += 1;
                keep
            });
        }
        None => items.push(item),
    }
}

impl StateMachineHost for MemoryHost {
    fn controller(&self) -> HostResult<Controller> {
        self.check(HostCall::Controller)?;
        Ok(self.controller.clone())
    }

    fn replace_layer(&mut self, layer: &Layer) -> HostResult {
        self.check(HostCall::ReplaceLayer)?;
        replace_by(&mut self.controller.layers, layer.clone(), |l| l.name.clone());
        self.ops.push(HostOp::ReplaceLayer {
            name: layer.name.clone(),
            states: layer.states.len(),
        });
        Ok(())
    }

    fn restore_controller(&mut self, controller: &Controller) -> HostResult {
        self.check(HostCall::RestoreController)?;
        self.controller = controller.clone();
        self.ops.push(HostOp::RestoreController {
            layers: controller.layers.len(),
        });
        Ok(())
    }
}

impl ParameterHost for MemoryHost {
    fn declare_parameter(&mut self, parameter: &ParameterDecl) -> HostResult {
        self.check(HostCall::DeclareParameter)?;
        replace_by(&mut self.controller.parameters, parameter.clone(), |p| p.name.clone());
        self.ops.push(HostOp::DeclareParameter {
            name: parameter.name.clone(),
        });
        Ok(())
    }

    fn current_menu(&self) -> HostResult<Option<Menu>> {
        self.check(HostCall::CurrentMenu)?;
        Ok(self.menu.clone())
    }

    fn set_menu(&mut self, menu: Option<&Menu>) -> HostResult {
        self.check(HostCall::SetMenu)?;
        self.menu = menu.cloned();
        self.ops.push(match menu {
            Some(menu) => HostOp::SetMenu {
                entries: menu.entries.len(),
            },
            None => HostOp::RemoveMenu,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wardrobe_types::{selector_parameter, ParameterKind, SynthesisOptions};

    fn empty_layer(name: &str, parameter: &str) -> Layer {
        Layer {
            name: name.to_string(),
            parameter: parameter.to_string(),
            default_state: "Neutral".to_string(),
            states: Vec::new(),
            transitions: Vec::new(),
        }
    }

    #[test]
    fn replace_layer_keeps_position_and_drops_duplicates() {
        let mut controller = Controller::default();
        controller.layers.push(empty_layer("Base", "X"));
        controller.layers.push(empty_layer("Wardrobe", "old"));
        controller.layers.push(empty_layer("FX", "Y"));
        controller.layers.push(empty_layer("Wardrobe", "older"));
        let mut host = MemoryHost::with_controller(controller);

        host.replace_layer(&empty_layer("Wardrobe", "new")).unwrap();

        let names: Vec<&str> = host
            .current_controller()
            .layers
            .iter()
            .map(|l| l.name.as_str())
            .collect();
        assert_eq!(names, vec!["Base", "Wardrobe", "FX"]);
        assert_eq!(host.current_controller().layers[1].parameter, "new");
        assert_eq!(
            host.operations(),
            &[HostOp::ReplaceLayer {
                name: "Wardrobe".into(),
                states: 0
            }]
        );
    }

    #[test]
    fn redeclaring_a_parameter_replaces_it() {
        let options = SynthesisOptions::default();
        let mut host = MemoryHost::new();
        let mut param = selector_parameter(&options);
        param.kind = ParameterKind::Bool;
        host.declare_parameter(&param).unwrap();
        host.declare_parameter(&selector_parameter(&options)).unwrap();

        let params = &host.current_controller().parameters;
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].kind, ParameterKind::Int);
    }

    #[test]
    fn failing_host_changes_nothing() {
        let mut host = MemoryHost::new();
        host.fail_with("read-only");
        let err = host.set_menu(Some(&Menu::default())).unwrap_err();
        assert_eq!(err.to_string(), "read-only");
        assert!(host.menu().is_none());
        assert!(host.operations().is_empty());
    }

    #[test]
    fn single_call_failure_leaves_other_calls_working() {
        let options = SynthesisOptions::default();
        let mut host = MemoryHost::new();
        host.fail_on(HostCall::ReplaceLayer, "layer locked");

        host.declare_parameter(&selector_parameter(&options)).unwrap();
        let err = host.replace_layer(&empty_layer("Wardrobe", "P")).unwrap_err();
        assert_eq!(err, HostError("layer locked".into()));
        assert!(host.current_controller().layers.is_empty());
        assert_eq!(host.current_controller().parameters.len(), 1);

        let snapshot = Controller::default();
        host.restore_controller(&snapshot).unwrap();
        host.set_menu(None).unwrap();
        assert_eq!(host.current_controller(), &snapshot);
        assert_eq!(host.operations().last(), Some(&HostOp::RemoveMenu));
    }
}

//! Port model: typed, named, counted data slots.
//!
//! # Responsibility
//! - Hold a region's inputs and outputs keyed by name.
//! - Expose connection state and effective width to the owning region.
//!
//! # Invariants
//! - Ports are visited in ascending name order.
//! - The producing output owns every buffer; inputs only view it.
//! - An input's width is frozen once its region fixes it and may not change.

mod input;
mod output;

pub use input::Input;
pub use output::Output;

use crate::spec::Spec;
use crate::types::BasicType;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// All ports of one region.
#[derive(Debug, Default)]
pub struct PortSet {
    inputs: BTreeMap<String, Input>,
    outputs: BTreeMap<String, Output>,
}

impl PortSet {
    /// Builds inputs and outputs declared by `spec`.
    ///
    /// `output_width` resolves outputs declared with count 0.
    pub fn from_spec<E>(
        spec: &Spec,
        mut output_width: impl FnMut(&str) -> Result<usize, E>,
    ) -> Result<Self, E> {
        let mut ports = Self::default();
        for input in &spec.inputs {
            ports.inputs.insert(input.name.clone(), Input::new(input));
        }
        for output in &spec.outputs {
            let width = if output.count == 0 {
                output_width(&output.name)?
            } else {
                output.count as usize
            };
            ports.outputs.insert(
                output.name.clone(),
                Output::new(&output.name, output.data_type, width),
            );
        }
        Ok(ports)
    }

    pub fn input(&self, name: &str) -> Option<&Input> {
        self.inputs.get(name)
    }

    pub fn output(&self, name: &str) -> Option<&Output> {
        self.outputs.get(name)
    }

    pub fn output_mut(&mut self, name: &str) -> Option<&mut Output> {
        self.outputs.get_mut(name)
    }

    /// All inputs in ascending name order.
    pub fn inputs(&self) -> impl Iterator<Item = (&str, &Input)> {
        self.inputs.iter().map(|(name, input)| (name.as_str(), input))
    }

    /// All outputs in ascending name order.
    pub fn outputs(&self) -> impl Iterator<Item = (&str, &Output)> {
        self.outputs
            .iter()
            .map(|(name, output)| (name.as_str(), output))
    }

    /// Connected inputs with non-zero width, in ascending name order.
    ///
    /// Frozen inputs keep their frozen width here; `check_input_widths`
    /// reports upstream buffers that drifted from it.
    pub fn active_inputs(&self) -> impl Iterator<Item = (&str, &Input)> {
        self.inputs()
            .filter(|(_, input)| input.is_connected() && input.element_count() != 0)
    }

    /// Fails on the first connected input whose upstream width differs from
    /// its frozen width, including a change to 0.
    pub fn check_input_widths(&self) -> Result<(), PortError> {
        self.inputs.values().try_for_each(Input::check_width)
    }

    /// Whether any input or output is connected.
    pub fn has_connections(&self) -> bool {
        self.inputs.values().any(Input::is_connected)
            || self.outputs.values().any(Output::is_connected)
    }

    pub(crate) fn input_mut(&mut self, name: &str) -> Option<&mut Input> {
        self.inputs.get_mut(name)
    }

    /// Freezes the width of every connected input not frozen yet.
    pub(crate) fn freeze_connected_inputs(&mut self) {
        for input in self.inputs.values_mut() {
            if input.is_connected() && !input.is_frozen() {
                input.freeze();
            }
        }
    }
}

/// Wiring and buffer access errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortError {
    NotConnected(String),
    UpstreamDropped(String),
    AlreadyConnected {
        input: String,
        source: String,
    },
    TypeMismatch {
        port: String,
        expected: BasicType,
        found: BasicType,
    },
    WidthMismatch {
        port: String,
        declared: usize,
        upstream: usize,
    },
    WidthChanged {
        port: String,
        frozen: usize,
        current: usize,
    },
}

impl Display for PortError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotConnected(port) => write!(f, "input `{port}` is not connected"),
            Self::UpstreamDropped(port) => {
                write!(f, "upstream output of input `{port}` no longer exists")
            }
            Self::AlreadyConnected { input, source } => {
                write!(f, "input `{input}` is already linked to `{source}`")
            }
            Self::TypeMismatch {
                port,
                expected,
                found,
            } => write!(f, "port `{port}` carries {expected}, got {found}"),
            Self::WidthMismatch {
                port,
                declared,
                upstream,
            } => write!(
                f,
                "input `{port}` declares {declared} elements, upstream provides {upstream}"
            ),
            Self::WidthChanged {
                port,
                frozen,
                current,
            } => write!(
                f,
                "input `{port}` width is fixed at {frozen}, upstream now provides {current}"
            ),
        }
    }
}

impl Error for PortError {}

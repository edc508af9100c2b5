//! Region self-description (Spec) and its validation.
//!
//! # Responsibility
//! - Declare every input, output, parameter and command a region type exposes.
//! - Let callers wire graphs and validate bundles without knowing the
//!   concrete region type.
//!
//! # Invariants
//! - A `Spec` is built once per region type and never mutated afterwards.
//! - Names are unique within each of inputs, outputs, parameters, commands.
//! - Element count 0 on a port means the width is fixed at wiring time.

use crate::types::{BasicType, Value, ValueError};
use serde::Serialize;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Parameter access mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    /// Reported by the region, never written by callers.
    ReadOnly,
    /// Writable at construction and at runtime.
    ReadWrite,
    /// Writable only in the construction bundle.
    CreateOnly,
}

impl AccessMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReadOnly => "read_only",
            Self::ReadWrite => "read_write",
            Self::CreateOnly => "create_only",
        }
    }
}

/// Declaration of one input port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputSpec {
    pub name: String,
    pub description: String,
    pub data_type: BasicType,
    /// 0 = region-level width taken from the upstream output.
    pub count: u32,
    pub required: bool,
    pub region_level: bool,
    pub is_default_input: bool,
}

impl InputSpec {
    pub fn new(name: &str, description: &str, data_type: BasicType) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            data_type,
            count: 0,
            required: false,
            region_level: true,
            is_default_input: false,
        }
    }

    pub fn count(mut self, count: u32) -> Self {
        self.count = count;
        self.region_level = count == 0;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_input(mut self) -> Self {
        self.is_default_input = true;
        self
    }
}

/// Declaration of one output port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputSpec {
    pub name: String,
    pub description: String,
    pub data_type: BasicType,
    /// 0 = width reported by the region at construction.
    pub count: u32,
    pub region_level: bool,
    pub is_default_output: bool,
}

impl OutputSpec {
    pub fn new(name: &str, description: &str, data_type: BasicType) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            data_type,
            count: 0,
            region_level: true,
            is_default_output: false,
        }
    }

    pub fn count(mut self, count: u32) -> Self {
        self.count = count;
        self.region_level = count == 0;
        self
    }

    pub fn default_output(mut self) -> Self {
        self.is_default_output = true;
        self
    }
}

/// Declaration of one parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterSpec {
    pub name: String,
    pub description: String,
    pub data_type: BasicType,
    /// 0 for strings, 1 for scalars, n for positional arrays.
    pub count: u32,
    pub constraints: String,
    pub default_value: String,
    pub access: AccessMode,
}

impl ParameterSpec {
    pub fn new(name: &str, description: &str, data_type: BasicType, access: AccessMode) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            data_type,
            count: if data_type == BasicType::Byte { 0 } else { 1 },
            constraints: String::new(),
            default_value: String::new(),
            access,
        }
    }

    pub fn count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    pub fn constraints(mut self, constraints: &str) -> Self {
        self.constraints = constraints.to_string();
        self
    }

    pub fn default_value(mut self, default_value: &str) -> Self {
        self.default_value = default_value.to_string();
        self
    }

    /// Parses `default_value` into the declared type.
    pub fn default(&self) -> Result<Option<Value>, ValueError> {
        Value::parse(self.data_type, &self.default_value)
    }

    /// Number of addressable positions for `get/set_parameter` indexes.
    pub fn positions(&self) -> usize {
        self.count.max(1) as usize
    }
}

/// Declaration of one command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandSpec {
    pub name: String,
    pub description: String,
}

impl CommandSpec {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
        }
    }
}

/// Immutable self-description of one region type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Spec {
    pub description: String,
    pub inputs: Vec<InputSpec>,
    pub outputs: Vec<OutputSpec>,
    pub parameters: Vec<ParameterSpec>,
    pub commands: Vec<CommandSpec>,
}

impl Spec {
    pub fn new(description: &str) -> Self {
        Self {
            description: description.to_string(),
            ..Self::default()
        }
    }

    pub fn input(&self, name: &str) -> Option<&InputSpec> {
        self.inputs.iter().find(|input| input.name == name)
    }

    pub fn output(&self, name: &str) -> Option<&OutputSpec> {
        self.outputs.iter().find(|output| output.name == name)
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|parameter| parameter.name == name)
    }

    pub fn command(&self, name: &str) -> Option<&CommandSpec> {
        self.commands.iter().find(|command| command.name == name)
    }

    /// Validates declaration-level invariants.
    pub fn validate(&self) -> Result<(), SpecError> {
        check_unique("input", self.inputs.iter().map(|input| input.name.as_str()))?;
        check_unique(
            "output",
            self.outputs.iter().map(|output| output.name.as_str()),
        )?;
        check_unique(
            "parameter",
            self.parameters.iter().map(|parameter| parameter.name.as_str()),
        )?;
        check_unique(
            "command",
            self.commands.iter().map(|command| command.name.as_str()),
        )?;

        for parameter in &self.parameters {
            parameter
                .default()
                .map_err(|err| SpecError::InvalidDefault {
                    parameter: parameter.name.clone(),
                    reason: err.to_string(),
                })?;
        }
        Ok(())
    }
}

fn check_unique<'a>(
    kind: &'static str,
    names: impl Iterator<Item = &'a str>,
) -> Result<(), SpecError> {
    let mut seen = BTreeSet::new();
    for name in names {
        if name.trim().is_empty() {
            return Err(SpecError::EmptyName(kind));
        }
        if !seen.insert(name) {
            return Err(SpecError::DuplicateName {
                kind,
                name: name.to_string(),
            });
        }
    }
    Ok(())
}

/// Spec declaration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecError {
    EmptyName(&'static str),
    DuplicateName { kind: &'static str, name: String },
    InvalidDefault { parameter: String, reason: String },
}

impl Display for SpecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName(kind) => write!(f, "spec declares an {kind} with an empty name"),
            Self::DuplicateName { kind, name } => {
                write!(f, "spec declares {kind} `{name}` more than once")
            }
            Self::InvalidDefault { parameter, reason } => {
                write!(f, "default for parameter `{parameter}` is invalid: {reason}")
            }
        }
    }
}

impl Error for SpecError {}

#[cfg(test)]
mod tests {
    use super::{AccessMode, CommandSpec, InputSpec, ParameterSpec, Spec, SpecError};
    use crate::types::{BasicType, Value};

    fn sample_spec() -> Spec {
        let mut spec = Spec::new("sample");
        spec.inputs
            .push(InputSpec::new("dataIn", "input", BasicType::Real32));
        spec.parameters.push(
            ParameterSpec::new("width", "width", BasicType::UInt32, AccessMode::CreateOnly)
                .default_value("1"),
        );
        spec.commands.push(CommandSpec::new("reset", "reset state"));
        spec
    }

    #[test]
    fn validates_sample_spec() {
        let spec = sample_spec();
        assert!(spec.validate().is_ok());
        assert_eq!(
            spec.parameter("width").unwrap().default().unwrap(),
            Some(Value::UInt32(1))
        );
        assert!(spec.input("dataIn").unwrap().region_level);
        assert!(spec.command("reset").is_some());
        assert!(spec.output("dataOut").is_none());
    }

    #[test]
    fn rejects_duplicate_port_names() {
        let mut spec = sample_spec();
        spec.inputs
            .push(InputSpec::new("dataIn", "again", BasicType::Real32));
        assert_eq!(
            spec.validate().unwrap_err(),
            SpecError::DuplicateName {
                kind: "input",
                name: "dataIn".to_string(),
            }
        );
    }

    #[test]
    fn rejects_unparseable_default() {
        let mut spec = sample_spec();
        spec.parameters[0].default_value = "wide".to_string();
        assert!(matches!(
            spec.validate().unwrap_err(),
            SpecError::InvalidDefault { .. }
        ));
    }

    #[test]
    fn string_parameters_default_to_count_zero() {
        let parameter =
            ParameterSpec::new("path", "path", BasicType::Byte, AccessMode::ReadWrite);
        assert_eq!(parameter.count, 0);
        assert_eq!(parameter.positions(), 1);
    }

    #[test]
    fn serializes_to_json() {
        let json = serde_json::to_value(sample_spec()).unwrap();
        assert_eq!(json["parameters"][0]["access"], "create_only");
        assert_eq!(json["inputs"][0]["data_type"], "Real32");
    }
}

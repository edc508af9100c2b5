//! Source region publishing an arithmetic scalar stream.
//!
//! Each compute fills `dataOut` with the current `value` and then advances it
//! by `increment`. Width is fixed at construction by the create-only `width`
//! parameter.

use super::{resolve_param, unknown_parameter};
use crate::persist::codec::{read_version, write_version};
use crate::persist::{PersistError, PersistResult, Serializable};
use crate::port::PortSet;
use crate::region::{RegionError, RegionImpl, RegionResult, RegionType};
use crate::spec::{AccessMode, CommandSpec, OutputSpec, ParameterSpec, Spec};
use crate::types::{Array, BasicType, Value, ValueMap};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use once_cell::sync::Lazy;
use std::any::Any;
use std::io::{Read, Write};

pub const OUTPUT_DATA: &str = "dataOut";
pub const PARAM_VALUE: &str = "value";
pub const PARAM_INCREMENT: &str = "increment";
pub const PARAM_WIDTH: &str = "width";
pub const PARAM_EMITTED: &str = "emitted";
pub const COMMAND_RESET: &str = "reset";
/// Largest accepted `width`.
pub const MAX_WIDTH: u32 = 65_536;

const TYPE_NAME: &str = "ScalarSourceRegion";
const FORMAT_VERSION: i32 = 2;
const OLDEST_FORMAT_VERSION: i32 = 1;

static SPEC: Lazy<Spec> = Lazy::new(|| {
    let mut spec = Spec::new(
        "Publishes `value` on every element of `dataOut` each compute, then adds `increment`.",
    );
    spec.outputs.push(
        OutputSpec::new(OUTPUT_DATA, "Current stream value.", BasicType::Real32).default_output(),
    );
    spec.parameters.push(
        ParameterSpec::new(
            PARAM_VALUE,
            "Value published by the next compute.",
            BasicType::Real64,
            AccessMode::ReadWrite,
        )
        .default_value("0"),
    );
    spec.parameters.push(
        ParameterSpec::new(
            PARAM_INCREMENT,
            "Added to `value` after every compute.",
            BasicType::Real64,
            AccessMode::ReadWrite,
        )
        .default_value("0"),
    );
    spec.parameters.push(
        ParameterSpec::new(
            PARAM_WIDTH,
            "Number of elements in `dataOut`.",
            BasicType::UInt32,
            AccessMode::CreateOnly,
        )
        .constraints("interval: [1, 65536]")
        .default_value("1"),
    );
    spec.parameters.push(
        ParameterSpec::new(
            PARAM_EMITTED,
            "Computes since construction or the last `reset`.",
            BasicType::UInt64,
            AccessMode::ReadOnly,
        )
        .default_value("0"),
    );
    spec.commands.push(CommandSpec::new(
        COMMAND_RESET,
        "Restore the last explicitly set `value` and zero `emitted`.",
    ));
    spec
});

#[derive(Debug, Clone)]
pub struct ScalarSourceRegion {
    value: f64,
    increment: f64,
    width: u32,
    /// Value restored by `reset`.
    origin: f64,
    emitted: u64,
}

impl ScalarSourceRegion {
    pub fn new(value: f64, increment: f64, width: u32) -> RegionResult<Self> {
        check_width(width).map_err(RegionError::Configuration)?;
        Ok(Self {
            value,
            increment,
            width,
            origin: value,
            emitted: 0,
        })
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn emitted(&self) -> u64 {
        self.emitted
    }
}

/// Reals compare by bit pattern so a NaN state equals its restored copy.
impl PartialEq for ScalarSourceRegion {
    fn eq(&self, other: &Self) -> bool {
        self.value.to_bits() == other.value.to_bits()
            && self.increment.to_bits() == other.increment.to_bits()
            && self.origin.to_bits() == other.origin.to_bits()
            && self.width == other.width
            && self.emitted == other.emitted
    }
}

impl Serializable for ScalarSourceRegion {
    fn serializable_version(&self) -> i32 {
        FORMAT_VERSION
    }

    fn save(&self, writer: &mut dyn Write) -> PersistResult<()> {
        write_version(writer, FORMAT_VERSION)?;
        writer.write_f64::<LittleEndian>(self.value)?;
        writer.write_f64::<LittleEndian>(self.increment)?;
        writer.write_u32::<LittleEndian>(self.width)?;
        writer.write_f64::<LittleEndian>(self.origin)?;
        writer.write_u64::<LittleEndian>(self.emitted)?;
        Ok(())
    }

    fn load(&mut self, reader: &mut dyn Read) -> PersistResult<()> {
        let version = read_version(reader, OLDEST_FORMAT_VERSION..=FORMAT_VERSION)?;
        let value = reader.read_f64::<LittleEndian>()?;
        let increment = reader.read_f64::<LittleEndian>()?;
        let width = reader.read_u32::<LittleEndian>()?;
        check_width(width).map_err(PersistError::Corrupt)?;
        let (origin, emitted) = match version {
            1 => (value, 0),
            _ => (
                reader.read_f64::<LittleEndian>()?,
                reader.read_u64::<LittleEndian>()?,
            ),
        };

        *self = Self {
            value,
            increment,
            width,
            origin,
            emitted,
        };
        Ok(())
    }
}

impl RegionImpl for ScalarSourceRegion {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn spec(&self) -> &'static Spec {
        Self::create_spec()
    }

    fn output_element_count(&self, output: &str) -> RegionResult<usize> {
        match output {
            OUTPUT_DATA => Ok(self.width as usize),
            _ => Err(RegionError::Configuration(format!(
                "{TYPE_NAME}: unknown output `{output}`"
            ))),
        }
    }

    fn initialize(&mut self, _ports: &PortSet) -> RegionResult<()> {
        Ok(())
    }

    fn compute(&mut self, ports: &mut PortSet) -> RegionResult<()> {
        let output = ports.output_mut(OUTPUT_DATA).ok_or_else(|| {
            RegionError::Configuration(format!("{TYPE_NAME}: output `{OUTPUT_DATA}` is missing"))
        })?;
        output.set_data(Array::Real32(vec![self.value as f32; self.width as usize]))?;
        self.value += self.increment;
        self.emitted += 1;
        Ok(())
    }

    fn get_parameter(&self, name: &str, _index: usize) -> RegionResult<Value> {
        match name {
            PARAM_VALUE => Ok(Value::Real64(self.value)),
            PARAM_INCREMENT => Ok(Value::Real64(self.increment)),
            PARAM_WIDTH => Ok(Value::UInt32(self.width)),
            PARAM_EMITTED => Ok(Value::UInt64(self.emitted)),
            _ => Err(unknown_parameter(TYPE_NAME, name)),
        }
    }

    fn set_parameter(&mut self, name: &str, _index: usize, value: Value) -> RegionResult<()> {
        let value = match value {
            Value::Real64(value) => value,
            other => {
                return Err(RegionError::ParameterType {
                    name: name.to_string(),
                    expected: BasicType::Real64,
                    found: other.basic_type(),
                })
            }
        };
        match name {
            PARAM_VALUE => {
                self.value = value;
                self.origin = value;
            }
            PARAM_INCREMENT => self.increment = value,
            _ => return Err(unknown_parameter(TYPE_NAME, name)),
        }
        Ok(())
    }

    fn execute_command(&mut self, args: &[String]) -> RegionResult<Option<String>> {
        match args.first().map(String::as_str) {
            Some(COMMAND_RESET) => {
                self.value = self.origin;
                self.emitted = 0;
                Ok(None)
            }
            Some(other) => Err(RegionError::UnknownCommand {
                region: TYPE_NAME.to_string(),
                command: other.to_string(),
            }),
            None => Err(RegionError::Configuration(format!(
                "{TYPE_NAME}: empty command"
            ))),
        }
    }

    fn equals(&self, other: &dyn RegionImpl) -> bool {
        other
            .as_any()
            .downcast_ref::<Self>()
            .is_some_and(|other| self == other)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl RegionType for ScalarSourceRegion {
    const TYPE_NAME: &'static str = TYPE_NAME;

    fn create_spec() -> &'static Spec {
        &SPEC
    }

    fn from_params(params: &ValueMap) -> RegionResult<Self> {
        let spec = Self::create_spec();
        Self::new(
            resolve_param(spec, params, PARAM_VALUE)?,
            resolve_param(spec, params, PARAM_INCREMENT)?,
            resolve_param(spec, params, PARAM_WIDTH)?,
        )
    }

    fn from_persisted(reader: &mut dyn Read) -> RegionResult<Self> {
        let mut region = Self::new(0.0, 0.0, 1)?;
        region.load(reader)?;
        Ok(region)
    }
}

fn check_width(width: u32) -> Result<(), String> {
    if !(1..=MAX_WIDTH).contains(&width) {
        return Err(format!(
            "{TYPE_NAME}: `{PARAM_WIDTH}` must be within 1..={MAX_WIDTH}, got {width}"
        ));
    }
    Ok(())
}

//! Region plugin contract and lifecycle wrapper.
//!
//! # Responsibility
//! - Define the `RegionImpl` capability every plugin implements.
//! - Enforce the lifecycle `Constructed -> Initialized -> Computing*` and the
//!   parameter/command protocol in one place (`Region`), so plugins only
//!   implement their own semantics.
//!
//! # Invariants
//! - `compute()` before a successful `initialize()` fails with `NotInitialized`.
//! - `initialize()` with no connected port fails before the plugin runs.
//! - A failed `initialize()` leaves the region `Constructed`.
//! - The iteration counter increments by exactly one per successful compute.
//! - Read-only and create-only parameters are never written through
//!   `set_parameter`; equal values are a no-op.
//! - Links can change until the first compute and never after.
//!
//! # See also
//! - `registry` for late-bound construction by type name.

mod error;
pub mod registry;

pub use error::{RegionError, RegionResult};

use crate::persist::codec::{write_str, write_version};
use crate::persist::{self, Serializable};
use crate::port::{Input, Output, PortSet};
use crate::spec::{AccessMode, ParameterSpec, Spec};
use crate::types::{BasicType, Value, ValueMap};
use log::{debug, error, info, warn};
use std::any::Any;
use std::fmt::{Debug, Formatter};
use std::io::{Read, Write};
use std::path::Path;

/// Format version of the region envelope (type name + region name + body).
pub const REGION_ENVELOPE_VERSION: i32 = 1;

/// Capability implemented by every region plugin.
///
/// Ports are owned by the wrapping `Region` and handed in per call; plugins
/// must not keep views across calls.
pub trait RegionImpl: Serializable + Any {
    fn type_name(&self) -> &'static str;

    /// Same value as `RegionType::create_spec` for the concrete type.
    fn spec(&self) -> &'static Spec;

    /// Width of an output declared with count 0.
    fn output_element_count(&self, output: &str) -> RegionResult<usize> {
        Err(RegionError::Configuration(format!(
            "{}: output `{output}` has no region-level width",
            self.type_name()
        )))
    }

    /// Acquires backing resources. Called again on re-initialization; the
    /// previous resource must be released first.
    fn initialize(&mut self, ports: &PortSet) -> RegionResult<()>;

    /// Drops resources held since the last `initialize`. Called when a
    /// re-initialization fails before the plugin runs.
    fn release(&mut self) -> RegionResult<()> {
        Ok(())
    }

    /// One iteration over connected ports in ascending name order.
    fn compute(&mut self, ports: &mut PortSet) -> RegionResult<()>;

    fn get_parameter(&self, name: &str, index: usize) -> RegionResult<Value>;

    fn set_parameter(&mut self, name: &str, index: usize, value: Value) -> RegionResult<()>;

    /// Dispatches on `args[0]`; `args` is never empty.
    fn execute_command(&mut self, args: &[String]) -> RegionResult<Option<String>>;

    /// Structural equality over externally observable parameters.
    fn equals(&self, other: &dyn RegionImpl) -> bool;

    fn as_any(&self) -> &dyn Any;
}

/// Static side of a region plugin, used for registration.
pub trait RegionType: RegionImpl + Sized {
    const TYPE_NAME: &'static str;

    /// Immutable spec shared by every instance; callable without one.
    fn create_spec() -> &'static Spec;

    fn from_params(params: &ValueMap) -> RegionResult<Self>;

    fn from_persisted(reader: &mut dyn Read) -> RegionResult<Self>;
}

/// Lifecycle state of one region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionState {
    Constructed,
    Initialized,
    Computing,
}

/// One named plugin instance with its ports and lifecycle.
pub struct Region {
    name: String,
    ports: PortSet,
    imp: Box<dyn RegionImpl>,
    iteration: u64,
    state: RegionState,
}

impl Region {
    /// Wraps a constructed plugin and builds the ports its spec declares.
    pub fn new(name: impl Into<String>, imp: Box<dyn RegionImpl>) -> RegionResult<Self> {
        let ports = PortSet::from_spec(imp.spec(), |output| imp.output_element_count(output))?;
        Ok(Self {
            name: name.into(),
            ports,
            imp,
            iteration: 0,
            state: RegionState::Constructed,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &'static str {
        self.imp.type_name()
    }

    pub fn spec(&self) -> &'static Spec {
        self.imp.spec()
    }

    pub fn state(&self) -> RegionState {
        self.state
    }

    /// Completed computes since the last successful `initialize()`.
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    pub fn input(&self, name: &str) -> Option<&Input> {
        self.ports.input(name)
    }

    pub fn output(&self, name: &str) -> Option<&Output> {
        self.ports.output(name)
    }

    pub fn ports(&self) -> &PortSet {
        &self.ports
    }

    /// Concrete plugin, when it is a `T`.
    pub fn implementation<T: RegionImpl>(&self) -> Option<&T> {
        self.imp.as_any().downcast_ref::<T>()
    }

    /// Links `input` to an upstream output.
    pub fn link_input(&mut self, input: &str, upstream: &Output) -> RegionResult<()> {
        if self.state == RegionState::Computing {
            return Err(RegionError::Configuration(format!(
                "{}: cannot link `{input}` after the first compute",
                self.name
            )));
        }
        let region = self.name.clone();
        let port = self.ports.input_mut(input).ok_or_else(|| {
            RegionError::Configuration(format!("{region}: unknown input `{input}`"))
        })?;
        port.connect(upstream)?;
        debug!(
            "event=region_link module=region status=ok region={} input={} source={}",
            self.name,
            input,
            upstream.name()
        );
        Ok(())
    }

    /// Removes the link of `input`, if any.
    pub fn unlink_input(&mut self, input: &str) -> RegionResult<()> {
        if self.state == RegionState::Computing {
            return Err(RegionError::Configuration(format!(
                "{}: cannot unlink `{input}` after the first compute",
                self.name
            )));
        }
        let region = self.name.clone();
        self.ports
            .input_mut(input)
            .ok_or_else(|| RegionError::Configuration(format!("{region}: unknown input `{input}`")))?
            .disconnect();
        Ok(())
    }

    pub fn initialize(&mut self) -> RegionResult<()> {
        info!(
            "event=region_initialize module=region status=start region={} type={}",
            self.name,
            self.type_name()
        );

        self.state = RegionState::Constructed;
        if let Err(err) = self.check_wiring() {
            error!(
                "event=region_initialize module=region status=error region={} error={}",
                self.name, err
            );
            if let Err(release_err) = self.imp.release() {
                warn!(
                    "event=region_release module=region status=error region={} error={}",
                    self.name, release_err
                );
            }
            return Err(err);
        }

        if let Err(err) = self.imp.initialize(&self.ports) {
            error!(
                "event=region_initialize module=region status=error region={} error={}",
                self.name, err
            );
            return Err(err);
        }

        self.ports.freeze_connected_inputs();
        self.iteration = 0;
        self.state = RegionState::Initialized;
        info!(
            "event=region_initialize module=region status=ok region={} active_inputs={}",
            self.name,
            self.ports.active_inputs().count()
        );
        Ok(())
    }

    pub fn compute(&mut self) -> RegionResult<()> {
        if self.state == RegionState::Constructed {
            return Err(RegionError::NotInitialized(self.name.clone()));
        }
        if self.state == RegionState::Initialized {
            self.ports.freeze_connected_inputs();
        }

        let result = self
            .ports
            .check_input_widths()
            .map_err(RegionError::from)
            .and_then(|()| self.imp.compute(&mut self.ports));
        if let Err(err) = result {
            error!(
                "event=region_compute module=region status=error region={} iteration={} error={}",
                self.name, self.iteration, err
            );
            return Err(err);
        }

        debug!(
            "event=region_compute module=region status=ok region={} iteration={}",
            self.name, self.iteration
        );
        self.iteration += 1;
        self.state = RegionState::Computing;
        Ok(())
    }

    pub fn get_parameter(&self, name: &str, index: usize) -> RegionResult<Value> {
        let spec = self.parameter_spec(name)?;
        check_index(spec, index)?;
        self.imp.get_parameter(name, index)
    }

    pub fn set_parameter(
        &mut self,
        name: &str,
        index: usize,
        value: impl Into<Value>,
    ) -> RegionResult<()> {
        let spec = self.parameter_spec(name)?;
        if spec.access != AccessMode::ReadWrite {
            return Err(RegionError::AccessViolation {
                region: self.name.clone(),
                name: name.to_string(),
                access: spec.access,
            });
        }
        check_index(spec, index)?;
        let value = coerce_parameter(spec, value.into())?;

        if self.imp.get_parameter(name, index)? == value {
            debug!(
                "event=region_set_parameter module=region status=unchanged region={} parameter={}",
                self.name, name
            );
            return Ok(());
        }
        self.imp.set_parameter(name, index, value)?;
        info!(
            "event=region_set_parameter module=region status=ok region={} parameter={}",
            self.name, name
        );
        Ok(())
    }

    /// `get_parameter` for string parameters.
    pub fn get_parameter_string(&self, name: &str) -> RegionResult<String> {
        match self.get_parameter(name, 0)? {
            Value::Str(value) => Ok(value),
            other => Err(RegionError::ParameterType {
                name: name.to_string(),
                expected: BasicType::Byte,
                found: other.basic_type(),
            }),
        }
    }

    /// `set_parameter` for string parameters.
    pub fn set_parameter_string(&mut self, name: &str, value: &str) -> RegionResult<()> {
        self.set_parameter(name, 0, Value::Str(value.to_string()))
    }

    pub fn execute_command<S: AsRef<str>>(&mut self, args: &[S]) -> RegionResult<Option<String>> {
        let Some(command) = args.first().map(AsRef::as_ref) else {
            return Err(RegionError::Configuration(format!(
                "{}: empty command",
                self.name
            )));
        };
        if self.spec().command(command).is_none() {
            return Err(RegionError::UnknownCommand {
                region: self.name.clone(),
                command: command.to_string(),
            });
        }

        let args: Vec<String> = args.iter().map(|arg| arg.as_ref().to_string()).collect();
        let result = self.imp.execute_command(&args)?;
        info!(
            "event=region_command module=region status=ok region={} command={}",
            self.name, args[0]
        );
        Ok(result)
    }

    /// Writes the envelope: version, type name, region name, plugin payload.
    pub fn save(&self, writer: &mut dyn Write) -> RegionResult<()> {
        write_version(writer, REGION_ENVELOPE_VERSION)?;
        write_str(writer, self.type_name())?;
        write_str(writer, &self.name)?;
        self.imp.save(writer)?;
        Ok(())
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> RegionResult<()> {
        persist::write_file(path, |writer| self.save(writer))
    }

    fn parameter_spec(&self, name: &str) -> RegionResult<&'static ParameterSpec> {
        self.spec()
            .parameter(name)
            .ok_or_else(|| RegionError::UnknownParameter {
                region: self.name.clone(),
                name: name.to_string(),
            })
    }

    fn check_wiring(&self) -> RegionResult<()> {
        if !self.ports.has_connections() {
            return Err(RegionError::Configuration(format!(
                "{}: no ports configured",
                self.name
            )));
        }
        if let Some((name, _)) = self
            .ports
            .inputs()
            .find(|(_, input)| input.is_required() && !input.is_connected())
        {
            return Err(RegionError::Configuration(format!(
                "{}: required input `{name}` is not connected",
                self.name
            )));
        }
        Ok(())
    }
}

impl PartialEq for Region {
    fn eq(&self, other: &Self) -> bool {
        self.type_name() == other.type_name() && self.imp.equals(other.imp.as_ref())
    }
}

impl Debug for Region {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Region")
            .field("name", &self.name)
            .field("type", &self.type_name())
            .field("state", &self.state)
            .field("iteration", &self.iteration)
            .finish()
    }
}

impl Drop for Region {
    fn drop(&mut self) {
        debug!(
            "event=region_destroy module=region status=ok region={} type={}",
            self.name,
            self.type_name()
        );
    }
}

/// Converts `value` to the declared parameter type or fails closed.
pub(crate) fn coerce_parameter(spec: &ParameterSpec, value: Value) -> RegionResult<Value> {
    let found = value.basic_type();
    value
        .coerce(spec.data_type)
        .ok_or_else(|| RegionError::ParameterType {
            name: spec.name.clone(),
            expected: spec.data_type,
            found,
        })
}

fn check_index(spec: &ParameterSpec, index: usize) -> RegionResult<()> {
    let positions = spec.positions();
    if index >= positions {
        return Err(RegionError::IndexOutOfRange {
            name: spec.name.clone(),
            index,
            positions,
        });
    }
    Ok(())
}

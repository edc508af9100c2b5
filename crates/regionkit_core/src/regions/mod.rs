//! Region types shipped with the crate.
//!
//! # Responsibility
//! - `DatabaseOutRegion`: sink writing scalar streams to a SQLite file.
//! - `ScalarSourceRegion`: source publishing a constant-step scalar stream.
//!
//! # See also
//! - `region::registry::RegionRegistry::register_builtin_regions`

mod database_out;
mod scalar_source;

pub use database_out::{
    DatabaseOutRegion, COMMAND_CLOSE_FILE, DEFAULT_TABLE_PREFIX, MAX_NUMBER_OF_INPUTS,
    PARAM_OUTPUT_FILE, PARAM_TABLE_PREFIX,
};
pub use scalar_source::{
    ScalarSourceRegion, COMMAND_RESET, MAX_WIDTH, OUTPUT_DATA, PARAM_EMITTED, PARAM_INCREMENT,
    PARAM_VALUE, PARAM_WIDTH,
};

use crate::region::{coerce_parameter, RegionError, RegionResult};
use crate::spec::Spec;
use crate::types::{FromValue, ValueMap};

/// Bundle value for `name` coerced to its declared type, else the Spec default.
pub(crate) fn resolve_param<T: FromValue>(
    spec: &Spec,
    params: &ValueMap,
    name: &str,
) -> RegionResult<T> {
    let parameter = spec
        .parameter(name)
        .ok_or_else(|| RegionError::Configuration(format!("parameter `{name}` is not declared")))?;
    let value = match params.get(name) {
        Some(value) => Some(coerce_parameter(parameter, value.clone())?),
        None => parameter.default()?,
    };
    let value = value.ok_or_else(|| {
        RegionError::Configuration(format!("parameter `{name}` has no value and no default"))
    })?;
    T::from_value(&value).ok_or_else(|| RegionError::ParameterType {
        name: name.to_string(),
        expected: T::basic_type(),
        found: value.basic_type(),
    })
}

/// Error for a parameter name the implementation does not handle.
pub(crate) fn unknown_parameter(region: &str, name: &str) -> RegionError {
    RegionError::UnknownParameter {
        region: region.to_string(),
        name: name.to_string(),
    }
}

//! Plugin runtime for computation regions.
//!
//! A region is a named, stateful unit that consumes typed input ports,
//! produces output ports, exposes typed parameters and string commands, and
//! persists itself in a versioned binary format.

pub mod logging;
pub mod persist;
pub mod port;
pub mod region;
pub mod regions;
pub mod spec;
pub mod store;
pub mod types;

pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use persist::{PersistError, PersistResult, Serializable};
pub use port::{Input, Output, PortError, PortSet};
pub use region::registry::{RegionFactory, RegionRegistry, RegistryError};
pub use region::{
    Region, RegionError, RegionImpl, RegionResult, RegionState, RegionType,
    REGION_ENVELOPE_VERSION,
};
pub use regions::{DatabaseOutRegion, ScalarSourceRegion};
pub use spec::{AccessMode, CommandSpec, InputSpec, OutputSpec, ParameterSpec, Spec, SpecError};
pub use store::{StoreError, StoreResult, StreamRow};
pub use types::{Array, BasicType, FromValue, Value, ValueError, ValueMap};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}

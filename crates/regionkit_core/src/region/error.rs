//! Region error taxonomy.

use crate::persist::PersistError;
use crate::port::PortError;
use crate::spec::AccessMode;
use crate::store::StoreError;
use crate::types::{BasicType, ValueError};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RegionResult<T> = Result<T, RegionError>;

/// Errors surfaced by the region plugin contract.
///
/// Nothing here is retried internally; callers decide whether to abort the
/// graph or reconfigure.
#[derive(Debug)]
pub enum RegionError {
    /// Bad or missing wiring/parameters.
    Configuration(String),
    UnknownParameter {
        region: String,
        name: String,
    },
    UnknownCommand {
        region: String,
        command: String,
    },
    AccessViolation {
        region: String,
        name: String,
        access: AccessMode,
    },
    /// External store could not be opened, written, closed or deleted.
    Resource(StoreError),
    IncompatibleVersion {
        found: i32,
        oldest_supported: i32,
        newest_supported: i32,
    },
    /// Persisted payload unreadable for reasons other than its version.
    Persist(PersistError),
    NotInitialized(String),
    ParameterType {
        name: String,
        expected: BasicType,
        found: BasicType,
    },
    IndexOutOfRange {
        name: String,
        index: usize,
        positions: usize,
    },
    UnknownRegionType(String),
}

impl Display for RegionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configuration(message) => write!(f, "configuration error: {message}"),
            Self::UnknownParameter { region, name } => {
                write!(f, "{region}: unknown parameter `{name}`")
            }
            Self::UnknownCommand { region, command } => {
                write!(f, "{region}: unknown command `{command}`")
            }
            Self::AccessViolation {
                region,
                name,
                access,
            } => write!(
                f,
                "{region}: parameter `{name}` is {} and cannot be set",
                access.as_str()
            ),
            Self::Resource(err) => write!(f, "resource error: {err}"),
            Self::IncompatibleVersion {
                found,
                oldest_supported,
                newest_supported,
            } => write!(
                f,
                "persisted format version {found} is not supported (supported {oldest_supported}..={newest_supported})"
            ),
            Self::Persist(err) => write!(f, "{err}"),
            Self::NotInitialized(region) => {
                write!(f, "{region}: compute called before initialize")
            }
            Self::ParameterType {
                name,
                expected,
                found,
            } => write!(f, "parameter `{name}` expects {expected}, got {found}"),
            Self::IndexOutOfRange {
                name,
                index,
                positions,
            } => write!(
                f,
                "parameter `{name}` index {index} is out of range (positions: {positions})"
            ),
            Self::UnknownRegionType(type_name) => {
                write!(f, "region type is not registered: {type_name}")
            }
        }
    }
}

impl Error for RegionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Resource(err) => Some(err),
            Self::Persist(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for RegionError {
    fn from(value: StoreError) -> Self {
        Self::Resource(value)
    }
}

impl From<PortError> for RegionError {
    fn from(value: PortError) -> Self {
        Self::Configuration(value.to_string())
    }
}

impl From<PersistError> for RegionError {
    fn from(value: PersistError) -> Self {
        match value {
            PersistError::IncompatibleVersion {
                found,
                oldest_supported,
                newest_supported,
            } => Self::IncompatibleVersion {
                found,
                oldest_supported,
                newest_supported,
            },
            other => Self::Persist(other),
        }
    }
}

impl From<ValueError> for RegionError {
    fn from(value: ValueError) -> Self {
        Self::Configuration(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::RegionError;
    use crate::persist::PersistError;
    use crate::types::{BasicType, ValueError};

    #[test]
    fn incompatible_version_is_lifted_out_of_persist_errors() {
        let err = RegionError::from(PersistError::IncompatibleVersion {
            found: 9,
            oldest_supported: 1,
            newest_supported: 2,
        });
        assert!(matches!(err, RegionError::IncompatibleVersion { found: 9, .. }));

        let err = RegionError::from(PersistError::Corrupt("short".to_string()));
        assert!(matches!(err, RegionError::Persist(_)));
    }

    #[test]
    fn unparseable_default_is_a_configuration_error() {
        let err = RegionError::from(ValueError::Parse {
            data_type: BasicType::UInt32,
            raw: "ten".to_string(),
        });
        assert_eq!(
            err.to_string(),
            "configuration error: cannot parse `ten` as UInt32"
        );
    }
}

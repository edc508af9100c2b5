//! Element type tags for ports and parameters.

use serde::Serialize;
use std::fmt::{Display, Formatter};

/// Element type carried by one port or parameter.
///
/// `Byte` with element count 0 is the free-form string/path convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum BasicType {
    Byte,
    Bool,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Real32,
    Real64,
}

impl BasicType {
    /// Stable name used in specs and diagnostics.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Byte => "Byte",
            Self::Bool => "Bool",
            Self::Int32 => "Int32",
            Self::UInt32 => "UInt32",
            Self::Int64 => "Int64",
            Self::UInt64 => "UInt64",
            Self::Real32 => "Real32",
            Self::Real64 => "Real64",
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            Self::Int32 | Self::UInt32 | Self::Int64 | Self::UInt64
        )
    }

    pub fn is_real(self) -> bool {
        matches!(self, Self::Real32 | Self::Real64)
    }
}

impl Display for BasicType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::BasicType;

    #[test]
    fn classifies_numeric_types() {
        assert!(BasicType::UInt32.is_integer());
        assert!(!BasicType::UInt32.is_real());
        assert!(BasicType::Real32.is_real());
        assert!(!BasicType::Byte.is_integer());
        assert!(!BasicType::Bool.is_real());
    }

    #[test]
    fn display_matches_stable_name() {
        assert_eq!(BasicType::Real64.to_string(), "Real64");
        assert_eq!(BasicType::Byte.as_str(), "Byte");
    }
}

//! Tagged parameter values and the name-keyed parameter bundle.
//!
//! # Responsibility
//! - Represent one parameter value as a tagged variant.
//! - Hold the construction-time parameter bundle (`ValueMap`).
//! - Parse spec default strings and JSON bundles into typed values.
//!
//! # Invariants
//! - `ValueMap` keys iterate in ascending name order.
//! - `Value::coerce` is the only conversion path; it rejects any value that
//!   would not convert back unchanged, and is applied at validation time.

use crate::types::basic_type::BasicType;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// One scalar parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Real32(f32),
    Real64(f64),
    /// Free-form string, declared as `Byte` with element count 0.
    Str(String),
}

impl Value {
    pub fn basic_type(&self) -> BasicType {
        match self {
            Self::Bool(_) => BasicType::Bool,
            Self::Int32(_) => BasicType::Int32,
            Self::UInt32(_) => BasicType::UInt32,
            Self::Int64(_) => BasicType::Int64,
            Self::UInt64(_) => BasicType::UInt64,
            Self::Real32(_) => BasicType::Real32,
            Self::Real64(_) => BasicType::Real64,
            Self::Str(_) => BasicType::Byte,
        }
    }

    /// Parses a spec default string for the declared type.
    ///
    /// An empty string is the empty `Str` for `Byte` and `None` otherwise.
    pub fn parse(data_type: BasicType, raw: &str) -> Result<Option<Self>, ValueError> {
        let trimmed = raw.trim();
        if data_type == BasicType::Byte {
            return Ok(Some(Self::Str(raw.to_string())));
        }
        if trimmed.is_empty() {
            return Ok(None);
        }

        let parse_error = || ValueError::Parse {
            data_type,
            raw: raw.to_string(),
        };
        let value = match data_type {
            BasicType::Bool => match trimmed {
                "true" | "1" => Self::Bool(true),
                "false" | "0" => Self::Bool(false),
                _ => return Err(parse_error()),
            },
            BasicType::Int32 => Self::Int32(trimmed.parse().map_err(|_| parse_error())?),
            BasicType::UInt32 => Self::UInt32(trimmed.parse().map_err(|_| parse_error())?),
            BasicType::Int64 => Self::Int64(trimmed.parse().map_err(|_| parse_error())?),
            BasicType::UInt64 => Self::UInt64(trimmed.parse().map_err(|_| parse_error())?),
            BasicType::Real32 => Self::Real32(trimmed.parse().map_err(|_| parse_error())?),
            BasicType::Real64 => Self::Real64(trimmed.parse().map_err(|_| parse_error())?),
            BasicType::Byte => return Err(parse_error()),
        };
        Ok(Some(value))
    }

    /// Converts to `target` when no information is lost.
    ///
    /// Integers convert between integer types when in range and to reals when
    /// exactly representable; `Real64` narrows to `Real32` only when the value
    /// survives the round trip (NaN included). Strings and bools only match
    /// themselves.
    pub fn coerce(self, target: BasicType) -> Option<Self> {
        if self.basic_type() == target {
            return Some(self);
        }

        if let Some(integer) = self.as_i128() {
            return match target {
                BasicType::Int32 => i32::try_from(integer).ok().map(Self::Int32),
                BasicType::UInt32 => u32::try_from(integer).ok().map(Self::UInt32),
                BasicType::Int64 => i64::try_from(integer).ok().map(Self::Int64),
                BasicType::UInt64 => u64::try_from(integer).ok().map(Self::UInt64),
                BasicType::Real32 => {
                    let real = integer as f32;
                    (real as i128 == integer).then_some(Self::Real32(real))
                }
                BasicType::Real64 => {
                    let real = integer as f64;
                    (real as i128 == integer).then_some(Self::Real64(real))
                }
                BasicType::Byte | BasicType::Bool => None,
            };
        }

        match (self, target) {
            (Self::Real32(value), BasicType::Real64) => Some(Self::Real64(f64::from(value))),
            (Self::Real64(value), BasicType::Real32) => {
                let narrowed = value as f32;
                (f64::from(narrowed) == value || value.is_nan()).then_some(Self::Real32(narrowed))
            }
            _ => None,
        }
    }

    fn as_i128(&self) -> Option<i128> {
        match self {
            Self::Int32(value) => Some(i128::from(*value)),
            Self::UInt32(value) => Some(i128::from(*value)),
            Self::Int64(value) => Some(i128::from(*value)),
            Self::UInt64(value) => Some(i128::from(*value)),
            _ => None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int32(value) => write!(f, "{value}"),
            Self::UInt32(value) => write!(f, "{value}"),
            Self::Int64(value) => write!(f, "{value}"),
            Self::UInt64(value) => write!(f, "{value}"),
            Self::Real32(value) => write!(f, "{value}"),
            Self::Real64(value) => write!(f, "{value}"),
            Self::Str(value) => f.write_str(value),
        }
    }
}

macro_rules! value_conversions {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Self::$variant(value)
                }
            }

            impl FromValue for $ty {
                fn from_value(value: &Value) -> Option<Self> {
                    match value {
                        Value::$variant(inner) => Some(*inner),
                        _ => None,
                    }
                }

                fn basic_type() -> BasicType {
                    BasicType::$variant
                }
            }
        )*
    };
}

/// Typed extraction from a `Value` without conversion.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Option<Self>;
    fn basic_type() -> BasicType;
}

value_conversions!(
    bool => Bool,
    i32 => Int32,
    u32 => UInt32,
    i64 => Int64,
    u64 => UInt64,
    f32 => Real32,
    f64 => Real64,
);

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Str(inner) => Some(inner.clone()),
            _ => None,
        }
    }

    fn basic_type() -> BasicType {
        BasicType::Byte
    }
}

/// Construction-time parameter bundle keyed by parameter name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueMap {
    entries: BTreeMap<String, Value>,
}

impl ValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a flat JSON object into a bundle.
    ///
    /// Integers become `Int64` (or `UInt64` above `i64::MAX`), other numbers
    /// `Real64`, strings `Str`. Nested values and `null` are rejected.
    pub fn from_json_str(raw: &str) -> Result<Self, ValueError> {
        let parsed: serde_json::Value =
            serde_json::from_str(raw).map_err(|err| ValueError::InvalidJson(err.to_string()))?;
        let serde_json::Value::Object(object) = parsed else {
            return Err(ValueError::InvalidJson(
                "parameter bundle must be a JSON object".to_string(),
            ));
        };

        let mut map = Self::new();
        for (name, raw_value) in object {
            let value = match raw_value {
                serde_json::Value::Bool(flag) => Value::Bool(flag),
                serde_json::Value::String(text) => Value::Str(text),
                serde_json::Value::Number(number) => {
                    if let Some(signed) = number.as_i64() {
                        Value::Int64(signed)
                    } else if let Some(unsigned) = number.as_u64() {
                        Value::UInt64(unsigned)
                    } else if let Some(real) = number.as_f64() {
                        Value::Real64(real)
                    } else {
                        return Err(ValueError::UnsupportedJson(name));
                    }
                }
                _ => return Err(ValueError::UnsupportedJson(name)),
            };
            map.entries.insert(name, value);
        }
        Ok(map)
    }

    /// Inserts or replaces one entry, returning the previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(name.into(), value.into())
    }

    /// Builder form of `insert`.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in ascending name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }
}

/// Parameter value parse and access errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueError {
    Parse {
        data_type: BasicType,
        raw: String,
    },
    InvalidJson(String),
    UnsupportedJson(String),
}

impl Display for ValueError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse { data_type, raw } => {
                write!(f, "cannot parse `{raw}` as {data_type}")
            }
            Self::InvalidJson(message) => write!(f, "invalid parameter bundle: {message}"),
            Self::UnsupportedJson(name) => write!(
                f,
                "parameter `{name}` must be a bool, number or string"
            ),
        }
    }
}

impl Error for ValueError {}

//! Typed element buffers published by outputs and viewed by inputs.

use crate::types::basic_type::BasicType;

/// Owned, typed buffer for one port.
#[derive(Debug, Clone, PartialEq)]
pub enum Array {
    Byte(Vec<u8>),
    Bool(Vec<bool>),
    Int32(Vec<i32>),
    UInt32(Vec<u32>),
    Int64(Vec<i64>),
    UInt64(Vec<u64>),
    Real32(Vec<f32>),
    Real64(Vec<f64>),
}

impl Array {
    /// Creates a zero-filled buffer of `count` elements.
    pub fn zeros(data_type: BasicType, count: usize) -> Self {
        match data_type {
            BasicType::Byte => Self::Byte(vec![0; count]),
            BasicType::Bool => Self::Bool(vec![false; count]),
            BasicType::Int32 => Self::Int32(vec![0; count]),
            BasicType::UInt32 => Self::UInt32(vec![0; count]),
            BasicType::Int64 => Self::Int64(vec![0; count]),
            BasicType::UInt64 => Self::UInt64(vec![0; count]),
            BasicType::Real32 => Self::Real32(vec![0.0; count]),
            BasicType::Real64 => Self::Real64(vec![0.0; count]),
        }
    }

    pub fn basic_type(&self) -> BasicType {
        match self {
            Self::Byte(_) => BasicType::Byte,
            Self::Bool(_) => BasicType::Bool,
            Self::Int32(_) => BasicType::Int32,
            Self::UInt32(_) => BasicType::UInt32,
            Self::Int64(_) => BasicType::Int64,
            Self::UInt64(_) => BasicType::UInt64,
            Self::Real32(_) => BasicType::Real32,
            Self::Real64(_) => BasicType::Real64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Byte(values) => values.len(),
            Self::Bool(values) => values.len(),
            Self::Int32(values) => values.len(),
            Self::UInt32(values) => values.len(),
            Self::Int64(values) => values.len(),
            Self::UInt64(values) => values.len(),
            Self::Real32(values) => values.len(),
            Self::Real64(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads one element widened to `f64`.
    ///
    /// Returns `None` when `index` is out of range.
    pub fn get_f64(&self, index: usize) -> Option<f64> {
        match self {
            Self::Byte(values) => values.get(index).map(|v| f64::from(*v)),
            Self::Bool(values) => values.get(index).map(|v| if *v { 1.0 } else { 0.0 }),
            Self::Int32(values) => values.get(index).map(|v| f64::from(*v)),
            Self::UInt32(values) => values.get(index).map(|v| f64::from(*v)),
            Self::Int64(values) => values.get(index).map(|v| *v as f64),
            Self::UInt64(values) => values.get(index).map(|v| *v as f64),
            Self::Real32(values) => values.get(index).map(|v| f64::from(*v)),
            Self::Real64(values) => values.get(index).copied(),
        }
    }
}

impl From<Vec<f32>> for Array {
    fn from(value: Vec<f32>) -> Self {
        Self::Real32(value)
    }
}

impl From<Vec<f64>> for Array {
    fn from(value: Vec<f64>) -> Self {
        Self::Real64(value)
    }
}

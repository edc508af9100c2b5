//! Shared data types for ports, parameters and specs.
//!
//! # Responsibility
//! - Name the element types a port or parameter can carry.
//! - Hold typed buffers exchanged across links.
//! - Hold the tagged parameter values of a parameter bundle.
//!
//! # Invariants
//! - Every `Value` and `Array` reports exactly one `BasicType`.
//! - Typed accessors fail closed on type mismatch; no silent casts.

pub mod array;
pub mod basic_type;
pub mod value;

pub use array::Array;
pub use basic_type::BasicType;
pub use value::{FromValue, Value, ValueError, ValueMap};

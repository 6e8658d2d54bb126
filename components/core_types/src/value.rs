//! Runtime value representation.
//!
//! Every value carries its tag, but the tag is never consulted to pick an
//! arithmetic operation: each instruction fixes the types it operates on,
//! and the type checker guarantees the operands already have them.

use serde::{Serialize, Serializer};
use std::fmt;
use std::time::Duration;

/// Represents any value handled by the virtual machine.
///
/// # Examples
///
/// ```
/// use core_types::{Value, ValueType};
///
/// let value = Value::Float(2.5);
/// assert_eq!(value.value_type(), Some(ValueType::Float));
/// assert_eq!(Value::zero(ValueType::String), Value::Str(String::new()));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// 64-bit signed integer
    Int(i64),
    /// IEEE 754 double-precision float
    Float(f64),
    /// UTF-8 string
    Str(String),
    /// Boolean produced by matches and comparisons
    Bool(bool),
    /// Duration literal, used by timed deletion
    Duration(Duration),
}

/// The value type of a metric datum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    /// Integer datum
    Int,
    /// Floating point datum
    Float,
    /// Text datum
    String,
}

impl Value {
    /// The initial value of a freshly created datum of the given type
    pub fn zero(value_type: ValueType) -> Self {
        match value_type {
            ValueType::Int => Value::Int(0),
            ValueType::Float => Value::Float(0.0),
            ValueType::String => Value::Str(String::new()),
        }
    }

    /// The datum type this value can be stored as, if any
    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            Value::Int(_) => Some(ValueType::Int),
            Value::Float(_) => Some(ValueType::Float),
            Value::Str(_) => Some(ValueType::String),
            Value::Bool(_) | Value::Duration(_) => None,
        }
    }

    /// Short name of the value's tag, used in diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Bool(_) => "bool",
            Value::Duration(_) => "duration",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{}", s),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Duration(d) => write!(f, "{:?}", d),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Int(n) => serializer.serialize_i64(*n),
            Value::Float(n) => serializer.serialize_f64(*n),
            Value::Str(s) => serializer.serialize_str(s),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Duration(d) => serializer.serialize_f64(d.as_secs_f64()),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::String => "string",
        };
        f.write_str(name)
    }
}

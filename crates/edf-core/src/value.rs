//! Typed scalar values as they appear on disk.
//!
//! Every numeric field in an EDF file is one of three little-endian
//! encodings. The encoding is always known from the catalog or the row shape;
//! consumers match on [`Value`] rather than guessing.

use std::fmt;

use serde::{Deserialize, Serialize};

/// On-disk encoding of a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    /// IEEE-754 `f32`, 4 bytes.
    Float,
    /// Signed `i32`, 4 bytes.
    Int,
    /// Unsigned byte.
    Byte,
}

impl ValueType {
    /// Number of bytes the encoding occupies.
    pub const fn width(self) -> usize {
        match self {
            ValueType::Float | ValueType::Int => 4,
            ValueType::Byte => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ValueType::Float => "float",
            ValueType::Int => "int",
            ValueType::Byte => "byte",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded field value, tagged with its encoding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Float(f32),
    Int(i32),
    Byte(u8),
}

impl Value {
    /// Decode a value of type `ty` at `offset`. Returns `None` if the buffer
    /// is too short.
    pub fn read(buf: &[u8], offset: usize, ty: ValueType) -> Option<Value> {
        match ty {
            ValueType::Float => read_f32(buf, offset).map(Value::Float),
            ValueType::Int => read_i32(buf, offset).map(Value::Int),
            ValueType::Byte => buf.get(offset).copied().map(Value::Byte),
        }
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Float(_) => ValueType::Float,
            Value::Int(_) => ValueType::Int,
            Value::Byte(_) => ValueType::Byte,
        }
    }

    pub fn as_f64(&self) -> f64 {
        match *self {
            Value::Float(v) => v as f64,
            Value::Int(v) => v as f64,
            Value::Byte(v) => v as f64,
        }
    }

    pub fn as_f32(&self) -> f32 {
        match *self {
            Value::Float(v) => v,
            Value::Int(v) => v as f32,
            Value::Byte(v) => v as f32,
        }
    }

    /// Little-endian encoding of the value.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        match *self {
            Value::Float(v) => v.to_le_bytes().to_vec(),
            Value::Int(v) => v.to_le_bytes().to_vec(),
            Value::Byte(v) => vec![v],
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Float(v) => write!(f, "{}", crate::format::format_float(*v as f64, 6)),
            Value::Int(v) => write!(f, "{v}"),
            Value::Byte(v) => write!(f, "{v}"),
        }
    }
}

/// Closed plausibility interval `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// NaN is never contained.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

pub(crate) fn read_f32(buf: &[u8], offset: usize) -> Option<f32> {
    read_array(buf, offset).map(f32::from_le_bytes)
}

pub(crate) fn read_i32(buf: &[u8], offset: usize) -> Option<i32> {
    read_array(buf, offset).map(i32::from_le_bytes)
}

fn read_array(buf: &[u8], offset: usize) -> Option<[u8; 4]> {
    let end = offset.checked_add(4)?;
    buf.get(offset..end)?.try_into().ok()
}

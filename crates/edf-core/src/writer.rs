//! Patch writer: the only code that mutates a buffer.
//!
//! An edit names a field by [`FieldRef`]: exact offset, encoding and optional
//! plausibility bounds, all derived from a decoded entity. Values are checked
//! before any byte is touched, and a successful edit overwrites exactly the
//! field's width.

use std::fmt;

use serde::Serialize;

use crate::catalog::Signature;
use crate::error::{EdfError, Result};
use crate::range::ByteRange;
use crate::row::{BoostColumn, TorqueColumn};
use crate::value::{Bounds, Value, ValueType};

/// Which entity field a [`FieldRef`] was derived from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "entity", rename_all = "snake_case")]
pub enum FieldTarget {
    Torque {
        table: usize,
        row: usize,
        column: TorqueColumn,
    },
    Boost {
        table: usize,
        row: usize,
        column: BoostColumn,
    },
    Parameter {
        signature: Signature,
        field: usize,
    },
}

impl fmt::Display for FieldTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldTarget::Torque { table, row, column } => {
                write!(f, "torque[{table}][{row}].{}", column.name())
            }
            FieldTarget::Boost { table, row, column } => {
                write!(f, "boost[{table}][{row}].{}", column.name())
            }
            FieldTarget::Parameter { signature, field } => {
                write!(f, "param[{signature}].{field}")
            }
        }
    }
}

/// Exact location, encoding and bounds of an editable field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldRef {
    pub target: FieldTarget,
    pub offset: usize,
    pub encoding: ValueType,
    pub bounds: Option<Bounds>,
}

impl FieldRef {
    pub fn width(&self) -> usize {
        self.encoding.width()
    }

    pub fn span(&self) -> Option<ByteRange> {
        ByteRange::with_len(self.offset, self.width())
    }
}

/// Check `value` against the field's encoding and bounds, returning the value
/// exactly as it will be stored.
pub fn validate(field: &FieldRef, value: f64) -> Result<Value> {
    let reject = |expected: String| EdfError::validation(field.target.to_string(), value, expected);

    let encoded = match field.encoding {
        ValueType::Float => {
            let v = value as f32;
            if !value.is_finite() || !v.is_finite() {
                return Err(reject("a finite 32-bit float".to_string()));
            }
            Value::Float(v)
        }
        ValueType::Int => {
            if value.fract() != 0.0 || value < i32::MIN as f64 || value > i32::MAX as f64 {
                return Err(reject("a 32-bit integer".to_string()));
            }
            Value::Int(value as i32)
        }
        ValueType::Byte => {
            if value.fract() != 0.0 || !(0.0..=255.0).contains(&value) {
                return Err(reject("an integer in 0..=255".to_string()));
            }
            Value::Byte(value as u8)
        }
    };

    if let Some(bounds) = field.bounds {
        if !bounds.contains(value) {
            return Err(reject(format!("a value in {bounds}")));
        }
    }
    Ok(encoded)
}

/// Overwrite `bytes` at `offset`. Fails without touching `buf` if the patch
/// would run past the end.
pub fn patch(buf: &mut [u8], offset: usize, bytes: &[u8]) -> Result<()> {
    let len = buf.len();
    let write_err = || EdfError::Write {
        offset,
        width: bytes.len(),
        len,
    };
    let end = offset.checked_add(bytes.len()).ok_or_else(write_err)?;
    let dest = buf.get_mut(offset..end).ok_or_else(write_err)?;
    dest.copy_from_slice(bytes);
    Ok(())
}

/// Validate and write one field.
pub fn apply_edit(buf: &mut [u8], field: &FieldRef, value: f64) -> Result<Value> {
    let encoded = validate(field, value)?;
    check_in_bounds(buf.len(), field)?;
    patch(buf, field.offset, &encoded.to_le_bytes())?;
    Ok(encoded)
}

/// Validate every edit, then write them all. Either every field is written or
/// the buffer is left untouched.
pub fn apply_batch(buf: &mut [u8], edits: &[(FieldRef, f64)]) -> Result<Vec<Value>> {
    let len = buf.len();
    let encoded = edits
        .iter()
        .map(|(field, value)| {
            let v = validate(field, *value)?;
            check_in_bounds(len, field)?;
            Ok(v)
        })
        .collect::<Result<Vec<Value>>>()?;

    for ((field, _), value) in edits.iter().zip(&encoded) {
        patch(buf, field.offset, &value.to_le_bytes())?;
    }
    Ok(encoded)
}

fn check_in_bounds(len: usize, field: &FieldRef) -> Result<()> {
    match field.offset.checked_add(field.width()) {
        Some(end) if end <= len => Ok(()),
        _ => Err(EdfError::Write {
            offset: field.offset,
            width: field.width(),
            len,
        }),
    }
}

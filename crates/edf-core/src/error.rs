//! Error and diagnostic types for the EDF codec.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::catalog::Signature;
use crate::row::RowShape;

/// Result type for codec operations.
pub type Result<T> = std::result::Result<T, EdfError>;

/// Errors that abort a load or reject a single edit.
#[derive(Debug, Error)]
pub enum EdfError {
    /// No table or parameter signature was found anywhere in the buffer.
    #[error("not an EDF file: no table or parameter signatures found in {len} bytes")]
    Format {
        /// Length of the rejected buffer.
        len: usize,
    },

    /// An edit value violates the field's encoding or plausibility bounds.
    #[error("invalid value {value} for {field}: expected {expected}")]
    Validation {
        /// Human-readable field name.
        field: String,
        /// The rejected input.
        value: f64,
        /// Description of the accepted domain.
        expected: String,
    },

    /// A patch would touch bytes outside the buffer.
    #[error("patch of {width} bytes at 0x{offset:X} exceeds buffer length {len}")]
    Write {
        offset: usize,
        width: usize,
        len: usize,
    },

    /// Known and unknown ranges failed to partition the file.
    #[error("byte range partition broken: {detail}")]
    Partition { detail: String },

    /// A field reference that no longer points at a decoded entity.
    #[error("stale field reference: {field}")]
    StaleField { field: String },

    /// An edit would change which bytes decode as tables or parameters.
    #[error("{edit} would change the decoded file structure; edit undone")]
    StructureChanged { edit: String },

    /// A signature or byte string that is not valid hex.
    #[error("invalid hex bytes {text:?}")]
    Hex {
        text: String,
        #[source]
        source: hex::FromHexError,
    },

    /// Invalid catalog extension.
    #[error("catalog error: {detail}")]
    Catalog { detail: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EdfError {
    pub(crate) fn validation(
        field: impl Into<String>,
        value: f64,
        expected: impl Into<String>,
    ) -> Self {
        EdfError::Validation {
            field: field.into(),
            value,
            expected: expected.into(),
        }
    }
}

/// Non-fatal anomalies recorded while scanning.
///
/// These never abort a load; they explain why the decoded result has fewer
/// rows or parameters than the file might suggest.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A parameter signature matched at several offsets; the first was used.
    AmbiguousSignature {
        name: String,
        signature: Signature,
        offsets: Vec<usize>,
    },
    /// A parameter signature matched but its values run past the end of the file.
    TruncatedParameter {
        name: String,
        offset: usize,
    },
    /// A table row failed plausibility bounds under every row shape.
    ImplausibleRow {
        table: TableKind,
        offset: usize,
    },
    /// A row whose marker declares a different shape from the table's first
    /// standard row. The row is kept, decoded as its marker says.
    MixedRowShape {
        table: TableKind,
        offset: usize,
        expected: RowShape,
        found: RowShape,
    },
    /// A zero-RPM row whose RPM byte is not zero.
    NonZeroRpmByte {
        table: TableKind,
        offset: usize,
        value: u8,
    },
}

/// Which family of table a diagnostic refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    Torque,
    Boost,
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableKind::Torque => write!(f, "torque"),
            TableKind::Boost => write!(f, "boost"),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::AmbiguousSignature {
                name,
                signature,
                offsets,
            } => {
                let list: Vec<String> = offsets.iter().map(|o| format!("0x{o:X}")).collect();
                write!(
                    f,
                    "signature [{signature}] ({name}) matched {} times at {}; using the first",
                    offsets.len(),
                    list.join(", ")
                )
            }
            Diagnostic::TruncatedParameter { name, offset } => {
                write!(f, "{name} at 0x{offset:X} is truncated by end of file")
            }
            Diagnostic::ImplausibleRow { table, offset } => {
                write!(f, "{table} row at 0x{offset:X} is out of bounds; table ends here")
            }
            Diagnostic::MixedRowShape {
                table,
                offset,
                expected,
                found,
            } => write!(
                f,
                "{table} row at 0x{offset:X} is tagged {found:?} in a {expected:?} table"
            ),
            Diagnostic::NonZeroRpmByte {
                table,
                offset,
                value,
            } => write!(
                f,
                "{table} zero-RPM row at 0x{offset:X} has RPM byte {value}"
            ),
        }
    }
}

//! Lossless codec for EDF engine-definition files.
//!
//! Decodes torque curves, boost curves, named parameters and the engine
//! layout tag from an opaque binary, and writes edits back in place. Every
//! byte that is not an edited field is preserved exactly.
//!
//! ## Row Layout
//!
//! ```text
//! Torque table:
//! ┌──────────────────────────────┐
//! │ 24 8B 0A B7 71 83 02         │  zero-RPM marker
//! │   u8 rpm, f32 comp, f32 Nm   │  9 bytes
//! ├──────────────────────────────┤
//! │ 24 8B 0A B7 71 93|A3 02      │  row marker (repeated)
//! │   i32|f32 rpm, f32, f32      │  12 bytes
//! ├──────────────────────────────┤
//! │ 24 8B 0A B7 71 93 00         │  terminal marker (optional)
//! │   i32 rpm, f32 comp, u8      │  9 bytes
//! └──────────────────────────────┘
//!
//! Boost table:
//! ┌──────────────────────────────┐
//! │ 24 51 5F 5E 83 86 AA         │  zero-RPM marker
//! │   u8 rpm, f32 x 5            │  21 bytes
//! ├──────────────────────────────┤
//! │ 24 51 5F 5E 83 96 AA         │  row marker (repeated)
//! │   i32 rpm, f32 x 5           │  24 bytes
//! └──────────────────────────────┘
//! ```
//!
//! All integers and floats are little-endian. Parameters are a catalog
//! signature followed by a fixed sequence of values.

pub mod analysis;
pub mod catalog;
pub mod document;
pub mod error;
pub mod export;
pub mod format;
pub mod layout;
pub mod param;
pub mod range;
pub mod row;
pub mod table;
pub mod value;
pub mod writer;

#[cfg(test)]
pub(crate) mod fixture;

pub use catalog::{Catalog, FieldSpec, LayoutKind, ParamSpec, RowMarker, Signature};
pub use document::{Document, DocumentSummary, Tables};
pub use error::{Diagnostic, EdfError, Result, TableKind};
pub use layout::EngineLayout;
pub use param::{Parameter, ParameterField};
pub use range::{ByteRange, RangeMap};
pub use row::{BoostColumn, RowShape, TorqueColumn};
pub use table::{BoostRow, BoostTable, RowKind, TorqueRow, TorqueTable};
pub use value::{Bounds, Value, ValueType};
pub use writer::{FieldRef, FieldTarget};

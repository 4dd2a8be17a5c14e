//! An opened EDF file: original bytes, the working copy, and everything
//! decoded from it.
//!
//! The original buffer is never mutated. All edits go through
//! [`crate::writer`] against the working copy, which is then decoded again,
//! so the decoded entities always agree with a fresh decode of
//! [`Document::serialize`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::catalog::{Catalog, Signature};
use crate::error::{Diagnostic, EdfError, Result};
use crate::layout::{detect_layout, EngineLayout};
use crate::param::{scan_parameters, Parameter};
use crate::range::{merge, ByteRange, RangeMap};
use crate::row::{BoostColumn, TorqueColumn};
use crate::table::{scan_boost_tables, scan_torque_tables, BoostTable, TorqueTable};
use crate::value::Value;
use crate::writer::{self, FieldRef, FieldTarget};

/// Everything decoded from one buffer state.
#[derive(Debug, Clone)]
struct Decoded {
    torque: Vec<TorqueTable>,
    boost: Vec<BoostTable>,
    parameters: BTreeMap<Signature, Parameter>,
    layout: EngineLayout,
    ranges: RangeMap,
    diagnostics: Vec<Diagnostic>,
}

impl Decoded {
    fn scan(buf: &[u8], catalog: &Catalog) -> Result<Self> {
        let torque = scan_torque_tables(buf, catalog);
        let boost = scan_boost_tables(buf, catalog);
        let params = scan_parameters(buf, catalog);

        if torque.tables.is_empty() && boost.tables.is_empty() && params.parameters.is_empty() {
            return Err(EdfError::Format { len: buf.len() });
        }

        let known: Vec<ByteRange> = torque
            .tables
            .iter()
            .flat_map(TorqueTable::known_ranges)
            .chain(boost.tables.iter().flat_map(BoostTable::known_ranges))
            .chain(params.parameters.values().filter_map(Parameter::span))
            .collect();
        let ranges = RangeMap::compute(buf.len(), &known)?;

        let mut diagnostics = torque.diagnostics;
        diagnostics.extend(boost.diagnostics);
        diagnostics.extend(params.diagnostics);

        Ok(Self {
            torque: torque.tables,
            boost: boost.tables,
            parameters: params.parameters,
            layout: detect_layout(buf, catalog),
            ranges,
            diagnostics,
        })
    }

    fn torque_field(&self, table: usize, row: usize, column: TorqueColumn) -> Option<FieldRef> {
        self.torque.get(table)?.field_ref(row, column)
    }

    fn boost_field(&self, table: usize, row: usize, column: BoostColumn) -> Option<FieldRef> {
        self.boost.get(table)?.field_ref(row, column)
    }

    fn parameter_field(&self, signature: &Signature, field: usize) -> Option<FieldRef> {
        self.parameters.get(signature)?.field_ref(field)
    }

    fn resolve(&self, target: &FieldTarget) -> Option<FieldRef> {
        match target {
            FieldTarget::Torque { table, row, column } => self.torque_field(*table, *row, *column),
            FieldTarget::Boost { table, row, column } => self.boost_field(*table, *row, *column),
            FieldTarget::Parameter { signature, field } => self.parameter_field(signature, *field),
        }
    }
}

/// Borrowed view of both table families.
#[derive(Debug, Clone, Copy)]
pub struct Tables<'a> {
    pub torque: &'a [TorqueTable],
    pub boost: &'a [BoostTable],
}

/// Serializable overview of a document, for tooling.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    pub source: Option<PathBuf>,
    pub file_len: usize,
    pub sha256: String,
    pub modified: bool,
    pub layout: EngineLayout,
    pub layout_label: String,
    pub torque_tables: Vec<TableSummary>,
    pub boost_tables: Vec<TableSummary>,
    pub parameters: usize,
    pub known_bytes: usize,
    pub unknown_bytes: usize,
    pub unknown_regions: usize,
    pub coverage: f64,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableSummary {
    pub index: usize,
    pub start_offset: usize,
    pub rows: usize,
    /// `(rpm, Nm)`; torque tables only.
    pub peak_torque: Option<(f32, f32)>,
}

/// An opened EDF file.
#[derive(Debug, Clone)]
pub struct Document {
    catalog: Arc<Catalog>,
    source: Option<PathBuf>,
    original: Vec<u8>,
    working: Vec<u8>,
    decoded: Decoded,
    edited: Vec<ByteRange>,
}

impl Document {
    /// Read and decode a file.
    pub fn open(path: impl AsRef<Path>, catalog: Arc<Catalog>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let mut doc = Self::from_bytes(bytes, catalog)?;
        doc.source = Some(path.to_path_buf());
        info!(
            path = %path.display(),
            bytes = doc.original.len(),
            torque_tables = doc.decoded.torque.len(),
            boost_tables = doc.decoded.boost.len(),
            parameters = doc.decoded.parameters.len(),
            "loaded EDF"
        );
        Ok(doc)
    }

    /// Decode an in-memory buffer. Fails with [`EdfError::Format`] when no
    /// table or parameter is found.
    pub fn from_bytes(bytes: Vec<u8>, catalog: Arc<Catalog>) -> Result<Self> {
        let decoded = Decoded::scan(&bytes, &catalog)?;
        Ok(Self {
            catalog,
            source: None,
            working: bytes.clone(),
            original: bytes,
            decoded,
            edited: Vec::new(),
        })
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn tables(&self) -> Tables<'_> {
        Tables {
            torque: &self.decoded.torque,
            boost: &self.decoded.boost,
        }
    }

    pub fn torque_tables(&self) -> &[TorqueTable] {
        &self.decoded.torque
    }

    pub fn boost_tables(&self) -> &[BoostTable] {
        &self.decoded.boost
    }

    /// Decoded parameters keyed by signature.
    pub fn parameters(&self) -> &BTreeMap<Signature, Parameter> {
        &self.decoded.parameters
    }

    /// First parameter whose name matches, case-insensitive.
    pub fn parameter_named(&self, name: &str) -> Option<&Parameter> {
        self.decoded
            .parameters
            .values()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn layout(&self) -> EngineLayout {
        self.decoded.layout
    }

    pub fn unknown_regions(&self) -> &[ByteRange] {
        self.decoded.ranges.unknown()
    }

    pub fn known_ranges(&self) -> &[ByteRange] {
        self.decoded.ranges.known()
    }

    pub fn range_map(&self) -> &RangeMap {
        &self.decoded.ranges
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.decoded.diagnostics
    }

    pub fn torque_field(&self, table: usize, row: usize, column: TorqueColumn) -> Option<FieldRef> {
        self.decoded.torque_field(table, row, column)
    }

    pub fn boost_field(&self, table: usize, row: usize, column: BoostColumn) -> Option<FieldRef> {
        self.decoded.boost_field(table, row, column)
    }

    pub fn parameter_field(&self, signature: &Signature, field: usize) -> Option<FieldRef> {
        self.decoded.parameter_field(signature, field)
    }

    /// Write one field. The reference must still describe a decoded field of
    /// this document exactly; otherwise [`EdfError::StaleField`].
    ///
    /// The working copy is decoded again afterwards. An edit that changes
    /// which bytes are known (for example by overwriting part of another
    /// entity's signature) is undone and fails with
    /// [`EdfError::StructureChanged`].
    pub fn edit(&mut self, field: &FieldRef, value: f64) -> Result<Value> {
        self.ensure_current(field)?;
        let before = self.working.clone();
        let stored = writer::apply_edit(&mut self.working, field, value)?;
        self.redecode(before, std::slice::from_ref(field), || field.target.to_string())?;
        debug!(field = %field.target, offset = field.offset, value = %stored, "edit");
        Ok(stored)
    }

    /// Multiply every torque value in every table by `percent / 100`.
    ///
    /// All values are validated before any byte changes. Returns the number
    /// of fields written.
    pub fn scale_torque(&mut self, percent: f64) -> Result<usize> {
        if !percent.is_finite() || percent <= 0.0 {
            return Err(EdfError::validation(
                "torque scale",
                percent,
                "a finite percentage above 0",
            ));
        }
        let factor = percent / 100.0;

        let edits: Vec<(FieldRef, f64)> = self
            .decoded
            .torque
            .iter()
            .flat_map(|table| {
                table.rows.iter().enumerate().filter_map(move |(i, row)| {
                    let torque = row.torque?;
                    let field = table.field_ref(i, TorqueColumn::Torque)?;
                    Some((field, torque as f64 * factor))
                })
            })
            .collect();

        let before = self.working.clone();
        writer::apply_batch(&mut self.working, &edits)?;
        let fields: Vec<FieldRef> = edits.into_iter().map(|(field, _)| field).collect();
        self.redecode(before, &fields, || format!("torque scale {percent}%"))?;
        info!(percent, fields = fields.len(), "scaled torque");
        Ok(fields.len())
    }

    /// Overwrite a single raw byte and decode the whole buffer again. If the
    /// patched buffer no longer decodes, the byte is restored and the error
    /// returned.
    pub fn patch_byte(&mut self, offset: usize, value: u8) -> Result<()> {
        let previous = *self.working.get(offset).ok_or(EdfError::Write {
            offset,
            width: 1,
            len: self.working.len(),
        })?;
        writer::patch(&mut self.working, offset, &[value])?;
        match Decoded::scan(&self.working, &self.catalog) {
            Ok(decoded) => {
                self.decoded = decoded;
                self.edited.extend(ByteRange::with_len(offset, 1));
                debug!(offset, value, "patched byte");
                Ok(())
            }
            Err(e) => {
                writer::patch(&mut self.working, offset, &[previous])?;
                Err(e)
            }
        }
    }

    fn ensure_current(&self, field: &FieldRef) -> Result<()> {
        match self.decoded.resolve(&field.target) {
            Some(current) if current == *field => Ok(()),
            _ => Err(EdfError::StaleField {
                field: field.target.to_string(),
            }),
        }
    }

    /// Decode the working copy after `fields` were written. On failure the
    /// bytes in `before` are restored and the decoded state is left as it was.
    fn redecode(
        &mut self,
        before: Vec<u8>,
        fields: &[FieldRef],
        what: impl FnOnce() -> String,
    ) -> Result<()> {
        let outcome = Decoded::scan(&self.working, &self.catalog).and_then(|decoded| {
            if decoded.ranges.known() != self.decoded.ranges.known() {
                return Err(EdfError::StructureChanged { edit: what() });
            }
            match fields
                .iter()
                .find(|f| decoded.resolve(&f.target).as_ref() != Some(*f))
            {
                Some(stale) => Err(EdfError::StaleField {
                    field: stale.target.to_string(),
                }),
                None => Ok(decoded),
            }
        });
        match outcome {
            Ok(decoded) => {
                self.decoded = decoded;
                self.edited.extend(fields.iter().filter_map(FieldRef::span));
                Ok(())
            }
            Err(e) => {
                self.working = before;
                Err(e)
            }
        }
    }

    /// The working copy as it would be saved.
    pub fn serialize(&self) -> Vec<u8> {
        self.working.clone()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.working
    }

    /// The bytes as loaded.
    pub fn original(&self) -> &[u8] {
        &self.original
    }

    pub fn is_modified(&self) -> bool {
        self.working != self.original
    }

    /// Merged spans of every field written so far.
    pub fn edited_spans(&self) -> Vec<ByteRange> {
        merge(self.edited.clone())
    }

    /// Maximal runs of bytes that differ from the original.
    pub fn changed_spans(&self) -> Vec<ByteRange> {
        diff_spans(&self.original, &self.working)
    }

    /// Write the working copy to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, &self.working)?;
        info!(
            path = %path.display(),
            bytes = self.working.len(),
            changed_spans = self.changed_spans().len(),
            "saved EDF"
        );
        Ok(())
    }

    /// SHA-256 of the working copy, lowercase hex.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.working);
        format!("{:x}", hasher.finalize())
    }

    pub fn summary(&self) -> DocumentSummary {
        let ranges = &self.decoded.ranges;
        DocumentSummary {
            source: self.source.clone(),
            file_len: self.working.len(),
            sha256: self.digest(),
            modified: self.is_modified(),
            layout: self.decoded.layout,
            layout_label: self.decoded.layout.label().to_string(),
            torque_tables: self
                .decoded
                .torque
                .iter()
                .map(|t| TableSummary {
                    index: t.index,
                    start_offset: t.start_offset,
                    rows: t.rows.len(),
                    peak_torque: t.peak_torque(),
                })
                .collect(),
            boost_tables: self
                .decoded
                .boost
                .iter()
                .map(|t| TableSummary {
                    index: t.index,
                    start_offset: t.start_offset,
                    rows: t.rows.len(),
                    peak_torque: None,
                })
                .collect(),
            parameters: self.decoded.parameters.len(),
            known_bytes: ranges.known_bytes(),
            unknown_bytes: ranges.unknown_bytes(),
            unknown_regions: ranges.unknown().len(),
            coverage: ranges.coverage(),
            diagnostics: self.decoded.diagnostics.clone(),
        }
    }
}

/// Maximal runs where `a` and `b` differ. Bytes past the shorter buffer count
/// as different.
pub fn diff_spans(a: &[u8], b: &[u8]) -> Vec<ByteRange> {
    let len = a.len().max(b.len());
    let mut spans = Vec::new();
    let mut run_start: Option<usize> = None;
    for i in 0..len {
        let differs = a.get(i) != b.get(i);
        match (differs, run_start) {
            (true, None) => run_start = Some(i),
            (false, Some(start)) => {
                spans.extend(ByteRange::new(start, i));
                run_start = None;
            }
            _ => {}
        }
    }
    if let Some(start) = run_start {
        spans.extend(ByteRange::new(start, len));
    }
    spans
}

//! Table scanner: torque and boost curves.
//!
//! A table starts at its zero-RPM signature and continues through a run of
//! marker-prefixed rows. The scanner never fails; anything it cannot
//! interpret simply ends the current table and is left for the unknown-range
//! report.

use serde::Serialize;
use tracing::{debug, warn};

use crate::catalog::{find_all, Catalog, TableMarkers};
use crate::error::{Diagnostic, TableKind};
use crate::range::ByteRange;
use crate::row::{
    self, BoostColumn, BoostPayload, BoostShape, RowShape, TorqueColumn, TorquePayload,
    BOOST_ADVISORY_BOUNDS, RPM_BOUNDS, TORQUE_BOUNDS,
};
use crate::writer::{FieldRef, FieldTarget};

/// Position of a row within its table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    ZeroRpm,
    Standard,
    Terminal,
}

impl RowKind {
    pub fn name(self) -> &'static str {
        match self {
            RowKind::ZeroRpm => "zero_rpm",
            RowKind::Standard => "standard",
            RowKind::Terminal => "terminal",
        }
    }
}

/// One row of a torque curve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TorqueRow {
    pub rpm: f32,
    pub compression: f32,
    /// `None` on the terminal row, which stores a trailer byte instead.
    pub torque: Option<f32>,
    /// Offset of the row's marker signature.
    pub byte_offset: usize,
    pub row_kind: RowKind,
    pub shape: RowShape,
    marker_len: usize,
}

impl TorqueRow {
    /// Offset of the first payload byte.
    pub fn payload_offset(&self) -> usize {
        self.byte_offset + self.marker_len
    }

    /// Marker plus payload.
    pub fn span(&self) -> Option<ByteRange> {
        ByteRange::new(self.byte_offset, self.payload_offset() + self.shape.payload_len())
    }

    /// A zero-RPM row is expected to carry RPM 0.
    pub fn rpm_flagged(&self) -> bool {
        self.row_kind == RowKind::ZeroRpm && self.rpm != 0.0
    }
}

/// A torque curve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TorqueTable {
    pub index: usize,
    pub start_offset: usize,
    /// Shape of the first standard row; later rows normally share it.
    pub shape: RowShape,
    pub rows: Vec<TorqueRow>,
    /// Structurally complete rows dropped on plausibility.
    pub rejected: Vec<ByteRange>,
}

impl TorqueTable {
    /// Every byte this table accounts for, rejected rows included.
    pub fn known_ranges(&self) -> Vec<ByteRange> {
        self.rows
            .iter()
            .filter_map(TorqueRow::span)
            .chain(self.rejected.iter().copied())
            .collect()
    }

    /// Field reference for one cell, if that cell exists and is editable.
    ///
    /// The zero-RPM row's RPM byte is structural and not editable.
    pub fn field_ref(&self, row: usize, column: TorqueColumn) -> Option<FieldRef> {
        let r = self.rows.get(row)?;
        if r.row_kind == RowKind::ZeroRpm && column == TorqueColumn::Rpm {
            return None;
        }
        let (rel, encoding) = r.shape.column(column)?;
        let bounds = match column {
            TorqueColumn::Rpm => Some(RPM_BOUNDS),
            TorqueColumn::Torque => Some(TORQUE_BOUNDS),
            TorqueColumn::Compression => None,
        };
        Some(FieldRef {
            target: FieldTarget::Torque {
                table: self.index,
                row,
                column,
            },
            offset: r.payload_offset() + rel,
            encoding,
            bounds,
        })
    }

    /// `(rpm, torque Nm, power kW)` points for charting. Rows without torque
    /// are skipped.
    pub fn power_curve(&self) -> Vec<(f32, f32, f32)> {
        self.rows
            .iter()
            .filter_map(|r| {
                let torque = r.torque?;
                Some((r.rpm, torque, torque * r.rpm / 9549.3))
            })
            .collect()
    }

    /// Highest torque and the RPM it occurs at.
    pub fn peak_torque(&self) -> Option<(f32, f32)> {
        self.rows
            .iter()
            .filter_map(|r| r.torque.map(|t| (r.rpm, t)))
            .fold(None, |best, (rpm, t)| match best {
                Some((_, bt)) if bt >= t => best,
                _ => Some((rpm, t)),
            })
    }
}

/// One row of a boost curve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoostRow {
    pub rpm: f32,
    /// Boost in bar at 0, 25, 50, 75 and 100 % throttle.
    pub throttle: [f32; 5],
    pub byte_offset: usize,
    pub shape: BoostShape,
    marker_len: usize,
}

impl BoostRow {
    pub fn payload_offset(&self) -> usize {
        self.byte_offset + self.marker_len
    }

    pub fn span(&self) -> Option<ByteRange> {
        ByteRange::new(self.byte_offset, self.payload_offset() + self.shape.payload_len())
    }

    /// Any throttle value outside the usual 0.5-3.0 bar. Advisory only.
    pub fn out_of_range(&self) -> bool {
        self.throttle
            .iter()
            .any(|t| !BOOST_ADVISORY_BOUNDS.contains(*t as f64))
    }
}

/// A boost curve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoostTable {
    pub index: usize,
    pub start_offset: usize,
    pub rows: Vec<BoostRow>,
    pub rejected: Vec<ByteRange>,
}

impl BoostTable {
    pub fn known_ranges(&self) -> Vec<ByteRange> {
        self.rows
            .iter()
            .filter_map(BoostRow::span)
            .chain(self.rejected.iter().copied())
            .collect()
    }

    pub fn field_ref(&self, row: usize, column: BoostColumn) -> Option<FieldRef> {
        let r = self.rows.get(row)?;
        if r.shape == BoostShape::ZeroRpm && column == BoostColumn::Rpm {
            return None;
        }
        let (rel, encoding) = r.shape.column(column)?;
        Some(FieldRef {
            target: FieldTarget::Boost {
                table: self.index,
                row,
                column,
            },
            offset: r.payload_offset() + rel,
            encoding,
            bounds: (column == BoostColumn::Rpm).then_some(RPM_BOUNDS),
        })
    }
}

/// Tables plus the diagnostics raised while finding them.
#[derive(Debug, Clone, Default)]
pub struct TableScan<T> {
    pub tables: Vec<T>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Find every torque table in file order.
pub fn scan_torque_tables(buf: &[u8], catalog: &Catalog) -> TableScan<TorqueTable> {
    let markers = catalog.torque_markers();
    let mut scan = TableScan {
        tables: Vec::new(),
        diagnostics: Vec::new(),
    };
    for start in find_all(buf, markers.start.as_bytes()) {
        let index = scan.tables.len();
        if let Some(table) = scan_torque_table(buf, start, index, markers, &mut scan.diagnostics) {
            debug!(
                index,
                offset = start,
                rows = table.rows.len(),
                shape = ?table.shape,
                "torque table"
            );
            scan.tables.push(table);
        }
    }
    scan
}

fn scan_torque_table(
    buf: &[u8],
    start: usize,
    index: usize,
    markers: &TableMarkers,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<TorqueTable> {
    let marker_len = markers.start.len();
    let zero = row::decode_torque(buf, start + marker_len, RowShape::ZeroRpm)?;
    if !zero.is_plausible() {
        diagnostics.push(Diagnostic::ImplausibleRow {
            table: TableKind::Torque,
            offset: start,
        });
        return None;
    }
    if let Some(b) = zero.tag_byte.filter(|b| *b != 0) {
        diagnostics.push(Diagnostic::NonZeroRpmByte {
            table: TableKind::Torque,
            offset: start,
            value: b,
        });
    }

    let mut rows = vec![torque_row(zero, start, marker_len, RowKind::ZeroRpm, RowShape::ZeroRpm)];
    let mut rejected = Vec::new();
    let mut shape: Option<RowShape> = None;
    let mut cursor = start + marker_len + RowShape::ZeroRpm.payload_len();

    while cursor < buf.len() {
        if markers.start.matches_at(buf, cursor) {
            break;
        }

        if let Some(end) = markers.terminator.as_ref().filter(|t| t.matches_at(buf, cursor)) {
            if let Some(p) = row::decode_torque(buf, cursor + end.len(), RowShape::Terminal) {
                rows.push(torque_row(p, cursor, end.len(), RowKind::Terminal, RowShape::Terminal));
            }
            break;
        }

        let Some(marker) = markers.row_marker_at(buf, cursor) else {
            break;
        };
        let payload = cursor + marker.len();
        let decoded = match (marker.shape, shape) {
            // The tag byte is authoritative; no fallback to the other shape.
            (Some(declared), _) => row::decode_torque(buf, payload, declared)
                .filter(TorquePayload::is_plausible)
                .map(|p| (declared, p)),
            (None, None) => row::infer_shape(buf, payload)
                .and_then(|s| row::decode_torque(buf, payload, s).map(|p| (s, p))),
            (None, Some(s)) => row::decode_plausible(buf, payload, s),
        };

        match decoded {
            Some((s, p)) => {
                match shape {
                    None => shape = Some(s),
                    Some(expected) if expected != s => {
                        let diag = Diagnostic::MixedRowShape {
                            table: TableKind::Torque,
                            offset: cursor,
                            expected,
                            found: s,
                        };
                        warn!("{diag}");
                        diagnostics.push(diag);
                    }
                    Some(_) => {}
                }
                rows.push(torque_row(p, cursor, marker.len(), RowKind::Standard, s));
                cursor = payload + s.payload_len();
            }
            None => {
                let span = ByteRange::with_len(cursor, marker.len() + RowShape::Int.payload_len())
                    .filter(|r| r.end() <= buf.len());
                if let Some(span) = span {
                    diagnostics.push(Diagnostic::ImplausibleRow {
                        table: TableKind::Torque,
                        offset: cursor,
                    });
                    rejected.push(span);
                }
                break;
            }
        }
    }

    if rows.len() < 2 {
        return None;
    }
    Some(TorqueTable {
        index,
        start_offset: start,
        shape: shape.unwrap_or(RowShape::Int),
        rows,
        rejected,
    })
}

fn torque_row(
    p: TorquePayload,
    offset: usize,
    marker_len: usize,
    row_kind: RowKind,
    shape: RowShape,
) -> TorqueRow {
    TorqueRow {
        rpm: p.rpm,
        compression: p.compression,
        torque: p.torque,
        byte_offset: offset,
        row_kind,
        shape,
        marker_len,
    }
}

/// Find every boost table in file order.
pub fn scan_boost_tables(buf: &[u8], catalog: &Catalog) -> TableScan<BoostTable> {
    let markers = catalog.boost_markers();
    let mut scan = TableScan {
        tables: Vec::new(),
        diagnostics: Vec::new(),
    };
    for start in find_all(buf, markers.start.as_bytes()) {
        let index = scan.tables.len();
        if let Some(table) = scan_boost_table(buf, start, index, markers, &mut scan.diagnostics) {
            debug!(index, offset = start, rows = table.rows.len(), "boost table");
            scan.tables.push(table);
        }
    }
    scan
}

fn scan_boost_table(
    buf: &[u8],
    start: usize,
    index: usize,
    markers: &TableMarkers,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<BoostTable> {
    let marker_len = markers.start.len();
    let zero = row::decode_boost(buf, start + marker_len, BoostShape::ZeroRpm)?;
    if zero.rpm != 0.0 {
        diagnostics.push(Diagnostic::NonZeroRpmByte {
            table: TableKind::Boost,
            offset: start,
            value: zero.rpm as u8,
        });
    }

    let mut rows = vec![boost_row(zero, start, marker_len, BoostShape::ZeroRpm)];
    let mut rejected = Vec::new();
    let mut cursor = start + marker_len + BoostShape::ZeroRpm.payload_len();

    while cursor < buf.len() {
        if markers.start.matches_at(buf, cursor) {
            break;
        }
        let Some(marker) = markers.row_marker_at(buf, cursor) else {
            break;
        };
        let Some(p) = row::decode_boost(buf, cursor + marker.len(), BoostShape::Standard) else {
            break;
        };
        if !RPM_BOUNDS.contains(p.rpm as f64) {
            diagnostics.push(Diagnostic::ImplausibleRow {
                table: TableKind::Boost,
                offset: cursor,
            });
            rejected.extend(ByteRange::with_len(
                cursor,
                marker.len() + BoostShape::Standard.payload_len(),
            ));
            break;
        }
        rows.push(boost_row(p, cursor, marker.len(), BoostShape::Standard));
        cursor += marker.len() + BoostShape::Standard.payload_len();
    }

    if rows.len() < 2 {
        return None;
    }
    Some(BoostTable {
        index,
        start_offset: start,
        rows,
        rejected,
    })
}

fn boost_row(p: BoostPayload, offset: usize, marker_len: usize, shape: BoostShape) -> BoostRow {
    BoostRow {
        rpm: p.rpm,
        throttle: p.throttle,
        byte_offset: offset,
        shape,
        marker_len,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::RowMarker;
    use crate::fixture::EdfBuilder;

    #[test]
    fn scans_mixed_torque_table() {
        let data = EdfBuilder::new()
            .padding(10, 0x00)
            .torque_zero(10.0, 100.0)
            .torque_int(1000, 10.0, 150.0)
            .torque_float(2000.5, 10.0, 200.0)
            .torque_end(3000, 10.0, 0)
            .padding(5, 0xFF)
            .build();
        let scan = scan_torque_tables(&data, &Catalog::builtin());
        assert_eq!(scan.tables.len(), 1);

        let table = &scan.tables[0];
        assert_eq!(table.start_offset, 10);
        assert_eq!(table.shape, RowShape::Int);
        let kinds: Vec<RowKind> = table.rows.iter().map(|r| r.row_kind).collect();
        assert_eq!(
            kinds,
            vec![RowKind::ZeroRpm, RowKind::Standard, RowKind::Standard, RowKind::Terminal]
        );
        assert_eq!(table.rows[1].rpm, 1000.0);
        assert_eq!(table.rows[2].rpm, 2000.5);
        assert_eq!(table.rows[2].shape, RowShape::Float);
        assert_eq!(table.rows[3].torque, None);
        assert_eq!(table.rows[1].byte_offset, 26);
        assert_eq!(table.rows[1].payload_offset(), 33);
        assert!(matches!(
            scan.diagnostics[..],
            [Diagnostic::MixedRowShape {
                expected: RowShape::Int,
                found: RowShape::Float,
                ..
            }]
        ));
    }

    #[test]
    fn rows_stay_in_file_order() {
        let data = EdfBuilder::new()
            .torque_zero(0.0, 50.0)
            .torque_int(4000, 0.0, 300.0)
            .torque_int(2000, 0.0, 200.0)
            .build();
        let table = &scan_torque_tables(&data, &Catalog::builtin()).tables[0];
        let rpms: Vec<f32> = table.rows.iter().map(|r| r.rpm).collect();
        assert_eq!(rpms, vec![0.0, 4000.0, 2000.0]);
    }

    #[test]
    fn implausible_rpm_ends_table() {
        let data = EdfBuilder::new()
            .torque_zero(0.0, 50.0)
            .torque_float(1000.0, 0.0, 100.0)
            .torque_float(24_999.0, 0.0, 9_999.0)
            .torque_float(30_000.0, 0.0, 100.0)
            .torque_float(5000.0, 0.0, 100.0)
            .build();
        let scan = scan_torque_tables(&data, &Catalog::builtin());
        let table = &scan.tables[0];
        let rpms: Vec<f32> = table.rows.iter().map(|r| r.rpm).collect();
        assert_eq!(rpms, vec![0.0, 1000.0, 24_999.0]);
        assert_eq!(table.rows[2].torque, Some(9_999.0));
        assert_eq!(table.rejected.len(), 1);
        assert_eq!(table.rejected[0].len(), 19);
        assert!(scan
            .diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::ImplausibleRow { table: TableKind::Torque, .. })));
    }

    #[test]
    fn truncated_row_is_not_known() {
        let mut data = EdfBuilder::new()
            .torque_zero(0.0, 50.0)
            .torque_int(1000, 0.0, 100.0)
            .torque_int(2000, 0.0, 100.0)
            .build();
        data.truncate(data.len() - 3);
        let table = &scan_torque_tables(&data, &Catalog::builtin()).tables[0];
        assert_eq!(table.rows.len(), 2);
        assert!(table.rejected.is_empty());
    }

    #[test]
    fn lone_zero_row_is_not_a_table() {
        let data = EdfBuilder::new().torque_zero(0.0, 50.0).padding(8, 0).build();
        assert!(scan_torque_tables(&data, &Catalog::builtin()).tables.is_empty());
    }

    #[test]
    fn implausible_zero_row_is_skipped() {
        let data = EdfBuilder::new()
            .torque_zero(0.0, 50_000.0)
            .torque_int(1000, 0.0, 100.0)
            .build();
        let scan = scan_torque_tables(&data, &Catalog::builtin());
        assert!(scan.tables.is_empty());
        assert_eq!(scan.diagnostics.len(), 1);
    }

    #[test]
    fn nonzero_rpm_byte_is_flagged_not_rejected() {
        let data = EdfBuilder::new()
            .torque_zero_with_byte(3, 0.0, 50.0)
            .torque_int(1000, 0.0, 100.0)
            .build();
        let scan = scan_torque_tables(&data, &Catalog::builtin());
        assert!(scan.tables[0].rows[0].rpm_flagged());
        assert!(matches!(
            scan.diagnostics[0],
            Diagnostic::NonZeroRpmByte { value: 3, .. }
        ));
    }

    #[test]
    fn next_table_start_ends_table() {
        let data = EdfBuilder::new()
            .torque_zero(0.0, 50.0)
            .torque_int(1000, 0.0, 100.0)
            .torque_zero(0.0, 60.0)
            .torque_float(1500.0, 0.0, 110.0)
            .build();
        let scan = scan_torque_tables(&data, &Catalog::builtin());
        assert_eq!(scan.tables.len(), 2);
        assert_eq!(scan.tables[0].rows.len(), 2);
        assert_eq!(scan.tables[1].index, 1);
        assert_eq!(scan.tables[1].shape, RowShape::Float);
    }

    #[test]
    fn row_tag_decides_shape() {
        // Zero RPM bytes read the same as int or float; the float tag wins.
        let data = EdfBuilder::new()
            .torque_zero(0.0, 50.0)
            .torque_float(0.0, 0.0, 80.0)
            .torque_float(1000.0, 0.0, 100.0)
            .build();
        let scan = scan_torque_tables(&data, &Catalog::builtin());
        let table = &scan.tables[0];
        assert_eq!(table.shape, RowShape::Float);
        assert_eq!(table.rows[1].shape, RowShape::Float);
        assert_eq!(table.rows[2].rpm, 1000.0);
        assert!(scan.diagnostics.is_empty());
    }

    #[test]
    fn untagged_markers_prefer_int() {
        let builtin = Catalog::builtin();
        let tagged = builtin.torque_markers();
        let markers = TableMarkers {
            start: tagged.start.clone(),
            rows: tagged
                .rows
                .iter()
                .map(|m| RowMarker::new(m.signature.as_bytes(), None))
                .collect(),
            terminator: tagged.terminator.clone(),
        };
        let data = EdfBuilder::new()
            .torque_zero(0.0, 50.0)
            .torque_float(0.0, 0.0, 80.0)
            .torque_int(1000, 0.0, 100.0)
            .build();
        let mut diagnostics = Vec::new();
        let table = scan_torque_table(&data, 0, 0, &markers, &mut diagnostics).unwrap();
        assert_eq!(table.shape, RowShape::Int);
        assert_eq!(table.rows[1].shape, RowShape::Int);
        assert_eq!(table.rows[2].shape, RowShape::Int);
        assert_eq!(table.rows[2].rpm, 1000.0);
    }

    #[test]
    fn known_ranges_cover_rows() {
        let data = EdfBuilder::new()
            .padding(4, 0)
            .torque_zero(0.0, 50.0)
            .torque_int(1000, 0.0, 100.0)
            .build();
        let table = &scan_torque_tables(&data, &Catalog::builtin()).tables[0];
        let ranges = table.known_ranges();
        assert_eq!(ranges[0], ByteRange::new(4, 20).unwrap());
        assert_eq!(ranges[1], ByteRange::new(20, 39).unwrap());
    }

    #[test]
    fn field_refs() {
        let data = EdfBuilder::new()
            .torque_zero(0.0, 50.0)
            .torque_int(1000, 0.0, 100.0)
            .torque_end(3000, 0.0, 0)
            .build();
        let table = &scan_torque_tables(&data, &Catalog::builtin()).tables[0];
        assert!(table.field_ref(0, TorqueColumn::Rpm).is_none());
        assert!(table.field_ref(2, TorqueColumn::Torque).is_none());
        assert!(table.field_ref(9, TorqueColumn::Torque).is_none());

        let torque = table.field_ref(1, TorqueColumn::Torque).unwrap();
        assert_eq!(torque.offset, table.rows[1].payload_offset() + 8);
        assert_eq!(torque.bounds, Some(TORQUE_BOUNDS));

        let comp = table.field_ref(0, TorqueColumn::Compression).unwrap();
        assert_eq!(comp.offset, table.rows[0].payload_offset() + 1);
        assert_eq!(comp.bounds, None);
    }

    #[test]
    fn power_and_peak() {
        let data = EdfBuilder::new()
            .torque_zero(0.0, 50.0)
            .torque_int(9549, 0.0, 100.0)
            .torque_int(5000, 0.0, 300.0)
            .build();
        let table = &scan_torque_tables(&data, &Catalog::builtin()).tables[0];
        let curve = table.power_curve();
        assert_eq!(curve.len(), 3);
        assert!((curve[1].2 - 100.0).abs() < 0.1);
        assert_eq!(table.peak_torque(), Some((5000.0, 300.0)));
    }

    #[test]
    fn scans_boost_table() {
        let data = EdfBuilder::new()
            .padding(20, 0)
            .boost_zero([1.0, 1.2, 1.5, 1.8, 2.0])
            .boost_row(2000, [1.1, 1.3, 1.6, 1.9, 2.1])
            .build();
        let scan = scan_boost_tables(&data, &Catalog::builtin());
        assert_eq!(scan.tables.len(), 1);
        let table = &scan.tables[0];
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].rpm, 0.0);
        assert_eq!(table.rows[1].rpm, 2000.0);
        assert_eq!(table.rows[1].throttle[4], 2.1);
        assert!(!table.rows[1].out_of_range());
    }

    #[test]
    fn boost_out_of_range_values_are_retained() {
        let data = EdfBuilder::new()
            .boost_zero([0.2, 1.2, 1.5, 1.8, 2.0])
            .boost_row(2000, [1.1, 1.3, 1.6, 1.9, 4.5])
            .build();
        let table = &scan_boost_tables(&data, &Catalog::builtin()).tables[0];
        assert_eq!(table.rows.len(), 2);
        assert!(table.rows[0].out_of_range());
        assert!(table.rows[1].out_of_range());
    }

    #[test]
    fn boost_field_refs() {
        let data = EdfBuilder::new()
            .boost_zero([1.0; 5])
            .boost_row(2000, [1.5; 5])
            .build();
        let table = &scan_boost_tables(&data, &Catalog::builtin()).tables[0];
        assert!(table.field_ref(0, BoostColumn::Rpm).is_none());
        let t100 = table.field_ref(1, BoostColumn::Throttle(4)).unwrap();
        assert_eq!(t100.offset, table.rows[1].payload_offset() + 20);
        let rpm = table.field_ref(1, BoostColumn::Rpm).unwrap();
        assert_eq!(rpm.bounds, Some(RPM_BOUNDS));
    }
}

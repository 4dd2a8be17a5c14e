//! Torque table CSV export.

use std::io::Write;

use serde::Serialize;

use crate::error::Result;
use crate::format::format_float;
use crate::row::TorqueColumn;
use crate::table::TorqueTable;
use crate::value::ValueType;

/// Header row, in column order.
pub const CSV_COLUMNS: [&str; 8] = [
    "table_index",
    "row_index",
    "rpm",
    "compression",
    "torque",
    "row_kind",
    "payload_offset_hex",
    "source_file",
];

/// Default number of fractional digits for float cells.
pub const DEFAULT_FLOAT_DECIMALS: usize = 6;

/// One CSV line, already formatted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TorqueRecord {
    pub table_index: usize,
    pub row_index: usize,
    pub rpm: String,
    pub compression: String,
    /// Empty for the terminal row.
    pub torque: String,
    pub row_kind: &'static str,
    pub payload_offset_hex: String,
    pub source_file: String,
}

impl TorqueRecord {
    fn cells(&self) -> [String; 8] {
        [
            self.table_index.to_string(),
            self.row_index.to_string(),
            self.rpm.clone(),
            self.compression.clone(),
            self.torque.clone(),
            self.row_kind.to_string(),
            self.payload_offset_hex.clone(),
            self.source_file.clone(),
        ]
    }
}

/// Flatten every torque row into records. Integer RPM encodings are written
/// without a fractional part; floats use `decimals` fixed-point digits.
pub fn torque_records(tables: &[TorqueTable], source_file: &str, decimals: usize) -> Vec<TorqueRecord> {
    tables
        .iter()
        .flat_map(|table| {
            table.rows.iter().enumerate().map(move |(row_index, row)| {
                let rpm = match row.shape.column(TorqueColumn::Rpm) {
                    Some((_, ValueType::Float)) => format_float(row.rpm as f64, decimals),
                    _ => format!("{}", row.rpm as i64),
                };
                TorqueRecord {
                    table_index: table.index,
                    row_index,
                    rpm,
                    compression: format_float(row.compression as f64, decimals),
                    torque: row
                        .torque
                        .map(|t| format_float(t as f64, decimals))
                        .unwrap_or_default(),
                    row_kind: row.row_kind.name(),
                    payload_offset_hex: format!("0x{:X}", row.payload_offset()),
                    source_file: source_file.to_string(),
                }
            })
        })
        .collect()
}

/// Write the header and one line per torque row.
pub fn write_torque_csv<W: Write>(
    mut out: W,
    tables: &[TorqueTable],
    source_file: &str,
    decimals: usize,
) -> Result<usize> {
    writeln!(out, "{}", CSV_COLUMNS.join(","))?;
    let records = torque_records(tables, source_file, decimals);
    for record in &records {
        let line: Vec<String> = record.cells().iter().map(|c| escape(c)).collect();
        writeln!(out, "{}", line.join(","))?;
    }
    out.flush()?;
    Ok(records.len())
}

/// Quote a cell if it contains a separator, quote or line break.
fn escape(cell: &str) -> String {
    if cell.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::fixture::EdfBuilder;
    use crate::table::scan_torque_tables;

    fn tables() -> Vec<TorqueTable> {
        let data = EdfBuilder::new()
            .padding(2, 0)
            .torque_zero(1.5, 100.0)
            .torque_int(2000, 2.5, 200.25)
            .torque_float(3000.5, 3.5, 300.0)
            .torque_end(6000, 4.0, 0)
            .build();
        scan_torque_tables(&data, &Catalog::builtin()).tables
    }

    #[test]
    fn writes_header_and_rows() {
        let mut out = Vec::new();
        let n = write_torque_csv(&mut out, &tables(), "engine.edf", 2).unwrap();
        assert_eq!(n, 4);
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "table_index,row_index,rpm,compression,torque,row_kind,payload_offset_hex,source_file"
        );
        assert_eq!(lines[1], "0,0,0,1.50,100.00,zero_rpm,0x9,engine.edf");
        assert_eq!(lines[2], "0,1,2000,2.50,200.25,standard,0x19,engine.edf");
        assert_eq!(lines[3], "0,2,3000.50,3.50,300.00,standard,0x2C,engine.edf");
        assert_eq!(lines[4], "0,3,6000,4.00,,terminal,0x3F,engine.edf");
    }

    #[test]
    fn floats_are_never_scientific() {
        let data = EdfBuilder::new()
            .torque_zero(0.000_001, 100.0)
            .torque_int(1000, 1.0e9, 0.5)
            .build();
        let tables = scan_torque_tables(&data, &Catalog::builtin()).tables;
        let records = torque_records(&tables, "", DEFAULT_FLOAT_DECIMALS);
        assert_eq!(records[0].compression, "0.000001");
        assert_eq!(records[1].compression, "1000000000.000000");
        assert!(records.iter().all(|r| !r.compression.contains('e')));
    }

    #[test]
    fn source_with_comma_is_quoted() {
        assert_eq!(escape("a,b.edf"), "\"a,b.edf\"");
        assert_eq!(escape("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape("plain.edf"), "plain.edf");
    }
}

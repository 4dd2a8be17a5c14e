//! `edf inspect`: document overview.

use std::fmt::Write as _;

use anyhow::{bail, Result};
use edf_core::format::{coverage_strip, format_float, format_size, torque_chart};
use edf_core::Document;

/// Print a summary in the requested format (`text` by default, or `json`).
pub fn run(doc: &Document, export: Option<&str>, decimals: usize) -> Result<()> {
    match export.unwrap_or("text") {
        "text" => print!("{}", render_text(doc, decimals)?),
        "json" => println!("{}", serde_json::to_string_pretty(&doc.summary())?),
        other => bail!("unknown export format '{other}' (expected text or json)"),
    }
    Ok(())
}

pub fn render_text(doc: &Document, decimals: usize) -> Result<String> {
    let summary = doc.summary();
    let map = doc.range_map();
    let mut out = String::new();

    let name = summary
        .source
        .as_ref()
        .map_or_else(|| "<memory>".to_string(), |p| p.display().to_string());
    writeln!(out, "--- {name} ---")?;
    writeln!(out, "  Size:    {} ({} bytes)", format_size(summary.file_len), summary.file_len)?;
    writeln!(out, "  SHA-256: {}", summary.sha256)?;
    writeln!(out, "  Layout:  {}", summary.layout_label)?;
    writeln!(
        out,
        "  Known:   {} of {} bytes ({:.1}%)",
        map.known_bytes(),
        map.file_len(),
        map.coverage() * 100.0
    )?;
    writeln!(out, "  Map:     [{}]", coverage_strip(map, 48))?;
    writeln!(
        out,
        "  Unknown: {} bytes in {} regions",
        summary.unknown_bytes, summary.unknown_regions
    )?;

    for table in doc.torque_tables() {
        writeln!(out)?;
        writeln!(
            out,
            "Torque table {} @ 0x{:X} ({} rows, {:?} shape)",
            table.index,
            table.start_offset,
            table.rows.len(),
            table.shape
        )?;
        writeln!(out, "  {:>10} {:>14} {:>12} {:>10}", "RPM", "Compression", "Torque Nm", "Power kW")?;
        for row in &table.rows {
            let (torque, power) = match row.torque {
                Some(t) => (
                    format_float(t as f64, decimals),
                    format_float((t * row.rpm / 9549.3) as f64, 1),
                ),
                None => ("-".to_string(), "-".to_string()),
            };
            let flag = if row.rpm_flagged() { "  (rpm byte set)" } else { "" };
            writeln!(
                out,
                "  {:>10} {:>14} {:>12} {:>10}{flag}",
                format_float(row.rpm as f64, 0),
                format_float(row.compression as f64, decimals),
                torque,
                power
            )?;
        }
        if let Some((rpm, nm)) = table.peak_torque() {
            writeln!(out, "  Peak: {} Nm @ {} rpm", format_float(nm as f64, 1), rpm)?;
        }
        for line in torque_chart(&table.power_curve(), 24) {
            writeln!(out, "  {line}")?;
        }
    }

    for table in doc.boost_tables() {
        writeln!(out)?;
        writeln!(
            out,
            "Boost table {} @ 0x{:X} ({} rows)",
            table.index,
            table.start_offset,
            table.rows.len()
        )?;
        for row in &table.rows {
            let cells: Vec<String> = row
                .throttle
                .iter()
                .map(|t| format_float(*t as f64, decimals.min(3)))
                .collect();
            let note = if row.out_of_range() { "  (outside 0.5-3.0 bar)" } else { "" };
            writeln!(out, "  {:>8} rpm: {}{note}", row.rpm, cells.join(" "))?;
        }
    }

    writeln!(out)?;
    writeln!(out, "Parameters: {}", summary.parameters)?;

    if !summary.diagnostics.is_empty() {
        writeln!(out)?;
        writeln!(out, "Diagnostics:")?;
        for d in &summary.diagnostics {
            writeln!(out, "  - {d}")?;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use edf_core::Catalog;

    fn doc() -> Document {
        let mut v = vec![0x24, 0x8B, 0x0A, 0xB7, 0x71, 0x83, 0x02, 0x00];
        v.extend_from_slice(&1.0f32.to_le_bytes());
        v.extend_from_slice(&100.0f32.to_le_bytes());
        v.extend_from_slice(&[0x24, 0x8B, 0x0A, 0xB7, 0x71, 0x93, 0x02]);
        v.extend_from_slice(&9549i32.to_le_bytes());
        v.extend_from_slice(&2.0f32.to_le_bytes());
        v.extend_from_slice(&200.0f32.to_le_bytes());
        v.extend_from_slice(&[0xD2, 0x21, 0x3B]);
        Document::from_bytes(v, Arc::new(Catalog::builtin())).unwrap()
    }

    #[test]
    fn text_lists_rows_and_power() {
        let text = render_text(&doc(), 2).unwrap();
        assert!(text.contains("Torque table 0 @ 0x0 (2 rows"));
        assert!(text.contains("200.00"));
        assert!(text.contains("Layout:  V8 / Flat 8"));
        assert!(text.contains("Peak: 200.0 Nm @ 9549 rpm"));
        assert!(text.contains("   9549 rpm |████████████████████████| 200.0 Nm"));
        assert!(text.contains("Known:   35 of 38 bytes (92.1%)"));
    }

    #[test]
    fn rejects_unknown_format() {
        assert!(run(&doc(), Some("xml"), 2).is_err());
    }
}

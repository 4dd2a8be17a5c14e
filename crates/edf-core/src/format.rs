//! Shared formatting helpers for display and export.

use crate::error::{EdfError, Result};
use crate::range::RangeMap;

/// Format a float in fixed-point notation, never scientific.
///
/// `format_float(0.000006, 6)` gives `"0.000006"` rather than `"6e-6"`.
pub fn format_float(value: f64, decimals: usize) -> String {
    format!("{value:.decimals$}")
}

/// Space-separated uppercase hex, e.g. `"24 8B 0A"`.
pub fn hex_bytes(bytes: &[u8]) -> String {
    let parts: Vec<String> = bytes.iter().map(|b| hex::encode_upper([*b])).collect();
    parts.join(" ")
}

/// Parse a hex byte string. Accepts separators (space, `:`, `-`, `,`) and an
/// optional `0x` prefix on each byte group.
pub fn parse_hex_bytes(text: &str) -> Result<Vec<u8>> {
    let digits: String = text
        .split(|c: char| c.is_whitespace() || matches!(c, ':' | '-' | ','))
        .map(|group| {
            group
                .strip_prefix("0x")
                .or_else(|| group.strip_prefix("0X"))
                .unwrap_or(group)
        })
        .collect();
    let invalid = |source| EdfError::Hex {
        text: text.to_string(),
        source,
    };
    if digits.is_empty() {
        return Err(invalid(hex::FromHexError::InvalidStringLength));
    }
    hex::decode(&digits).map_err(invalid)
}

/// Format a byte count with binary units.
pub fn format_size(bytes: usize) -> String {
    const KIB: f64 = 1024.0;
    let b = bytes as f64;
    if b < KIB {
        format!("{bytes} B")
    } else if b < KIB * KIB {
        format!("{:.1} KiB", b / KIB)
    } else {
        format!("{:.1} MiB", b / (KIB * KIB))
    }
}

/// One character per slice of the file: `█` known, `▒` partly known,
/// `·` unknown. Files shorter than `width` get one cell per byte.
pub fn coverage_strip(map: &RangeMap, width: usize) -> String {
    let len = map.file_len();
    let cells = width.min(len);
    (0..cells)
        .map(|i| {
            let start = i * len / cells;
            let end = (i + 1) * len / cells;
            let known: usize = map
                .known()
                .iter()
                .map(|k| k.end().min(end).saturating_sub(k.start().max(start)))
                .sum();
            match known {
                0 => '·',
                n if n == end - start => '█',
                _ => '▒',
            }
        })
        .collect()
}

/// Torque curve as one labelled bar per RPM point, scaled to the peak.
///
/// Takes `(rpm, torque, power)` points as produced by
/// [`TorqueTable::power_curve`](crate::table::TorqueTable::power_curve).
/// Negative torque draws an empty bar.
///
/// ```text
///    4000 rpm |████████████████████| 300.0 Nm
///    6000 rpm |█████████████       | 200.0 Nm
/// ```
pub fn torque_chart(points: &[(f32, f32, f32)], width: usize) -> Vec<String> {
    let peak = points.iter().map(|p| p.1).fold(0.0f32, f32::max);
    points
        .iter()
        .map(|&(rpm, nm, _)| {
            let filled = if peak > 0.0 {
                ((nm.max(0.0) / peak) * width as f32).round() as usize
            } else {
                0
            };
            let filled = filled.min(width);
            format!(
                "{:>7} rpm |{}{}| {nm:.1} Nm",
                rpm.round(),
                "█".repeat(filled),
                " ".repeat(width - filled)
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range::ByteRange;

    #[test]
    fn float_never_scientific() {
        assert_eq!(format_float(0.000006, 6), "0.000006");
        assert_eq!(format_float(123.456, 3), "123.456");
        assert_eq!(format_float(1.0e10, 1), "10000000000.0");
    }

    #[test]
    fn hex_round_trip() {
        let bytes = [0x24, 0x8B, 0x0A, 0xB7];
        let text = hex_bytes(&bytes);
        assert_eq!(text, "24 8B 0A B7");
        assert_eq!(parse_hex_bytes(&text).unwrap(), bytes);
    }

    #[test]
    fn parse_hex_variants() {
        assert_eq!(parse_hex_bytes("248b0a").unwrap(), vec![0x24, 0x8B, 0x0A]);
        assert_eq!(parse_hex_bytes("0x24 0x8B").unwrap(), vec![0x24, 0x8B]);
        assert_eq!(parse_hex_bytes("24:8B-0A").unwrap(), vec![0x24, 0x8B, 0x0A]);
        assert!(matches!(
            parse_hex_bytes(""),
            Err(EdfError::Hex { source: hex::FromHexError::InvalidStringLength, .. })
        ));
        assert!(matches!(
            parse_hex_bytes("248"),
            Err(EdfError::Hex { source: hex::FromHexError::OddLength, .. })
        ));
        let err = parse_hex_bytes("zz").unwrap_err();
        assert!(matches!(
            err,
            EdfError::Hex { source: hex::FromHexError::InvalidHexCharacter { c: 'z', .. }, .. }
        ));
        assert_eq!(err.to_string(), "invalid hex bytes \"zz\"");
    }

    #[test]
    fn size_units() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KiB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MiB");
    }

    #[test]
    fn coverage_strip_marks_partial_cells() {
        let known = [ByteRange::new(0, 8).unwrap(), ByteRange::new(12, 14).unwrap()];
        let map = RangeMap::compute(16, &known).unwrap();
        assert_eq!(coverage_strip(&map, 4), "██·▒");
        assert_eq!(coverage_strip(&map, 100).chars().count(), 16);
        assert_eq!(coverage_strip(&RangeMap::compute(0, &[]).unwrap(), 8), "");
    }

    #[test]
    fn torque_chart_scales_to_peak() {
        let lines = torque_chart(&[(2000.0, 150.0, 0.0), (4000.0, 300.0, 0.0), (6000.0, -10.0, 0.0)], 4);
        assert_eq!(
            lines,
            vec![
                "   2000 rpm |██  | 150.0 Nm",
                "   4000 rpm |████| 300.0 Nm",
                "   6000 rpm |    | -10.0 Nm",
            ]
        );
        assert!(torque_chart(&[], 4).is_empty());
    }
}

//! Heuristics for describing unknown regions.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::catalog::find_all;
use crate::format::hex_bytes;
use crate::range::ByteRange;

/// Recurring block marker seen in unmapped areas of many files.
pub const REPEATED_MARKER: [u8; 6] = [0x24, 0x04, 0x45, 0x49, 0x29, 0x04];

/// Regions shorter than this are not checked for a repeat stride.
pub const STRIDE_MIN_REGION: usize = 100;

/// Bytes shown in a region preview.
pub const PREVIEW_LEN: usize = 64;

const ASCII_PREVIEW_CHARS: usize = 50;

/// One observation about a region's contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "pattern", rename_all = "snake_case")]
pub enum RegionPattern {
    /// [`REPEATED_MARKER`] occurs more than once.
    RepeatedMarker { count: usize },
    /// The region's first four bytes recur at a dominant distance, which
    /// usually means an array of fixed-size records.
    Stride { stride: usize, lead: [u8; 4] },
    /// More than 90 % zero bytes.
    MostlyNull { nulls: usize, len: usize },
    /// Entirely printable ASCII.
    Ascii { preview: String },
}

impl fmt::Display for RegionPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegionPattern::RepeatedMarker { count } => {
                write!(f, "repeated marker [{}]: {count}x", hex_bytes(&REPEATED_MARKER))
            }
            RegionPattern::Stride { stride, lead } => {
                write!(f, "record size ~{stride} bytes (lead {})", hex_bytes(lead))
            }
            RegionPattern::MostlyNull { nulls, len } => write!(f, "mostly null ({nulls}/{len} bytes)"),
            RegionPattern::Ascii { preview } => write!(f, "ASCII text: {preview}"),
        }
    }
}

/// Unknown region with its preview and detected patterns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionReport {
    pub range: ByteRange,
    /// Hex of the first [`PREVIEW_LEN`] bytes.
    pub preview: String,
    pub truncated: bool,
    pub patterns: Vec<RegionPattern>,
}

/// Describe the bytes of `range` within `buf`.
pub fn report(buf: &[u8], range: ByteRange) -> RegionReport {
    let end = range.end().min(buf.len());
    let data = buf.get(range.start()..end).unwrap_or_default();
    let shown = &data[..data.len().min(PREVIEW_LEN)];
    RegionReport {
        range,
        preview: hex_bytes(shown),
        truncated: data.len() > PREVIEW_LEN,
        patterns: analyze_region(data),
    }
}

/// Run every heuristic over one region. Regions under four bytes yield
/// nothing.
pub fn analyze_region(data: &[u8]) -> Vec<RegionPattern> {
    if data.len() < 4 {
        return Vec::new();
    }
    let mut patterns = Vec::new();

    let count = find_all(data, &REPEATED_MARKER).count();
    if count > 1 {
        patterns.push(RegionPattern::RepeatedMarker { count });
    }

    if data.len() >= STRIDE_MIN_REGION {
        patterns.extend(dominant_stride(data));
    }

    let nulls = data.iter().filter(|b| **b == 0).count();
    if nulls * 10 > data.len() * 9 {
        patterns.push(RegionPattern::MostlyNull {
            nulls,
            len: data.len(),
        });
    }

    if data.iter().all(|b| (0x20..0x7F).contains(b)) {
        let preview = data
            .iter()
            .take(ASCII_PREVIEW_CHARS)
            .map(|b| *b as char)
            .collect();
        patterns.push(RegionPattern::Ascii { preview });
    }

    patterns
}

/// Distance between successive (possibly overlapping) occurrences of the
/// leading four bytes, if one distance accounts for more than half of them.
fn dominant_stride(data: &[u8]) -> Option<RegionPattern> {
    let lead: [u8; 4] = data.get(..4)?.try_into().ok()?;
    let positions: Vec<usize> = data
        .windows(4)
        .enumerate()
        .filter(|(_, w)| *w == lead)
        .map(|(i, _)| i)
        .collect();
    if positions.len() < 3 {
        return None;
    }

    let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
    for pair in positions.windows(2) {
        *counts.entry(pair[1] - pair[0]).or_default() += 1;
    }
    let distances = positions.len() - 1;
    // Smallest stride wins a tie.
    let (stride, hits) = counts
        .into_iter()
        .fold((0, 0), |best, (d, n)| if n > best.1 { (d, n) } else { best });
    (hits * 2 > distances).then_some(RegionPattern::Stride { stride, lead })
}

/// Human-readable summary joined the way the region tree shows it.
pub fn describe(patterns: &[RegionPattern]) -> Option<String> {
    if patterns.is_empty() {
        return None;
    }
    Some(
        patterns
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" | "),
    )
}

//! Engine-layout detection from tail tags.
//!
//! Heuristic: the tag is expected near the end of the file, so only the
//! trailing window is searched. A miss is a normal outcome.

use serde::Serialize;

use crate::catalog::{rfind, Catalog, LayoutKind};

/// Detected engine layout, if any.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineLayout {
    pub detected: Option<LayoutKind>,
    /// Absolute offset of the matched tag.
    pub match_offset: Option<usize>,
}

impl EngineLayout {
    pub fn label(&self) -> &'static str {
        self.detected.map_or("Unknown", LayoutKind::label)
    }
}

/// Search the tail window for each layout tag in catalog priority order.
/// The first tag found wins; within the window its last occurrence is used.
pub fn detect_layout(buf: &[u8], catalog: &Catalog) -> EngineLayout {
    let tail_start = buf.len().saturating_sub(catalog.layout_tail_window());
    let tail = &buf[tail_start..];
    catalog
        .layouts()
        .iter()
        .find_map(|pattern| {
            rfind(tail, pattern.code.as_bytes()).map(|at| EngineLayout {
                detected: Some(pattern.kind),
                match_offset: Some(tail_start + at),
            })
        })
        .unwrap_or_default()
}

//! `edf diff`: byte spans that differ between two files.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use edf_core::document::diff_spans;
use edf_core::format::hex_bytes;
use edf_core::ByteRange;

/// Bytes of each side shown per span.
const SHOW_BYTES: usize = 16;

pub fn spans(a: &Path, b: &Path) -> Result<Vec<ByteRange>> {
    let left = fs::read(a).with_context(|| format!("reading {}", a.display()))?;
    let right = fs::read(b).with_context(|| format!("reading {}", b.display()))?;
    Ok(diff_spans(&left, &right))
}

pub fn run(a: &Path, b: &Path) -> Result<()> {
    let left = fs::read(a).with_context(|| format!("reading {}", a.display()))?;
    let right = fs::read(b).with_context(|| format!("reading {}", b.display()))?;
    let spans = diff_spans(&left, &right);

    if left.len() != right.len() {
        println!(
            "Lengths differ: {} is {} bytes, {} is {} bytes",
            a.display(),
            left.len(),
            b.display(),
            right.len()
        );
    }
    if spans.is_empty() {
        println!("Files are identical");
        return Ok(());
    }
    let total: usize = spans.iter().map(ByteRange::len).sum();
    println!("{} differing spans, {total} bytes", spans.len());
    for span in &spans {
        println!("  {span} ({} bytes)", span.len());
        println!("    - {}", preview(&left, span));
        println!("    + {}", preview(&right, span));
    }
    Ok(())
}

fn preview(data: &[u8], span: &ByteRange) -> String {
    let start = span.start().min(data.len());
    let end = span.end().min(data.len()).min(start + SHOW_BYTES);
    let shown = &data[start..end];
    if shown.is_empty() {
        return "(absent)".to_string();
    }
    let more = if span.len() > SHOW_BYTES { " ..." } else { "" };
    format!("{}{more}", hex_bytes(shown))
}

//! `edf unknown`: regions no decoder accounts for.

use anyhow::Result;
use edf_core::analysis::{describe, report, RegionReport};
use edf_core::Document;

/// Regions shown when `--max` is not given.
pub const DEFAULT_MAX_REGIONS: usize = 20;

pub fn run(doc: &Document, max: Option<usize>) -> Result<()> {
    let map = doc.range_map();
    println!(
        "{} unknown bytes in {} regions ({:.1}% known)",
        map.unknown_bytes(),
        map.unknown().len(),
        map.coverage() * 100.0
    );
    for (i, r) in reports(doc, max.unwrap_or(DEFAULT_MAX_REGIONS)).iter().enumerate() {
        println!();
        println!("Region {}: {} ({} bytes)", i + 1, r.range, r.range.len());
        println!("  Hex: {}{}", r.preview, if r.truncated { " ..." } else { "" });
        if let Some(text) = describe(&r.patterns) {
            println!("  Pattern: {text}");
        }
    }
    let hidden = map.unknown().len().saturating_sub(max.unwrap_or(DEFAULT_MAX_REGIONS));
    if hidden > 0 {
        println!();
        println!("... {hidden} more regions (use --max to show them)");
    }
    Ok(())
}

pub fn reports(doc: &Document, max: usize) -> Vec<RegionReport> {
    doc.unknown_regions()
        .iter()
        .take(max)
        .map(|r| report(doc.as_bytes(), *r))
        .collect()
}

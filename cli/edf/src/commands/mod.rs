//! CLI command implementations.

pub mod diff;
pub mod export;
pub mod inspect;
pub mod params;
pub mod poke;
pub mod scale;
pub mod set;
pub mod unknown;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use edf_core::{Catalog, Document};

/// Open and decode an EDF file.
pub fn open(path: &Path, catalog: Arc<Catalog>) -> Result<Document> {
    Document::open(path, catalog).with_context(|| format!("opening {}", path.display()))
}

/// `<stem>_modified.<ext>` next to `input`.
pub fn modified_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "edf".to_string());
    let name = match input.extension() {
        Some(ext) => format!("{stem}_modified.{}", ext.to_string_lossy()),
        None => format!("{stem}_modified"),
    };
    input.with_file_name(name)
}

/// Save an edited document to `output`, or next to `input` by default.
pub fn save(doc: &Document, input: &Path, output: Option<&Path>) -> Result<()> {
    let path = output.map_or_else(|| modified_path(input), Path::to_path_buf);
    doc.save(&path)
        .with_context(|| format!("writing {}", path.display()))?;
    let changed = doc.changed_spans();
    let bytes: usize = changed.iter().map(|s| s.len()).sum();
    println!(
        "Wrote {} ({} bytes changed in {} spans)",
        path.display(),
        bytes,
        changed.len()
    );
    Ok(())
}

/// Parse a decimal or `0x`-prefixed hex integer.
pub fn parse_number(text: &str) -> Result<u64> {
    let text = text.trim();
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.with_context(|| format!("'{text}' is not a decimal or 0x-prefixed hex number"))
}

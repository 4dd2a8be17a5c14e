//! `edf export-csv`: torque tables as CSV.

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;

use anyhow::{Context, Result};
use edf_core::export::write_torque_csv;
use edf_core::Document;

/// Write the CSV to `output`, or stdout if none is given.
pub fn run(doc: &Document, input: &Path, output: Option<&Path>, decimals: usize) -> Result<()> {
    let source = input.display().to_string();
    match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("creating {}", path.display()))?;
            let rows = write_torque_csv(BufWriter::new(file), doc.torque_tables(), &source, decimals)
                .with_context(|| format!("writing {}", path.display()))?;
            println!("Exported {rows} torque rows to {}", path.display());
        }
        None => {
            let stdout = io::stdout();
            write_torque_csv(stdout.lock(), doc.torque_tables(), &source, decimals)?;
        }
    }
    Ok(())
}

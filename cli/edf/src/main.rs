//! EDF CLI: inspect, export and patch engine-definition files.

mod commands;
mod config;

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use config::EdfConfig;

#[derive(Parser)]
#[command(name = "edf", version, about = "EDF engine-definition inspector and patcher")]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize tables, parameters, layout and byte coverage
    Inspect {
        /// Input .edf file
        file: PathBuf,
        /// Output format (text, json)
        #[arg(long)]
        export: Option<String>,
    },
    /// List decoded parameters with offsets and values
    Params {
        /// Input .edf file
        file: PathBuf,
    },
    /// List byte regions no decoder accounts for
    Unknown {
        /// Input .edf file
        file: PathBuf,
        /// Maximum number of regions to show
        #[arg(long)]
        max: Option<usize>,
    },
    /// Export torque tables as CSV
    ExportCsv {
        /// Input .edf file
        file: PathBuf,
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Set one field (torque:T:R:COL, boost:T:R:COL, param:NAME[:FIELD])
    Set {
        /// Input .edf file
        file: PathBuf,
        /// Field to write
        target: String,
        /// New value
        #[arg(allow_hyphen_values = true)]
        value: f64,
        /// Output path (default: <stem>_modified.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Scale every torque value by a percentage (110 = +10 %)
    Scale {
        /// Input .edf file
        file: PathBuf,
        /// Percentage
        percent: f64,
        /// Output path (default: <stem>_modified.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Overwrite one raw byte and re-decode
    Poke {
        /// Input .edf file
        file: PathBuf,
        /// Byte offset (decimal or 0x-prefixed hex)
        offset: String,
        /// New byte value (decimal or 0x-prefixed hex)
        byte: String,
        /// Output path (default: <stem>_modified.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List byte spans that differ between two files
    Diff {
        /// First file
        a: PathBuf,
        /// Second file
        b: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = run(cli);
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let config = load_config(&cwd)?;
    let catalog = Arc::new(config.build_catalog()?);
    let decimals = config.float_decimals();

    match cli.command {
        Commands::Inspect { file, export } => {
            let doc = commands::open(&file, catalog)?;
            commands::inspect::run(&doc, export.as_deref(), decimals)
        }
        Commands::Params { file } => {
            let doc = commands::open(&file, catalog)?;
            commands::params::run(&doc, decimals)
        }
        Commands::Unknown { file, max } => {
            let doc = commands::open(&file, catalog)?;
            commands::unknown::run(&doc, max)
        }
        Commands::ExportCsv { file, output } => {
            let doc = commands::open(&file, catalog)?;
            commands::export::run(&doc, &file, output.as_deref(), decimals)
        }
        Commands::Set {
            file,
            target,
            value,
            output,
        } => {
            let mut doc = commands::open(&file, catalog)?;
            commands::set::run(&mut doc, &target, value)?;
            commands::save(&doc, &file, output.as_deref())
        }
        Commands::Scale {
            file,
            percent,
            output,
        } => {
            let mut doc = commands::open(&file, catalog)?;
            commands::scale::run(&mut doc, percent)?;
            commands::save(&doc, &file, output.as_deref())
        }
        Commands::Poke {
            file,
            offset,
            byte,
            output,
        } => {
            let mut doc = commands::open(&file, catalog)?;
            commands::poke::run(&mut doc, &offset, &byte)?;
            commands::save(&doc, &file, output.as_deref())
        }
        Commands::Diff { a, b } => commands::diff::run(&a, &b),
    }
}

/// Load `edf.toml` from the working directory upward, or defaults if none.
fn load_config(cwd: &Path) -> anyhow::Result<EdfConfig> {
    match EdfConfig::find_and_load(cwd)? {
        Some((config, dir)) => {
            tracing::debug!(dir = %dir.display(), "using edf.toml");
            Ok(config)
        }
        None => Ok(EdfConfig::default()),
    }
}

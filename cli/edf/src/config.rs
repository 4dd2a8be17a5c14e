//! `edf.toml` configuration: scan tuning, export formatting and extra
//! parameter signatures.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use edf_core::export::DEFAULT_FLOAT_DECIMALS;
use edf_core::format::parse_hex_bytes;
use edf_core::{Catalog, FieldSpec, ParamSpec, Signature, ValueType};
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE: &str = "edf.toml";

/// The top-level configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EdfConfig {
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub export: ExportConfig,
    /// Signatures appended to the built-in catalog.
    #[serde(default)]
    pub parameters: Vec<ParameterConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Bytes at the end of the file searched for the layout tag.
    #[serde(default)]
    pub layout_tail_window: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Fractional digits for floats in CSV and text output.
    #[serde(default)]
    pub float_decimals: Option<usize>,
}

/// A user-supplied parameter signature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterConfig {
    pub name: String,
    /// Hex bytes, e.g. `"22 AA BB CC DD"`.
    pub signature: String,
    #[serde(default)]
    pub fields: Vec<FieldConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldConfig {
    pub label: String,
    #[serde(rename = "type")]
    pub value_type: ValueType,
    #[serde(default)]
    pub unit: Option<String>,
}

impl EdfConfig {
    /// Search upward from `start_dir` for `edf.toml`, parse and return it
    /// along with the directory it was found in.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(CONFIG_FILE);
            if candidate.is_file() {
                let content = std::fs::read_to_string(&candidate)
                    .with_context(|| format!("reading {}", candidate.display()))?;
                let config: EdfConfig = content
                    .parse()
                    .with_context(|| format!("in {}", candidate.display()))?;
                return Ok(Some((config, dir)));
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    pub fn float_decimals(&self) -> usize {
        self.export.float_decimals.unwrap_or(DEFAULT_FLOAT_DECIMALS)
    }

    /// The built-in catalog with this configuration applied.
    pub fn build_catalog(&self) -> Result<Catalog> {
        let mut catalog = Catalog::builtin();
        if let Some(window) = self.scan.layout_tail_window {
            catalog = catalog.with_layout_tail_window(window);
        }
        let extra = self
            .parameters
            .iter()
            .map(ParameterConfig::to_spec)
            .collect::<Result<Vec<_>>>()?;
        catalog
            .extend(extra)
            .context("adding parameters from edf.toml")?;
        Ok(catalog)
    }
}

impl FromStr for EdfConfig {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing edf.toml")
    }
}

impl ParameterConfig {
    fn to_spec(&self) -> Result<ParamSpec> {
        let bytes = parse_hex_bytes(&self.signature).with_context(|| {
            format!(
                "parameter '{}': signature '{}' is not a hex byte string",
                self.name, self.signature
            )
        })?;
        Ok(ParamSpec {
            name: self.name.clone(),
            signature: Signature::new(bytes),
            fields: self
                .fields
                .iter()
                .map(|f| FieldSpec::new(&f.label, f.unit.as_deref(), f.value_type))
                .collect(),
        })
    }
}

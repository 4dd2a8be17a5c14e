//! `edf set`: write a single field.
//!
//! Target syntax:
//!
//! ```text
//! torque:T:R:{rpm|compression|torque}
//! boost:T:R:{rpm|t0|t25|t50|t75|t100}
//! param:NAME[:FIELD]          FIELD is a label or a 0-based index
//! ```

use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use edf_core::{BoostColumn, Document, FieldRef, TorqueColumn};

/// A parsed `set` target, before it is resolved against a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Torque {
        table: usize,
        row: usize,
        column: TorqueColumn,
    },
    Boost {
        table: usize,
        row: usize,
        column: BoostColumn,
    },
    Param {
        name: String,
        field: Option<String>,
    },
}

impl FromStr for Target {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        match parts.as_slice() {
            ["torque", table, row, column] => Ok(Target::Torque {
                table: index(table, "table")?,
                row: index(row, "row")?,
                column: torque_column(column)?,
            }),
            ["boost", table, row, column] => Ok(Target::Boost {
                table: index(table, "table")?,
                row: index(row, "row")?,
                column: boost_column(column)?,
            }),
            ["param", name] if !name.is_empty() => Ok(Target::Param {
                name: name.to_string(),
                field: None,
            }),
            ["param", name, field] if !name.is_empty() => Ok(Target::Param {
                name: name.to_string(),
                field: Some(field.to_string()),
            }),
            _ => bail!(
                "invalid target '{s}' (expected torque:T:R:COL, boost:T:R:COL or param:NAME[:FIELD])"
            ),
        }
    }
}

fn index(text: &str, what: &str) -> Result<usize> {
    text.parse()
        .with_context(|| format!("{what} index '{text}' is not a number"))
}

fn torque_column(text: &str) -> Result<TorqueColumn> {
    match text.to_ascii_lowercase().as_str() {
        "rpm" => Ok(TorqueColumn::Rpm),
        "compression" | "comp" => Ok(TorqueColumn::Compression),
        "torque" | "nm" => Ok(TorqueColumn::Torque),
        _ => bail!("unknown torque column '{text}' (expected rpm, compression or torque)"),
    }
}

fn boost_column(text: &str) -> Result<BoostColumn> {
    match text.to_ascii_lowercase().as_str() {
        "rpm" => Ok(BoostColumn::Rpm),
        "t0" => Ok(BoostColumn::Throttle(0)),
        "t25" => Ok(BoostColumn::Throttle(1)),
        "t50" => Ok(BoostColumn::Throttle(2)),
        "t75" => Ok(BoostColumn::Throttle(3)),
        "t100" => Ok(BoostColumn::Throttle(4)),
        _ => bail!("unknown boost column '{text}' (expected rpm, t0, t25, t50, t75 or t100)"),
    }
}

impl Target {
    /// Find the field this target names in `doc`.
    pub fn resolve(&self, doc: &Document) -> Result<FieldRef> {
        match self {
            Target::Torque { table, row, column } => doc
                .torque_field(*table, *row, *column)
                .ok_or_else(|| {
                    anyhow!(
                        "torque table {table} row {row} has no editable {} field",
                        column.name()
                    )
                }),
            Target::Boost { table, row, column } => doc
                .boost_field(*table, *row, *column)
                .ok_or_else(|| {
                    anyhow!(
                        "boost table {table} row {row} has no editable {} field",
                        column.name()
                    )
                }),
            Target::Param { name, field } => {
                let param = doc
                    .parameter_named(name)
                    .ok_or_else(|| anyhow!("parameter '{name}' not found in this file"))?;
                let labels: Vec<&str> = param.fields.iter().map(|f| f.label.as_str()).collect();
                let idx = match field {
                    Some(f) => f
                        .parse::<usize>()
                        .ok()
                        .filter(|i| *i < param.fields.len())
                        .or_else(|| param.field_index(f))
                        .ok_or_else(|| {
                            anyhow!("parameter '{name}' has no field '{f}' (fields: {labels:?})")
                        })?,
                    None if param.fields.len() == 1 => 0,
                    None if param.fields.is_empty() => {
                        bail!("parameter '{name}' has no value to edit")
                    }
                    None => bail!("parameter '{name}' has several fields, pick one of {labels:?}"),
                };
                param
                    .field_ref(idx)
                    .ok_or_else(|| anyhow!("parameter '{name}' has no field {idx}"))
            }
        }
    }
}

pub fn run(doc: &mut Document, target: &str, value: f64) -> Result<()> {
    let target: Target = target.parse()?;
    let field = target.resolve(doc)?;
    let stored = doc.edit(&field, value)?;
    println!(
        "{} @ 0x{:X} ({}) = {stored}",
        field.target, field.offset, field.encoding
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use edf_core::{Catalog, Value};

    const REV_RANGE: [u8; 7] = [0x24, 0xDE, 0xA7, 0x2E, 0xB7, 0x23, 0x00];

    fn doc() -> Document {
        let mut v = vec![0x24, 0x51, 0x5F, 0x5E, 0x83, 0x86, 0xAA, 0x00];
        for t in [1.0f32, 1.1, 1.2, 1.3, 1.4] {
            v.extend_from_slice(&t.to_le_bytes());
        }
        v.extend_from_slice(&[0x24, 0x51, 0x5F, 0x5E, 0x83, 0x96, 0xAA]);
        v.extend_from_slice(&3000i32.to_le_bytes());
        for t in [1.5f32, 1.6, 1.7, 1.8, 1.9] {
            v.extend_from_slice(&t.to_le_bytes());
        }
        v.extend_from_slice(&REV_RANGE);
        v.extend_from_slice(&8500.0f32.to_le_bytes());
        v.extend_from_slice(&9000.0f32.to_le_bytes());
        v.push(10);
        Document::from_bytes(v, Arc::new(Catalog::builtin())).unwrap()
    }

    #[test]
    fn parses_targets() {
        assert_eq!(
            "torque:0:3:torque".parse::<Target>().unwrap(),
            Target::Torque {
                table: 0,
                row: 3,
                column: TorqueColumn::Torque
            }
        );
        assert_eq!(
            "boost:1:2:t75".parse::<Target>().unwrap(),
            Target::Boost {
                table: 1,
                row: 2,
                column: BoostColumn::Throttle(3)
            }
        );
        assert_eq!(
            "param:RevLimitRange:Steps".parse::<Target>().unwrap(),
            Target::Param {
                name: "RevLimitRange".to_string(),
                field: Some("Steps".to_string())
            }
        );
        assert!("torque:0:x:rpm".parse::<Target>().is_err());
        assert!("boost:0:0:t60".parse::<Target>().is_err());
        assert!("param:".parse::<Target>().is_err());
        assert!("fuel:0".parse::<Target>().is_err());
    }

    #[test]
    fn edits_boost_cell() {
        let mut d = doc();
        run(&mut d, "boost:0:1:t100", 2.4).unwrap();
        assert_eq!(d.boost_tables()[0].rows[1].throttle[4], 2.4);
        run(&mut d, "boost:0:1:rpm", 3500.0).unwrap();
        assert_eq!(d.boost_tables()[0].rows[1].rpm, 3500.0);
        assert!(run(&mut d, "boost:0:0:rpm", 10.0).is_err());
        assert!(run(&mut d, "boost:0:1:rpm", 3500.5).is_err());
    }

    #[test]
    fn param_field_by_label_or_index() {
        let mut d = doc();
        run(&mut d, "param:RevLimitRange:steps", 12.0).unwrap();
        run(&mut d, "param:revlimitrange:0", 8800.0).unwrap();
        let p = d.parameter_named("RevLimitRange").unwrap();
        assert_eq!(p.fields[2].value, Value::Byte(12));
        assert_eq!(p.fields[0].value, Value::Float(8800.0));
    }

    #[test]
    fn multi_field_param_needs_field() {
        let mut d = doc();
        let err = run(&mut d, "param:RevLimitRange", 1.0).unwrap_err();
        assert!(err.to_string().contains("several fields"));
        assert!(run(&mut d, "param:RevLimitRange:Bogus", 1.0).is_err());
        assert!(run(&mut d, "param:EngineInertia", 1.0).is_err());
        assert!(!d.is_modified());
    }
}

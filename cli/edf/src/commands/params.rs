//! `edf params`: parameter listing.

use anyhow::Result;
use edf_core::format::format_float;
use edf_core::{Document, Parameter, Value};

pub fn run(doc: &Document, decimals: usize) -> Result<()> {
    let params = doc.parameters();
    if params.is_empty() {
        println!("No parameters found.");
        return Ok(());
    }
    println!("{:<32} {:>10}  Values", "Name", "Offset");
    for param in params.values() {
        println!("{}", render_line(param, decimals));
    }
    Ok(())
}

fn render_line(param: &Parameter, decimals: usize) -> String {
    let values: Vec<String> = param
        .fields
        .iter()
        .map(|f| {
            let value = match f.value {
                Value::Float(v) => format_float(v as f64, decimals),
                other => other.to_string(),
            };
            match &f.unit {
                Some(unit) => format!("{}={value} {unit}", f.label),
                None => format!("{}={value}", f.label),
            }
        })
        .collect();
    let values = if values.is_empty() {
        "(no value)".to_string()
    } else {
        values.join(", ")
    };
    format!("{:<32} {:>10}  {values}", param.name, format!("0x{:X}", param.byte_offset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use edf_core::{ParameterField, Signature};

    fn param(fields: Vec<ParameterField>) -> Parameter {
        Parameter {
            name: "RevLimitRange".to_string(),
            signature: Signature::new(vec![0x24, 0xDE, 0xA7, 0x2E, 0xB7, 0x23, 0x00]),
            byte_offset: 0x40,
            fields,
        }
    }

    fn field(label: &str, unit: Option<&str>, value: Value) -> ParameterField {
        ParameterField {
            label: label.to_string(),
            unit: unit.map(str::to_string),
            value_type: value.value_type(),
            value,
            byte_offset: 0,
        }
    }

    #[test]
    fn renders_units_and_fixed_point() {
        let line = render_line(
            &param(vec![
                field("Limit", Some("rpm"), Value::Float(8500.0)),
                field("Steps", None, Value::Byte(10)),
            ]),
            2,
        );
        assert!(line.starts_with("RevLimitRange"));
        assert!(line.contains("0x40"));
        assert!(line.ends_with("Limit=8500.00 rpm, Steps=10"));
    }

    #[test]
    fn no_value_variant() {
        assert!(render_line(&param(Vec::new()), 2).ends_with("(no value)"));
    }
}

//! `edf poke`: raw byte patch followed by a full re-decode.

use anyhow::{bail, Context, Result};
use edf_core::Document;

use super::parse_number;

pub fn run(doc: &mut Document, offset: &str, byte: &str) -> Result<()> {
    let offset = usize::try_from(parse_number(offset)?).context("offset out of range")?;
    let value = parse_number(byte)?;
    let Ok(value) = u8::try_from(value) else {
        bail!("byte value {value} does not fit in 0..=255");
    };
    let previous = doc.as_bytes().get(offset).copied();
    doc.patch_byte(offset, value)
        .with_context(|| format!("patching byte at 0x{offset:X}"))?;
    if let Some(previous) = previous {
        println!("0x{offset:X}: {previous:02X} -> {value:02X}");
    }
    let map = doc.range_map();
    println!(
        "Re-decoded: {} torque tables, {} boost tables, {} parameters, {} unknown bytes",
        doc.torque_tables().len(),
        doc.boost_tables().len(),
        doc.parameters().len(),
        map.unknown_bytes()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use edf_core::Catalog;

    fn doc() -> Document {
        let mut v = vec![0x20, 0xA5, 0x5C, 0xC1, 0xC4, 0x01];
        v.extend_from_slice(&[0xAB; 10]);
        Document::from_bytes(v, Arc::new(Catalog::builtin())).unwrap()
    }

    #[test]
    fn patches_filler() {
        let mut d = doc();
        run(&mut d, "8", "0x00").unwrap();
        assert_eq!(d.as_bytes()[8], 0);
    }

    #[test]
    fn patching_a_value_updates_the_parameter() {
        let mut d = doc();
        run(&mut d, "0x5", "3").unwrap();
        assert_eq!(
            d.parameter_named("RevLimitSetting").unwrap().value(),
            Some(edf_core::Value::Byte(3))
        );
    }

    #[test]
    fn rejects_bad_input() {
        let mut d = doc();
        assert!(run(&mut d, "8", "256").is_err());
        assert!(run(&mut d, "0x100", "1").is_err());
        // Destroying the only signature leaves nothing to decode.
        assert!(run(&mut d, "0", "0xFF").is_err());
        assert!(!d.is_modified());
    }
}

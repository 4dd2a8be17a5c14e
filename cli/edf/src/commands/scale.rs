//! `edf scale`: scale every torque value.

use anyhow::{Context, Result};
use edf_core::Document;

pub fn run(doc: &mut Document, percent: f64) -> Result<()> {
    let fields = doc
        .scale_torque(percent)
        .with_context(|| format!("scaling torque by {percent}%"))?;
    let tables = doc.torque_tables().len();
    println!("Scaled {fields} torque values in {tables} tables by {percent}%");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use edf_core::Catalog;

    fn doc(torque: f32) -> Document {
        let mut v = vec![0x24, 0x8B, 0x0A, 0xB7, 0x71, 0x83, 0x02, 0x00];
        v.extend_from_slice(&0.0f32.to_le_bytes());
        v.extend_from_slice(&torque.to_le_bytes());
        v.extend_from_slice(&[0x24, 0x8B, 0x0A, 0xB7, 0x71, 0x93, 0x02]);
        v.extend_from_slice(&3000i32.to_le_bytes());
        v.extend_from_slice(&0.0f32.to_le_bytes());
        v.extend_from_slice(&(torque * 2.0).to_le_bytes());
        Document::from_bytes(v, Arc::new(Catalog::builtin())).unwrap()
    }

    #[test]
    fn scales_all_rows() {
        let mut d = doc(100.0);
        run(&mut d, 90.0).unwrap();
        let torques: Vec<Option<f32>> = d.torque_tables()[0].rows.iter().map(|r| r.torque).collect();
        assert_eq!(torques, vec![Some(90.0), Some(180.0)]);
    }

    #[test]
    fn out_of_bounds_result_is_rejected_whole() {
        let mut d = doc(4000.0);
        let err = run(&mut d, 200.0).unwrap_err();
        assert!(format!("{err:#}").contains("scaling torque by 200%"));
        assert!(!d.is_modified());
    }
}

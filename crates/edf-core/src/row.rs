//! Row codec: one torque or boost row at a time.
//!
//! A row is a marker signature followed by a fixed-size payload. The payload
//! itself does not say how it is laid out; torque row markers declare the
//! shape in their last byte. Callers pass the shape to decode with and check
//! plausibility themselves. [`infer_shape`] covers markers that declare none.

use serde::Serialize;

use crate::value::{read_f32, read_i32, Bounds, ValueType};

/// Plausible engine speed range.
pub const RPM_BOUNDS: Bounds = Bounds::new(0.0, 25_000.0);
/// Plausible torque range in Nm.
pub const TORQUE_BOUNDS: Bounds = Bounds::new(-4_000.0, 10_000.0);
/// Advisory boost pressure range in bar; never used to reject a row.
pub const BOOST_ADVISORY_BOUNDS: Bounds = Bounds::new(0.5, 3.0);

/// Number of throttle columns in a boost row (0, 25, 50, 75, 100 %).
pub const THROTTLE_COLUMNS: usize = 5;

/// Binary layout of a torque row payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowShape {
    /// `{u8 rpm, f32 compression, f32 torque}`
    ZeroRpm,
    /// `{i32 rpm, f32 compression, f32 torque}`
    Int,
    /// `{f32 rpm, f32 compression, f32 torque}`
    Float,
    /// `{i32 rpm, f32 compression, u8 trailer}`
    Terminal,
}

impl RowShape {
    pub const fn payload_len(self) -> usize {
        match self {
            RowShape::ZeroRpm | RowShape::Terminal => 9,
            RowShape::Int | RowShape::Float => 12,
        }
    }

    /// The other standard shape. Non-standard shapes map to themselves.
    pub const fn alternate(self) -> RowShape {
        match self {
            RowShape::Int => RowShape::Float,
            RowShape::Float => RowShape::Int,
            other => other,
        }
    }

    /// Position and encoding of a column within the payload.
    pub fn column(self, column: TorqueColumn) -> Option<(usize, ValueType)> {
        match (self, column) {
            (RowShape::ZeroRpm, TorqueColumn::Rpm) => Some((0, ValueType::Byte)),
            (RowShape::ZeroRpm, TorqueColumn::Compression) => Some((1, ValueType::Float)),
            (RowShape::ZeroRpm, TorqueColumn::Torque) => Some((5, ValueType::Float)),
            (RowShape::Int | RowShape::Terminal, TorqueColumn::Rpm) => Some((0, ValueType::Int)),
            (RowShape::Float, TorqueColumn::Rpm) => Some((0, ValueType::Float)),
            (_, TorqueColumn::Compression) => Some((4, ValueType::Float)),
            (RowShape::Terminal, TorqueColumn::Torque) => None,
            (_, TorqueColumn::Torque) => Some((8, ValueType::Float)),
        }
    }
}

/// Editable columns of a torque row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TorqueColumn {
    Rpm,
    Compression,
    Torque,
}

impl TorqueColumn {
    pub fn name(self) -> &'static str {
        match self {
            TorqueColumn::Rpm => "rpm",
            TorqueColumn::Compression => "compression",
            TorqueColumn::Torque => "torque",
        }
    }
}

/// Decoded torque payload, before it is attached to a table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TorquePayload {
    pub rpm: f32,
    pub compression: f32,
    pub torque: Option<f32>,
    /// Raw zero-RPM byte or terminal trailer byte.
    pub tag_byte: Option<u8>,
}

impl TorquePayload {
    /// RPM and torque within bounds, compression finite. Compression has no
    /// plausible range of its own.
    pub fn is_plausible(&self) -> bool {
        RPM_BOUNDS.contains(self.rpm as f64)
            && self.compression.is_finite()
            && self.torque.map_or(true, |t| TORQUE_BOUNDS.contains(t as f64))
    }
}

/// Decode a torque payload at `offset` using `shape`.
pub fn decode_torque(buf: &[u8], offset: usize, shape: RowShape) -> Option<TorquePayload> {
    let end = offset.checked_add(shape.payload_len())?;
    if end > buf.len() {
        return None;
    }
    let payload = match shape {
        RowShape::ZeroRpm => {
            let b = buf[offset];
            TorquePayload {
                rpm: b as f32,
                compression: read_f32(buf, offset + 1)?,
                torque: Some(read_f32(buf, offset + 5)?),
                tag_byte: Some(b),
            }
        }
        RowShape::Int => TorquePayload {
            rpm: read_i32(buf, offset)? as f32,
            compression: read_f32(buf, offset + 4)?,
            torque: Some(read_f32(buf, offset + 8)?),
            tag_byte: None,
        },
        RowShape::Float => TorquePayload {
            rpm: read_f32(buf, offset)?,
            compression: read_f32(buf, offset + 4)?,
            torque: Some(read_f32(buf, offset + 8)?),
            tag_byte: None,
        },
        RowShape::Terminal => TorquePayload {
            rpm: read_i32(buf, offset)? as f32,
            compression: read_f32(buf, offset + 4)?,
            torque: None,
            tag_byte: Some(buf[offset + 8]),
        },
    };
    Some(payload)
}

/// Encode a torque payload. `rpm` is truncated to the shape's RPM encoding;
/// `tag_byte` fills the zero-RPM byte or terminal trailer (defaults to 0).
#[cfg(test)]
pub(crate) fn encode_torque(shape: RowShape, payload: &TorquePayload) -> Vec<u8> {
    let mut out = Vec::with_capacity(shape.payload_len());
    match shape {
        RowShape::ZeroRpm => out.push(payload.tag_byte.unwrap_or(0)),
        RowShape::Int | RowShape::Terminal => {
            out.extend_from_slice(&(payload.rpm as i32).to_le_bytes())
        }
        RowShape::Float => out.extend_from_slice(&payload.rpm.to_le_bytes()),
    }
    out.extend_from_slice(&payload.compression.to_le_bytes());
    match shape {
        RowShape::Terminal => out.push(payload.tag_byte.unwrap_or(0)),
        _ => out.extend_from_slice(&payload.torque.unwrap_or(0.0).to_le_bytes()),
    }
    out
}

/// Pick a shape for a row whose marker declares none, by decoding it both
/// ways.
///
/// The int shape is tried first, so when both interpretations are plausible
/// `{i32, f32, f32}` wins. `None` means neither shape is plausible.
pub fn infer_shape(buf: &[u8], offset: usize) -> Option<RowShape> {
    decode_plausible(buf, offset, RowShape::Int).map(|(shape, _)| shape)
}

/// Decode with `preferred`, falling back to its alternate. Returns the first
/// plausible interpretation.
pub fn decode_plausible(
    buf: &[u8],
    offset: usize,
    preferred: RowShape,
) -> Option<(RowShape, TorquePayload)> {
    [preferred, preferred.alternate()]
        .into_iter()
        .find_map(|shape| {
            decode_torque(buf, offset, shape)
                .filter(TorquePayload::is_plausible)
                .map(|p| (shape, p))
        })
}

/// Binary layout of a boost row payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoostShape {
    /// `{u8 rpm, f32 x 5}`
    ZeroRpm,
    /// `{i32 rpm, f32 x 5}`
    Standard,
}

impl BoostShape {
    pub const fn payload_len(self) -> usize {
        self.throttle_offset() + THROTTLE_COLUMNS * 4
    }

    const fn throttle_offset(self) -> usize {
        match self {
            BoostShape::ZeroRpm => 1,
            BoostShape::Standard => 4,
        }
    }

    pub fn column(self, column: BoostColumn) -> Option<(usize, ValueType)> {
        match (self, column) {
            (BoostShape::ZeroRpm, BoostColumn::Rpm) => Some((0, ValueType::Byte)),
            (BoostShape::Standard, BoostColumn::Rpm) => Some((0, ValueType::Int)),
            (_, BoostColumn::Throttle(i)) if i < THROTTLE_COLUMNS => {
                Some((self.throttle_offset() + i * 4, ValueType::Float))
            }
            _ => None,
        }
    }
}

/// Editable columns of a boost row. `Throttle(i)` is the `i * 25` % column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoostColumn {
    Rpm,
    Throttle(usize),
}

impl BoostColumn {
    pub fn name(self) -> String {
        match self {
            BoostColumn::Rpm => "rpm".to_string(),
            BoostColumn::Throttle(i) => format!("t{}", i * 25),
        }
    }
}

/// Decoded boost payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoostPayload {
    pub rpm: f32,
    pub throttle: [f32; THROTTLE_COLUMNS],
}

pub fn decode_boost(buf: &[u8], offset: usize, shape: BoostShape) -> Option<BoostPayload> {
    let end = offset.checked_add(shape.payload_len())?;
    if end > buf.len() {
        return None;
    }
    let rpm = match shape {
        BoostShape::ZeroRpm => buf[offset] as f32,
        BoostShape::Standard => read_i32(buf, offset)? as f32,
    };
    let base = offset + shape.throttle_offset();
    let mut throttle = [0.0f32; THROTTLE_COLUMNS];
    for (i, slot) in throttle.iter_mut().enumerate() {
        *slot = read_f32(buf, base + i * 4)?;
    }
    Some(BoostPayload { rpm, throttle })
}

#[cfg(test)]
pub(crate) fn encode_boost(shape: BoostShape, payload: &BoostPayload) -> Vec<u8> {
    let mut out = Vec::with_capacity(shape.payload_len());
    match shape {
        BoostShape::ZeroRpm => out.push(payload.rpm as u8),
        BoostShape::Standard => out.extend_from_slice(&(payload.rpm as i32).to_le_bytes()),
    }
    for t in payload.throttle {
        out.extend_from_slice(&t.to_le_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_row(rpm: i32, comp: f32, torque: f32) -> Vec<u8> {
        let mut v = rpm.to_le_bytes().to_vec();
        v.extend_from_slice(&comp.to_le_bytes());
        v.extend_from_slice(&torque.to_le_bytes());
        v
    }

    fn float_row(rpm: f32, comp: f32, torque: f32) -> Vec<u8> {
        let mut v = rpm.to_le_bytes().to_vec();
        v.extend_from_slice(&comp.to_le_bytes());
        v.extend_from_slice(&torque.to_le_bytes());
        v
    }

    #[test]
    fn payload_lengths() {
        assert_eq!(RowShape::ZeroRpm.payload_len(), 9);
        assert_eq!(RowShape::Int.payload_len(), 12);
        assert_eq!(RowShape::Float.payload_len(), 12);
        assert_eq!(RowShape::Terminal.payload_len(), 9);
        assert_eq!(BoostShape::ZeroRpm.payload_len(), 21);
        assert_eq!(BoostShape::Standard.payload_len(), 24);
    }

    #[test]
    fn infers_int_for_int_rows() {
        let buf = int_row(3000, 12.0, 250.0);
        assert_eq!(infer_shape(&buf, 0), Some(RowShape::Int));
    }

    #[test]
    fn infers_float_for_float_rows() {
        let buf = float_row(3000.0, 12.0, 250.0);
        assert_eq!(infer_shape(&buf, 0), Some(RowShape::Float));
    }

    #[test]
    fn inference_tie_prefers_int() {
        // Zero RPM bytes are plausible under both shapes.
        let buf = float_row(0.0, 12.0, 250.0);
        assert!(decode_torque(&buf, 0, RowShape::Float)
            .unwrap()
            .is_plausible());
        assert!(decode_torque(&buf, 0, RowShape::Int)
            .unwrap()
            .is_plausible());
        assert_eq!(infer_shape(&buf, 0), Some(RowShape::Int));
    }

    #[test]
    fn inference_rejects_implausible_torque() {
        let buf = float_row(3000.0, 12.0, 20_000.0);
        assert_eq!(infer_shape(&buf, 0), None);
    }

    #[test]
    fn decode_truncated_is_none() {
        let buf = int_row(3000, 1.0, 2.0);
        assert!(decode_torque(&buf[..11], 0, RowShape::Int).is_none());
        assert!(decode_torque(&buf, 1, RowShape::Int).is_none());
    }

    #[test]
    fn terminal_has_no_torque() {
        let mut buf = 4500i32.to_le_bytes().to_vec();
        buf.extend_from_slice(&(-3.5f32).to_le_bytes());
        buf.push(7);
        let row = decode_torque(&buf, 0, RowShape::Terminal).unwrap();
        assert_eq!(row.rpm, 4500.0);
        assert_eq!(row.compression, -3.5);
        assert_eq!(row.torque, None);
        assert_eq!(row.tag_byte, Some(7));
    }

    #[test]
    fn encode_matches_decode_layout() {
        let payload = TorquePayload {
            rpm: 0.0,
            compression: 10.0,
            torque: Some(100.0),
            tag_byte: Some(0),
        };
        let bytes = encode_torque(RowShape::ZeroRpm, &payload);
        assert_eq!(bytes.len(), 9);
        assert_eq!(decode_torque(&bytes, 0, RowShape::ZeroRpm), Some(payload));
    }

    #[test]
    fn compression_is_not_range_checked() {
        let buf = float_row(2000.0, -5000.0, 100.0);
        assert!(decode_torque(&buf, 0, RowShape::Float)
            .unwrap()
            .is_plausible());
        let nan = float_row(2000.0, f32::NAN, 100.0);
        assert!(!decode_torque(&nan, 0, RowShape::Float)
            .unwrap()
            .is_plausible());
    }

    #[test]
    fn column_positions() {
        assert_eq!(
            RowShape::ZeroRpm.column(TorqueColumn::Torque),
            Some((5, ValueType::Float))
        );
        assert_eq!(
            RowShape::Int.column(TorqueColumn::Rpm),
            Some((0, ValueType::Int))
        );
        assert_eq!(
            RowShape::Float.column(TorqueColumn::Compression),
            Some((4, ValueType::Float))
        );
        assert_eq!(RowShape::Terminal.column(TorqueColumn::Torque), None);
        assert_eq!(
            BoostShape::Standard.column(BoostColumn::Throttle(4)),
            Some((20, ValueType::Float))
        );
        assert_eq!(BoostShape::Standard.column(BoostColumn::Throttle(5)), None);
    }

    #[test]
    fn boost_decode() {
        let payload = BoostPayload {
            rpm: 2000.0,
            throttle: [1.1, 1.3, 1.6, 1.9, 2.1],
        };
        let bytes = encode_boost(BoostShape::Standard, &payload);
        assert_eq!(bytes.len(), 24);
        assert_eq!(decode_boost(&bytes, 0, BoostShape::Standard), Some(payload));
        assert!(decode_boost(&bytes[..23], 0, BoostShape::Standard).is_none());
    }

    #[test]
    fn boost_column_names() {
        assert_eq!(BoostColumn::Rpm.name(), "rpm");
        assert_eq!(BoostColumn::Throttle(0).name(), "t0");
        assert_eq!(BoostColumn::Throttle(3).name(), "t75");
    }
}

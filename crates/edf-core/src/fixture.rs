//! Test helper for assembling synthetic EDF buffers.

use crate::catalog::{
    SIG_BOOST_ROW, SIG_BOOST_ZERO, SIG_TORQUE_END, SIG_TORQUE_ROW_FLOAT, SIG_TORQUE_ROW_INT,
    SIG_TORQUE_ZERO,
};
use crate::row::{encode_boost, encode_torque, BoostPayload, BoostShape, RowShape, TorquePayload};
use crate::value::Value;

#[derive(Debug, Default)]
pub struct EdfBuilder {
    buf: Vec<u8>,
}

impl EdfBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn padding(mut self, n: usize, byte: u8) -> Self {
        self.buf.extend(std::iter::repeat(byte).take(n));
        self
    }

    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn torque_zero(self, compression: f32, torque: f32) -> Self {
        self.torque_zero_with_byte(0, compression, torque)
    }

    pub fn torque_zero_with_byte(self, rpm_byte: u8, compression: f32, torque: f32) -> Self {
        let payload = TorquePayload {
            rpm: rpm_byte as f32,
            compression,
            torque: Some(torque),
            tag_byte: Some(rpm_byte),
        };
        self.torque(&SIG_TORQUE_ZERO, RowShape::ZeroRpm, payload)
    }

    pub fn torque_int(self, rpm: i32, compression: f32, torque: f32) -> Self {
        let payload = TorquePayload {
            rpm: rpm as f32,
            compression,
            torque: Some(torque),
            tag_byte: None,
        };
        self.torque(&SIG_TORQUE_ROW_INT, RowShape::Int, payload)
    }

    pub fn torque_float(self, rpm: f32, compression: f32, torque: f32) -> Self {
        let payload = TorquePayload {
            rpm,
            compression,
            torque: Some(torque),
            tag_byte: None,
        };
        self.torque(&SIG_TORQUE_ROW_FLOAT, RowShape::Float, payload)
    }

    pub fn torque_end(self, rpm: i32, compression: f32, trailer: u8) -> Self {
        let payload = TorquePayload {
            rpm: rpm as f32,
            compression,
            torque: None,
            tag_byte: Some(trailer),
        };
        self.torque(&SIG_TORQUE_END, RowShape::Terminal, payload)
    }

    fn torque(self, marker: &[u8], shape: RowShape, payload: TorquePayload) -> Self {
        self.raw(marker).raw(&encode_torque(shape, &payload))
    }

    pub fn boost_zero(self, throttle: [f32; 5]) -> Self {
        let payload = BoostPayload { rpm: 0.0, throttle };
        self.raw(&SIG_BOOST_ZERO)
            .raw(&encode_boost(BoostShape::ZeroRpm, &payload))
    }

    pub fn boost_row(self, rpm: i32, throttle: [f32; 5]) -> Self {
        let payload = BoostPayload {
            rpm: rpm as f32,
            throttle,
        };
        self.raw(&SIG_BOOST_ROW)
            .raw(&encode_boost(BoostShape::Standard, &payload))
    }

    /// Signature followed by each value's little-endian encoding.
    pub fn param(mut self, signature: &[u8], values: &[Value]) -> Self {
        self.buf.extend_from_slice(signature);
        for v in values {
            self.buf.extend_from_slice(&v.to_le_bytes());
        }
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.buf
    }
}

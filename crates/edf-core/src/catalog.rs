//! Signature catalog: every byte sequence the codec knows how to recognise.
//!
//! The catalog is an ordinary immutable value. Build it once with
//! [`Catalog::builtin`], optionally [`Catalog::extend`] it with user-supplied
//! parameter signatures, and pass it by reference to every scanner.
//!
//! Marker tag bytes follow a visible pattern: the high nibble of the tag
//! names the type of the first payload field (`0x8_` byte, `0x9_` int,
//! `0xA_` float). Torque row markers carry that type as their declared
//! [`RowShape`]; a row marker without one has its shape inferred.

use std::fmt;

use memchr::memmem;
use serde::{Serialize, Serializer};

use crate::error::{EdfError, Result};
use crate::format::hex_bytes;
use crate::row::RowShape;
use crate::value::ValueType;

/// Torque table start: zero-RPM row `{u8, f32, f32}`.
pub const SIG_TORQUE_ZERO: [u8; 7] = [0x24, 0x8B, 0x0A, 0xB7, 0x71, 0x83, 0x02];
/// Torque row marker, int-tagged variant.
pub const SIG_TORQUE_ROW_INT: [u8; 7] = [0x24, 0x8B, 0x0A, 0xB7, 0x71, 0x93, 0x02];
/// Torque row marker, float-tagged variant.
pub const SIG_TORQUE_ROW_FLOAT: [u8; 7] = [0x24, 0x8B, 0x0A, 0xB7, 0x71, 0xA3, 0x02];
/// Torque table terminator `{i32, f32, u8}`.
pub const SIG_TORQUE_END: [u8; 7] = [0x24, 0x8B, 0x0A, 0xB7, 0x71, 0x93, 0x00];
/// Boost table start: zero-RPM row `{u8, f32 x 5}`.
pub const SIG_BOOST_ZERO: [u8; 7] = [0x24, 0x51, 0x5F, 0x5E, 0x83, 0x86, 0xAA];
/// Boost row marker `{i32, f32 x 5}`.
pub const SIG_BOOST_ROW: [u8; 7] = [0x24, 0x51, 0x5F, 0x5E, 0x83, 0x96, 0xAA];

/// Default size of the trailing region searched for engine-layout tags.
pub const LAYOUT_TAIL_WINDOW: usize = 64;

/// A fixed byte sequence.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Signature(Vec<u8>);

impl Signature {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `buf` carries this signature at `offset`.
    pub fn matches_at(&self, buf: &[u8], offset: usize) -> bool {
        buf.get(offset..)
            .is_some_and(|rest| rest.starts_with(&self.0))
    }
}

impl From<&[u8]> for Signature {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex_bytes(&self.0))
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Every non-overlapping occurrence of `needle` in `haystack`, in file
/// order. An empty needle matches nothing.
pub fn find_all<'a>(haystack: &'a [u8], needle: &'a [u8]) -> impl Iterator<Item = usize> + 'a {
    (!needle.is_empty())
        .then(|| memmem::find_iter(haystack, needle))
        .into_iter()
        .flatten()
}

/// Offset of the last occurrence of `needle` in `haystack`.
pub fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    memmem::rfind(haystack, needle)
}

/// A row marker and the payload shape its tag byte declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowMarker {
    pub signature: Signature,
    /// `None` when the marker does not say how its payload is laid out.
    pub shape: Option<RowShape>,
}

impl RowMarker {
    pub fn new(signature: &[u8], shape: Option<RowShape>) -> Self {
        Self {
            signature: Signature::from(signature),
            shape,
        }
    }

    pub fn len(&self) -> usize {
        self.signature.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signature.is_empty()
    }
}

/// Markers delimiting one family of tables.
#[derive(Debug, Clone)]
pub struct TableMarkers {
    /// Table start; also prefixes the zero-RPM row.
    pub start: Signature,
    /// Accepted markers in front of each standard row.
    pub rows: Vec<RowMarker>,
    /// Terminal-row marker, if the family has one.
    pub terminator: Option<Signature>,
}

impl TableMarkers {
    /// The row marker present at `offset`, if any.
    pub fn row_marker_at(&self, buf: &[u8], offset: usize) -> Option<&RowMarker> {
        self.rows.iter().find(|m| m.signature.matches_at(buf, offset))
    }
}

/// One value field following a parameter signature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSpec {
    pub label: String,
    pub unit: Option<String>,
    pub value_type: ValueType,
}

impl FieldSpec {
    pub fn new(label: impl Into<String>, unit: Option<&str>, value_type: ValueType) -> Self {
        Self {
            label: label.into(),
            unit: unit.map(str::to_string),
            value_type,
        }
    }
}

/// A known parameter: signature plus the layout of the values after it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamSpec {
    pub name: String,
    pub signature: Signature,
    pub fields: Vec<FieldSpec>,
}

impl ParamSpec {
    /// Bytes of value data after the signature.
    pub fn payload_len(&self) -> usize {
        self.fields.iter().map(|f| f.value_type.width()).sum()
    }
}

/// Engine layouts recognised by their tail tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutKind {
    SingleCylinder,
    Flat4OrThreeRotor,
    Straight4,
    Straight5,
    Straight6,
    Flat6,
    V8OrFlat8,
    V12,
    V10,
}

impl LayoutKind {
    pub fn label(self) -> &'static str {
        match self {
            LayoutKind::SingleCylinder => "Single Cylinder",
            LayoutKind::Flat4OrThreeRotor => "Flat 4 / 3 Rotor",
            LayoutKind::Straight4 => "Straight 4",
            LayoutKind::Straight5 => "Straight 5",
            LayoutKind::Straight6 => "Straight 6",
            LayoutKind::Flat6 => "Flat 6",
            LayoutKind::V8OrFlat8 => "V8 / Flat 8",
            LayoutKind::V12 => "V12",
            LayoutKind::V10 => "V10",
        }
    }
}

impl fmt::Display for LayoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A layout tag and the layout it identifies.
#[derive(Debug, Clone)]
pub struct LayoutPattern {
    pub code: Signature,
    pub kind: LayoutKind,
}

/// Immutable set of everything the scanners look for.
#[derive(Debug, Clone)]
pub struct Catalog {
    torque: TableMarkers,
    boost: TableMarkers,
    parameters: Vec<ParamSpec>,
    layouts: Vec<LayoutPattern>,
    layout_tail_window: usize,
}

impl Catalog {
    /// The built-in catalog: both table families, 51 parameter signatures and
    /// 9 engine-layout tags.
    pub fn builtin() -> Self {
        let parameters = BUILTIN_PARAMS
            .iter()
            .map(|(name, sig, fields)| ParamSpec {
                name: (*name).to_string(),
                signature: Signature::from(*sig),
                fields: fields
                    .iter()
                    .map(|(label, unit, ty)| FieldSpec::new(*label, *unit, *ty))
                    .collect(),
            })
            .collect();

        let layouts = BUILTIN_LAYOUTS
            .iter()
            .map(|(code, kind)| LayoutPattern {
                code: Signature::from(*code),
                kind: *kind,
            })
            .collect();

        Self {
            torque: TableMarkers {
                start: Signature::from(&SIG_TORQUE_ZERO[..]),
                rows: vec![
                    RowMarker::new(&SIG_TORQUE_ROW_INT, Some(RowShape::Int)),
                    RowMarker::new(&SIG_TORQUE_ROW_FLOAT, Some(RowShape::Float)),
                ],
                terminator: Some(Signature::from(&SIG_TORQUE_END[..])),
            },
            boost: TableMarkers {
                start: Signature::from(&SIG_BOOST_ZERO[..]),
                rows: vec![RowMarker::new(&SIG_BOOST_ROW, None)],
                terminator: None,
            },
            parameters,
            layouts,
            layout_tail_window: LAYOUT_TAIL_WINDOW,
        }
    }

    /// Append user-supplied parameter signatures.
    ///
    /// Empty signatures and signatures already present in the catalog are
    /// rejected, and nothing is added on error.
    pub fn extend(&mut self, extra: Vec<ParamSpec>) -> Result<()> {
        for (i, spec) in extra.iter().enumerate() {
            if spec.signature.is_empty() {
                return Err(EdfError::Catalog {
                    detail: format!("parameter '{}' has an empty signature", spec.name),
                });
            }
            let clash = self
                .parameters
                .iter()
                .chain(&extra[..i])
                .find(|p| p.signature == spec.signature);
            if let Some(existing) = clash {
                return Err(EdfError::Catalog {
                    detail: format!(
                        "signature [{}] of '{}' is already used by '{}'",
                        spec.signature, spec.name, existing.name
                    ),
                });
            }
        }
        self.parameters.extend(extra);
        Ok(())
    }

    /// Override the size of the tail region searched for layout tags.
    pub fn with_layout_tail_window(mut self, window: usize) -> Self {
        self.layout_tail_window = window;
        self
    }

    pub fn torque_markers(&self) -> &TableMarkers {
        &self.torque
    }

    pub fn boost_markers(&self) -> &TableMarkers {
        &self.boost
    }

    pub fn parameters(&self) -> &[ParamSpec] {
        &self.parameters
    }

    /// Look up a parameter spec by signature.
    pub fn parameter(&self, signature: &Signature) -> Option<&ParamSpec> {
        self.parameters.iter().find(|p| &p.signature == signature)
    }

    /// Layout tags in priority order.
    pub fn layouts(&self) -> &[LayoutPattern] {
        &self.layouts
    }

    pub fn layout_tail_window(&self) -> usize {
        self.layout_tail_window
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

type BuiltinField = (&'static str, Option<&'static str>, ValueType);

const F: ValueType = ValueType::Float;
const I: ValueType = ValueType::Int;
const B: ValueType = ValueType::Byte;

#[rustfmt::skip]
const BUILTIN_PARAMS: &[(&str, &[u8], &[BuiltinField])] = &[
    ("FuelConsumption", &[0x22, 0x4A, 0xE2, 0xDD, 0x6C], &[("Consumption", None, F)]),
    ("FuelEstimate", &[0x22, 0xD2, 0xA2, 0x92, 0x32], &[("Estimate", None, F)]),
    ("EngineInertia", &[0x22, 0x46, 0x65, 0xAE, 0x87], &[("Inertia", Some("kg·m²"), F)]),
    ("Unknown_EngineFreeRevs", &[0x22, 0x40, 0xF1, 0xD2, 0xB9], &[("Value", None, F)]),
    ("IdleRPMLogic", &[0x24, 0x4D, 0x23, 0x97, 0x54, 0xA2], &[("RPM Low", Some("rpm"), F), ("RPM High", Some("rpm"), F)]),
    ("IdleRPMLogic", &[0x24, 0x4D, 0x23, 0x97, 0x54, 0x52], &[("RPM Low", Some("rpm"), I), ("RPM High", Some("rpm"), I)]),
    ("LaunchEfficiency", &[0x22, 0x21, 0x98, 0x99, 0xAE], &[("Efficiency", None, F)]),
    ("LaunchRPMLogic", &[0x24, 0x79, 0x02, 0xB6, 0xBD, 0xA2], &[("RPM 1", Some("rpm"), F), ("RPM 2", Some("rpm"), F)]),
    ("RevLimitRange", &[0x24, 0xDE, 0xA7, 0x2E, 0xB7, 0x23, 0x00], &[("Limit", Some("rpm"), F), ("Max/Steps", None, F), ("Steps", None, B)]),
    ("RevLimitRange", &[0x24, 0xDE, 0xA7, 0x2E, 0xB7, 0x13, 0x00], &[("Limit", Some("rpm"), I), ("Max/Steps", None, B), ("Steps", None, B)]),
    ("RevLimitSetting", &[0x20, 0xA5, 0x5C, 0xC1, 0xC4], &[("Setting", None, B)]),
    ("RevLimitSetting_NoValue", &[0x28, 0xA5, 0x5C, 0xC1, 0xC4], &[]),
    ("RevLimitLogic", &[0x22, 0x19, 0x66, 0x8A, 0xF9], &[("Value", None, F)]),
    ("EngineFuelMapRange", &[0x24, 0x83, 0x15, 0x2F, 0x20, 0x03, 0x00], &[("Min", None, B), ("Max", None, B), ("Steps", None, B)]),
    ("EngineFuelMapSetting", &[0x20, 0xC4, 0x44, 0x73, 0xF5], &[("Map Index", None, B)]),
    ("EngineBrakingMapRange", &[0x24, 0xBF, 0x84, 0x7C, 0xF1, 0xA3, 0x00], &[("Min", None, F), ("Max", None, F), ("Steps", None, B)]),
    ("EngineBrakingMapSetting", &[0x20, 0xBE, 0x71, 0xED, 0x67], &[("Map Index", None, B)]),
    ("OptimumOilTemp", &[0x22, 0xAF, 0xD7, 0x8A, 0xDD], &[("Temp", Some("°C"), F)]),
    ("CombustionHeat", &[0x22, 0x54, 0x10, 0x6D, 0xB1], &[("Heat", None, F)]),
    ("EngineSpeedHeat", &[0x22, 0xF6, 0xE3, 0x9F, 0xD9], &[("Heat", None, F)]),
    ("OilMinimumCooling", &[0x22, 0xB3, 0x0F, 0x25, 0xFC], &[("Cooling", None, F)]),
    ("OilWaterHeatTransfer", &[0x24, 0xA7, 0x00, 0xD2, 0x3A, 0xA2], &[("K1", None, F), ("K2", None, F)]),
    ("WaterMinimumCooling", &[0x22, 0x67, 0x17, 0x15, 0x86], &[("Cooling", None, F)]),
    ("RadiatorCooling", &[0x24, 0x6A, 0xDA, 0x2B, 0x3A, 0xA2], &[("K1", None, F), ("K2", None, F)]),
    ("Unknown_Chunk_213F6B", &[0x21, 0x3F, 0x6B, 0x7B, 0xE7, 0x82, 0x00], &[("Byte 1", None, B), ("Byte 2", None, B)]),
    ("Unknown_Chunk_206D47", &[0x20, 0x6D, 0x47, 0xC1, 0xB2], &[("Value", None, B)]),
    ("LifetimeEngineRPM", &[0x24, 0xD3, 0x94, 0x64, 0xAF, 0xA2], &[("Avg", Some("rpm"), F), ("Max", Some("rpm"), F)]),
    ("LifetimeEngineRPM", &[0x24, 0xD3, 0x94, 0x64, 0xAF, 0x52], &[("Avg", Some("rpm"), I), ("Max", Some("rpm"), I)]),
    ("LifetimeOilTemp", &[0x24, 0x0A, 0xCE, 0xA8, 0x58, 0xA2], &[("Avg", Some("°C"), F), ("Max", Some("°C"), F)]),
    ("Unknown_LMP_RWD_P30_A", &[0x24, 0x05, 0x71, 0xC7, 0x19, 0xA2], &[("Value 1", None, F), ("Value 2", None, F)]),
    ("LifetimeAvg", &[0x22, 0xF7, 0x5F, 0x82, 0x2B], &[("Average", None, F)]),
    ("LifetimeVar", &[0x22, 0x52, 0x7B, 0x76, 0xCD], &[("Variance", None, F)]),
    ("Unknown_LMP_RWD_P30_B", &[0x24, 0xC1, 0xF4, 0x54, 0x3C, 0x83, 0x02], &[("Byte", None, B), ("Float 1", None, F), ("Float 2", None, F)]),
    ("EngineEmission", &[0x24, 0xCE, 0xB1, 0x75, 0x25, 0xA3, 0x02], &[("E1", None, F), ("E2", None, F), ("E3", None, F)]),
    ("OnboardStarter?", &[0x20, 0x11, 0x8B, 0xA3, 0x81], &[("Present", None, B)]),
    ("EDF_UNKN_005", &[0x26, 0xAF, 0x00, 0xB3, 0xBA], &[("Value", None, B)]),
    ("StarterTiming", &[0x24, 0x52, 0x17, 0xFB, 0x41, 0xA3, 0x02], &[("T1", None, F), ("T2", None, F), ("T3", None, F)]),
    ("Unknown_Float_3", &[0x22, 0x92, 0xC7, 0xCD, 0x7C], &[("Value", None, F)]),
    ("AirRestrictorRange", &[0x24, 0xFC, 0x89, 0xE8, 0x9C, 0xA3, 0x00], &[("Min", None, F), ("Max", None, F), ("Steps", None, B)]),
    ("AirRestrictorSetting", &[0x20, 0xC5, 0xB4, 0x08, 0xFE], &[("Setting", None, B)]),
    ("AirRestrictorSetting_NoValue", &[0x28, 0xC5, 0xB4, 0x08, 0xFE], &[]),
    ("Unknown_Byte_2B3ED340", &[0x20, 0x2B, 0x3E, 0xD3, 0x40], &[("Value", None, B)]),
    ("Unknown_Float_6e-06", &[0x22, 0xBA, 0x65, 0xDD, 0x60], &[("Value", None, F)]),
    ("Unknown_Float_295", &[0x22, 0x81, 0x92, 0x17, 0xE0], &[("Value", None, F)]),
    ("WasteGateRange_OLD", &[0x24, 0x63, 0x23, 0x3A, 0x14, 0xA3, 0x00], &[("Min", None, F), ("Max", None, F), ("Steps", None, B)]),
    ("WasteGateSetting_OLD", &[0x20, 0xDF, 0x86, 0x64, 0xFC], &[("Setting", None, B)]),
    ("WasteGateSetting_OLD_NoValue", &[0x28, 0xDF, 0x86, 0x64, 0xFC], &[]),
    ("Unknown_2300005", &[0x23, 0x00, 0x00, 0x50, 0xC3], &[("Byte 1", None, B), ("Byte 2", None, B)]),
    ("BoostRange", &[0x24, 0xD7, 0x74, 0x45, 0x1A, 0x83, 0x00], &[("Min", None, B), ("Max", Some("bar"), F), ("Steps", None, B)]),
    ("BoostSetting", &[0x20, 0xCA, 0x2F, 0xD1, 0x34], &[("Setting", None, B)]),
    ("BoostSetting_NoValue", &[0x28, 0xCA, 0x2F, 0xD1, 0x34], &[]),
];

const BUILTIN_LAYOUTS: &[(&[u8], LayoutKind)] = &[
    (&[0xD7, 0x50, 0x75, 0x68, 0xA3, 0x0A, 0x62], LayoutKind::SingleCylinder),
    (&[0xC2, 0x2D, 0x3B], LayoutKind::Flat4OrThreeRotor),
    (&[0xD7, 0x2D, 0x3B], LayoutKind::Straight4),
    (&[0xD7, 0x2C, 0x3B], LayoutKind::Straight5),
    (&[0xD7, 0x2F, 0x3B], LayoutKind::Straight6),
    (&[0xC2, 0x2F, 0x3B], LayoutKind::Flat6),
    (&[0xD2, 0x21, 0x3B], LayoutKind::V8OrFlat8),
    (&[0xD2, 0x28, 0x09, 0x2F], LayoutKind::V12),
    (&[0xD2, 0x28, 0x0B, 0x2F], LayoutKind::V10),
];

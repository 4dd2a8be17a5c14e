//! Parameter scanner: named scalar settings keyed by signature.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, warn};

use crate::catalog::{find_all, Catalog, ParamSpec, Signature};
use crate::error::Diagnostic;
use crate::range::ByteRange;
use crate::value::{Value, ValueType};
use crate::writer::{FieldRef, FieldTarget};

/// One decoded value of a parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterField {
    pub label: String,
    pub unit: Option<String>,
    pub value_type: ValueType,
    pub value: Value,
    pub byte_offset: usize,
}

impl ParameterField {
    pub fn byte_length(&self) -> usize {
        self.value_type.width()
    }
}

/// A catalog parameter found in the buffer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    pub name: String,
    pub signature: Signature,
    /// Offset of the signature.
    pub byte_offset: usize,
    pub fields: Vec<ParameterField>,
}

impl Parameter {
    /// Signature plus every value.
    pub fn byte_length(&self) -> usize {
        self.signature.len() + self.fields.iter().map(ParameterField::byte_length).sum::<usize>()
    }

    pub fn span(&self) -> Option<ByteRange> {
        ByteRange::with_len(self.byte_offset, self.byte_length())
    }

    /// Single-valued parameters expose their value directly.
    pub fn value(&self) -> Option<Value> {
        match self.fields.as_slice() {
            [only] => Some(only.value),
            _ => None,
        }
    }

    pub fn field_ref(&self, field: usize) -> Option<FieldRef> {
        let f = self.fields.get(field)?;
        Some(FieldRef {
            target: FieldTarget::Parameter {
                signature: self.signature.clone(),
                field,
            },
            offset: f.byte_offset,
            encoding: f.value_type,
            bounds: None,
        })
    }

    /// Index of the field with the given label, case-insensitive.
    pub fn field_index(&self, label: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|f| f.label.eq_ignore_ascii_case(label))
    }
}

/// Parameters keyed by signature, plus scan diagnostics.
#[derive(Debug, Clone, Default)]
pub struct ParameterScan {
    pub parameters: BTreeMap<Signature, Parameter>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Decode every catalog parameter present in `buf`.
///
/// Absent signatures yield no entry. A signature seen more than once is
/// decoded at its lowest offset and reported as ambiguous.
pub fn scan_parameters(buf: &[u8], catalog: &Catalog) -> ParameterScan {
    let mut scan = ParameterScan::default();
    for spec in catalog.parameters() {
        let offsets: Vec<usize> = find_all(buf, spec.signature.as_bytes()).collect();
        let Some(&first) = offsets.first() else {
            continue;
        };

        if offsets.len() > 1 {
            let diag = Diagnostic::AmbiguousSignature {
                name: spec.name.clone(),
                signature: spec.signature.clone(),
                offsets: offsets.clone(),
            };
            warn!("{diag}");
            scan.diagnostics.push(diag);
        }

        match offsets.iter().find_map(|&at| decode_parameter(buf, at, spec)) {
            Some(param) => {
                debug!(name = %param.name, offset = param.byte_offset, "parameter");
                scan.parameters.insert(spec.signature.clone(), param);
            }
            None => {
                let diag = Diagnostic::TruncatedParameter {
                    name: spec.name.clone(),
                    offset: first,
                };
                warn!("{diag}");
                scan.diagnostics.push(diag);
            }
        }
    }
    scan
}

/// Decode the values following a signature at `offset`. `None` if the
/// values run past the end of the buffer.
pub fn decode_parameter(buf: &[u8], offset: usize, spec: &ParamSpec) -> Option<Parameter> {
    let mut cursor = offset + spec.signature.len();
    let mut fields = Vec::with_capacity(spec.fields.len());
    for f in &spec.fields {
        let value = Value::read(buf, cursor, f.value_type)?;
        fields.push(ParameterField {
            label: f.label.clone(),
            unit: f.unit.clone(),
            value_type: f.value_type,
            value,
            byte_offset: cursor,
        });
        cursor += f.value_type.width();
    }
    Some(Parameter {
        name: spec.name.clone(),
        signature: spec.signature.clone(),
        byte_offset: offset,
        fields,
    })
}

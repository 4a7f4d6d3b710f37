// Raw response models
//
// Loosely typed mirrors of the controller's JSON. Firmware versions
// disagree on whether flags are booleans or 0/1 and whether indices are
// numbers or numeric strings, so fields stay as `Value` and typed
// accessors do the tolerant parsing.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Error;

// ── Envelope ─────────────────────────────────────────────────────────

/// A decoded `{ "<name>Ver": token, "data": ... }` response.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// Device-side version token, when the response carries one.
    pub version: Option<String>,
    pub data: Value,
}

impl Envelope {
    /// Split a response body into version token and `data` payload.
    pub fn from_value(endpoint: &str, body: Value) -> Result<Self, Error> {
        let Value::Object(mut map) = body else {
            return Err(Error::MissingData {
                endpoint: endpoint.to_owned(),
            });
        };
        let data = map.remove("data").ok_or_else(|| Error::MissingData {
            endpoint: endpoint.to_owned(),
        })?;
        Ok(Self {
            version: version_token(&map),
            data,
        })
    }
}

fn version_token(map: &Map<String, Value>) -> Option<String> {
    map.iter()
        .find(|(key, _)| key.ends_with("Ver"))
        .and_then(|(_, value)| match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}

// ── rmParamsData ─────────────────────────────────────────────────────

/// One element of the `rmParamsData` array.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RawParamData {
    pub value: Option<Value>,
    pub maxv: Option<Value>,
    pub minv: Option<Value>,
    pub edit: Option<Value>,
    pub unit: Option<Value>,
    pub mult: Option<Value>,
    pub offset: Option<Value>,
}

impl RawParamData {
    pub fn is_editable(&self) -> bool {
        self.edit.as_ref().is_some_and(as_flag)
    }

    pub fn unit_index(&self) -> Option<usize> {
        self.unit.as_ref().and_then(as_index)
    }
}

// ── rmStructure ──────────────────────────────────────────────────────

/// One element of the `rmStructure` array.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RawStructureEntry {
    pub pass_index: Option<Value>,
    pub index: Option<Value>,
    #[serde(rename = "type")]
    pub kind: Option<Value>,
    pub lock: Option<Value>,
    pub lock_index: Option<Value>,
    pub data_id: Option<Value>,
}

impl RawStructureEntry {
    pub fn kind_code(&self) -> Option<i64> {
        self.kind.as_ref().and_then(as_i64)
    }

    pub fn index(&self) -> Option<usize> {
        self.index.as_ref().and_then(as_index)
    }

    pub fn pass_index(&self) -> u8 {
        self.pass_index
            .as_ref()
            .and_then(as_index)
            .and_then(|p| u8::try_from(p).ok())
            .unwrap_or(0)
    }

    pub fn is_locked(&self) -> bool {
        self.lock.as_ref().is_some_and(as_flag)
    }

    pub fn lock_index(&self) -> Option<usize> {
        self.lock_index.as_ref().and_then(as_index)
    }

    /// Enumeration reference; empty strings mean "none".
    pub fn data_id(&self) -> Option<usize> {
        self.data_id.as_ref().and_then(as_index)
    }
}

// ── rmParamsEnums ────────────────────────────────────────────────────

/// One element of the `rmParamsEnums` array.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RawEnum {
    pub values: Vec<Value>,
    pub first: Option<Value>,
}

impl RawEnum {
    /// Option labels in device order; non-string entries are stringified.
    pub fn labels(&self) -> Vec<String> {
        self.values
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect()
    }

    /// Device value of the first option.
    pub fn first(&self) -> i64 {
        self.first.as_ref().and_then(as_i64).unwrap_or(0)
    }
}

// ── sysParams ────────────────────────────────────────────────────────

/// Controller identity from `/econet/sysParams`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SysParams {
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(rename = "controllerID", default)]
    pub controller_id: Option<String>,
    #[serde(rename = "softVer", default)]
    pub soft_ver: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ── Tolerant scalar parsing ──────────────────────────────────────────

/// Booleans, non-zero numbers and `"true"`/`"1"` strings count as set.
pub fn as_flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1"),
        _ => false,
    }
}

/// Integers, integral floats and numeric strings.
pub fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral_f64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
fn integral_f64(f: f64) -> Option<i64> {
    (f.fract() == 0.0 && f.abs() < 9.0e15).then_some(f as i64)
}

/// A non-negative `as_i64`, usable as an array position.
pub fn as_index(value: &Value) -> Option<usize> {
    as_i64(value).and_then(|i| usize::try_from(i).ok())
}

/// Finite numbers and numeric strings.
pub fn as_finite_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|f| f.is_finite())
}

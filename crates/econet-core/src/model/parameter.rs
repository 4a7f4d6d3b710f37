// ── Normalized parameter ──
//
// One record per metadata position, joined from every remote-menu
// endpoint. Rebuilt from scratch each poll cycle.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A device value: numeric for almost everything, text for the odd
/// firmware that reports strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Number(f64),
    Text(String),
}

impl ParamValue {
    /// Convert a raw JSON scalar. Arrays, objects and null carry no value.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_f64().map(Self::Number),
            Value::String(s) => Some(Self::Text(s.clone())),
            Value::Bool(b) => Some(Self::Number(if *b { 1.0 } else { 0.0 })),
            _ => None,
        }
    }

    /// Numeric view, parsing numeric text.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
        .filter(|n: &f64| n.is_finite())
    }

    /// Integral numeric view, used for enumeration lookups.
    #[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
    pub fn as_i64(&self) -> Option<i64> {
        self.as_f64()
            .filter(|n| n.fract() == 0.0 && n.abs() < 9.0e15)
            .map(|n| n as i64)
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) if n.fract() == 0.0 => write!(f, "{n:.0}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for ParamValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for ParamValue {
    #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

/// Resolved option list for an enumerated parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enumeration {
    /// Position in `rmParamsEnums`.
    pub id: usize,
    /// Option labels in device order.
    pub options: Vec<String>,
    /// Device value of `options[0]`.
    pub first: i64,
}

impl Enumeration {
    /// Label for a device value, if it falls inside the option list.
    pub fn label_for(&self, value: &ParamValue) -> Option<&str> {
        let offset = value.as_i64()?.checked_sub(self.first)?;
        let idx = usize::try_from(offset).ok()?;
        self.options.get(idx).map(String::as_str)
    }

    /// Device value for the option at `idx`.
    pub fn device_value(&self, idx: usize) -> i64 {
        i64::try_from(idx).map_or(self.first, |i| self.first.saturating_add(i))
    }

    /// Device value for an option label (exact match).
    pub fn value_of(&self, label: &str) -> Option<i64> {
        self.options
            .iter()
            .position(|o| o == label)
            .map(|idx| self.device_value(idx))
    }
}

/// Menu category a parameter sits under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Position in `rmCatsNames`.
    pub index: usize,
    pub name: Option<String>,
}

/// The merged view of one device parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedParameter {
    /// Metadata position as a string; stable for the lifetime of a firmware.
    pub key: String,
    /// Structure parameter number, the handle writes go through.
    pub number: Option<u32>,
    pub name: Option<String>,
    pub description: Option<String>,
    /// Host translation key derived from the name.
    pub translation_key: Option<String>,
    pub value: Option<ParamValue>,
    pub editable: bool,
    pub min: Option<ParamValue>,
    pub max: Option<ParamValue>,
    /// Unit symbol, e.g. `°C` or `%`.
    pub unit: Option<String>,
    pub enumeration: Option<Enumeration>,
    /// Enumeration label matching the current value.
    pub current_option: Option<String>,
    pub category: Option<Category>,
    /// 0 = user menu, 1-4 = service password levels.
    pub pass_index: u8,
    pub locked: bool,
    pub lock_reason: Option<String>,
}

impl NormalizedParameter {
    /// A record with only the key set, everything else absent.
    pub fn unbound(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            number: None,
            name: None,
            description: None,
            translation_key: None,
            value: None,
            editable: false,
            min: None,
            max: None,
            unit: None,
            enumeration: None,
            current_option: None,
            category: None,
            pass_index: 0,
            locked: false,
            lock_reason: None,
        }
    }

    /// Both bounds as finite numbers, in device order.
    pub fn numeric_bounds(&self) -> Option<(f64, f64)> {
        let min = self.min.as_ref()?;
        let max = self.max.as_ref()?;
        match (min, max) {
            (ParamValue::Number(lo), ParamValue::Number(hi)) if lo.is_finite() && hi.is_finite() => {
                Some((*lo, *hi))
            }
            _ => None,
        }
    }

    pub fn category_name(&self) -> Option<&str> {
        self.category.as_ref()?.name.as_deref()
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn modes() -> Enumeration {
        Enumeration {
            id: 3,
            options: vec!["Manual".into(), "Auto".into(), "Schedule".into()],
            first: 1,
        }
    }

    #[test]
    fn enumeration_labels_are_offset_by_first() {
        let e = modes();
        assert_eq!(e.label_for(&ParamValue::Number(1.0)), Some("Manual"));
        assert_eq!(e.label_for(&ParamValue::Number(3.0)), Some("Schedule"));
        assert_eq!(e.label_for(&ParamValue::Number(0.0)), None);
        assert_eq!(e.label_for(&ParamValue::Number(4.0)), None);
        assert_eq!(e.value_of("Auto"), Some(2));
    }

    #[test]
    fn values_from_json() {
        assert_eq!(ParamValue::from_json(&json!(45)), Some(ParamValue::Number(45.0)));
        assert_eq!(ParamValue::from_json(&json!("x")), Some(ParamValue::Text("x".into())));
        assert_eq!(ParamValue::from_json(&json!(null)), None);
        assert_eq!(ParamValue::Text(" 12 ".into()).as_i64(), Some(12));
    }

    #[test]
    fn display_drops_integral_fraction() {
        assert_eq!(ParamValue::Number(2.0).to_string(), "2");
        assert_eq!(ParamValue::Number(2.5).to_string(), "2.5");
    }

    #[test]
    fn numeric_bounds_need_two_numbers() {
        let mut p = NormalizedParameter::unbound("7");
        p.min = Some(ParamValue::Number(20.0));
        assert_eq!(p.numeric_bounds(), None);
        p.max = Some(ParamValue::Text("hot".into()));
        assert_eq!(p.numeric_bounds(), None);
        p.max = Some(ParamValue::Number(80.0));
        assert_eq!(p.numeric_bounds(), Some((20.0, 80.0)));
    }
}

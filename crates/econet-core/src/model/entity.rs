// ── Entity-facing types ──
//
// What the classifier decides and what the host registry sees: the
// per-kind control payload, one-time registrations, and state pushes.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::parameter::{NormalizedParameter, ParamValue};

/// Host entity platform a parameter is exposed as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Number,
    Switch,
    Select,
    ReadOnlySensor,
}

/// Why a parameter ended up read-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SensorReason {
    /// Category is an information-only menu.
    InformationCategory,
    NotEditable,
    /// Editable but locked by the controller this cycle.
    Locked,
    /// Editable with nothing to build a control from.
    Unclassifiable,
}

/// Kind-specific payload chosen by the classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Control {
    Number {
        min: f64,
        max: f64,
        unit: String,
        step: f64,
    },
    Switch {
        /// Device value meaning "off".
        off_value: i64,
        /// Device value meaning "on".
        on_value: i64,
    },
    Select {
        options: Vec<String>,
        first: i64,
    },
    ReadOnlySensor {
        unit: Option<String>,
        /// Option labels, so the host can render enumerated sensors.
        options: Option<Vec<String>>,
        reason: SensorReason,
    },
}

impl Control {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Number { .. } => EntityKind::Number,
            Self::Switch { .. } => EntityKind::Switch,
            Self::Select { .. } => EntityKind::Select,
            Self::ReadOnlySensor { .. } => EntityKind::ReadOnlySensor,
        }
    }
}

/// A parameter after classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedParameter {
    pub param: NormalizedParameter,
    pub control: Control,
}

impl ClassifiedParameter {
    pub fn key(&self) -> &str {
        &self.param.key
    }

    pub fn kind(&self) -> EntityKind {
        self.control.kind()
    }

    /// Switch state derived from the current value.
    pub fn is_on(&self) -> Option<bool> {
        let Control::Switch { on_value, .. } = self.control else {
            return None;
        };
        Some(self.param.value.as_ref()?.as_i64()? == on_value)
    }
}

/// Host device an entity is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeviceGroup {
    /// The main controller device.
    Controller,
    /// Mixer circuit 1-4.
    Mixer { number: u8 },
    /// Add-on module such as the lambda sensor or DHW.
    Module { name: String },
    /// Fallback: the menu category.
    Category { index: usize, name: Option<String> },
}

/// Created once per key and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRegistration {
    pub key: String,
    pub kind: EntityKind,
    pub group: DeviceGroup,
    /// `{device uid}-{key}`
    pub unique_id: String,
    /// Display name, suffixed when several parameters share one.
    pub name: Option<String>,
    pub translation_key: Option<String>,
    /// Service-level parameters start disabled in the host.
    pub enabled_by_default: bool,
}

/// State pushed to the host for a registered entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityUpdate {
    pub value: Option<ParamValue>,
    pub current_option: Option<String>,
    pub locked: bool,
    pub lock_reason: Option<String>,
    pub available: bool,
}

/// A registered key whose classification changed. The registration keeps
/// its original kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationAnomaly {
    pub key: String,
    pub registered: EntityKind,
    pub observed: EntityKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_follows_control() {
        let c = Control::Select {
            options: vec!["a".into(), "b".into(), "c".into()],
            first: 0,
        };
        assert_eq!(c.kind(), EntityKind::Select);
        assert_eq!(EntityKind::ReadOnlySensor.to_string(), "read_only_sensor");
    }

    #[test]
    fn switch_state_uses_on_value() {
        let mut param = NormalizedParameter::unbound("3");
        param.value = Some(ParamValue::Number(1.0));
        let p = ClassifiedParameter {
            param,
            control: Control::Switch {
                off_value: 0,
                on_value: 1,
            },
        };
        assert_eq!(p.is_on(), Some(true));
    }
}

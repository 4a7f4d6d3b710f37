// ── Classifier ──
//
// Maps a validated record to exactly one entity kind. Rules are tried
// in order and the first match wins; the information-category override
// sits in front of all of them.

use super::lexicon::binary_order;
use crate::config::PipelineOptions;
use crate::model::{ClassifiedParameter, Control, NormalizedParameter, SensorReason};

/// Category labels whose parameters are display-only.
const INFORMATION_CATEGORIES: &[&str] = &["information", "informacje"];

#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    Entity(ClassifiedParameter),
    /// Locked and hidden for this cycle.
    Suppressed,
}

pub fn is_information_category(name: &str) -> bool {
    let name = name.trim().to_lowercase();
    INFORMATION_CATEGORIES.contains(&name.as_str())
}

pub fn classify(param: NormalizedParameter, options: &PipelineOptions) -> Classification {
    let control = if param.category_name().is_some_and(is_information_category) {
        sensor(&param, SensorReason::InformationCategory)
    } else if !param.editable {
        sensor(&param, SensorReason::NotEditable)
    } else if param.locked {
        if !options.show_locked_as_sensors {
            return Classification::Suppressed;
        }
        sensor(&param, SensorReason::Locked)
    } else {
        editable_control(&param)
    };

    Classification::Entity(ClassifiedParameter { param, control })
}

/// Enumerations outrank the unit: a parameter with both options and a
/// unit is a choice, not a number.
fn editable_control(param: &NormalizedParameter) -> Control {
    if let Some(e) = param.enumeration.as_ref().filter(|e| e.options.len() >= 2) {
        if let Some(order) = binary_order(&e.options) {
            return Control::Switch {
                off_value: e.device_value(order.off_index),
                on_value: e.device_value(order.on_index),
            };
        }
        return Control::Select {
            options: e.options.clone(),
            first: e.first,
        };
    }

    if let (Some(unit), Some((min, max))) = (&param.unit, param.numeric_bounds()) {
        if min < max {
            return Control::Number {
                min,
                max,
                unit: unit.clone(),
                step: step_for(min, max),
            };
        }
    }

    sensor(param, SensorReason::Unclassifiable)
}

fn step_for(min: f64, max: f64) -> f64 {
    if min.fract() == 0.0 && max.fract() == 0.0 {
        1.0
    } else {
        0.1
    }
}

fn sensor(param: &NormalizedParameter, reason: SensorReason) -> Control {
    Control::ReadOnlySensor {
        unit: param.unit.clone(),
        options: param.enumeration.as_ref().map(|e| e.options.clone()),
        reason,
    }
}

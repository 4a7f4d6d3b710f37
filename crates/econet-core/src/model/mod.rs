// ── Domain model ──
//
// Merged parameters and the entity-facing types derived from them.

pub mod entity;
pub mod parameter;

pub use entity::{
    ClassificationAnomaly, ClassifiedParameter, Control, DeviceGroup, EntityKind,
    EntityRegistration, EntityUpdate, SensorReason,
};
pub use parameter::{Category, Enumeration, NormalizedParameter, ParamValue};

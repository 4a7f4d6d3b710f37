//! Parameter pipeline between `econet-api` and a home-automation host.
//!
//! This crate owns the merge, validation and classification logic that
//! turns an ecoNET-300 controller's parallel remote-menu arrays into
//! typed entities:
//!
//! - **[`Coordinator`]**: lifecycle facade. [`connect()`](Coordinator::connect)
//!   discovers the device uid, runs the first cycle, then spawns the poll
//!   task. Writes go through [`set_value()`](Coordinator::set_value),
//!   [`set_switch()`](Coordinator::set_switch) and
//!   [`select_option()`](Coordinator::select_option), which refuse locked
//!   keys before any request is made.
//!
//! - **[`Pipeline`]**: one cycle over cached endpoint snapshots. Structure
//!   indexing, merge, validation, classification, lock refresh and entity
//!   sync, in that order.
//!
//! - **[`EndpointCache`] / [`ParameterStore`]**: last-good raw payloads on
//!   the way in, `DashMap` + `watch` snapshots of classified parameters on
//!   the way out.
//!
//! - **[`EntityHost`]**: the seam to the host's entity registry.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod host;
pub mod model;
pub mod pipeline;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{CoordinatorConfig, DeviceConfig, PipelineOptions};
pub use coordinator::{ConnectionState, Coordinator, DeviceInfo, Transport};
pub use error::CoreError;
pub use host::EntityHost;
pub use pipeline::{CycleReport, LockTracker, Pipeline, Rejection, RejectionReason};
pub use store::{EndpointCache, ParameterSnapshot, ParameterStore, RawEndpointSnapshot};

pub use model::{
    Category, ClassificationAnomaly, ClassifiedParameter, Control, DeviceGroup, EntityKind,
    EntityRegistration, EntityUpdate, Enumeration, NormalizedParameter, ParamValue, SensorReason,
};

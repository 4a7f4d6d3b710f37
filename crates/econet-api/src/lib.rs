// econet-api: Async Rust client for the ecoNET-300 remote menu HTTP API

pub mod client;
pub mod endpoint;
pub mod error;
pub mod models;
pub mod transport;

pub use client::{BasicCredentials, EconetClient};
pub use endpoint::{Endpoint, ServiceQuery};
pub use error::Error;
pub use models::{Envelope, RawEnum, RawParamData, RawStructureEntry, SysParams};
pub use transport::TransportConfig;

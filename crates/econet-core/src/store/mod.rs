// ── Storage ──
//
// Raw endpoint snapshots on the write side, classified parameters on
// the read side.

pub mod endpoint_cache;
pub mod parameter_store;

pub use endpoint_cache::{EndpointCache, RawEndpointSnapshot};
pub use parameter_store::{ParameterSnapshot, ParameterStore};

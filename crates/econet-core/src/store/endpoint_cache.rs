// ── Raw endpoint cache ──
//
// Last successfully fetched payload for each remote-menu endpoint.
// Snapshots are replaced wholesale on success. A failed fetch keeps
// the previous snapshot and flags it stale so the cycle can run
// degraded instead of dropping the endpoint.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use econet_api::{Endpoint, Envelope};

/// One endpoint's most recent payload.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEndpointSnapshot {
    pub endpoint: Endpoint,
    pub fetched_at: DateTime<Utc>,
    /// Opaque `data` member: an array or a position-keyed mapping.
    pub payload: Value,
    /// Device-side version token from the response envelope.
    pub version: Option<String>,
    /// Set when the latest fetch failed and this payload is older.
    pub stale: bool,
}

#[derive(Debug, Default)]
pub struct EndpointCache {
    snapshots: HashMap<Endpoint, RawEndpointSnapshot>,
}

impl EndpointCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the endpoint's snapshot with a fresh payload.
    pub fn record_success(&mut self, endpoint: Endpoint, envelope: Envelope) {
        self.record_success_at(endpoint, envelope, Utc::now());
    }

    pub(crate) fn record_success_at(
        &mut self,
        endpoint: Endpoint,
        envelope: Envelope,
        fetched_at: DateTime<Utc>,
    ) {
        if let Some(prev) = self.snapshots.get(&endpoint) {
            if prev.version != envelope.version {
                debug!(
                    %endpoint,
                    old = ?prev.version,
                    new = ?envelope.version,
                    "endpoint version changed"
                );
            }
        }
        self.snapshots.insert(
            endpoint,
            RawEndpointSnapshot {
                endpoint,
                fetched_at,
                payload: envelope.data,
                version: envelope.version,
                stale: false,
            },
        );
    }

    /// Keep the previous snapshot (if any) and mark it stale.
    pub fn record_failure(&mut self, endpoint: Endpoint, error: &dyn std::fmt::Display) {
        match self.snapshots.get_mut(&endpoint) {
            Some(snap) => {
                snap.stale = true;
                warn!(%endpoint, %error, fetched_at = %snap.fetched_at, "fetch failed, using stale snapshot");
            }
            None => warn!(%endpoint, %error, "fetch failed, no snapshot to fall back on"),
        }
    }

    pub fn mark_all_stale(&mut self) {
        for snap in self.snapshots.values_mut() {
            snap.stale = true;
        }
    }

    pub fn get(&self, endpoint: Endpoint) -> Option<&RawEndpointSnapshot> {
        self.snapshots.get(&endpoint)
    }

    pub fn payload(&self, endpoint: Endpoint) -> Option<&Value> {
        self.get(endpoint).map(|s| &s.payload)
    }

    pub fn version(&self, endpoint: Endpoint) -> Option<&str> {
        self.get(endpoint)?.version.as_deref()
    }

    /// Endpoints currently serving stale or no data.
    pub fn degraded_endpoints(&self) -> Vec<Endpoint> {
        Endpoint::all()
            .filter(|e| self.get(*e).is_none_or(|s| s.stale))
            .collect()
    }
}

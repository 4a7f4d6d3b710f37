// ── Parameter pipeline ──
//
// One poll cycle's worth of work on cached snapshots:
// index structure → merge → validate → classify → lock refresh → sync.
// Runs single-threaded under the coordinator's cycle lock.

pub mod classify;
pub mod lexicon;
pub mod lock;
pub mod merge;
pub mod naming;
pub mod structure;
pub mod sync;
pub mod validate;

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use econet_api::Endpoint;

use crate::config::PipelineOptions;
use crate::host::EntityHost;
use crate::model::ClassifiedParameter;
use crate::store::EndpointCache;

pub use classify::{Classification, classify};
pub use lock::{LockState, LockTracker};
pub use merge::{LengthMismatch, MergeSources, check_lengths, merge};
pub use structure::{PositionMap, index_structure};
pub use sync::{EntitySync, SyncReport};
pub use validate::{Rejection, RejectionReason, validate};

/// Elements of an array payload, or of a mapping keyed by position.
/// Gaps in a mapping come back as `None`. Mapping keys at or past the
/// mapping's size cannot be positions and are dropped.
pub(crate) fn payload_items(payload: &Value) -> Vec<Option<&Value>> {
    match payload {
        Value::Array(items) => items.iter().map(Some).collect(),
        Value::Object(map) => {
            let mut items = vec![None; map.len()];
            for (k, v) in map {
                let Ok(i) = k.trim().parse::<usize>() else {
                    continue;
                };
                match items.get_mut(i) {
                    Some(slot) => *slot = Some(v),
                    None => warn!(key = %k, size = map.len(), "dropping out-of-range payload key"),
                }
            }
            let len = items.iter().rposition(Option::is_some).map_or(0, |i| i + 1);
            items.truncate(len);
            items
        }
        _ => Vec::new(),
    }
}

/// Everything one cycle produced.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    /// Records produced by the merge.
    pub merged: usize,
    pub classified: Vec<ClassifiedParameter>,
    pub rejected: Vec<Rejection>,
    /// Keys hidden this cycle because they are locked.
    pub suppressed: Vec<String>,
    pub mismatches: Vec<LengthMismatch>,
    /// Endpoints that were stale or missing.
    pub degraded: Vec<Endpoint>,
    pub sync: SyncReport,
}

impl CycleReport {
    /// Every merged record is classified, rejected or suppressed.
    pub fn is_balanced(&self) -> bool {
        self.classified.len() + self.rejected.len() + self.suppressed.len() == self.merged
    }
}

pub struct Pipeline {
    options: PipelineOptions,
    sync: EntitySync,
    locks: Arc<LockTracker>,
}

impl Pipeline {
    pub fn new(uid: impl Into<String>, options: PipelineOptions, locks: Arc<LockTracker>) -> Self {
        Self {
            options,
            sync: EntitySync::new(uid),
            locks,
        }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn entities(&self) -> &EntitySync {
        &self.sync
    }

    pub fn set_uid(&mut self, uid: impl Into<String>) {
        self.sync.set_uid(uid);
    }

    /// Run one cycle over the cached snapshots and push the result to the host.
    pub fn run(&mut self, cache: &EndpointCache, host: &mut dyn EntityHost) -> CycleReport {
        let sources = MergeSources::from_cache(cache);
        let positions = index_structure(cache.payload(Endpoint::Structure));
        let mismatches = check_lengths(cache, &sources, &positions);

        let records = merge(&sources, &positions, &self.options);
        self.locks.refresh(records.values());

        let mut report = CycleReport {
            merged: records.len(),
            mismatches,
            degraded: cache.degraded_endpoints(),
            ..CycleReport::default()
        };

        for record in records.into_values() {
            if let Err(rejection) = validate(&record) {
                warn!(
                    key = %rejection.key,
                    reason = %rejection.reason,
                    "rejected parameter record"
                );
                report.rejected.push(rejection);
                continue;
            }
            let key = record.key.clone();
            match classify(record, &self.options) {
                Classification::Entity(parameter) => report.classified.push(parameter),
                Classification::Suppressed => report.suppressed.push(key),
            }
        }

        report.sync = self.sync.sync(&report.classified, &self.locks, host);

        info!(
            merged = report.merged,
            classified = report.classified.len(),
            rejected = report.rejected.len(),
            suppressed = report.suppressed.len(),
            created = report.sync.created.len(),
            updated = report.sync.updated.len(),
            unavailable = report.sync.unavailable.len(),
            degraded = report.degraded.len(),
            "poll cycle complete"
        );
        report
    }

    /// Transport is down: every registered entity becomes unavailable.
    pub fn mark_unreachable(&mut self, host: &mut dyn EntityHost) -> Vec<String> {
        self.sync.mark_all_unavailable(host)
    }
}

// ── Published parameter store ──
//
// Concurrent read side of the pipeline: the latest classified
// parameters, looked up by key from any task and broadcast as an
// ordered snapshot through a `watch` channel. Only the poll cycle writes.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::watch;

use crate::model::ClassifiedParameter;

pub type ParameterSnapshot = Arc<Vec<Arc<ClassifiedParameter>>>;

pub struct ParameterStore {
    by_key: DashMap<String, Arc<ClassifiedParameter>>,
    /// Bumped once per published cycle.
    version: watch::Sender<u64>,
    /// Parameters in metadata order.
    snapshot: watch::Sender<ParameterSnapshot>,
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ParameterStore {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0u64);
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            by_key: DashMap::new(),
            version,
            snapshot,
        }
    }

    /// Publish one cycle's output: upsert everything incoming, then prune
    /// keys that are no longer classified. Avoids an empty window.
    pub fn publish(&self, items: Vec<ClassifiedParameter>) {
        let incoming: HashSet<String> = items.iter().map(|p| p.key().to_owned()).collect();
        for item in items {
            self.by_key.insert(item.key().to_owned(), Arc::new(item));
        }
        self.by_key.retain(|key, _| incoming.contains(key));

        self.rebuild_snapshot();
        self.version.send_modify(|v| *v += 1);
    }

    pub fn get(&self, key: &str) -> Option<Arc<ClassifiedParameter>> {
        self.by_key.get(key).map(|r| Arc::clone(r.value()))
    }

    /// Current snapshot (cheap `Arc` clone).
    pub fn snapshot(&self) -> ParameterSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ParameterSnapshot> {
        self.snapshot.subscribe()
    }

    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    fn rebuild_snapshot(&self) {
        let mut values: Vec<Arc<ClassifiedParameter>> =
            self.by_key.iter().map(|r| Arc::clone(r.value())).collect();
        values.sort_by_key(|p| position(p.key()));
        // `send_modify` updates even with zero receivers.
        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
    }
}

/// Numeric order for position keys; anything else sorts last.
fn position(key: &str) -> (usize, String) {
    (key.parse().unwrap_or(usize::MAX), key.to_owned())
}

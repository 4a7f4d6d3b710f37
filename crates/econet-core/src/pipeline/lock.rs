// ── Lock / availability tracker ──
//
// Per-key lock state, refreshed from every cycle's merged records.
// Shared with the write path, which must refuse locked keys before
// any request leaves the process.

use dashmap::DashMap;
use tracing::warn;

use super::merge::GENERIC_LOCK_REASON;
use crate::error::CoreError;
use crate::model::NormalizedParameter;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LockState {
    pub locked: bool,
    pub reason: Option<String>,
}

#[derive(Debug, Default)]
pub struct LockTracker {
    states: DashMap<String, LockState>,
}

impl LockTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all states with this cycle's records.
    pub fn refresh<'a>(&self, records: impl IntoIterator<Item = &'a NormalizedParameter>) {
        let mut seen = std::collections::HashSet::new();
        for record in records {
            seen.insert(record.key.clone());
            self.states.insert(
                record.key.clone(),
                LockState {
                    locked: record.locked,
                    reason: record.lock_reason.clone(),
                },
            );
        }
        self.states.retain(|key, _| seen.contains(key));
    }

    pub fn state(&self, key: &str) -> Option<LockState> {
        self.states.get(key).map(|s| s.value().clone())
    }

    pub fn is_locked(&self, key: &str) -> bool {
        self.states.get(key).is_some_and(|s| s.locked)
    }

    /// Available means the transport is up and the key is not locked.
    pub fn is_available(&self, key: &str, reachable: bool) -> bool {
        reachable && !self.is_locked(key)
    }

    /// Refuse writes to locked keys.
    pub fn check_writable(&self, key: &str) -> Result<(), CoreError> {
        match self.state(key) {
            Some(LockState { locked: true, reason }) => {
                let reason = reason.unwrap_or_else(|| GENERIC_LOCK_REASON.to_owned());
                warn!(key, %reason, "refusing write to locked parameter");
                Err(CoreError::LockedWrite {
                    key: key.to_owned(),
                    reason,
                })
            }
            _ => Ok(()),
        }
    }
}

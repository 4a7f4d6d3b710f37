// ── Entity diff / sync ──
//
// Turns each cycle's classified parameters into host callbacks.
// Registrations are append-only: a key is registered once, keeps its
// first kind forever, and is only ever marked unavailable, never removed.
// State is pushed only when it differs from what the host last saw.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use tracing::{debug, warn};

use super::lock::LockTracker;
use super::naming::{device_group, duplicate_display_name, duplicate_translation_key};
use crate::host::EntityHost;
use crate::model::{ClassificationAnomaly, ClassifiedParameter, EntityRegistration, EntityUpdate};

/// What one sync pass did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub unavailable: Vec<String>,
    pub anomalies: Vec<ClassificationAnomaly>,
}

pub struct EntitySync {
    uid: String,
    registrations: IndexMap<String, EntityRegistration>,
    /// Last state handed to the host per key.
    published: HashMap<String, EntityUpdate>,
    /// Keys currently classified differently from their registration.
    anomalous: HashSet<String>,
}

impl EntitySync {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            registrations: IndexMap::new(),
            published: HashMap::new(),
            anomalous: HashSet::new(),
        }
    }

    /// Device uid used for new unique ids. Existing registrations keep
    /// theirs.
    pub fn set_uid(&mut self, uid: impl Into<String>) {
        self.uid = uid.into();
    }

    pub fn registration(&self, key: &str) -> Option<&EntityRegistration> {
        self.registrations.get(key)
    }

    pub fn registrations(&self) -> impl Iterator<Item = &EntityRegistration> {
        self.registrations.values()
    }

    pub fn sync(
        &mut self,
        classified: &[ClassifiedParameter],
        locks: &LockTracker,
        host: &mut dyn EntityHost,
    ) -> SyncReport {
        let mut report = SyncReport::default();
        let mut present = HashSet::with_capacity(classified.len());
        let sequences = duplicate_sequences(classified);

        for parameter in classified {
            let key = parameter.key();
            present.insert(key.to_owned());
            let update = EntityUpdate {
                value: parameter.param.value.clone(),
                current_option: parameter.param.current_option.clone(),
                locked: parameter.param.locked,
                lock_reason: parameter.param.lock_reason.clone(),
                available: locks.is_available(key, true),
            };

            let Some(registration) = self.registrations.get(key) else {
                let registration = self.register(parameter, sequences.get(key).copied());
                debug!(key, kind = %registration.kind, "registering entity");
                host.on_create(&registration, parameter);
                self.registrations.insert(key.to_owned(), registration);
                self.published.insert(key.to_owned(), update);
                report.created.push(key.to_owned());
                continue;
            };

            let mut force = false;
            if registration.kind == parameter.kind() {
                self.anomalous.remove(key);
            } else {
                let anomaly = ClassificationAnomaly {
                    key: key.to_owned(),
                    registered: registration.kind,
                    observed: parameter.kind(),
                };
                // Push once when the anomaly first shows up.
                force = self.anomalous.insert(key.to_owned());
                warn!(
                    key,
                    registered = %anomaly.registered,
                    observed = %anomaly.observed,
                    "classification changed for registered entity, keeping original kind"
                );
                report.anomalies.push(anomaly);
            }

            if force || self.published.get(key) != Some(&update) {
                host.on_update(key, &update);
                self.published.insert(key.to_owned(), update);
                report.updated.push(key.to_owned());
            }
        }

        let vanished: Vec<String> = self
            .registrations
            .keys()
            .filter(|key| !present.contains(*key))
            .cloned()
            .collect();
        for key in vanished {
            if self.mark_unavailable(&key, host) {
                report.unavailable.push(key);
            }
        }

        report
    }

    /// Mark every registered entity unavailable (transport down).
    pub fn mark_all_unavailable(&mut self, host: &mut dyn EntityHost) -> Vec<String> {
        let keys: Vec<String> = self.registrations.keys().cloned().collect();
        let mut marked = Vec::new();
        for key in keys {
            if self.mark_unavailable(&key, host) {
                marked.push(key);
            }
        }
        marked
    }

    /// Returns `true` if the host was told; already-unavailable keys are
    /// skipped.
    fn mark_unavailable(&mut self, key: &str, host: &mut dyn EntityHost) -> bool {
        match self.published.get_mut(key) {
            Some(state) if !state.available => false,
            Some(state) => {
                state.available = false;
                host.on_unavailable(key);
                true
            }
            None => {
                host.on_unavailable(key);
                true
            }
        }
    }

    fn register(&self, parameter: &ClassifiedParameter, sequence: Option<usize>) -> EntityRegistration {
        let param = &parameter.param;
        let description = param.description.as_deref();
        let (name, translation_key) = match sequence {
            Some(n) => (
                param
                    .name
                    .as_deref()
                    .map(|name| duplicate_display_name(name, n, description)),
                param
                    .translation_key
                    .as_deref()
                    .map(|key| duplicate_translation_key(key, n, description)),
            ),
            None => (param.name.clone(), param.translation_key.clone()),
        };
        EntityRegistration {
            key: param.key.clone(),
            kind: parameter.kind(),
            group: device_group(param, sequence),
            unique_id: format!("{}-{}", self.uid, param.key),
            name,
            translation_key,
            enabled_by_default: param.pass_index == 0,
        }
    }
}

/// 1-based position of each key among parameters sharing a translation
/// key. Keys with a unique translation key are absent.
fn duplicate_sequences(classified: &[ClassifiedParameter]) -> HashMap<&str, usize> {
    let mut groups: IndexMap<&str, Vec<&str>> = IndexMap::new();
    for parameter in classified {
        if let Some(base) = parameter.param.translation_key.as_deref() {
            groups.entry(base).or_default().push(parameter.key());
        }
    }
    groups
        .into_iter()
        .filter(|(_, keys)| keys.len() > 1)
        .flat_map(|(base, keys)| {
            debug!(base, count = keys.len(), "parameter name repeats");
            keys.into_iter().enumerate().map(|(i, key)| (key, i + 1))
        })
        .collect()
}

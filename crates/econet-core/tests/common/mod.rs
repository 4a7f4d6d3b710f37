// Shared fixtures for econet-core integration tests.
#![allow(dead_code, clippy::unwrap_used)]

use std::sync::{Arc, Mutex};

use serde_json::{Value, json};

use econet_api::{Endpoint, Envelope};
use econet_core::{
    ClassifiedParameter, EndpointCache, EntityHost, EntityRegistration, EntityUpdate,
};

// ── Recording host ──────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct Recorded {
    pub created: Vec<EntityRegistration>,
    pub updates: Vec<(String, EntityUpdate)>,
    pub unavailable: Vec<String>,
}

/// Host that records every callback; clones share one log.
#[derive(Debug, Clone, Default)]
pub struct RecordingHost(pub Arc<Mutex<Recorded>>);

impl RecordingHost {
    pub fn created_keys(&self) -> Vec<String> {
        self.0
            .lock()
            .unwrap()
            .created
            .iter()
            .map(|r| r.key.clone())
            .collect()
    }

    pub fn update_count(&self) -> usize {
        self.0.lock().unwrap().updates.len()
    }

    pub fn last_update(&self, key: &str) -> Option<EntityUpdate> {
        self.0
            .lock()
            .unwrap()
            .updates
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, u)| u.clone())
    }

    pub fn unavailable(&self) -> Vec<String> {
        self.0.lock().unwrap().unavailable.clone()
    }
}

impl EntityHost for RecordingHost {
    fn on_create(&mut self, registration: &EntityRegistration, _: &ClassifiedParameter) {
        self.0.lock().unwrap().created.push(registration.clone());
    }

    fn on_update(&mut self, key: &str, update: &EntityUpdate) {
        self.0
            .lock()
            .unwrap()
            .updates
            .push((key.to_owned(), update.clone()));
    }

    fn on_unavailable(&mut self, key: &str) {
        self.0.lock().unwrap().unavailable.push(key.to_owned());
    }
}

// ── Device fixture ──────────────────────────────────────────────────
//
// Position → parameter:
//   0  "100% output"       editable number, unit "%"        → Number
//   1  "Pump"              enum off/on via data_id 0         → Switch
//   2  "Operating mode"    enum Manual/Auto/Schedule, id 1   → Select
//   3  "Summer mode temp"  locked, reason index 1            → sensor or hidden
//   4  ""                  no name                           → rejected
//   5  "Flue temp"         read-only                         → sensor

pub fn device_payloads() -> Vec<(Endpoint, Value)> {
    vec![
        (
            Endpoint::ParamsData,
            json!([
                {"value": 60, "minv": 15, "maxv": 100, "edit": true, "unit": 5},
                {"value": 1, "edit": true, "unit": 31},
                {"value": 1, "edit": true, "unit": 31},
                {"value": 21, "minv": 10, "maxv": 30, "edit": true, "unit": 1},
                {"value": 3, "edit": false},
                {"value": 182.5, "edit": false, "unit": 1}
            ]),
        ),
        (
            Endpoint::ParamsNames,
            json!(["100% output", "Pump", "Operating mode", "Summer mode temp", "", "Flue temp"]),
        ),
        (
            Endpoint::ParamsDescs,
            json!(["Boiler output at full power", "", "", "", "", "Exhaust temperature"]),
        ),
        (
            Endpoint::ParamsEnums,
            json!([
                {"values": ["off", "on"], "first": 0},
                {"values": ["Manual", "Auto", "Schedule"], "first": 0}
            ]),
        ),
        (
            Endpoint::UnitsNames,
            json!(["", "°C", "s", "min", "h", "%"]),
        ),
        (Endpoint::CatsNames, json!(["Boiler settings"])),
        (
            Endpoint::LocksNames,
            json!(["", "Weather control enabled"]),
        ),
        (
            Endpoint::Structure,
            json!([
                {"type": 7, "index": 0},
                {"type": 1, "index": 100},
                {"type": 1, "index": 101, "data_id": 0},
                {"type": 1, "index": 102, "data_id": 1},
                {"type": 1, "index": 103, "lock": true, "lock_index": 1},
                {"type": 1, "index": 104},
                {"type": 1, "index": 105, "pass_index": 1}
            ]),
        ),
    ]
}

pub fn envelope(data: Value) -> Envelope {
    Envelope {
        version: Some("1".into()),
        data,
    }
}

pub fn cache_from(payloads: &[(Endpoint, Value)]) -> EndpointCache {
    let mut cache = EndpointCache::new();
    for (endpoint, data) in payloads {
        cache.record_success(*endpoint, envelope(data.clone()));
    }
    cache
}

/// Replace one endpoint's payload in a fixture.
pub fn with_payload(
    mut payloads: Vec<(Endpoint, Value)>,
    endpoint: Endpoint,
    data: Value,
) -> Vec<(Endpoint, Value)> {
    for (e, d) in &mut payloads {
        if *e == endpoint {
            *d = data.clone();
        }
    }
    payloads
}

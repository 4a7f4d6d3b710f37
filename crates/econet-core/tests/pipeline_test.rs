#![allow(clippy::unwrap_used)]
// End-to-end pipeline cycles over cached endpoint snapshots.

mod common;

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;

use econet_api::Endpoint;
use econet_core::{
    ClassifiedParameter, Control, CycleReport, DeviceGroup, EntityKind, LockTracker, ParamValue,
    Pipeline, PipelineOptions, RejectionReason, SensorReason,
};

use common::{RecordingHost, cache_from, device_payloads, with_payload};

// ── Helpers ─────────────────────────────────────────────────────────

fn pipeline(options: PipelineOptions) -> Pipeline {
    Pipeline::new("UID42", options, Arc::new(LockTracker::new()))
}

fn find<'a>(report: &'a CycleReport, key: &str) -> &'a ClassifiedParameter {
    report
        .classified
        .iter()
        .find(|c| c.key() == key)
        .unwrap_or_else(|| panic!("key {key} not classified"))
}

// ── Classification scenarios ────────────────────────────────────────

#[test]
fn editable_value_with_unit_and_range_becomes_number() {
    let mut host = RecordingHost::default();
    let report = pipeline(PipelineOptions::default()).run(&cache_from(&device_payloads()), &mut host);

    let output = find(&report, "0");
    assert_eq!(output.param.name.as_deref(), Some("100% output"));
    assert_eq!(output.param.unit.as_deref(), Some("%"));
    assert_eq!(output.param.number, Some(100));
    assert_eq!(
        output.control,
        Control::Number {
            min: 15.0,
            max: 100.0,
            unit: "%".into(),
            step: 1.0,
        }
    );
}

#[test]
fn off_on_enumeration_becomes_switch() {
    let mut host = RecordingHost::default();
    let report = pipeline(PipelineOptions::default()).run(&cache_from(&device_payloads()), &mut host);

    let pump = find(&report, "1");
    assert_eq!(
        pump.control,
        Control::Switch {
            off_value: 0,
            on_value: 1
        }
    );
    assert_eq!(pump.is_on(), Some(true));
    assert_eq!(pump.param.current_option.as_deref(), Some("on"));
}

#[test]
fn binary_detection_ignores_option_order() {
    let payloads = with_payload(
        device_payloads(),
        Endpoint::ParamsEnums,
        json!([
            {"values": ["On", "Off"], "first": 0},
            {"values": ["Manual", "Auto", "Schedule"], "first": 0}
        ]),
    );
    let mut host = RecordingHost::default();
    let report = pipeline(PipelineOptions::default()).run(&cache_from(&payloads), &mut host);

    assert_eq!(
        find(&report, "1").control,
        Control::Switch {
            off_value: 1,
            on_value: 0
        }
    );
}

#[test]
fn three_options_become_select() {
    let mut host = RecordingHost::default();
    let report = pipeline(PipelineOptions::default()).run(&cache_from(&device_payloads()), &mut host);

    let mode = find(&report, "2");
    assert_eq!(mode.kind(), EntityKind::Select);
    assert_eq!(mode.param.current_option.as_deref(), Some("Auto"));
}

#[test]
fn locked_parameter_is_a_sensor_with_reason() {
    let mut host = RecordingHost::default();
    let report = pipeline(PipelineOptions::default()).run(&cache_from(&device_payloads()), &mut host);

    let summer = find(&report, "3");
    assert!(summer.param.locked);
    assert_eq!(summer.param.lock_reason.as_deref(), Some("Weather control enabled"));
    assert!(matches!(
        summer.control,
        Control::ReadOnlySensor {
            reason: SensorReason::Locked,
            ..
        }
    ));
    assert!(report.suppressed.is_empty());
}

#[test]
fn locked_parameter_is_hidden_when_sensors_disabled() {
    let options = PipelineOptions {
        show_locked_as_sensors: false,
        ..PipelineOptions::default()
    };
    let mut host = RecordingHost::default();
    let report = pipeline(options).run(&cache_from(&device_payloads()), &mut host);

    assert!(report.classified.iter().all(|c| c.key() != "3"));
    assert_eq!(report.suppressed, vec!["3"]);
    assert!(!host.created_keys().contains(&"3".to_owned()));
}

#[test]
fn nameless_record_is_rejected_before_classification() {
    let mut host = RecordingHost::default();
    let report = pipeline(PipelineOptions::default()).run(&cache_from(&device_payloads()), &mut host);

    assert_eq!(report.rejected.len(), 1);
    assert_eq!(report.rejected[0].key, "4");
    assert_eq!(report.rejected[0].reason, RejectionReason::MissingKeyOrName);
    assert_eq!(
        report.rejected[0].reason.to_string(),
        "missing key or name"
    );
    assert!(!host.created_keys().contains(&"4".to_owned()));
}

#[test]
fn structure_enumeration_reference_is_ignored_for_unit_parameters() {
    let payloads = with_payload(
        device_payloads(),
        Endpoint::Structure,
        json!([
            {"type": 7, "index": 0},
            {"type": 1, "index": 100, "data_id": 0},
            {"type": 1, "index": 101, "data_id": 0},
            {"type": 1, "index": 102, "data_id": 1},
            {"type": 1, "index": 103, "lock": true, "lock_index": 1},
            {"type": 1, "index": 104},
            {"type": 1, "index": 105, "pass_index": 1}
        ]),
    );
    let mut host = RecordingHost::default();
    let report = pipeline(PipelineOptions::default()).run(&cache_from(&payloads), &mut host);

    let output = find(&report, "0");
    assert_eq!(output.param.enumeration, None);
    assert_eq!(output.kind(), EntityKind::Number);
    assert_eq!(output.param.unit.as_deref(), Some("%"));
}

#[test]
fn enumeration_is_inferred_without_structure_reference() {
    let payloads = with_payload(
        with_payload(
            device_payloads(),
            Endpoint::ParamsData,
            json!([
                {"value": 60, "minv": 15, "maxv": 100, "edit": true, "unit": 5},
                {"value": 1, "edit": true, "unit": 31},
                {"value": 1, "minv": 0, "maxv": 2, "edit": true, "unit": 31},
                {"value": 21, "minv": 10, "maxv": 30, "edit": true, "unit": 1},
                {"value": 3, "edit": false},
                {"value": 182.5, "edit": false, "unit": 1}
            ]),
        ),
        Endpoint::Structure,
        json!([
            {"type": 7, "index": 0},
            {"type": 1, "index": 100},
            {"type": 1, "index": 101},
            {"type": 1, "index": 102},
            {"type": 1, "index": 103, "lock": true, "lock_index": 1},
            {"type": 1, "index": 104},
            {"type": 1, "index": 105, "pass_index": 1}
        ]),
    );
    let mut host = RecordingHost::default();
    let report = pipeline(PipelineOptions::default()).run(&cache_from(&payloads), &mut host);

    let mode = find(&report, "2");
    assert_eq!(mode.kind(), EntityKind::Select);
    assert_eq!(mode.param.current_option.as_deref(), Some("Auto"));
    // Nothing in "Pump" matches a table well enough.
    assert_eq!(find(&report, "1").param.enumeration, None);
}

#[test]
fn mapping_payload_with_huge_keys_is_bounded() {
    let payloads = with_payload(
        device_payloads(),
        Endpoint::ParamsNames,
        json!({
            "0": "100% output",
            "1": "Pump",
            "2": "Operating mode",
            "3": "Summer mode temp",
            "5": "Flue temp",
            "18446744073709551615": "overflow",
            "4000000000": "far away"
        }),
    );
    let mut host = RecordingHost::default();
    let report = pipeline(PipelineOptions::default()).run(&cache_from(&payloads), &mut host);

    assert_eq!(report.merged, 6);
    assert!(report.is_balanced());
    assert_eq!(host.created_keys(), vec!["0", "1", "2", "3", "5"]);
    assert!(report.mismatches.is_empty());
}

// ── Cycle-level properties ──────────────────────────────────────────

#[test]
fn every_merged_record_is_accounted_for() {
    for show_locked in [true, false] {
        let options = PipelineOptions {
            show_locked_as_sensors: show_locked,
            ..PipelineOptions::default()
        };
        let mut host = RecordingHost::default();
        let report = pipeline(options).run(&cache_from(&device_payloads()), &mut host);
        assert_eq!(report.merged, 6);
        assert!(report.is_balanced(), "unbalanced report: {report:?}");
    }
}

#[test]
fn repeated_cycle_with_same_data_pushes_nothing() {
    let cache = cache_from(&device_payloads());
    let mut host = RecordingHost::default();
    let mut p = pipeline(PipelineOptions::default());

    let first = p.run(&cache, &mut host);
    assert_eq!(first.sync.created, vec!["0", "1", "2", "3", "5"]);

    let second = p.run(&cache, &mut host);
    assert!(second.sync.created.is_empty());
    assert!(second.sync.updated.is_empty());
    assert!(second.sync.unavailable.is_empty());
    assert_eq!(host.update_count(), 0);
}

#[test]
fn registrations_carry_uid_group_and_default_enablement() {
    let mut host = RecordingHost::default();
    pipeline(PipelineOptions::default()).run(&cache_from(&device_payloads()), &mut host);

    let created = host.0.lock().unwrap().created.clone();
    let flue = created.iter().find(|r| r.key == "5").unwrap();
    assert_eq!(flue.unique_id, "UID42-5");
    assert!(!flue.enabled_by_default, "service-level parameter");
    assert_eq!(
        flue.group,
        DeviceGroup::Category {
            index: 0,
            name: Some("Boiler settings".into())
        }
    );
    assert!(created.iter().find(|r| r.key == "0").unwrap().enabled_by_default);
}

#[test]
fn kind_change_keeps_registration_and_pushes_value() {
    let mut host = RecordingHost::default();
    let mut p = pipeline(PipelineOptions::default());
    p.run(&cache_from(&device_payloads()), &mut host);

    // Position 0 now reports the enumerated unit with a three-state range.
    let drifted = with_payload(
        device_payloads(),
        Endpoint::ParamsData,
        json!([
            {"value": 2, "minv": 0, "maxv": 2, "edit": true, "unit": 31},
            {"value": 1, "edit": true, "unit": 31},
            {"value": 1, "edit": true, "unit": 31},
            {"value": 21, "minv": 10, "maxv": 30, "edit": true, "unit": 1},
            {"value": 3, "edit": false},
            {"value": 182.5, "edit": false, "unit": 1}
        ]),
    );
    let report = p.run(&cache_from(&drifted), &mut host);

    assert_eq!(report.sync.anomalies.len(), 1);
    assert_eq!(report.sync.anomalies[0].registered, EntityKind::Number);
    assert_eq!(report.sync.anomalies[0].observed, EntityKind::Select);
    assert_eq!(
        p.entities().registration("0").map(|r| r.kind),
        Some(EntityKind::Number)
    );
    assert_eq!(
        host.last_update("0").and_then(|u| u.value),
        Some(ParamValue::Number(2.0))
    );
}

#[test]
fn disappearing_key_goes_unavailable_but_stays_registered() {
    let mut host = RecordingHost::default();
    let mut p = pipeline(PipelineOptions::default());
    p.run(&cache_from(&device_payloads()), &mut host);

    let trimmed = with_payload(
        device_payloads(),
        Endpoint::ParamsNames,
        json!(["100% output", "Pump", "", "Summer mode temp", "", "Flue temp"]),
    );
    let report = p.run(&cache_from(&trimmed), &mut host);

    assert_eq!(report.sync.unavailable, vec!["2"]);
    assert_eq!(host.unavailable(), vec!["2"]);
    assert!(p.entities().registration("2").is_some());
}

#[test]
fn structure_shortfall_leaves_tail_unbound() {
    let short = with_payload(
        device_payloads(),
        Endpoint::Structure,
        json!([
            {"type": 7, "index": 0},
            {"type": 1, "index": 100},
            {"type": 1, "index": 101},
            {"type": 1, "index": 102}
        ]),
    );
    let mut host = RecordingHost::default();
    let report = pipeline(PipelineOptions::default()).run(&cache_from(&short), &mut host);

    assert_eq!(find(&report, "2").param.number, Some(102));
    let tail = find(&report, "3");
    assert_eq!(tail.param.number, None);
    assert!(!tail.param.locked, "lock flags come from the structure only");
    assert!(
        report
            .mismatches
            .iter()
            .any(|m| m.endpoint == Endpoint::Structure)
    );
}

#[test]
fn information_category_forces_sensors() {
    let payloads = with_payload(device_payloads(), Endpoint::CatsNames, json!(["Information"]));
    let mut host = RecordingHost::default();
    let report = pipeline(PipelineOptions::default()).run(&cache_from(&payloads), &mut host);

    assert!(
        report
            .classified
            .iter()
            .all(|c| c.kind() == EntityKind::ReadOnlySensor)
    );
}

// ── Merge engine ──
//
// Joins the metadata array with names, descriptions, enumerations,
// units, categories and lock reasons into one record per metadata
// position. Every cross-reference is bounds-checked: an index outside
// its table means "absent", never an error.

use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, warn};

use econet_api::models::as_finite_f64;
use econet_api::{Endpoint, RawEnum, RawParamData};

use super::naming::translation_key;
use super::payload_items;
use super::structure::{ParameterBinding, PositionMap};
use crate::config::PipelineOptions;
use crate::model::{Category, Enumeration, NormalizedParameter, ParamValue};
use crate::store::EndpointCache;

/// Unit index the controller uses to mark enumerated parameters.
pub const ENUM_UNIT: usize = 31;

/// Description words that hint at a set of discrete states.
const STATE_WORDS: [&str; 12] = [
    "off",
    "on",
    "auto",
    "manual",
    "enabled",
    "disabled",
    "start",
    "stop",
    "open",
    "close",
    "connected",
    "disconnected",
];

/// Lowest score an inferred enumeration needs to be attached.
const MATCH_THRESHOLD: u32 = 3;

/// Lock reason used when the device reports no resolvable text.
pub const GENERIC_LOCK_REASON: &str = "Parameter locked";

/// Decoded view of every cached endpoint, position-aligned.
#[derive(Debug, Default)]
pub struct MergeSources {
    pub params: Vec<Option<RawParamData>>,
    pub names: Vec<Option<String>>,
    pub descs: Vec<Option<String>>,
    pub enums: Vec<Option<RawEnum>>,
    pub units: Vec<Option<String>>,
    pub cats: Vec<Option<String>>,
    pub locks: Vec<Option<String>>,
}

impl MergeSources {
    pub fn from_cache(cache: &EndpointCache) -> Self {
        Self {
            params: typed_items(cache.payload(Endpoint::ParamsData)),
            names: text_items(cache.payload(Endpoint::ParamsNames)),
            descs: text_items(cache.payload(Endpoint::ParamsDescs)),
            enums: typed_items(cache.payload(Endpoint::ParamsEnums)),
            units: text_items(cache.payload(Endpoint::UnitsNames)),
            cats: text_items(cache.payload(Endpoint::CatsNames)),
            locks: text_items(cache.payload(Endpoint::LocksNames)),
        }
    }
}

fn typed_items<T: serde::de::DeserializeOwned>(payload: Option<&Value>) -> Vec<Option<T>> {
    payload
        .map(payload_items)
        .unwrap_or_default()
        .into_iter()
        .map(|item| item.and_then(|v| serde_json::from_value(v.clone()).ok()))
        .collect()
}

fn text_items(payload: Option<&Value>) -> Vec<Option<String>> {
    payload
        .map(payload_items)
        .unwrap_or_default()
        .into_iter()
        .map(|item| match item {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_owned()),
            _ => None,
        })
        .collect()
}

/// Bounds-checked lookup in a position-aligned table.
fn lookup<T>(table: &[Option<T>], idx: Option<usize>) -> Option<&T> {
    table.get(idx?)?.as_ref()
}

// ── Length consistency ───────────────────────────────────────────────

/// A position-correlated array whose length disagrees with the metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthMismatch {
    pub endpoint: Endpoint,
    pub metadata_len: usize,
    pub actual_len: usize,
    pub metadata_version: Option<String>,
    pub endpoint_version: Option<String>,
}

/// Compare every position-correlated source against the metadata length
/// and log each disagreement with both version tokens.
pub fn check_lengths(
    cache: &EndpointCache,
    sources: &MergeSources,
    positions: &PositionMap,
) -> Vec<LengthMismatch> {
    let expected = sources.params.len();
    let metadata_version = cache.version(Endpoint::ParamsData).map(str::to_owned);
    let correlated = [
        (Endpoint::ParamsNames, sources.names.len()),
        (Endpoint::ParamsDescs, sources.descs.len()),
        (Endpoint::Structure, positions.len()),
    ];

    correlated
        .into_iter()
        .filter(|(endpoint, len)| *len != expected && cache.get(*endpoint).is_some())
        .map(|(endpoint, actual_len)| {
            let mismatch = LengthMismatch {
                endpoint,
                metadata_len: expected,
                actual_len,
                metadata_version: metadata_version.clone(),
                endpoint_version: cache.version(endpoint).map(str::to_owned),
            };
            warn!(
                %endpoint,
                metadata_len = expected,
                actual_len,
                metadata_version = ?mismatch.metadata_version,
                endpoint_version = ?mismatch.endpoint_version,
                "array length disagrees with metadata, joining positionally"
            );
            mismatch
        })
        .collect()
}

// ── Merge ────────────────────────────────────────────────────────────

/// Build one normalized record per metadata position, keyed and ordered
/// by position.
pub fn merge(
    sources: &MergeSources,
    positions: &PositionMap,
    options: &PipelineOptions,
) -> IndexMap<String, NormalizedParameter> {
    sources
        .params
        .iter()
        .enumerate()
        .map(|(position, raw)| {
            let record = merge_one(sources, position, raw.as_ref(), positions.get(position), options);
            (record.key.clone(), record)
        })
        .collect()
}

fn merge_one(
    sources: &MergeSources,
    position: usize,
    raw: Option<&RawParamData>,
    binding: Option<&ParameterBinding>,
    options: &PipelineOptions,
) -> NormalizedParameter {
    let mut record = NormalizedParameter::unbound(position.to_string());

    record.name = lookup(&sources.names, Some(position)).cloned();
    record.description = lookup(&sources.descs, Some(position)).cloned();
    record.translation_key = record.name.as_deref().and_then(translation_key);

    if let Some(raw) = raw {
        record.value = raw.value.as_ref().and_then(ParamValue::from_json);
        record.editable = raw.is_editable();
        record.min = raw.minv.as_ref().and_then(bound);
        record.max = raw.maxv.as_ref().and_then(bound);
        record.unit = unit_symbol(sources, raw);
        if record.unit.is_none() {
            record.enumeration = enumeration(sources, raw, binding, &record);
        }
    }
    record.current_option = match (&record.enumeration, &record.value) {
        (Some(e), Some(v)) => e.label_for(v).map(str::to_owned),
        _ => None,
    };

    if let Some(binding) = binding {
        record.number = binding.number;
        record.pass_index = binding.pass_index;
        record.category = binding.category.map(|index| Category {
            index,
            name: lookup(&sources.cats, Some(index)).cloned(),
        });
        record.locked = binding.locked;
        if binding.locked && options.include_lock_reasons {
            record.lock_reason = Some(
                lookup(&sources.locks, binding.lock_code)
                    .cloned()
                    .unwrap_or_else(|| GENERIC_LOCK_REASON.to_owned()),
            );
        }
    }

    record
}

/// Numbers stay numbers; anything else is kept verbatim so the
/// validator can reject it.
fn bound(value: &Value) -> Option<ParamValue> {
    if let Some(n) = as_finite_f64(value) {
        return Some(ParamValue::Number(n));
    }
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(ParamValue::Text(s.clone())),
        other => Some(ParamValue::Text(other.to_string())),
    }
}

fn unit_symbol(sources: &MergeSources, raw: &RawParamData) -> Option<String> {
    let idx = raw.unit_index().filter(|u| *u != ENUM_UNIT)?;
    lookup(&sources.units, Some(idx)).cloned()
}

/// The structure's `data_id` names the enumeration when present;
/// otherwise one is inferred for parameters that look enumerated.
/// Callers only ask for unit-less parameters.
fn enumeration(
    sources: &MergeSources,
    raw: &RawParamData,
    binding: Option<&ParameterBinding>,
    record: &NormalizedParameter,
) -> Option<Enumeration> {
    let id = match binding.and_then(|b| b.enum_ref) {
        Some(id) => id,
        None if looks_enumerated(raw, record) => best_enumeration(sources, raw, record)?,
        None => return None,
    };
    let table = lookup(&sources.enums, Some(id))?;
    Some(Enumeration {
        id,
        options: table.labels(),
        first: table.first(),
    })
}

fn numeric(value: Option<&Value>) -> Option<f64> {
    value.and_then(as_finite_f64)
}

/// Enumerated unit, at least two state words in the description, or a
/// small range starting at zero or above.
fn looks_enumerated(raw: &RawParamData, record: &NormalizedParameter) -> bool {
    if raw.unit_index() == Some(ENUM_UNIT) {
        return true;
    }
    let description = record.description.as_deref().unwrap_or_default().to_lowercase();
    if STATE_WORDS.iter().filter(|w| description.contains(*w)).count() >= 2 {
        return true;
    }
    match (numeric(raw.minv.as_ref()), numeric(raw.maxv.as_ref())) {
        (Some(min), Some(max)) => 0.0 <= min && min <= max && max <= 10.0 && max - min <= 5.0,
        _ => false,
    }
}

/// Score every enumeration table against the parameter's name and
/// description. Ties keep the earlier table.
fn best_enumeration(
    sources: &MergeSources,
    raw: &RawParamData,
    record: &NormalizedParameter,
) -> Option<usize> {
    let name = record.name.as_deref().unwrap_or_default().to_lowercase();
    let description = record.description.as_deref().unwrap_or_default().to_lowercase();
    let span = match (
        numeric(raw.value.as_ref()),
        numeric(raw.minv.as_ref()),
        numeric(raw.maxv.as_ref()),
    ) {
        (Some(_), Some(min), Some(max)) => Some(max - min + 1.0),
        _ => None,
    };

    let mut best: Option<(usize, u32)> = None;
    for (id, table) in sources.enums.iter().enumerate() {
        let Some(table) = table else { continue };
        let labels: Vec<String> = table.labels().iter().map(|l| l.to_lowercase()).collect();
        if labels.is_empty() {
            continue;
        }
        let score = match_score(&labels, &name, &description, span);
        if score >= MATCH_THRESHOLD && best.is_none_or(|(_, top)| score > top) {
            best = Some((id, score));
        }
    }
    if let Some((id, score)) = best {
        debug!(id, score, "inferred enumeration");
    }
    best.map(|(id, _)| id)
}

fn match_score(labels: &[String], name: &str, description: &str, span: Option<f64>) -> u32 {
    let mut score = 0;
    for label in labels.iter().filter(|l| !l.is_empty()) {
        if description.contains(label.as_str()) {
            score += 2;
        }
        score += label
            .split_whitespace()
            .filter(|word| word.len() > 2 && description.contains(word))
            .map(|_| 1)
            .sum::<u32>();
        if name.contains(label.as_str()) {
            score += 3;
        }
    }
    #[allow(clippy::cast_precision_loss)]
    let size = labels.len() as f64;
    if span == Some(size) {
        score += 5;
    }
    score
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::pipeline::structure::index_structure;
    use econet_api::Envelope;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn cache_with(entries: &[(Endpoint, Value)]) -> EndpointCache {
        let mut cache = EndpointCache::new();
        for (endpoint, data) in entries {
            cache.record_success(
                *endpoint,
                Envelope {
                    version: Some("1".into()),
                    data: data.clone(),
                },
            );
        }
        cache
    }

    fn run(cache: &EndpointCache, options: &PipelineOptions) -> IndexMap<String, NormalizedParameter> {
        let sources = MergeSources::from_cache(cache);
        let positions = index_structure(cache.payload(Endpoint::Structure));
        merge(&sources, &positions, options)
    }

    #[test]
    fn joins_all_sources_for_a_number() {
        let cache = cache_with(&[
            (
                Endpoint::ParamsData,
                json!([{"value": 45, "minv": 20, "maxv": 80, "edit": true, "unit": 5}]),
            ),
            (Endpoint::ParamsNames, json!(["Fan power"])),
            (Endpoint::ParamsDescs, json!(["Blower output"])),
            (Endpoint::UnitsNames, json!(["", "°C", "s", "min", "h", "%"])),
            (Endpoint::CatsNames, json!(["Main", "Boiler settings"])),
            (Endpoint::Structure, json!([{"type": 7, "index": 1}, {"type": 1, "index": 42}])),
        ]);
        let records = run(&cache, &PipelineOptions::default());
        let p = &records["0"];

        assert_eq!(p.name.as_deref(), Some("Fan power"));
        assert_eq!(p.description.as_deref(), Some("Blower output"));
        assert_eq!(p.translation_key.as_deref(), Some("fan_power"));
        assert_eq!(p.unit.as_deref(), Some("%"));
        assert_eq!(p.numeric_bounds(), Some((20.0, 80.0)));
        assert_eq!(p.number, Some(42));
        assert_eq!(p.category_name(), Some("Boiler settings"));
        assert!(p.editable);
        assert!(!p.locked);
    }

    #[test]
    fn enum_unit_infers_enumeration_from_description_and_range() {
        let cache = cache_with(&[
            (
                Endpoint::ParamsData,
                json!([{"value": 2, "minv": 1, "maxv": 3, "edit": true, "unit": 31, "offset": 0}]),
            ),
            (Endpoint::ParamsNames, json!(["Operating mode"])),
            (Endpoint::ParamsDescs, json!(["Manual or auto operation"])),
            (
                Endpoint::ParamsEnums,
                json!([
                    {"values": ["off", "on"], "first": 0},
                    {"values": ["Manual", "Auto", "Schedule"], "first": 1}
                ]),
            ),
            (Endpoint::UnitsNames, json!([""])),
        ]);
        let records = run(&cache, &PipelineOptions::default());
        let p = &records["0"];

        let e = p.enumeration.as_ref().unwrap();
        assert_eq!(e.id, 1, "offset is not an enumeration reference");
        assert_eq!(e.options, vec!["Manual", "Auto", "Schedule"]);
        assert_eq!(p.current_option.as_deref(), Some("Auto"));
        assert_eq!(p.unit, None);
    }

    #[test]
    fn weak_matches_attach_no_enumeration() {
        let cache = cache_with(&[
            (Endpoint::ParamsData, json!([{"value": 4, "edit": true, "unit": 31}])),
            (Endpoint::ParamsNames, json!(["Hysteresis"])),
            (Endpoint::ParamsEnums, json!([{"values": ["Manual", "Auto"]}, {"values": []}])),
        ]);
        let records = run(&cache, &PipelineOptions::default());
        assert_eq!(records["0"].enumeration, None);
    }

    #[test]
    fn equal_scores_keep_the_first_table() {
        let cache = cache_with(&[
            (Endpoint::ParamsData, json!([{"value": 0, "edit": true, "unit": 31}])),
            (Endpoint::ParamsNames, json!(["Pump on"])),
            (
                Endpoint::ParamsEnums,
                json!([{"values": ["off", "on"]}, {"values": ["on", "off"]}]),
            ),
        ]);
        let records = run(&cache, &PipelineOptions::default());
        assert_eq!(records["0"].enumeration.as_ref().map(|e| e.id), Some(0));
    }

    #[test]
    fn parameters_with_a_unit_are_never_enumerated() {
        let cache = cache_with(&[
            (
                Endpoint::ParamsData,
                json!([{"value": 1, "minv": 0, "maxv": 1, "edit": true, "unit": 5}]),
            ),
            (Endpoint::ParamsNames, json!(["Pump on off"])),
            (Endpoint::ParamsEnums, json!([{"values": ["off", "on"]}])),
            (Endpoint::UnitsNames, json!(["", "°C", "s", "min", "h", "%"])),
            (Endpoint::Structure, json!([{"type": 1, "index": 3, "data_id": 0}])),
        ]);
        let records = run(&cache, &PipelineOptions::default());
        assert_eq!(records["0"].unit.as_deref(), Some("%"));
        assert_eq!(records["0"].enumeration, None);
    }

    #[test]
    fn out_of_range_references_are_absent() {
        let cache = cache_with(&[
            (
                Endpoint::ParamsData,
                json!([{"value": 1, "edit": true, "unit": 99, "offset": 0}]),
            ),
            (Endpoint::ParamsNames, json!([])),
            (Endpoint::UnitsNames, json!(["", "°C"])),
            (Endpoint::CatsNames, json!(["Main"])),
            (Endpoint::LocksNames, json!(["Summer mode"])),
            (
                Endpoint::Structure,
                json!([{"type": 7, "index": 12}, {"type": 1, "index": 7, "lock": true, "lock_index": 9}]),
            ),
        ]);
        let records = run(&cache, &PipelineOptions::default());
        let p = &records["0"];

        assert_eq!(p.name, None);
        assert_eq!(p.unit, None);
        assert_eq!(p.category.as_ref().map(|c| c.index), Some(12));
        assert_eq!(p.category_name(), None);
        assert!(p.locked);
        assert_eq!(p.lock_reason.as_deref(), Some(GENERIC_LOCK_REASON));
    }

    #[test]
    fn lock_reason_resolves_and_can_be_disabled() {
        let entries = [
            (Endpoint::ParamsData, json!([{"value": 1, "edit": true}])),
            (Endpoint::LocksNames, json!(["", "Summer mode"])),
            (
                Endpoint::Structure,
                json!([{"type": 1, "index": 7, "lock": 1, "lock_index": 1}]),
            ),
        ];
        let cache = cache_with(&entries);

        let with = run(&cache, &PipelineOptions::default());
        assert_eq!(with["0"].lock_reason.as_deref(), Some("Summer mode"));

        let without = run(
            &cache,
            &PipelineOptions {
                include_lock_reasons: false,
                ..PipelineOptions::default()
            },
        );
        assert!(without["0"].locked);
        assert_eq!(without["0"].lock_reason, None);
    }

    #[test]
    fn structure_shortfall_leaves_trailing_positions_unbound() {
        let cache = cache_with(&[
            (
                Endpoint::ParamsData,
                json!([{"value": 1}, {"value": 2}, {"value": 3}]),
            ),
            (Endpoint::ParamsNames, json!(["a", "b", "c"])),
            (
                Endpoint::Structure,
                json!([{"type": 1, "index": 10}, {"type": 1, "index": 11}]),
            ),
        ]);
        let records = run(&cache, &PipelineOptions::default());

        assert_eq!(records.len(), 3);
        assert_eq!(records["1"].number, Some(11));
        let last = &records["2"];
        assert_eq!(last.number, None);
        assert_eq!(last.category, None);
        assert!(!last.locked);
        assert_eq!(last.name.as_deref(), Some("c"));
    }

    #[test]
    fn non_numeric_bounds_are_kept_as_text() {
        let cache = cache_with(&[(
            Endpoint::ParamsData,
            json!([{"value": 1, "minv": "low", "maxv": 10, "edit": true}]),
        )]);
        let records = run(&cache, &PipelineOptions::default());
        assert_eq!(records["0"].min, Some(ParamValue::Text("low".into())));
        assert_eq!(records["0"].max, Some(ParamValue::Number(10.0)));
    }

    #[test]
    fn length_mismatches_are_reported_with_versions() {
        let cache = cache_with(&[
            (Endpoint::ParamsData, json!([{"value": 1}, {"value": 2}])),
            (Endpoint::ParamsNames, json!(["only one"])),
            (Endpoint::ParamsDescs, json!(["x", "y"])),
        ]);
        let sources = MergeSources::from_cache(&cache);
        let positions = index_structure(None);
        let mismatches = check_lengths(&cache, &sources, &positions);

        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].endpoint, Endpoint::ParamsNames);
        assert_eq!(mismatches[0].actual_len, 1);
        assert_eq!(mismatches[0].metadata_version.as_deref(), Some("1"));
    }
}

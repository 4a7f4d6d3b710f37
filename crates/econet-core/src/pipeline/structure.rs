// ── Structure indexer ──
//
// `rmStructure` is the only source of parameter numbers, categories and
// lock flags. Its parameter entries line up one-to-one, in order, with
// the metadata array, so the i-th parameter entry binds metadata
// position i. A category applies to every parameter after its header
// until the next header.

use serde_json::Value;
use tracing::{debug, warn};

use econet_api::RawStructureEntry;

use super::payload_items;

const PARAMETER_TYPE: i64 = 1;
const CATEGORY_HEADER_TYPE: i64 = 7;

/// Structure entry discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    Parameter,
    /// Opens a menu category; `index` names a `rmCatsNames` slot.
    CategoryHeader,
    /// Menu groups, links and other firmware-specific entries.
    Other(i64),
}

impl EntryType {
    fn from_code(code: Option<i64>) -> Self {
        match code {
            Some(PARAMETER_TYPE) => Self::Parameter,
            Some(CATEGORY_HEADER_TYPE) => Self::CategoryHeader,
            Some(other) => Self::Other(other),
            None => Self::Other(-1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureEntry {
    /// Position in the original structure array.
    pub position: usize,
    pub entry_type: EntryType,
    /// Parameter number for parameters, category index for headers.
    pub index: Option<usize>,
    pub pass_index: u8,
    pub locked: bool,
    pub lock_code: Option<usize>,
    pub enum_ref: Option<usize>,
}

/// What the structure says about one metadata position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterBinding {
    pub number: Option<u32>,
    pub category: Option<usize>,
    pub pass_index: u8,
    pub locked: bool,
    pub lock_code: Option<usize>,
    pub enum_ref: Option<usize>,
}

/// Metadata position → structure binding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionMap {
    bindings: Vec<ParameterBinding>,
}

impl PositionMap {
    /// Binding for a metadata position; `None` past the structure's end.
    pub fn get(&self, position: usize) -> Option<&ParameterBinding> {
        self.bindings.get(position)
    }

    /// Number of bound positions.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Parse a structure payload. Elements that are not objects are kept as
/// `Other` entries so positions stay faithful to the source.
pub fn parse_structure(payload: &Value) -> Vec<StructureEntry> {
    payload_items(payload)
        .into_iter()
        .enumerate()
        .map(|(position, item)| {
            let raw: RawStructureEntry = item
                .and_then(|v| serde_json::from_value(v.clone()).ok())
                .unwrap_or_default();
            StructureEntry {
                position,
                entry_type: EntryType::from_code(raw.kind_code()),
                index: raw.index(),
                pass_index: raw.pass_index(),
                locked: raw.is_locked(),
                lock_code: raw.lock_index(),
                enum_ref: raw.data_id(),
            }
        })
        .collect()
}

/// Walk the structure in order, tracking the current category, and bind
/// each parameter entry to the next metadata position.
pub fn build_position_map(entries: &[StructureEntry]) -> PositionMap {
    let mut current_category = None;
    let mut bindings = Vec::new();

    for entry in entries {
        match entry.entry_type {
            EntryType::CategoryHeader => current_category = entry.index,
            EntryType::Parameter => bindings.push(ParameterBinding {
                number: entry.index.and_then(|n| u32::try_from(n).ok()),
                category: current_category,
                pass_index: entry.pass_index,
                locked: entry.locked,
                lock_code: entry.lock_code,
                enum_ref: entry.enum_ref,
            }),
            EntryType::Other(_) => {}
        }
    }

    debug!(
        entries = entries.len(),
        parameters = bindings.len(),
        "indexed structure"
    );
    PositionMap { bindings }
}

/// Build the position map from an optional structure payload. Absent or
/// empty structure yields an empty map: every position stays unbound.
pub fn index_structure(payload: Option<&Value>) -> PositionMap {
    let entries = payload.map(parse_structure).unwrap_or_default();
    if entries.is_empty() {
        warn!("structure unavailable, merging without numbers, categories or locks");
    }
    build_position_map(&entries)
}

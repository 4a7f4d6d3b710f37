// ── Record validation ──
//
// Rejects records that cannot become a sane entity. The first failing
// check wins; rejected records are reported but never reach the host.

use serde::Serialize;
use strum::Display;

use crate::model::{NormalizedParameter, ParamValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
pub enum RejectionReason {
    #[strum(serialize = "missing key or name")]
    MissingKeyOrName,
    #[strum(serialize = "missing min/max for number")]
    MissingBounds,
    #[strum(serialize = "non-numeric min/max values")]
    NonNumericBounds,
    #[strum(serialize = "invalid min/max range")]
    InvalidRange,
    #[strum(serialize = "empty enum values")]
    EmptyEnumeration,
}

/// Side-log entry for a rejected record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    pub key: String,
    pub reason: RejectionReason,
}

fn is_finite_number(bound: &ParamValue) -> bool {
    matches!(bound, ParamValue::Number(n) if n.is_finite())
}

/// Check one record. Bounds are only required for editable records with a
/// unit, i.e. candidates for a numeric control.
pub fn validate(record: &NormalizedParameter) -> Result<(), Rejection> {
    let reject = |reason| {
        Err(Rejection {
            key: record.key.clone(),
            reason,
        })
    };

    let has_name = record.name.as_deref().is_some_and(|n| !n.trim().is_empty());
    if record.key.is_empty() || !has_name {
        return reject(RejectionReason::MissingKeyOrName);
    }

    if record.editable && record.unit.is_some() {
        let (Some(min), Some(max)) = (&record.min, &record.max) else {
            return reject(RejectionReason::MissingBounds);
        };
        // Non-finite bounds cannot be ordered, so type comes before range.
        if !is_finite_number(min) || !is_finite_number(max) {
            return reject(RejectionReason::NonNumericBounds);
        }
        if let Some((lo, hi)) = record.numeric_bounds() {
            if lo >= hi {
                return reject(RejectionReason::InvalidRange);
            }
        }
    }

    if record.enumeration.as_ref().is_some_and(|e| e.options.is_empty()) {
        return reject(RejectionReason::EmptyEnumeration);
    }

    Ok(())
}

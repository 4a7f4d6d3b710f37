// ── Binary option lexicon ──
//
// Two-option enumerations that read as an on/off pair become switches.
// Matching is case-insensitive, whitespace-trimmed and independent of
// option order; English and Polish firmware labels are both covered.

/// Known pairs as `(off, on)`.
const BINARY_PAIRS: &[(&str, &str)] = &[
    ("off", "on"),
    ("no", "yes"),
    ("disable", "enable"),
    ("disabled", "enabled"),
    ("inactive", "active"),
    ("stop", "start"),
    ("close", "open"),
    ("closed", "open"),
    ("false", "true"),
    ("0", "1"),
    ("wył.", "wł."),
    ("wył", "wł"),
    ("wyłącz", "włącz"),
    ("wyłączony", "włączony"),
    ("nie", "tak"),
    ("nieaktywny", "aktywny"),
    ("nieaktywna", "aktywna"),
    ("zamknij", "otwórz"),
    ("fałsz", "prawda"),
];

/// Which option index means off and which means on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinaryOrder {
    pub off_index: usize,
    pub on_index: usize,
}

fn normalize(label: &str) -> String {
    label.trim().to_lowercase()
}

/// Recognize a two-option list as an on/off pair.
pub fn binary_order(options: &[String]) -> Option<BinaryOrder> {
    let [a, b] = options else {
        return None;
    };
    let (a, b) = (normalize(a), normalize(b));

    BINARY_PAIRS.iter().find_map(|(off, on)| {
        if a == *off && b == *on {
            Some(BinaryOrder {
                off_index: 0,
                on_index: 1,
            })
        } else if a == *on && b == *off {
            Some(BinaryOrder {
                off_index: 1,
                on_index: 0,
            })
        } else {
            None
        }
    })
}

pub fn is_binary_pair(options: &[String]) -> bool {
    binary_order(options).is_some()
}

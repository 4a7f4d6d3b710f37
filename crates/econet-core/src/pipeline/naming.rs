// ── Naming and device grouping ──
//
// Host-facing identifiers derived from parameter names: translation
// keys and the device an entity is attached to. The menu categories
// alone misfile parameters (mixer settings under "Chimney sweep mode"),
// so names win over categories.
//
// Controllers repeat some names once per circuit ("Off by thermostat"
// for mixers 1-4). Such duplicates are told apart by their sequence
// number among parameters sharing a translation key.

use crate::model::{DeviceGroup, NormalizedParameter};

/// Highest mixer circuit number a controller exposes.
pub const MAX_MIXERS: u8 = 4;

/// Turn a display name into a host translation key.
///
/// `"Mixer 3 room therm."` becomes `"mixer3_room_therm"`.
pub fn translation_key(name: &str) -> Option<String> {
    let mut cleaned = String::with_capacity(name.len());
    for c in name.trim().chars() {
        match c {
            ' ' | '-' => cleaned.push('_'),
            '%' => cleaned.push_str("percent"),
            '.' | '(' | ')' | ':' | '\'' | '"' => {}
            other => cleaned.extend(other.to_lowercase()),
        }
    }

    let tokens: Vec<&str> = cleaned.split('_').filter(|t| !t.is_empty()).collect();
    let mut parts: Vec<String> = Vec::with_capacity(tokens.len());
    for (i, token) in tokens.iter().enumerate() {
        let is_number = token.chars().all(|c| c.is_ascii_digit());
        let has_next = i + 1 < tokens.len();
        match parts.last_mut() {
            Some(prev) if is_number && has_next => prev.push_str(token),
            _ => parts.push((*token).to_owned()),
        }
    }

    let key = parts.join("_");
    (!key.is_empty()).then_some(key)
}

// ── Duplicates ───────────────────────────────────────────────────────

/// What a repeated parameter is repeated for, judged by its description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Repeat {
    Mixer,
    Huw,
    Circuit,
    Buffer,
    Plain,
}

impl Repeat {
    fn of(description: Option<&str>) -> Self {
        let text = description.unwrap_or_default().to_lowercase();
        if text.contains("mixer") {
            Self::Mixer
        } else if ["hot water", "huw", "dhw", "tap water"]
            .iter()
            .any(|w| text.contains(w))
        {
            Self::Huw
        } else if text.contains("thermostat") && text.contains("room") {
            Self::Circuit
        } else if text.contains("buffer") {
            Self::Buffer
        } else {
            Self::Plain
        }
    }

    /// The first hot water tank or buffer is the unnumbered one.
    fn keeps_base(self, sequence: usize) -> bool {
        matches!(self, Self::Huw | Self::Buffer) && sequence <= 1
    }
}

/// Display name for the `sequence`-th (1-based) parameter sharing a name,
/// e.g. `"Off by thermostat (Mixer 2)"`.
pub fn duplicate_display_name(name: &str, sequence: usize, description: Option<&str>) -> String {
    let repeat = Repeat::of(description);
    if repeat.keeps_base(sequence) {
        return name.to_owned();
    }
    match repeat {
        Repeat::Mixer => format!("{name} (Mixer {sequence})"),
        Repeat::Huw => format!("{name} (HUW {sequence})"),
        Repeat::Circuit => format!("{name} (Circuit {sequence})"),
        Repeat::Buffer => format!("{name} (Buffer {sequence})"),
        Repeat::Plain => format!("{name} {sequence}"),
    }
}

/// Translation key counterpart of [`duplicate_display_name`], e.g.
/// `"off_by_thermostat_mixer_2"`.
pub fn duplicate_translation_key(base: &str, sequence: usize, description: Option<&str>) -> String {
    let repeat = Repeat::of(description);
    if repeat.keeps_base(sequence) {
        return base.to_owned();
    }
    match repeat {
        Repeat::Mixer => format!("{base}_mixer_{sequence}"),
        Repeat::Huw => format!("{base}_huw_{sequence}"),
        Repeat::Circuit => format!("{base}_circuit_{sequence}"),
        Repeat::Buffer => format!("{base}_buffer_{sequence}"),
        Repeat::Plain => format!("{base}_{sequence}"),
    }
}

// ── Device grouping ──────────────────────────────────────────────────

/// Pick the host device for a parameter from its name, falling back to
/// its menu category. A repeated parameter that mentions mixers without
/// a number is filed under the mixer matching its `sequence`.
pub fn device_group(param: &NormalizedParameter, sequence: Option<usize>) -> DeviceGroup {
    let text = format!(
        "{} {}",
        param.name.as_deref().unwrap_or_default(),
        param.description.as_deref().unwrap_or_default()
    )
    .to_lowercase();

    if let Some(number) = mixer_number(&text) {
        return DeviceGroup::Mixer { number };
    }

    let module = if text.contains("huw") || text.contains("dhw") || text.contains("cwu") {
        Some("huw")
    } else if text.contains("lambda") {
        Some("lambda")
    } else if text.contains("buffer") {
        Some("buffer")
    } else if text.contains("solar") {
        Some("solar")
    } else {
        None
    };
    if let Some(name) = module {
        return DeviceGroup::Module { name: name.into() };
    }

    let by_sequence = sequence
        .and_then(|n| u8::try_from(n).ok())
        .filter(|n| (1..=MAX_MIXERS).contains(n));
    if let Some(number) = by_sequence.filter(|_| text.contains("mixer")) {
        return DeviceGroup::Mixer { number };
    }

    match &param.category {
        Some(cat) => DeviceGroup::Category {
            index: cat.index,
            name: cat.name.clone(),
        },
        None => DeviceGroup::Controller,
    }
}

/// `mixer 2`, `mixer2` or `mixer_2`, limited to real circuits.
fn mixer_number(text: &str) -> Option<u8> {
    text.match_indices("mixer").find_map(|(at, word)| {
        let rest = text[at + word.len()..].trim_start_matches([' ', '_']);
        let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
        digits
            .parse::<u8>()
            .ok()
            .filter(|n| (1..=MAX_MIXERS).contains(n))
    })
}

//! Field normalization rules for merged rows
//!
//! Everything here is a pure function of JSON values found in spawn and
//! species files: text casing, list joins, and the small lookup tables used
//! for weather, sky, light and moon-phase conditions.

use serde_json::Value;

/// Lunar phases indexed by the integer used in spawn conditions.
const MOON_PHASES: [&str; 9] = [
    "Full Moon",
    "Waning Gibbous",
    "Last Quarter",
    "Waning Crescent",
    "New Moon",
    "Waxing Crescent",
    "First Quarter",
    "Waxing Gibbous",
    "Full Moon",
];

/// Upper-case every letter that follows a non-letter, lower-case the rest.
///
/// "pikachu" -> "Pikachu", "ice_stone" -> "Ice_Stone", "mr. mime" -> "Mr. Mime"
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_letter = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_letter = true;
        } else {
            out.push(c);
            prev_letter = false;
        }
    }
    out
}

/// Upper-case the first character and lower-case the remainder.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Render a JSON scalar the way it appears in a CSV cell.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Loose truthiness: false, null, zero, "" and empty containers are false.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// String field of a JSON object, or `default` when absent or not a string.
pub fn str_field<'a>(obj: &'a Value, key: &str, default: &'a str) -> &'a str {
    obj.get(key).and_then(Value::as_str).unwrap_or(default)
}

/// Items of a JSON list field rendered as text. Absent or non-list is empty.
pub fn list_field(obj: &Value, key: &str) -> Vec<String> {
    match obj.get(key) {
        Some(Value::Array(items)) => items.iter().map(value_text).collect(),
        _ => Vec::new(),
    }
}

/// A nested object such as `condition` or `anticondition`.
pub fn sub_object<'a>(obj: &'a Value, key: &str) -> Option<&'a Value> {
    obj.get(key).filter(|v| v.is_object())
}

/// Format biome, structure and block identifiers for display.
///
/// "minecraft:overworld/is_forest" -> "Overworld: Forest"
/// "#cobblemon:is_mountain" -> "Mountain"
pub fn format_location_names<S: AsRef<str>>(tokens: &[S]) -> Vec<String> {
    tokens
        .iter()
        .map(|token| format_location(token.as_ref()))
        .collect()
}

fn format_location(token: &str) -> String {
    match token.split_once(':') {
        Some((_, name)) => match name.split_once('/') {
            Some((head, descriptor)) => {
                format!("{}: {}", location_part(head), location_part(descriptor))
            }
            None => location_part(name),
        },
        None => location_part(token),
    }
}

fn location_part(part: &str) -> String {
    let part = part.strip_prefix("is_").unwrap_or(part);
    title_case(part.replace('_', " ").trim())
}

/// Location list from an optional condition object, joined with ", ".
pub fn joined_locations(section: Option<&Value>, key: &str) -> String {
    let tokens = section.map(|s| list_field(s, key)).unwrap_or_default();
    format_location_names(&tokens).join(", ")
}

/// Map a moon-phase value to readable phase names.
///
/// Accepts an integer, a list of integers, or a comma-separated string.
/// Unreadable values degrade to an "Unknown ... Phase" marker.
pub fn moon_phase_name(value: Option<&Value>) -> String {
    let Some(value) = value else {
        return String::new();
    };
    match value {
        Value::Null => String::new(),
        Value::Array(items) if items.is_empty() => String::new(),
        Value::String(s) if s.is_empty() => String::new(),
        Value::Array(items) => {
            let mut names = Vec::with_capacity(items.len());
            for item in items {
                match phase_number(item) {
                    Some(n) => names.push(phase_or(n, "Unknown List Phase")),
                    None => return "Unknown List Error Phase".to_string(),
                }
            }
            names.join(", ")
        }
        Value::String(s) if s.contains(',') => {
            let names: Vec<&str> = s
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
                .map(|p| p.parse::<i64>().map_or("Unknown Str Phase", |n| phase_or(n, "Unknown Str Phase")))
                .collect();
            if names.is_empty() {
                "Unknown Phase".to_string()
            } else {
                names.join(", ")
            }
        }
        single => match phase_number(single) {
            Some(n) => phase_or(n, "Unknown Single Phase").to_string(),
            None => "Unknown Single Error Phase".to_string(),
        },
    }
}

fn phase_number(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn phase_or(n: i64, unknown: &'static str) -> &'static str {
    usize::try_from(n)
        .ok()
        .and_then(|i| MOON_PHASES.get(i))
        .copied()
        .unwrap_or(unknown)
}

/// Weather requirement of a spawn condition. Thunder outranks rain.
pub fn weather_condition(condition: Option<&Value>) -> &'static str {
    let flag = |key: &str| condition.and_then(|c| c.get(key));
    if flag("isThundering").is_some_and(is_truthy) {
        "Thunder"
    } else if flag("isRaining").is_some_and(is_truthy) {
        "Rain"
    } else if matches!(flag("isRaining"), Some(Value::Bool(false))) {
        "Clear"
    } else {
        "Any"
    }
}

/// Sky visibility requirement; the top-level flag shadows the condition's.
pub fn sky_condition(spawn: &Value) -> &'static str {
    let can_see_sky = match spawn.get("canSeeSky") {
        Some(v) => Some(v),
        None => spawn.get("condition").and_then(|c| c.get("canSeeSky")),
    };
    match can_see_sky {
        Some(Value::Bool(true)) => "MUST SEE",
        Some(Value::Bool(false)) => "CANNOT SEE",
        _ => "Any",
    }
}

/// Sky-light range of a spawn condition, or "Any" when unbounded.
pub fn light_condition(condition: Option<&Value>) -> String {
    let Some(condition) = condition else {
        return "Any".to_string();
    };
    let min = condition.get("minSkyLight");
    let max = condition.get("maxSkyLight");
    if min.is_none() && max.is_none() {
        return "Any".to_string();
    }
    let bound = |v: Option<&Value>| v.map_or_else(|| "N/A".to_string(), value_text);
    format!("{} - {}", bound(min), bound(max))
}

/// "gen9" -> "Gen 9"
pub fn generation_label(label: &str) -> String {
    let rest = label.get(3..).unwrap_or("");
    format!("Gen {}", capitalize(rest))
}

/// Whether a species label names a generation (e.g. "gen1").
pub fn is_generation_label(label: &str) -> bool {
    label.to_lowercase().starts_with("gen")
}

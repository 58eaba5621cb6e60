//! Normalisation of circuit schedule values read from photos or typed in by hand.

use regex::Regex;
use std::sync::OnceLock;

use crate::design::DeviceCurve;

/// Live conductor size -> CPC size for UK flat twin & earth (6242Y).
const TWIN_AND_EARTH_CPC: &[(&str, &str)] = &[
    ("1.0", "1.0"),
    ("1.5", "1.0"),
    ("2.5", "1.5"),
    ("4.0", "1.5"),
    ("6.0", "2.5"),
    ("10", "4.0"),
    ("16", "6.0"),
];

fn leading_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim().trim_start_matches(|c: char| !c.is_ascii_digit() && c != '.');
    let numeric: String = trimmed
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    numeric.parse().ok()
}

/// Canonical conductor size string: "1.0", "2.5", "4.0", "10", "16", "0.75".
///
/// Units and trailing CPC notation ("2.5/1.5mm²") are dropped. Returns an
/// empty string when no size can be read.
pub fn normalise_cable_size(raw: &str) -> String {
    match leading_number(raw) {
        Some(size) if size > 0.0 => format_size(size),
        _ => String::new(),
    }
}

pub fn format_size(size: f64) -> String {
    if size.fract() == 0.0 {
        if size < 10.0 {
            format!("{:.1}", size)
        } else {
            format!("{:.0}", size)
        }
    } else {
        let s = format!("{:.2}", size);
        s.trim_end_matches('0').to_string()
    }
}

/// Correct CPC size for a T&E live conductor, if it is a T&E size.
pub fn twin_and_earth_cpc_for(live: &str) -> Option<&'static str> {
    let canonical = normalise_cable_size(live);
    TWIN_AND_EARTH_CPC
        .iter()
        .find(|(l, _)| *l == canonical)
        .map(|(_, cpc)| *cpc)
}

fn type_number_regexes() -> &'static [(Regex, &'static str); 3] {
    static RES: OnceLock<[(Regex, &'static str); 3]> = OnceLock::new();
    RES.get_or_init(|| {
        [
            (Regex::new(r"(?i)Type ?1").expect("valid regex"), "Type B"),
            (Regex::new(r"(?i)Type ?2").expect("valid regex"), "Type C"),
            (Regex::new(r"(?i)Type ?3").expect("valid regex"), "Type D"),
        ]
    })
}

/// Map the old numbered MCB types (Type 1/2/3) to curves B/C/D.
pub fn fix_protective_device_type(raw: &str) -> String {
    for (re, replacement) in type_number_regexes() {
        if re.is_match(raw) {
            return re.replace_all(raw, *replacement).into_owned();
        }
    }
    raw.to_string()
}

/// Base device family: "RCBO", "RCD", "MCB", "Fuse", or the input unchanged.
pub fn device_base_type(raw: &str) -> String {
    let upper = raw.to_uppercase();
    if upper.contains("RCBO") {
        "RCBO".to_string()
    } else if upper.contains("RCD") {
        "RCD".to_string()
    } else if upper.contains("MCB") {
        "MCB".to_string()
    } else if upper.contains("FUSE") {
        "Fuse".to_string()
    } else {
        raw.trim().to_string()
    }
}

/// Product standard for a device family; MCB (BS EN 60898) when unknown.
pub fn default_bs_standard(device_type: &str) -> &'static str {
    let upper = device_type.to_uppercase();
    if upper.contains("MCB") {
        "BS EN 60898"
    } else if upper.contains("RCBO") {
        "BS EN 61009"
    } else if upper.contains("RCD") {
        "BS EN 61008"
    } else if upper.contains("FUSE") {
        "BS 1361"
    } else {
        "BS EN 60898"
    }
}

/// Numeric rating only: "32A" -> "32", "B16" -> "16".
pub fn normalise_rating(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

fn curve_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:type\s*([BCD])\b|\b([BCD])\s*\d+\s*A?\b|\b([BCD])[- ]?curve)")
            .expect("valid regex")
    })
}

/// Tripping curve from a device description such as "MCB Type C" or "B32".
pub fn device_curve(raw: &str) -> Option<DeviceCurve> {
    let fixed = fix_protective_device_type(raw);
    let caps = curve_regex().captures(&fixed)?;
    let letter = caps
        .iter()
        .skip(1)
        .flatten()
        .next()?
        .as_str()
        .to_uppercase();
    match letter.as_str() {
        "B" => Some(DeviceCurve::B),
        "C" => Some(DeviceCurve::C),
        "D" => Some(DeviceCurve::D),
        _ => None,
    }
}

/// Grouping key for circuit numbers: "C01", "Circuit 1" and "1" all map to "1".
pub fn normalise_circuit_number(raw: &str) -> String {
    let mut s = raw.trim().to_lowercase();
    for prefix in ["circuit", "cct", "way", "c"] {
        if let Some(rest) = s.strip_prefix(prefix) {
            let rest = rest.trim_start_matches([' ', '-', '.', '#', ':']);
            if rest.starts_with(|c: char| c.is_ascii_digit()) {
                s = rest.to_string();
                break;
            }
        }
    }
    let s = s.trim_end_matches(['.', ':', ')']);
    let stripped = s.trim_start_matches('0');
    if stripped.is_empty() && !s.is_empty() {
        "0".to_string()
    } else {
        stripped.to_string()
    }
}

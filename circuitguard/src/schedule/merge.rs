//! Multi-photo circuit merge
//!
//! A consumer unit is usually photographed several times and each photo is
//! read independently by the vision model. The readings disagree: a label is
//! cropped in one photo, a rating is misread in another. This module folds
//! all readings of the same circuit into one schedule row.
//!
//! - Readings are grouped by normalised circuit number.
//! - Each field takes its most frequent value; ties go to the value seen
//!   first, and empty readings do not vote.
//! - Every disagreement is kept as a [`FieldConflict`] with counts and the
//!   photos each value came from.
//! - The CPC size is always taken from the twin & earth table for the merged
//!   live size, whatever the model reported.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

use super::normalise::{
    fix_protective_device_type, normalise_cable_size, normalise_circuit_number,
    normalise_rating, twin_and_earth_cpc_for,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[serde(rename_all = "lowercase", from = "Option<String>")]
pub enum Confidence {
    #[default]
    Low,
    Medium,
    High,
}

impl From<Option<String>> for Confidence {
    fn from(s: Option<String>) -> Self {
        match s.unwrap_or_default().trim().to_lowercase().as_str() {
            "high" => Confidence::High,
            "medium" => Confidence::Medium,
            _ => Confidence::Low,
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        };
        f.write_str(s)
    }
}

/// The vision model emits some fields as numbers and some as strings.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) => s,
        Some(other) => other.to_string(),
    })
}

/// One reading of one circuit from one photo.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DetectedCircuit {
    #[serde(default, deserialize_with = "lenient_string")]
    pub circuit_number: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub circuit_description: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub circuit_type: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub protective_device_type: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub protective_device_rating: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub protective_device_ka_rating: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub live_size: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub cpc_size: String,
    #[serde(default)]
    pub confidence: Confidence,
    #[serde(default)]
    pub source_photo_index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConflictValue {
    pub value: String,
    pub count: usize,
    pub photo_indices: Vec<usize>,
}

/// A field on which the photos disagreed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FieldConflict {
    pub field: String,
    pub chosen: String,
    /// Every distinct value, most frequent first.
    pub values: Vec<ConflictValue>,
}

/// The reconciled view of one circuit across all photos.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MergedCircuit {
    #[serde(flatten)]
    pub circuit: DetectedCircuit,
    pub overall_confidence: Confidence,
    pub detection_count: usize,
    pub source_photo_indices: Vec<usize>,
    pub conflicts: Vec<FieldConflict>,
    pub notes: Vec<String>,
}

impl MergedCircuit {
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

/// Confidence escalation across repeated readings.
pub fn overall_confidence(detections: &[&DetectedCircuit]) -> Confidence {
    let count = detections.len();
    let high = detections
        .iter()
        .filter(|d| d.confidence == Confidence::High)
        .count();

    if count >= 2 && high >= 2 {
        Confidence::High
    } else if count >= 3 && high >= 1 {
        Confidence::High
    } else if (count >= 2 && high >= 1) || high == 1 {
        Confidence::Medium
    } else {
        Confidence::Low
    }
}

struct Tally {
    display: String,
    count: usize,
    first_seen: usize,
    photos: Vec<usize>,
}

/// Mode of a field across readings, plus the conflict if they disagree.
fn vote<F>(
    field: &str,
    detections: &[&DetectedCircuit],
    extract: F,
) -> (String, Option<FieldConflict>)
where
    F: Fn(&DetectedCircuit) -> String,
{
    let mut tallies: Vec<Tally> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (pos, detection) in detections.iter().enumerate() {
        let value = extract(detection);
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        let key = value.to_lowercase();
        let slot = *index.entry(key).or_insert_with(|| {
            tallies.push(Tally {
                display: value.to_string(),
                count: 0,
                first_seen: pos,
                photos: Vec::new(),
            });
            tallies.len() - 1
        });
        let tally = &mut tallies[slot];
        tally.count += 1;
        if !tally.photos.contains(&detection.source_photo_index) {
            tally.photos.push(detection.source_photo_index);
        }
    }

    tallies.sort_by(|a, b| b.count.cmp(&a.count).then(a.first_seen.cmp(&b.first_seen)));

    let chosen = tallies.first().map(|t| t.display.clone()).unwrap_or_default();
    if tallies.len() <= 1 {
        return (chosen, None);
    }

    let conflict = FieldConflict {
        field: field.to_string(),
        chosen: chosen.clone(),
        values: tallies
            .into_iter()
            .map(|t| ConflictValue {
                value: t.display,
                count: t.count,
                photo_indices: t.photos,
            })
            .collect(),
    };
    (chosen, Some(conflict))
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn merge_group(number: &str, detections: &[&DetectedCircuit]) -> MergedCircuit {
    let mut conflicts = Vec::new();
    let mut notes = Vec::new();

    let mut take = |field: &str, extract: &dyn Fn(&DetectedCircuit) -> String| {
        let (value, conflict) = vote(field, detections, extract);
        if let Some(c) = conflict {
            conflicts.push(c);
        }
        value
    };

    let circuit_description = take("circuitDescription", &|d| collapse_whitespace(&d.circuit_description));
    let circuit_type = take("circuitType", &|d| collapse_whitespace(&d.circuit_type));
    let protective_device_type = take("protectiveDeviceType", &|d| {
        collapse_whitespace(&fix_protective_device_type(&d.protective_device_type))
    });
    let protective_device_rating =
        take("protectiveDeviceRating", &|d| normalise_rating(&d.protective_device_rating));
    let protective_device_ka_rating =
        take("protectiveDeviceKaRating", &|d| collapse_whitespace(&d.protective_device_ka_rating));
    let live_size = take("liveSize", &|d| normalise_cable_size(&d.live_size));
    let reported_cpc = take("cpcSize", &|d| normalise_cable_size(&d.cpc_size));

    let cpc_size = match twin_and_earth_cpc_for(&live_size) {
        Some(cpc) => {
            if !reported_cpc.is_empty() && reported_cpc != cpc {
                tracing::debug!(
                    "Circuit {}: CPC {} overridden to {} for {}mm² T&E",
                    number,
                    reported_cpc,
                    cpc,
                    live_size
                );
                notes.push(format!(
                    "CPC corrected from {}mm² to {}mm² (T&E standard for {}mm² live)",
                    reported_cpc, cpc, live_size
                ));
            }
            cpc.to_string()
        }
        None => {
            if !live_size.is_empty() {
                notes.push(format!(
                    "{}mm² is not a twin & earth size; CPC left blank for verification",
                    live_size
                ));
            }
            String::new()
        }
    };

    let overall = overall_confidence(detections);
    if overall == Confidence::Low {
        notes.push("Low confidence reading; verify against the board".to_string());
    }

    let mut photos: Vec<usize> = detections.iter().map(|d| d.source_photo_index).collect();
    photos.sort_unstable();
    photos.dedup();

    MergedCircuit {
        circuit: DetectedCircuit {
            circuit_number: number.to_string(),
            circuit_description,
            circuit_type,
            protective_device_type,
            protective_device_rating,
            protective_device_ka_rating,
            live_size,
            cpc_size,
            confidence: overall,
            source_photo_index: photos.first().copied().unwrap_or(0),
        },
        overall_confidence: overall,
        detection_count: detections.len(),
        source_photo_indices: photos,
        conflicts,
        notes,
    }
}

/// Reconcile readings from several photos into one circuit schedule.
///
/// Output is ordered by circuit number (numeric numbers first). Readings
/// without a circuit number cannot be matched and pass through unmerged at
/// the end.
pub fn merge_detections(detections: &[DetectedCircuit]) -> Vec<MergedCircuit> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<&DetectedCircuit>> = HashMap::new();
    let mut unnumbered: Vec<&DetectedCircuit> = Vec::new();

    for detection in detections {
        let key = normalise_circuit_number(&detection.circuit_number);
        if key.is_empty() {
            unnumbered.push(detection);
            continue;
        }
        groups
            .entry(key.clone())
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(detection);
    }

    order.sort_by(|a, b| match (a.parse::<u32>(), b.parse::<u32>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => std::cmp::Ordering::Less,
        (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    });

    let mut merged: Vec<MergedCircuit> = order
        .iter()
        .filter_map(|key| groups.get(key).map(|g| merge_group(key, g)))
        .collect();

    if !unnumbered.is_empty() {
        tracing::warn!(
            "{} reading(s) without a circuit number left unmerged",
            unnumbered.len()
        );
        merged.extend(unnumbered.into_iter().map(|d| merge_group("", &[d])));
    }

    let conflicted = merged.iter().filter(|m| m.has_conflicts()).count();
    tracing::info!(
        "Merged {} reading(s) into {} circuit(s), {} with conflicts",
        detections.len(),
        merged.len(),
        conflicted
    );
    merged
}

//! Board data migration
//!
//! Saved certificates store their board data as a JSON blob. Early versions
//! kept a single board's verification fields flat on the form; current data
//! has a `boards` array and tags every circuit row with a `boardId`.

use serde::Serialize;
use serde_json::{json, Map, Value};

use super::board::BoardError;

/// Current board data format version.
pub const BOARD_DATA_VERSION: u64 = 1;

/// Id given to the main board created when upgrading flat data.
pub const MIGRATED_MAIN_ID: &str = "main-board";

const LEGACY_FIELDS: [&str; 7] = [
    "dbReference",
    "zdb",
    "ipf",
    "confirmedCorrectPolarity",
    "confirmedPhaseSequence",
    "spdOperationalStatus",
    "spdNA",
];

const CIRCUIT_KEYS: [&str; 2] = ["scheduleOfTests", "circuits"];

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    pub from_version: u64,
    pub to_version: u64,
    pub changes: Vec<String>,
}

impl MigrationReport {
    pub fn is_noop(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Whether a blob carries board data at all, flat or current.
pub fn has_board_data(value: &Value) -> bool {
    value.as_object().is_some_and(|root| {
        root.contains_key("boards") || LEGACY_FIELDS.iter().any(|f| root.contains_key(*f))
    })
}

/// Upgrade a board data blob to the current format.
///
/// Flat legacy fields become the main board. Boards that break the
/// single-main invariant are repaired, and circuits pointing at missing
/// boards are moved to the main board. Current data passes through
/// unchanged.
pub fn migrate_board_data(value: Value) -> Result<(Value, MigrationReport), BoardError> {
    let Value::Object(mut root) = value else {
        return Err(BoardError::InvalidData(
            "board data must be a JSON object".to_string(),
        ));
    };

    let from_version = root.get("version").and_then(Value::as_u64).unwrap_or(0);
    let mut changes = Vec::new();

    if !root.contains_key("boards") {
        let main = lift_legacy_board(&mut root);
        root.insert("boards".to_string(), Value::Array(vec![main]));
        changes.push("created main board from flat verification fields".to_string());
    } else {
        // Stray flat fields next to a boards array are stale copies.
        for field in LEGACY_FIELDS {
            if root.remove(field).is_some() {
                changes.push(format!("dropped stale top-level '{}'", field));
            }
        }
    }

    let main_id = repair_main_board(&mut root, &mut changes)?;
    retag_circuits(&mut root, &main_id, &mut changes);

    if from_version != BOARD_DATA_VERSION {
        root.insert("version".to_string(), json!(BOARD_DATA_VERSION));
        changes.push(format!("version {} -> {}", from_version, BOARD_DATA_VERSION));
    }

    if !changes.is_empty() {
        tracing::info!("Migrated board data: {}", changes.join("; "));
    }

    Ok((
        Value::Object(root),
        MigrationReport {
            from_version,
            to_version: BOARD_DATA_VERSION,
            changes,
        },
    ))
}

fn lift_legacy_board(root: &mut Map<String, Value>) -> Value {
    let name = root
        .remove("dbReference")
        .and_then(|v| v.as_str().map(str::trim).map(str::to_string))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "Main Consumer Unit".to_string());
    let zdb = root.remove("zdb").and_then(|v| parse_measurement(&v));
    let ipf = root.remove("ipf").and_then(|v| parse_measurement(&v));
    let polarity = root
        .remove("confirmedCorrectPolarity")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    let phase_seq = root
        .remove("confirmedPhaseSequence")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    let spd_ok = root
        .remove("spdOperationalStatus")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    let spd_na = root.remove("spdNA").and_then(|v| v.as_bool()).unwrap_or(false);

    let spd_status = if spd_na {
        "not-applicable"
    } else if spd_ok {
        "operational"
    } else {
        "unchecked"
    };

    let mut board = json!({
        "id": MIGRATED_MAIN_ID,
        "name": name,
        "order": 0,
        "confirmedCorrectPolarity": polarity,
        "confirmedPhaseSequence": phase_seq,
        "spdStatus": spd_status,
    });
    if let Some(z) = zdb {
        board["zdb"] = json!(z);
    }
    if let Some(i) = ipf {
        board["ipf"] = json!(i);
    }
    board
}

/// Accepts numbers or form strings such as "0.35", "0.35Ω" or "1.6kA".
fn parse_measurement(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let numeric: String = s
                .trim()
                .chars()
                .take_while(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            numeric.parse().ok()
        }
        _ => None,
    }
}

fn repair_main_board(
    root: &mut Map<String, Value>,
    changes: &mut Vec<String>,
) -> Result<String, BoardError> {
    let boards = root
        .get_mut("boards")
        .and_then(Value::as_array_mut)
        .ok_or_else(|| BoardError::InvalidData("'boards' must be an array".to_string()))?;

    if boards.is_empty() {
        boards.push(json!({ "id": MIGRATED_MAIN_ID, "name": "Main Consumer Unit", "order": 0 }));
        changes.push("added missing main board".to_string());
    }

    let order_of = |b: &Value| b.get("order").and_then(Value::as_u64).unwrap_or(u64::MAX);
    let mains: Vec<usize> = boards
        .iter()
        .enumerate()
        .filter(|(_, b)| order_of(b) == 0)
        .map(|(i, _)| i)
        .collect();

    let main_idx = match mains.as_slice() {
        [] => {
            // Promote the lowest-ordered board.
            let idx = boards
                .iter()
                .enumerate()
                .min_by_key(|(_, b)| order_of(b))
                .map(|(i, _)| i)
                .unwrap_or(0);
            boards[idx]["order"] = json!(0);
            changes.push("promoted lowest-ordered board to main".to_string());
            idx
        }
        [only] => *only,
        [first, rest @ ..] => {
            let mut next = boards
                .iter()
                .map(order_of)
                .filter(|o| *o != u64::MAX)
                .max()
                .unwrap_or(0);
            for &idx in rest {
                next += 1;
                boards[idx]["order"] = json!(next);
            }
            changes.push(format!("demoted {} extra main board(s)", rest.len()));
            *first
        }
    };

    match boards[main_idx].get("id").and_then(Value::as_str) {
        Some(id) => Ok(id.to_string()),
        None => {
            boards[main_idx]["id"] = json!(MIGRATED_MAIN_ID);
            changes.push("assigned id to main board".to_string());
            Ok(MIGRATED_MAIN_ID.to_string())
        }
    }
}

fn retag_circuits(root: &mut Map<String, Value>, main_id: &str, changes: &mut Vec<String>) {
    let known: Vec<String> = root
        .get("boards")
        .and_then(Value::as_array)
        .map(|bs| {
            bs.iter()
                .filter_map(|b| b.get("id").and_then(Value::as_str).map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    for key in CIRCUIT_KEYS {
        let Some(rows) = root.get_mut(key).and_then(Value::as_array_mut) else {
            continue;
        };
        let mut tagged = 0;
        for row in rows.iter_mut().filter_map(Value::as_object_mut) {
            let valid = row
                .get("boardId")
                .and_then(Value::as_str)
                .map(|id| known.iter().any(|k| k == id))
                .unwrap_or(false);
            if !valid {
                row.insert("boardId".to_string(), json!(main_id));
                tagged += 1;
            }
        }
        if tagged > 0 {
            changes.push(format!("assigned {} '{}' row(s) to main board", tagged, key));
        }
    }
}

//! Built-in and external cable definitions
//!
//! Cable data is loaded from:
//! 1. JSON files embedded into the binary (the default UK catalogue)
//! 2. External JSON files in a user-supplied directory
//!
//! Users can add their own cable types by dropping JSON files into a
//! directory without recompiling.

use crate::cables::schema::CableData;
use std::path::Path;

const EMBEDDED_PVC_TWIN_EARTH: &str = include_str!("../../cables/pvc-twin-earth.json");
const EMBEDDED_SWA_XLPE: &str = include_str!("../../cables/swa-xlpe.json");
const EMBEDDED_PVC_SINGLE: &str = include_str!("../../cables/pvc-single.json");
const EMBEDDED_LSOH: &str = include_str!("../../cables/lsoh-cable.json");
const EMBEDDED_FIRE_RESISTANT: &str = include_str!("../../cables/fire-resistant.json");
const EMBEDDED_MICC: &str = include_str!("../../cables/micc.json");
const EMBEDDED_H07RN_F: &str = include_str!("../../cables/h07rn-f.json");
const EMBEDDED_NYY_J: &str = include_str!("../../cables/nyy-j.json");

/// All cable definitions compiled into the binary
pub fn get_builtin_cables() -> Vec<CableData> {
    let embedded_jsons = [
        EMBEDDED_PVC_TWIN_EARTH,
        EMBEDDED_SWA_XLPE,
        EMBEDDED_PVC_SINGLE,
        EMBEDDED_LSOH,
        EMBEDDED_FIRE_RESISTANT,
        EMBEDDED_MICC,
        EMBEDDED_H07RN_F,
        EMBEDDED_NYY_J,
    ];

    let mut cables = Vec::new();
    for json_str in embedded_jsons {
        match serde_json::from_str::<CableData>(json_str) {
            Ok(cable) => cables.push(cable),
            Err(e) => {
                tracing::warn!("Failed to parse embedded cable data: {}", e);
            }
        }
    }
    cables
}

/// Load cable definitions from a directory of JSON files.
/// Returns both the loaded cables and any per-file errors.
pub fn load_cables_from_directory(dir: &Path) -> (Vec<CableData>, Vec<String>) {
    let mut cables = Vec::new();
    let mut errors = Vec::new();

    if !dir.is_dir() {
        return (cables, errors);
    }

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            errors.push(format!("Failed to read directory {:?}: {}", dir, e));
            return (cables, errors);
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().map(|e| e != "json").unwrap_or(true) {
            continue;
        }

        match load_cable_from_file(&path) {
            Ok(cable) => {
                tracing::info!("Loaded cable type {} from {:?}", cable.cable_type, path.file_name());
                cables.push(cable);
            }
            Err(e) => {
                let error_msg = format!("Failed to load {:?}: {}", path.file_name(), e);
                tracing::warn!("{}", error_msg);
                errors.push(error_msg);
            }
        }
    }

    (cables, errors)
}

/// Load a single cable definition from a JSON file
pub fn load_cable_from_file(path: &Path) -> Result<CableData, String> {
    let content =
        std::fs::read_to_string(path).map_err(|e| format!("Failed to read file: {}", e))?;
    serde_json::from_str(&content).map_err(|e| format!("Failed to parse JSON: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_embedded_cables_parse() {
        let cables = get_builtin_cables();
        assert_eq!(cables.len(), 8);
        for cable in &cables {
            assert_eq!(cable.cable_type, cable.specification.cable_type);
            assert_eq!(cable.capacities.len(), cable.pricing.len());
        }
    }

    #[test]
    fn test_load_from_directory_reports_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("good.json"), EMBEDDED_MICC).unwrap();
        std::fs::write(dir.path().join("bad.json"), "{ not json").unwrap();
        std::fs::write(dir.path().join("README.md"), "ignored").unwrap();

        let (cables, errors) = load_cables_from_directory(dir.path());
        assert_eq!(cables.len(), 1);
        assert_eq!(cables[0].cable_type, "micc");
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let (cables, errors) = load_cables_from_directory(Path::new("/definitely/not/here"));
        assert!(cables.is_empty());
        assert!(errors.is_empty());
    }
}

//! Integration tests for CircuitGuard library

use circuitguard::design::SpdStatus;
use circuitguard::prelude::*;
use circuitguard::{discover_design_files, load_design, to_toon};
use std::path::PathBuf;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn test_validate_clean_design() {
    let result = CircuitGuardCore::validate_design_file(
        &fixture_path("clean.design.json"),
        &ValidationOptions::default(),
    )
    .expect("Clean design should load");

    assert_eq!(
        result.total_issues(),
        0,
        "Clean design should have no issues: {:?}",
        result.issues.iter().map(|i| &i.message).collect::<Vec<_>>()
    );
    assert!(result.source.ends_with("clean.design.json"));
}

#[test]
fn test_validate_problem_design() {
    let result = CircuitGuardCore::validate_design_file(
        &fixture_path("problems.design.json"),
        &ValidationOptions::default(),
    )
    .unwrap();

    let rule_ids: Vec<&str> = result.issues.iter().map(|i| i.rule_id.as_str()).collect();
    for expected in [
        "special_location_rcd",
        "socket_rcd",
        "ev_charger_rcd",
        "board_ipf",
        "board_zdb",
        "board_polarity",
        "board_spd",
    ] {
        assert!(rule_ids.contains(&expected), "missing {} in {:?}", expected, rule_ids);
    }

    // Both circuits with a 6kA device sit on the 10kA main board.
    let ipf: Vec<_> = result
        .issues
        .iter()
        .filter(|i| i.rule_id == "board_ipf")
        .filter_map(|i| i.component.as_deref())
        .collect();
    assert_eq!(ipf, vec!["Bathroom lights", "EV charger"]);

    // The garage board has its polarity confirmed.
    assert_eq!(
        result.issues.iter().filter(|i| i.rule_id == "board_polarity").count(),
        1
    );
    assert!(result.has_critical());
    assert!(result.stats.info >= 1);
}

#[test]
fn test_strict_mode_promotes_warnings() {
    let path = fixture_path("problems.design.json");
    let normal = CircuitGuardCore::validate_design_file(&path, &ValidationOptions::default()).unwrap();
    let strict = CircuitGuardCore::validate_design_file(
        &path,
        &ValidationOptions {
            strict_mode: true,
            ..ValidationOptions::default()
        },
    )
    .unwrap();

    assert!(normal.stats.high > 0);
    assert_eq!(strict.stats.high, 0);
    assert_eq!(strict.stats.critical, normal.stats.critical + normal.stats.high);
}

#[test]
fn test_rule_filter_limits_issues() {
    let options = ValidationOptions {
        rules: vec!["socket_rcd".to_string()],
        ..ValidationOptions::default()
    };
    let result =
        CircuitGuardCore::validate_design_file(&fixture_path("problems.design.json"), &options)
            .unwrap();

    assert_eq!(result.total_issues(), 1);
    assert_eq!(result.issues[0].rule_id, "socket_rcd");
    assert_eq!(result.issues[0].component.as_deref(), Some("Garage sockets"));
}

#[test]
fn test_earthing_override_requires_rcds() {
    let options = ValidationOptions {
        earthing: Some(EarthingSystem::Tt),
        ..ValidationOptions::default()
    };
    let result =
        CircuitGuardCore::validate_design_file(&fixture_path("clean.design.json"), &options)
            .unwrap();

    let tt: Vec<_> = result
        .issues
        .iter()
        .filter(|i| i.rule_id == "tt_rcd")
        .filter_map(|i| i.component.as_deref())
        .collect();
    assert_eq!(tt, vec!["Lighting", "Immersion heater"]);
}

fn zdb_messages(path: &std::path::Path, earthing: Option<EarthingSystem>) -> Vec<String> {
    let options = ValidationOptions {
        earthing,
        rules: vec!["board_zdb".to_string()],
        ..ValidationOptions::default()
    };
    CircuitGuardCore::validate_design_file(path, &options)
        .unwrap()
        .issues
        .into_iter()
        .map(|i| i.message)
        .collect()
}

#[test]
fn test_earthing_override_applies_to_board_zdb() {
    // Main board Zdb 0.5Ω: over the TN-C-S ceiling, no ceiling on TT.
    let tn_c_s = fixture_path("problems.design.json");
    assert_eq!(zdb_messages(&tn_c_s, None).len(), 1);
    assert!(zdb_messages(&tn_c_s, Some(EarthingSystem::Tt)).is_empty());

    let dir = tempfile::tempdir().unwrap();
    let tt = dir.path().join("tt.design.json");
    std::fs::write(
        &tt,
        r#"{
            "projectName": "Rural cottage",
            "earthingSystem": "TT",
            "boards": [{"id": "main", "name": "Main", "order": 0, "zdb": 0.5}],
            "circuits": []
        }"#,
    )
    .unwrap();
    assert!(zdb_messages(&tt, None).is_empty());
    let overridden = zdb_messages(&tt, Some(EarthingSystem::TnCS));
    assert_eq!(overridden.len(), 1);
    assert!(overridden[0].contains("TN-C-S"), "{:?}", overridden);
}

#[test]
fn test_legacy_design_is_migrated() {
    let design = load_design(&fixture_path("legacy.design.json")).unwrap();

    assert_eq!(design.boards.len(), 1);
    let main = &design.boards[0];
    assert!(main.is_main());
    assert_eq!(main.name, "DB1");
    assert_eq!(main.zdb, Some(0.27));
    assert_eq!(main.ipf, Some(1.6));
    assert_eq!(main.spd_status, SpdStatus::NotApplicable);
    assert_eq!(design.circuits[0].board_id.as_deref(), Some(main.id.as_str()));

    let result = CircuitGuardCore::validate_design_file(
        &fixture_path("legacy.design.json"),
        &ValidationOptions::default(),
    )
    .unwrap();
    assert_eq!(result.total_issues(), 0);
}

#[test]
fn test_validate_nonexistent_file() {
    let result = CircuitGuardCore::validate_design_file(
        &fixture_path("does_not_exist.design.json"),
        &ValidationOptions::default(),
    );
    assert!(matches!(result, Err(CircuitGuardError::Io(_))));
}

#[test]
fn test_invalid_json_is_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.design.json");
    std::fs::write(&path, "{ not json").unwrap();

    let err = CircuitGuardCore::validate_design_file(&path, &ValidationOptions::default())
        .unwrap_err();
    assert!(matches!(err, CircuitGuardError::Parse(_)));
    assert!(err.to_string().contains("broken.design.json"));
}

#[test]
fn test_validate_project_directory() {
    let results = CircuitGuardCore::validate_project(
        &fixture_path(""),
        &ValidationOptions::default(),
    )
    .unwrap();

    assert_eq!(results.len(), 3);
    let critical: usize = results.iter().map(|r| r.stats.critical).sum();
    assert!(critical > 0);
}

#[test]
fn test_discover_design_files() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("site/a")).unwrap();
    std::fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();
    std::fs::create_dir_all(dir.path().join(".cache")).unwrap();
    std::fs::write(dir.path().join("site/a/house.design.json"), "{}").unwrap();
    std::fs::write(dir.path().join("flat.design.json"), "{}").unwrap();
    std::fs::write(dir.path().join("notes.json"), "{}").unwrap();
    std::fs::write(dir.path().join("node_modules/pkg/x.design.json"), "{}").unwrap();
    std::fs::write(dir.path().join(".cache/y.design.json"), "{}").unwrap();

    let files = discover_design_files(dir.path()).unwrap();
    let names: Vec<_> = files
        .iter()
        .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().replace('\\', "/"))
        .collect();
    assert_eq!(names, vec!["flat.design.json", "site/a/house.design.json"]);
}

#[test]
fn test_result_renders_as_toon() {
    let result = CircuitGuardCore::validate_design_file(
        &fixture_path("clean.design.json"),
        &ValidationOptions::default(),
    )
    .unwrap();
    let toon = to_toon(&serde_json::to_value(&result).unwrap());

    assert!(toon.contains("issues[0]:"));
    assert!(toon.contains("stats:\n  critical: 0"));
}

//! Core validation logic shared by the CLI and library users.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analyzer::check_design;
use crate::analyzer::rules::{Issue, Severity};
use crate::config::ConfigError;
use crate::content::embedder::EmbeddingError;
use crate::design::{
    has_board_data, migrate_board_data, BoardError, EarthingSystem, InstallationDesign,
};
use crate::schedule::{merge_detections, DetectedCircuit, MergedCircuit};

#[derive(Debug, thiserror::Error)]
pub enum CircuitGuardError {
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Board error: {0}")]
    Board(#[from] BoardError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),
}

/// Options for validation runs.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidationOptions {
    /// Overrides the supply voltage declared in the design.
    pub voltage: Option<f64>,
    /// Overrides the earthing system declared in the design.
    pub earthing: Option<EarthingSystem>,
    pub max_voltage_drop_lighting: f64,
    pub max_voltage_drop_other: f64,
    /// Rule ids to run; empty runs everything.
    pub rules: Vec<String>,
    /// Treat warnings as errors.
    pub strict_mode: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            voltage: None,
            earthing: None,
            max_voltage_drop_lighting: 3.0,
            max_voltage_drop_other: 5.0,
            rules: vec![],
            strict_mode: false,
        }
    }
}

impl ValidationOptions {
    pub fn rule_enabled(&self, id: &str) -> bool {
        self.rules.is_empty() || self.rules.iter().any(|r| r == id)
    }
}

/// Validation result for one design, with issues and counts.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    /// Project name or file the design came from.
    pub source: String,
    pub issues: Vec<Issue>,
    pub stats: ValidationStats,
    pub checked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ValidationStats {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub info: usize,
}

impl ValidationResult {
    pub fn new(source: impl Into<String>, issues: Vec<Issue>) -> Self {
        let stats = issues_to_stats(&issues);
        Self {
            source: source.into(),
            issues,
            stats,
            checked_at: Utc::now(),
        }
    }

    pub fn has_critical(&self) -> bool {
        self.stats.critical > 0
    }

    pub fn has_high_or_critical(&self) -> bool {
        self.stats.critical > 0 || self.stats.high > 0
    }

    pub fn total_issues(&self) -> usize {
        self.stats.critical
            + self.stats.high
            + self.stats.medium
            + self.stats.low
            + self.stats.info
    }
}

/// Error -> critical, Warning -> high, Suggestion -> medium, Info -> low.
/// `info` counts informational notes that carry no suggestion.
fn issues_to_stats(issues: &[Issue]) -> ValidationStats {
    let mut stats = ValidationStats::default();
    for i in issues {
        match i.severity {
            Severity::Error => stats.critical += 1,
            Severity::Warning => stats.high += 1,
            Severity::Suggestion => stats.medium += 1,
            Severity::Info if i.suggestion.is_some() => stats.low += 1,
            Severity::Info => stats.info += 1,
        }
    }
    stats
}

/// Recursively discover `*.design.json` files in a directory.
pub fn discover_design_files(dir: &Path) -> Result<Vec<PathBuf>, CircuitGuardError> {
    let mut files = Vec::new();
    walk_dir(dir, &mut files, 0)?;
    files.sort();
    Ok(files)
}

fn walk_dir(dir: &Path, files: &mut Vec<PathBuf>, depth: usize) -> Result<(), CircuitGuardError> {
    if depth > 20 {
        return Ok(());
    }
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if name.starts_with('.') || name == "node_modules" || name == "target" {
                continue;
            }
            walk_dir(&path, files, depth + 1)?;
        } else if path.is_file() {
            let is_design = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.ends_with(".design.json"))
                .unwrap_or(false);
            if is_design {
                files.push(path);
            }
        }
    }
    Ok(())
}

/// Parse a design file, upgrading legacy board data on the way in.
pub fn load_design(path: &Path) -> Result<InstallationDesign, CircuitGuardError> {
    let content = std::fs::read_to_string(path)?;
    let mut value: serde_json::Value = serde_json::from_str(&content)
        .map_err(|e| CircuitGuardError::Parse(format!("{}: {}", path.display(), e)))?;

    if has_board_data(&value) {
        let (migrated, report) = migrate_board_data(value)?;
        if !report.is_noop() {
            tracing::info!(
                "Upgraded board data in {} ({} change(s))",
                path.display(),
                report.changes.len()
            );
        }
        value = migrated;
    }

    serde_json::from_value(value)
        .map_err(|e| CircuitGuardError::Parse(format!("{}: {}", path.display(), e)))
}

/// Core validation API used by the CLI.
pub struct CircuitGuardCore;

impl CircuitGuardCore {
    /// Validate a single design file.
    pub fn validate_design_file(
        path: &Path,
        options: &ValidationOptions,
    ) -> Result<ValidationResult, CircuitGuardError> {
        let design = load_design(path)?;
        let mut result = check_design(&design, options);
        result.source = path.display().to_string();
        Ok(result)
    }

    /// Merge a JSON array of per-photo detections into a circuit schedule.
    pub fn merge_detection_file(path: &Path) -> Result<Vec<MergedCircuit>, CircuitGuardError> {
        let content = std::fs::read_to_string(path)?;
        let detections: Vec<DetectedCircuit> = serde_json::from_str(&content)
            .map_err(|e| CircuitGuardError::Parse(format!("{}: {}", path.display(), e)))?;
        Ok(merge_detections(&detections))
    }

    /// Validate every design file found under a directory.
    pub fn validate_project(
        dir: &Path,
        options: &ValidationOptions,
    ) -> Result<Vec<ValidationResult>, CircuitGuardError> {
        let files = discover_design_files(dir)?;
        tracing::info!("Found {} design file(s) under {}", files.len(), dir.display());
        files
            .iter()
            .map(|path| Self::validate_design_file(path, options))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_buckets() {
        let issues = vec![
            Issue::new("a", Severity::Error, "e"),
            Issue::new("b", Severity::Warning, "w"),
            Issue::new("c", Severity::Suggestion, "s"),
            Issue::new("d", Severity::Info, "i").with_suggestion("do something"),
            Issue::new("e", Severity::Info, "note"),
        ];
        let result = ValidationResult::new("test", issues);
        assert_eq!(
            result.stats,
            ValidationStats {
                critical: 1,
                high: 1,
                medium: 1,
                low: 1,
                info: 1
            }
        );
        assert_eq!(result.total_issues(), 5);
        assert!(result.has_critical());
    }

    #[test]
    fn test_subsystem_errors_convert() {
        let board: CircuitGuardError = BoardError::CannotRemoveMain.into();
        assert!(matches!(board, CircuitGuardError::Board(_)));
        assert_eq!(board.to_string(), "Board error: the main board cannot be removed");

        let embedding: CircuitGuardError = EmbeddingError::MissingApiKey.into();
        assert_eq!(embedding.to_string(), "Embedding error: Missing API key");
    }

    #[test]
    fn test_rule_filter() {
        let mut options = ValidationOptions::default();
        assert!(options.rule_enabled("socket_rcd"));
        options.rules = vec!["tt_rcd".to_string()];
        assert!(options.rule_enabled("tt_rcd"));
        assert!(!options.rule_enabled("socket_rcd"));
    }

    #[test]
    fn test_discover_skips_hidden_and_target() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("flats/block-a")).unwrap();
        std::fs::create_dir_all(root.join(".cache")).unwrap();
        std::fs::create_dir_all(root.join("target")).unwrap();
        std::fs::write(root.join("house.design.json"), "{}").unwrap();
        std::fs::write(root.join("flats/block-a/flat1.design.json"), "{}").unwrap();
        std::fs::write(root.join("notes.json"), "{}").unwrap();
        std::fs::write(root.join(".cache/old.design.json"), "{}").unwrap();
        std::fs::write(root.join("target/copy.design.json"), "{}").unwrap();

        let files = discover_design_files(root).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| f.to_string_lossy().ends_with(".design.json")));
    }

    #[test]
    fn test_load_design_upgrades_flat_board_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.design.json");
        std::fs::write(
            &path,
            r#"{"projectName": "Old cert", "zdb": "0.27Ω", "ipf": "1.2",
                "circuits": [{"name": "Lights", "loadPower": 500, "cableLength": 10, "loadType": "lighting"}]}"#,
        )
        .unwrap();

        let design = load_design(&path).unwrap();
        assert_eq!(design.boards.len(), 1);
        assert!(design.boards[0].is_main());
        assert_eq!(design.boards[0].zdb, Some(0.27));
        assert_eq!(design.circuits[0].board_id.as_deref(), Some("main-board"));
    }

    #[test]
    fn test_load_design_reports_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.design.json");
        std::fs::write(&path, "{ nope").unwrap();
        assert!(matches!(load_design(&path), Err(CircuitGuardError::Parse(_))));
    }
}

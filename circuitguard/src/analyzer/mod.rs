pub mod rules;
pub mod verification;

pub use rules::*;
pub use verification::{check_boards, check_loop_impedance, DESIGN_CHECKS};

use serde::{Deserialize, Serialize};

use crate::cables::CableDatabase;
use crate::core::{ValidationOptions, ValidationResult};
use crate::design::{CircuitInput, EarthingSystem, InstallationDesign};

/// Outcome of the per-circuit BS 7671 checks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CircuitValidation {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Run the default circuit rules against one circuit.
pub fn validate_circuit(
    circuit: &CircuitInput,
    voltage: f64,
    earthing: EarthingSystem,
) -> CircuitValidation {
    let engine = RulesEngine::with_default_rules();
    let ctx = RuleContext::new(voltage, earthing);

    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    for issue in engine.analyze(circuit, &ctx) {
        match issue.severity {
            Severity::Error => errors.push(issue.message),
            Severity::Warning => warnings.push(issue.message),
            Severity::Info | Severity::Suggestion => {}
        }
    }

    CircuitValidation {
        is_valid: errors.is_empty(),
        errors,
        warnings,
    }
}

/// Check a whole installation: every circuit, every board, and loop impedance.
pub fn check_design(design: &InstallationDesign, options: &ValidationOptions) -> ValidationResult {
    let mut engine = RulesEngine::with_default_rules();
    engine.retain_rules(&options.rules);

    let ctx = RuleContext {
        voltage: options.voltage.unwrap_or(design.voltage),
        earthing: options.earthing.unwrap_or(design.earthing_system),
        max_voltage_drop_lighting: options.max_voltage_drop_lighting,
        max_voltage_drop_other: options.max_voltage_drop_other,
        cables: CableDatabase::builtin(),
    };

    let mut issues = Vec::new();
    for circuit in &design.circuits {
        issues.extend(engine.analyze(&circuit.input, &ctx));
    }
    issues.extend(check_boards(design, ctx.earthing, |id| options.rule_enabled(id)));
    if options.rule_enabled("loop_impedance") {
        issues.extend(check_loop_impedance(design, &ctx));
    }

    if options.strict_mode {
        for issue in &mut issues {
            if issue.severity == Severity::Warning {
                issue.severity = Severity::Error;
            }
        }
    }

    tracing::info!(
        "Checked '{}': {} circuit(s), {} board(s), {} issue(s)",
        design.project_name,
        design.circuits.len(),
        design.boards.len(),
        issues.len()
    );
    ValidationResult::new(design.project_name.clone(), issues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::{RcdType, SpecialLocation};

    #[test]
    fn test_validate_circuit_clean() {
        let circuit = CircuitInput::new("Lights", 600.0, "lighting").with_length(12.0);
        let v = validate_circuit(&circuit, 230.0, EarthingSystem::TnCS);
        assert!(v.is_valid);
        assert!(v.errors.is_empty());
        assert!(v.warnings.is_empty());
    }

    #[test]
    fn test_validate_circuit_tt_bathroom() {
        let circuit = CircuitInput::new("Bathroom fan", 50.0, "general")
            .with_length(8.0)
            .with_location(SpecialLocation::Bathroom);
        let v = validate_circuit(&circuit, 230.0, EarthingSystem::Tt);
        assert!(!v.is_valid);
        assert_eq!(v.errors.len(), 2);
    }

    #[test]
    fn test_validate_circuit_ev_without_type_is_warning_only() {
        let circuit = CircuitInput::new("EV", 7360.0, "ev-charger")
            .with_length(10.0)
            .with_rcd(None);
        let v = validate_circuit(&circuit, 230.0, EarthingSystem::TnCS);
        assert!(v.is_valid);
        assert_eq!(v.warnings.len(), 1);

        let ok = circuit.with_rcd(Some(RcdType::A));
        assert!(validate_circuit(&ok, 230.0, EarthingSystem::TnCS).warnings.is_empty());
    }

    #[test]
    fn test_zero_voltage_is_invalid_not_a_panic() {
        let circuit = CircuitInput::new("Lights", 600.0, "lighting").with_length(12.0);
        let v = validate_circuit(&circuit, 0.0, EarthingSystem::TnCS);
        assert!(!v.is_valid);
        assert_eq!(v.errors.len(), 1);
    }

    fn socket_design() -> InstallationDesign {
        InstallationDesign {
            project_name: "Flat 2".to_string(),
            earthing_system: EarthingSystem::TnCS,
            voltage: 230.0,
            ze: None,
            boards: Vec::new(),
            circuits: vec![
                CircuitInput::new("Sockets", 3000.0, "sockets").with_length(15.0).into(),
                CircuitInput::new("Shed", 100.0, "general").with_length(110.0).into(),
            ],
        }
    }

    #[test]
    fn test_check_design_strict_and_filter() {
        let design = socket_design();
        let result = check_design(&design, &ValidationOptions::default());
        assert_eq!(result.source, "Flat 2");
        assert_eq!(result.stats.critical, 1);
        assert_eq!(result.stats.high, 1);

        let strict = ValidationOptions {
            strict_mode: true,
            ..Default::default()
        };
        let result = check_design(&design, &strict);
        assert_eq!(result.stats.critical, 2);
        assert_eq!(result.stats.high, 0);

        let only_length = ValidationOptions {
            rules: vec!["cable_length".to_string()],
            ..Default::default()
        };
        let result = check_design(&design, &only_length);
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].rule_id, "cable_length");
    }

    #[test]
    fn test_options_override_design_earthing() {
        let design = socket_design();
        let options = ValidationOptions {
            earthing: Some(EarthingSystem::Tt),
            ..Default::default()
        };
        let result = check_design(&design, &options);
        assert!(result.issues.iter().any(|i| i.rule_id == "tt_rcd"));
    }
}

use crate::cables::CableDatabase;
use crate::calc::estimate::{
    calculate_design_current, estimate_cable_size, voltage_drop, voltage_drop_percent,
    MCB_RATINGS,
};
use crate::design::{CircuitInput, EarthingSystem, Phases, RcdType, SpecialLocation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
    Info,
    Suggestion,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
            Severity::Suggestion => "suggestion",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: String,
    pub rule_id: String,
    pub severity: Severity,
    pub message: String,
    /// Circuit or board the finding is about.
    pub component: Option<String>,
    pub suggestion: Option<String>,
}

impl Issue {
    pub fn new(
        rule_id: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            rule_id: rule_id.into(),
            severity,
            message: message.into(),
            component: None,
            suggestion: None,
        }
    }

    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// Supply characteristics and limits the circuit rules check against.
pub struct RuleContext<'a> {
    pub voltage: f64,
    pub earthing: EarthingSystem,
    /// Maximum voltage drop for lighting circuits, percent.
    pub max_voltage_drop_lighting: f64,
    /// Maximum voltage drop for all other circuits, percent.
    pub max_voltage_drop_other: f64,
    pub cables: &'a CableDatabase,
}

impl RuleContext<'static> {
    /// BS 7671 Appendix 4 limits against the built-in cable catalogue.
    pub fn new(voltage: f64, earthing: EarthingSystem) -> Self {
        Self {
            voltage,
            earthing,
            max_voltage_drop_lighting: 3.0,
            max_voltage_drop_other: 5.0,
            cables: CableDatabase::builtin(),
        }
    }
}

impl RuleContext<'_> {
    pub(crate) fn has_valid_inputs(&self, circuit: &CircuitInput) -> bool {
        circuit.load_power > 0.0 && circuit.cable_length > 0.0 && self.voltage > 0.0
    }
}

pub trait Rule: Send + Sync {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    fn severity(&self) -> Severity;
    fn check(&self, circuit: &CircuitInput, ctx: &RuleContext) -> Vec<Issue>;

    fn issue(&self, circuit: &CircuitInput, message: String) -> Issue {
        Issue::new(self.id(), self.severity(), message).with_component(circuit.name.clone())
    }
}

pub struct RulesEngine {
    rules: Vec<Arc<dyn Rule>>,
}

impl RulesEngine {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn with_default_rules() -> Self {
        let mut engine = Self::new();
        engine.add_rule(Arc::new(InvalidInputRule));
        engine.add_rule(Arc::new(TtRcdRule));
        engine.add_rule(Arc::new(SpecialLocationRcdRule));
        engine.add_rule(Arc::new(EvChargerRcdRule));
        engine.add_rule(Arc::new(SocketRcdRule));
        engine.add_rule(Arc::new(DesignCurrentLimitRule));
        engine.add_rule(Arc::new(VoltageDropRule));
        engine.add_rule(Arc::new(CableLengthRule));
        engine
    }

    pub fn add_rule(&mut self, rule: Arc<dyn Rule>) {
        self.rules.push(rule);
    }

    /// Keep only the rules whose id is listed. An empty list keeps everything.
    pub fn retain_rules(&mut self, ids: &[String]) {
        if ids.is_empty() {
            return;
        }
        self.rules.retain(|r| ids.iter().any(|id| id == r.id()));
    }

    pub fn rules(&self) -> impl Iterator<Item = &dyn Rule> {
        self.rules.iter().map(|r| r.as_ref())
    }

    pub fn analyze(&self, circuit: &CircuitInput, ctx: &RuleContext) -> Vec<Issue> {
        let mut issues = Vec::new();
        for rule in &self.rules {
            issues.extend(rule.check(circuit, ctx));
        }
        tracing::debug!(
            "{} rule(s) raised {} issue(s) for circuit '{}'",
            self.rules.len(),
            issues.len(),
            circuit.name
        );
        issues
    }
}

impl Default for RulesEngine {
    fn default() -> Self {
        Self::with_default_rules()
    }
}

fn is_socket_circuit(circuit: &CircuitInput) -> bool {
    matches!(circuit.load_key().as_str(), "sockets" | "ring-main")
}

// Rule implementations

pub struct InvalidInputRule;

impl Rule for InvalidInputRule {
    fn id(&self) -> &str {
        "invalid_input"
    }

    fn name(&self) -> &str {
        "Circuit Input Check"
    }

    fn severity(&self) -> Severity {
        Severity::Error
    }

    fn check(&self, circuit: &CircuitInput, ctx: &RuleContext) -> Vec<Issue> {
        let mut issues = Vec::new();
        // Negated comparisons so NaN is rejected too.
        if !(circuit.load_power > 0.0) {
            issues.push(self.issue(
                circuit,
                format!("Load power must be greater than zero (got {}W)", circuit.load_power),
            ));
        }
        if !(circuit.cable_length > 0.0) {
            issues.push(self.issue(
                circuit,
                format!("Cable length must be greater than zero (got {}m)", circuit.cable_length),
            ));
        }
        if !(ctx.voltage > 0.0) {
            issues.push(self.issue(
                circuit,
                format!("Supply voltage must be greater than zero (got {}V)", ctx.voltage),
            ));
        }
        issues
    }
}

pub struct TtRcdRule;

impl Rule for TtRcdRule {
    fn id(&self) -> &str {
        "tt_rcd"
    }

    fn name(&self) -> &str {
        "TT Earthing RCD Protection"
    }

    fn severity(&self) -> Severity {
        Severity::Error
    }

    fn check(&self, circuit: &CircuitInput, ctx: &RuleContext) -> Vec<Issue> {
        if ctx.earthing != EarthingSystem::Tt || circuit.rcd_protection {
            return Vec::new();
        }
        vec![self
            .issue(
                circuit,
                "TT earthing system requires RCD protection on all circuits (411.5)".to_string(),
            )
            .with_suggestion("Protect the circuit with a 30mA RCD or RCBO")]
    }
}

pub struct SpecialLocationRcdRule;

impl Rule for SpecialLocationRcdRule {
    fn id(&self) -> &str {
        "special_location_rcd"
    }

    fn name(&self) -> &str {
        "Special Location RCD Protection"
    }

    fn severity(&self) -> Severity {
        Severity::Error
    }

    fn check(&self, circuit: &CircuitInput, _ctx: &RuleContext) -> Vec<Issue> {
        if circuit.rcd_protection {
            return Vec::new();
        }
        let (location, regulation) = match circuit.special_location {
            SpecialLocation::Bathroom => ("Bathroom", "701.411.3.3"),
            SpecialLocation::Outdoor => ("Outdoor", "411.3.3"),
            SpecialLocation::SwimmingPool => ("Swimming pool", "702.411.3.3"),
            SpecialLocation::Sauna => ("Sauna", "703.411.3.3"),
            _ => return Vec::new(),
        };
        vec![self
            .issue(
                circuit,
                format!("{} circuits require 30mA RCD protection ({})", location, regulation),
            )
            .with_suggestion("Add 30mA RCD protection to this circuit")]
    }
}

pub struct EvChargerRcdRule;

impl Rule for EvChargerRcdRule {
    fn id(&self) -> &str {
        "ev_charger_rcd"
    }

    fn name(&self) -> &str {
        "EV Charger RCD Type"
    }

    fn severity(&self) -> Severity {
        Severity::Error
    }

    fn check(&self, circuit: &CircuitInput, _ctx: &RuleContext) -> Vec<Issue> {
        if circuit.load_key() != "ev-charger" {
            return Vec::new();
        }
        if !circuit.rcd_protection {
            return vec![self
                .issue(circuit, "EV charger circuits require RCD protection (722.531.3.101)".to_string())
                .with_suggestion("Use a Type A RCD with 6mA DC detection, or a Type B RCD")];
        }
        match circuit.rcd_type {
            Some(RcdType::Ac) => vec![self
                .issue(
                    circuit,
                    "Type AC RCDs must not be used for EV chargers; Type A or B is required"
                        .to_string(),
                )
                .with_suggestion("Replace with a Type A (with RDC-DD) or Type B RCD")],
            None => vec![Issue::new(
                self.id(),
                Severity::Warning,
                "EV charger RCD type not specified; confirm Type A or B",
            )
            .with_component(circuit.name.clone())],
            Some(_) => Vec::new(),
        }
    }
}

pub struct SocketRcdRule;

impl Rule for SocketRcdRule {
    fn id(&self) -> &str {
        "socket_rcd"
    }

    fn name(&self) -> &str {
        "Socket Outlet RCD Protection"
    }

    fn severity(&self) -> Severity {
        Severity::Error
    }

    fn check(&self, circuit: &CircuitInput, _ctx: &RuleContext) -> Vec<Issue> {
        if !is_socket_circuit(circuit) || circuit.rcd_protection {
            return Vec::new();
        }
        vec![self
            .issue(
                circuit,
                "Socket outlets rated up to 32A require 30mA RCD protection (411.3.3)".to_string(),
            )
            .with_suggestion("Protect socket circuits with a 30mA RCD or RCBO")]
    }
}

pub struct DesignCurrentLimitRule;

impl Rule for DesignCurrentLimitRule {
    fn id(&self) -> &str {
        "design_current_limit"
    }

    fn name(&self) -> &str {
        "Design Current Limit"
    }

    fn severity(&self) -> Severity {
        Severity::Error
    }

    fn check(&self, circuit: &CircuitInput, ctx: &RuleContext) -> Vec<Issue> {
        if !ctx.has_valid_inputs(circuit) {
            return Vec::new();
        }
        let ib = calculate_design_current(circuit.load_power, ctx.voltage, circuit.phases);
        let largest = MCB_RATINGS[MCB_RATINGS.len() - 1];
        if ib <= f64::from(largest) {
            return Vec::new();
        }
        vec![self
            .issue(
                circuit,
                format!(
                    "Design current {:.1}A exceeds the largest standard MCB rating ({}A)",
                    ib, largest
                ),
            )
            .with_suggestion("Split the load across circuits or supply it from a dedicated switchfuse")]
    }
}

pub struct VoltageDropRule;

impl VoltageDropRule {
    /// Estimated drop as a percentage of the supply, or None if no mV/A/m data.
    pub fn estimate_percent(circuit: &CircuitInput, ctx: &RuleContext) -> Option<f64> {
        let ib = calculate_design_current(circuit.load_power, ctx.voltage, circuit.phases);
        let size = ctx
            .cables
            .find_optimal_cable_size(&circuit.cable_type, ib, &circuit.installation_method)
            .map(|s| s.size)
            .unwrap_or_else(|| estimate_cable_size(ib));
        let mv = ctx
            .cables
            .voltage_drop_factor(&circuit.cable_type, size)
            .or_else(|| ctx.cables.voltage_drop_factor("pvc-twin-earth", size))?;

        let (mv, reference_voltage) = match circuit.phases {
            Phases::Single => (mv, ctx.voltage),
            // Balanced three-phase: line drop from the single-phase figure.
            Phases::Three => (mv * 3f64.sqrt() / 2.0, ctx.voltage * 3f64.sqrt()),
        };
        let drop = voltage_drop(mv, ib, circuit.cable_length);
        Some(voltage_drop_percent(drop, reference_voltage))
    }
}

impl Rule for VoltageDropRule {
    fn id(&self) -> &str {
        "voltage_drop"
    }

    fn name(&self) -> &str {
        "Voltage Drop Limit"
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn check(&self, circuit: &CircuitInput, ctx: &RuleContext) -> Vec<Issue> {
        if !ctx.has_valid_inputs(circuit) {
            return Vec::new();
        }
        let Some(percent) = Self::estimate_percent(circuit, ctx) else {
            return Vec::new();
        };
        let limit = if circuit.load_key() == "lighting" {
            ctx.max_voltage_drop_lighting
        } else {
            ctx.max_voltage_drop_other
        };
        if percent <= limit {
            return Vec::new();
        }
        vec![self
            .issue(
                circuit,
                format!(
                    "Estimated voltage drop {:.2}% exceeds the {:.0}% limit over {}m",
                    percent, limit, circuit.cable_length
                ),
            )
            .with_suggestion("Increase the cable size or shorten the route")]
    }
}

pub struct CableLengthRule;

const LONG_RUN_METRES: f64 = 100.0;

impl Rule for CableLengthRule {
    fn id(&self) -> &str {
        "cable_length"
    }

    fn name(&self) -> &str {
        "Long Cable Run"
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn check(&self, circuit: &CircuitInput, _ctx: &RuleContext) -> Vec<Issue> {
        if circuit.cable_length <= LONG_RUN_METRES {
            return Vec::new();
        }
        vec![self
            .issue(
                circuit,
                format!(
                    "Cable run of {}m exceeds {}m; verify voltage drop and disconnection time",
                    circuit.cable_length, LONG_RUN_METRES
                ),
            )
            .with_suggestion("Consider a sub-main and local distribution board")]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> RuleContext<'static> {
        RuleContext::new(230.0, EarthingSystem::TnCS)
    }

    fn rule_ids(issues: &[Issue]) -> Vec<&str> {
        issues.iter().map(|i| i.rule_id.as_str()).collect()
    }

    #[test]
    fn test_tt_requires_rcd() {
        let circuit = CircuitInput::new("Lights", 500.0, "lighting").with_length(10.0);
        let tt = RuleContext::new(230.0, EarthingSystem::Tt);
        let issues = TtRcdRule.check(&circuit, &tt);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Error);
        assert!(TtRcdRule.check(&circuit, &ctx()).is_empty());
        assert!(TtRcdRule
            .check(&circuit.clone().with_rcd(Some(RcdType::A)), &tt)
            .is_empty());
    }

    #[test]
    fn test_special_locations() {
        for loc in [
            SpecialLocation::Bathroom,
            SpecialLocation::Outdoor,
            SpecialLocation::SwimmingPool,
            SpecialLocation::Sauna,
        ] {
            let circuit = CircuitInput::new("X", 1000.0, "general")
                .with_length(5.0)
                .with_location(loc);
            assert_eq!(SpecialLocationRcdRule.check(&circuit, &ctx()).len(), 1, "{:?}", loc);
        }
        let indoor = CircuitInput::new("X", 1000.0, "general").with_length(5.0);
        assert!(SpecialLocationRcdRule.check(&indoor, &ctx()).is_empty());
    }

    #[test]
    fn test_ev_charger_rcd_types() {
        let base = CircuitInput::new("EV", 7360.0, "ev-charger").with_length(15.0);

        let none = EvChargerRcdRule.check(&base, &ctx());
        assert_eq!(none[0].severity, Severity::Error);

        let ac = EvChargerRcdRule.check(&base.clone().with_rcd(Some(RcdType::Ac)), &ctx());
        assert_eq!(ac[0].severity, Severity::Error);

        let unknown = EvChargerRcdRule.check(&base.clone().with_rcd(None), &ctx());
        assert_eq!(unknown[0].severity, Severity::Warning);

        assert!(EvChargerRcdRule
            .check(&base.clone().with_rcd(Some(RcdType::A)), &ctx())
            .is_empty());
        assert!(EvChargerRcdRule
            .check(&base.with_rcd(Some(RcdType::B)), &ctx())
            .is_empty());
    }

    #[test]
    fn test_sockets_need_rcd() {
        let ring = CircuitInput::new("Ring", 7000.0, "Ring Main").with_length(30.0);
        assert_eq!(rule_ids(&SocketRcdRule.check(&ring, &ctx())), vec!["socket_rcd"]);
    }

    #[test]
    fn test_design_current_limit() {
        let big = CircuitInput::new("Plant", 40_000.0, "motor").with_length(10.0);
        assert_eq!(DesignCurrentLimitRule.check(&big, &ctx()).len(), 1);
        let three = big.clone().with_phases(Phases::Three);
        assert!(DesignCurrentLimitRule.check(&three, &ctx()).is_empty());
    }

    #[test]
    fn test_invalid_inputs_each_reported() {
        let bad = CircuitInput::new("Bad", 0.0, "general").with_length(-1.0);
        let zero_volts = RuleContext::new(0.0, EarthingSystem::TnCS);
        let issues = InvalidInputRule.check(&bad, &zero_volts);
        assert_eq!(issues.len(), 3);
        assert!(DesignCurrentLimitRule.check(&bad, &zero_volts).is_empty());
        assert!(VoltageDropRule.check(&bad, &zero_volts).is_empty());
    }

    #[test]
    fn test_voltage_drop_long_lighting_run() {
        let short = CircuitInput::new("Lights", 1000.0, "lighting").with_length(10.0);
        assert!(VoltageDropRule.check(&short, &ctx()).is_empty());

        let long = CircuitInput::new("Garden lights", 1000.0, "lighting").with_length(90.0);
        let issues = VoltageDropRule.check(&long, &ctx());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Warning);
    }

    #[test]
    fn test_cable_length_warning() {
        let long = CircuitInput::new("Outbuilding", 2000.0, "general").with_length(120.0);
        assert_eq!(CableLengthRule.check(&long, &ctx()).len(), 1);
    }

    #[test]
    fn test_engine_retain_rules() {
        let mut engine = RulesEngine::with_default_rules();
        assert_eq!(engine.rules().count(), 8);
        engine.retain_rules(&["socket_rcd".to_string()]);
        let ids: Vec<&str> = engine.rules().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["socket_rcd"]);
        engine.retain_rules(&[]);
        assert_eq!(engine.rules().count(), 1);
    }
}

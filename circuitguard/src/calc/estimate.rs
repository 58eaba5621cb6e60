//! Quick-estimate functions
//!
//! Instant, non-authoritative figures shown while the full BS 7671 design
//! calculation runs elsewhere. The cable and cost tables are rough guides
//! only.

use serde::{Deserialize, Serialize};

use crate::design::{CircuitInput, Phases};

/// Standard MCB ratings in amps, ascending.
pub const MCB_RATINGS: [u32; 12] = [6, 10, 16, 20, 25, 32, 40, 50, 63, 80, 100, 125];

/// Power factor assumed for three-phase loads.
pub const THREE_PHASE_POWER_FACTOR: f64 = 0.95;

/// Diversity factors keyed by load type.
const DIVERSITY_TABLE: &[(&str, f64)] = &[
    ("lighting", 0.66),
    ("sockets", 0.5),
    ("ring-main", 0.5),
    ("cooker", 0.6),
    ("shower", 1.0),
    ("immersion", 1.0),
    ("heating", 1.0),
    ("ev-charger", 1.0),
    ("motor", 1.0),
    ("outdoor", 0.8),
    ("smoke-alarm", 1.0),
    ("hvac", 0.9),
    ("heat-pump", 1.0),
    ("general", 0.75),
];

/// (max design current A, T&E cable size mm²), clipped direct.
const CABLE_BREAKPOINTS: &[(f64, f64)] = &[
    (13.0, 1.5),
    (20.0, 2.5),
    (27.0, 4.0),
    (36.0, 6.0),
    (50.0, 10.0),
    (63.0, 16.0),
    (85.0, 25.0),
];

const LARGEST_ESTIMATED_CABLE: f64 = 35.0;

/// Retail cable price per metre (£) by size.
const CABLE_PRICE_PER_METRE: &[(f64, f64)] = &[
    (1.0, 1.20),
    (1.5, 1.45),
    (2.5, 2.25),
    (4.0, 3.35),
    (6.0, 5.25),
    (10.0, 8.75),
    (16.0, 13.50),
    (25.0, 20.00),
    (35.0, 28.00),
];

/// Single-phase P / V; three-phase P / (V·√3·pf).
///
/// Inputs are not validated: a zero voltage gives a non-finite result.
pub fn calculate_design_current(power: f64, voltage: f64, phases: Phases) -> f64 {
    match phases {
        Phases::Single => power / voltage,
        Phases::Three => power / (voltage * 3f64.sqrt() * THREE_PHASE_POWER_FACTOR),
    }
}

/// First standard rating at or above `ib`, or the largest (125 A).
pub fn suggest_mcb_rating(ib: f64) -> u32 {
    MCB_RATINGS
        .iter()
        .copied()
        .find(|&r| f64::from(r) >= ib)
        .unwrap_or(MCB_RATINGS[MCB_RATINGS.len() - 1])
}

/// Diversity for a load type; unknown types get no diversity (1.0).
pub fn calculate_diversity_factor(load_type: &str) -> f64 {
    let key = load_type.trim().to_lowercase().replace([' ', '_'], "-");
    DIVERSITY_TABLE
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, f)| *f)
        .unwrap_or(1.0)
}

/// Rough T&E conductor size (mm²) for a design current.
pub fn estimate_cable_size(ib: f64) -> f64 {
    CABLE_BREAKPOINTS
        .iter()
        .find(|(max, _)| ib <= *max)
        .map(|(_, size)| *size)
        .unwrap_or(LARGEST_ESTIMATED_CABLE)
}

fn cable_price(size: f64) -> f64 {
    CABLE_PRICE_PER_METRE
        .iter()
        .find(|(s, _)| (*s - size).abs() < f64::EPSILON)
        .or_else(|| CABLE_PRICE_PER_METRE.last())
        .map(|(_, p)| *p)
        .unwrap_or(0.0)
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MaterialCost {
    pub cable: f64,
    pub protection: f64,
    pub accessories: f64,
    pub total: f64,
}

/// Rough material cost in pounds for one circuit.
pub fn estimate_material_cost(circuit: &CircuitInput, voltage: f64) -> MaterialCost {
    let ib = calculate_design_current(circuit.load_power, voltage, circuit.phases);
    let size = estimate_cable_size(ib);
    let core_multiplier = match circuit.phases {
        Phases::Single => 1.0,
        Phases::Three => 1.6,
    };
    let cable = round2(cable_price(size) * circuit.cable_length.max(0.0) * core_multiplier);

    let protection = if circuit.rcd_protection {
        35.0
    } else if suggest_mcb_rating(ib) <= 63 {
        8.0
    } else {
        45.0
    };

    let accessories = match circuit.load_key().as_str() {
        "sockets" | "ring-main" => 25.0,
        "lighting" => 20.0,
        "ev-charger" => 60.0,
        "shower" | "cooker" => 30.0,
        _ => 15.0,
    };

    MaterialCost {
        cable,
        protection,
        accessories,
        total: round2(cable + protection + accessories),
    }
}

/// Voltage drop in volts from a tabulated mV/A/m figure.
pub fn voltage_drop(mv_per_a_per_m: f64, ib: f64, length: f64) -> f64 {
    mv_per_a_per_m * ib * length / 1000.0
}

pub fn voltage_drop_percent(drop: f64, voltage: f64) -> f64 {
    drop / voltage * 100.0
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuickEstimate {
    pub circuit: String,
    pub design_current: f64,
    pub diversity_factor: f64,
    pub diversified_current: f64,
    pub mcb_rating: u32,
    pub cable_size: f64,
    pub material_cost: MaterialCost,
}

/// All quick figures for one circuit.
pub fn quick_estimate(circuit: &CircuitInput, voltage: f64) -> QuickEstimate {
    let ib = calculate_design_current(circuit.load_power, voltage, circuit.phases);
    let diversity = calculate_diversity_factor(&circuit.load_type);
    QuickEstimate {
        circuit: circuit.name.clone(),
        design_current: round2(ib),
        diversity_factor: diversity,
        diversified_current: round2(ib * diversity),
        mcb_rating: suggest_mcb_rating(ib),
        cable_size: estimate_cable_size(ib),
        material_cost: estimate_material_cost(circuit, voltage),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_design_current_single_phase_exact() {
        assert_eq!(calculate_design_current(7360.0, 230.0, Phases::Single), 32.0);
    }

    #[test]
    fn test_design_current_three_phase() {
        let ib = calculate_design_current(22000.0, 400.0, Phases::Three);
        assert!((ib - 33.43).abs() < 0.01, "got {}", ib);
    }

    #[test]
    fn test_design_current_zero_voltage_not_finite() {
        assert!(!calculate_design_current(1000.0, 0.0, Phases::Single).is_finite());
    }

    #[test]
    fn test_suggest_mcb_rating() {
        assert_eq!(suggest_mcb_rating(0.0), 6);
        assert_eq!(suggest_mcb_rating(6.0), 6);
        assert_eq!(suggest_mcb_rating(6.1), 10);
        assert_eq!(suggest_mcb_rating(32.0), 32);
        assert_eq!(suggest_mcb_rating(400.0), 125);
    }

    #[test]
    fn test_suggest_mcb_rating_monotonic_and_member() {
        let mut last = 0;
        for tenth in 0..1500 {
            let rating = suggest_mcb_rating(f64::from(tenth) / 10.0);
            assert!(rating >= last);
            assert!(MCB_RATINGS.contains(&rating));
            last = rating;
        }
    }

    #[test]
    fn test_diversity_lookup() {
        assert_eq!(calculate_diversity_factor("lighting"), 0.66);
        assert_eq!(calculate_diversity_factor("Ring Main"), 0.5);
        assert_eq!(calculate_diversity_factor("unknown-load-type"), 1.0);
    }

    #[test]
    fn test_estimate_cable_size() {
        assert_eq!(estimate_cable_size(6.0), 1.5);
        assert_eq!(estimate_cable_size(20.0), 2.5);
        assert_eq!(estimate_cable_size(32.0), 6.0);
        assert_eq!(estimate_cable_size(500.0), 35.0);
    }

    #[test]
    fn test_material_cost_adds_up() {
        let c = CircuitInput::new("Sockets", 4600.0, "sockets")
            .with_length(20.0)
            .with_rcd(None);
        let cost = estimate_material_cost(&c, 230.0);
        // 20A -> 2.5mm² at £2.25/m
        assert_eq!(cost.cable, 45.0);
        assert_eq!(cost.protection, 35.0);
        assert_eq!(cost.accessories, 25.0);
        assert_eq!(cost.total, 105.0);
    }

    #[test]
    fn test_voltage_drop() {
        let vd = voltage_drop(18.0, 20.0, 25.0);
        assert!((vd - 9.0).abs() < 1e-9);
        assert!((voltage_drop_percent(vd, 230.0) - 3.913).abs() < 0.001);
    }

    #[test]
    fn test_quick_estimate() {
        let c = CircuitInput::new("EV", 7360.0, "ev-charger").with_length(15.0);
        let est = quick_estimate(&c, 230.0);
        assert_eq!(est.design_current, 32.0);
        assert_eq!(est.mcb_rating, 32);
        assert_eq!(est.cable_size, 6.0);
        assert_eq!(est.diversified_current, 32.0);
    }
}

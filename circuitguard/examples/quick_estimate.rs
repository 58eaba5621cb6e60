//! Quick estimate and circuit checks for a few typical domestic circuits.
//!
//! Run with: cargo run --example quick_estimate

use circuitguard::prelude::*;
use circuitguard::{quick_estimate, validate_circuit};

fn main() {
    let circuits = [
        CircuitInput::new("Kitchen ring", 7200.0, "ring-main")
            .with_length(35.0)
            .with_rcd(Some(RcdType::A)),
        CircuitInput::new("Electric shower", 9500.0, "shower").with_length(14.0),
        CircuitInput::new("Garden lights", 400.0, "lighting")
            .with_length(45.0)
            .with_location(SpecialLocation::Outdoor),
        CircuitInput::new("EV charger", 7400.0, "ev-charger")
            .with_length(22.0)
            .with_rcd(Some(RcdType::Ac)),
    ];

    for circuit in &circuits {
        let estimate = quick_estimate(circuit, 230.0);
        let checks = validate_circuit(circuit, 230.0, EarthingSystem::TnCS);

        println!("{}", estimate.circuit);
        println!(
            "  Ib {:.1}A, MCB {}A, {}mm² T&E, about £{:.2}",
            estimate.design_current,
            estimate.mcb_rating,
            estimate.cable_size,
            estimate.material_cost.total
        );
        for error in &checks.errors {
            println!("  error: {}", error);
        }
        for warning in &checks.warnings {
            println!("  warning: {}", warning);
        }
    }
}

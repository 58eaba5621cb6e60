//! Merge circuit readings taken from several photos of one consumer unit.
//!
//! Run with: cargo run --example merge_photos -- detections.json

use circuitguard::{CircuitGuardCore, CircuitGuardError};
use std::path::PathBuf;

fn main() -> Result<(), CircuitGuardError> {
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("tests/fixtures/detections.json"));

    let merged = CircuitGuardCore::merge_detection_file(&path)?;

    for m in &merged {
        println!(
            "{:>3} {:<20} {}A {}/{}mm² ({} from {} photo(s))",
            m.circuit.circuit_number,
            m.circuit.circuit_description,
            m.circuit.protective_device_rating,
            m.circuit.live_size,
            m.circuit.cpc_size,
            m.overall_confidence,
            m.source_photo_indices.len()
        );
        for conflict in &m.conflicts {
            println!("    {} disagreed; kept '{}'", conflict.field, conflict.chosen);
        }
    }
    Ok(())
}

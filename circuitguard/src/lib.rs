//! CircuitGuard - BS 7671 circuit estimation and validation library
//!
//! This library sizes and prices final circuits for UK domestic
//! installations, checks designs against common BS 7671 requirements
//! (RCD protection, voltage drop, loop impedance, distribution board
//! records), and merges circuit schedules read from several photos of the
//! same consumer unit.
//!
//! # Quick Start
//!
//! ```no_run
//! use circuitguard::{CircuitGuardCore, ValidationOptions};
//! use std::path::Path;
//!
//! let options = ValidationOptions::default();
//! let result = CircuitGuardCore::validate_design_file(
//!     Path::new("kitchen-rewire.design.json"),
//!     &options,
//! ).unwrap();
//!
//! for issue in &result.issues {
//!     println!("{}: {}", issue.severity, issue.message);
//! }
//! ```
//!
//! # Features
//!
//! - **Quick estimates**: design current, MCB rating, cable size, material cost
//! - **Circuit rules**: RCD requirements, voltage drop, design current limits
//! - **Board checks**: board hierarchy, Zdb, Ipf, polarity, SPD status, max Zs
//! - **Schedule merging**: majority vote across photos with conflict tracking
//! - **Content ingestion**: regulation text chunking and embedding
//! - **TOON output**: compact report rendering for language models

pub mod analyzer;
pub mod cables;
pub mod calc;
pub mod config;
pub mod content;
pub mod core;
pub mod design;
pub mod schedule;
pub mod toon;

// Re-export main types
pub use analyzer::rules::{Issue, RulesEngine, Severity};
pub use analyzer::{check_design, validate_circuit};
pub use cables::CableDatabase;
pub use calc::quick_estimate;
pub use core::{
    discover_design_files, load_design, CircuitGuardCore, CircuitGuardError, ValidationOptions,
    ValidationResult, ValidationStats,
};
pub use design::{CircuitInput, InstallationDesign};
pub use schedule::{merge_detections, DetectedCircuit, MergedCircuit};
pub use toon::to_toon;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::design::{EarthingSystem, Phases, RcdType, SpecialLocation};
    pub use crate::{
        CircuitGuardCore, CircuitGuardError, CircuitInput, InstallationDesign, Issue, Severity,
        ValidationOptions, ValidationResult, ValidationStats,
    };
}

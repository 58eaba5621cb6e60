//! Circuit schedules read from consumer unit photos.

pub mod merge;
pub mod normalise;

pub use merge::{
    merge_detections, overall_confidence, Confidence, ConflictValue, DetectedCircuit,
    FieldConflict, MergedCircuit,
};
pub use normalise::{
    default_bs_standard, device_base_type, device_curve, fix_protective_device_type,
    normalise_cable_size, normalise_circuit_number, normalise_rating, twin_and_earth_cpc_for,
};

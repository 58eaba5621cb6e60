//! Electrical calculations: quick estimates and loop impedance.

pub mod estimate;
pub mod zs;

pub use estimate::{
    calculate_design_current, calculate_diversity_factor, estimate_cable_size,
    estimate_material_cost, quick_estimate, suggest_mcb_rating, voltage_drop,
    voltage_drop_percent, MaterialCost, QuickEstimate, MCB_RATINGS,
};
pub use zs::{expected_r1_r2, max_zs, max_zs_measured};

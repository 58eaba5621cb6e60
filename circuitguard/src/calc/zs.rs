//! Earth fault loop impedance helpers
//!
//! Maximum Zs follows BS 7671 Table 41.3 for BS EN 60898 devices:
//! `Uo·Cmin / Ia` with Ia the instantaneous trip current.

use crate::design::DeviceCurve;

const UO: f64 = 230.0;
const CMIN: f64 = 0.95;

/// Measured values are compared against 80% of the tabulated maximum.
pub const MEASURED_DERATING: f64 = 0.8;

/// Conductor temperature correction from 20°C to 70°C operating.
pub const OPERATING_TEMP_FACTOR: f64 = 1.2;

/// Copper conductor resistance at 20°C, mΩ/m, keyed by size in mm².
const COPPER_RESISTANCE: &[(f64, f64)] = &[
    (1.0, 18.10),
    (1.5, 12.10),
    (2.5, 7.41),
    (4.0, 4.61),
    (6.0, 3.08),
    (10.0, 1.83),
    (16.0, 1.15),
    (25.0, 0.727),
    (35.0, 0.524),
];

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Tabulated maximum Zs (Ω), rounded to two places.
pub fn max_zs(curve: DeviceCurve, rating: u32) -> Option<f64> {
    if rating == 0 {
        return None;
    }
    Some(round2(UO * CMIN / (curve.instantaneous_multiple() * f64::from(rating))))
}

/// Maximum Zs for comparison with measured values (80% rule).
pub fn max_zs_measured(curve: DeviceCurve, rating: u32) -> Option<f64> {
    if rating == 0 {
        return None;
    }
    let raw = UO * CMIN / (curve.instantaneous_multiple() * f64::from(rating));
    Some(round2(raw * MEASURED_DERATING))
}

pub fn conductor_resistance(size_mm2: f64) -> Option<f64> {
    COPPER_RESISTANCE
        .iter()
        .find(|(s, _)| (s - size_mm2).abs() < 1e-6)
        .map(|(_, r)| *r)
}

/// Expected R1+R2 (Ω) at operating temperature for a run of `length` metres.
pub fn expected_r1_r2(live_mm2: f64, cpc_mm2: f64, length: f64) -> Option<f64> {
    let r1 = conductor_resistance(live_mm2)?;
    let r2 = conductor_resistance(cpc_mm2)?;
    Some((r1 + r2) * length / 1000.0 * OPERATING_TEMP_FACTOR)
}

pub fn estimated_zs(ze: f64, r1_r2: f64) -> f64 {
    ze + r1_r2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_zs_table_values() {
        assert_eq!(max_zs(DeviceCurve::B, 6), Some(7.28));
        assert_eq!(max_zs(DeviceCurve::B, 32), Some(1.37));
        assert_eq!(max_zs(DeviceCurve::C, 32), Some(0.68));
        assert_eq!(max_zs(DeviceCurve::D, 16), Some(0.68));
        assert_eq!(max_zs(DeviceCurve::B, 0), None);
    }

    #[test]
    fn test_max_zs_measured_applies_derating() {
        assert_eq!(max_zs_measured(DeviceCurve::B, 32), Some(1.09));
        assert_eq!(max_zs_measured(DeviceCurve::B, 6), Some(5.83));
    }

    #[test]
    fn test_expected_r1_r2() {
        let r = expected_r1_r2(2.5, 1.5, 20.0).unwrap();
        assert!((r - 0.46824).abs() < 1e-6, "got {}", r);
        assert!(expected_r1_r2(2.5, 0.75, 20.0).is_none());
    }

    #[test]
    fn test_estimated_zs() {
        assert!((estimated_zs(0.35, 0.47) - 0.82).abs() < 1e-9);
    }
}

//! Cable data schema
//!
//! Mirrors the JSON files under `cables/`. Capacities are in amps per
//! BS 7671 reference method; a zero means the method does not apply.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TemperatureRating {
    #[serde(rename = "70C")]
    C70,
    #[serde(rename = "90C")]
    C90,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FirePerformance {
    Standard,
    #[serde(rename = "LSOH")]
    Lsoh,
    #[serde(rename = "Fire Resistant")]
    FireResistant,
    Mineral,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MechanicalProtection {
    None,
    Light,
    Medium,
    Heavy,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Availability {
    #[serde(rename = "In Stock")]
    InStock,
    #[serde(rename = "Low Stock")]
    LowStock,
    #[serde(rename = "Out of Stock")]
    OutOfStock,
    #[serde(rename = "Special Order")]
    SpecialOrder,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CableSpecification {
    pub name: String,
    #[serde(rename = "type")]
    pub cable_type: String,
    pub description: String,
    /// Realistic field limit, mm².
    pub max_practical_size: f64,
    pub standard_sizes: Vec<f64>,
    pub temperature_rating: TemperatureRating,
    pub voltage_rating: u32,
    /// Multiple of cable diameter.
    pub min_bend_radius: f64,
    pub fire_performance: FirePerformance,
    pub uv_resistant: bool,
    pub direct_burial: bool,
    pub mechanical_protection: MechanicalProtection,
    pub installation_methods: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CableCapacity {
    pub size: f64,
    pub reference_method_a1: f64,
    pub reference_method_a2: f64,
    pub reference_method_b1: f64,
    pub reference_method_b2: f64,
    pub reference_method_c: f64,
    pub reference_method_d1: f64,
    pub reference_method_d2: f64,
    pub reference_method_e: f64,
    pub reference_method_f: f64,
    pub reference_method_g: f64,
}

impl CableCapacity {
    /// Current-carrying capacity for a reference method letter, if tabulated.
    pub fn for_method(&self, method: &str) -> Option<f64> {
        let rating = match method.trim().to_uppercase().as_str() {
            "A1" | "A" => self.reference_method_a1,
            "A2" => self.reference_method_a2,
            "B1" | "B" => self.reference_method_b1,
            "B2" => self.reference_method_b2,
            "C" => self.reference_method_c,
            "D1" | "D" => self.reference_method_d1,
            "D2" => self.reference_method_d2,
            "E" => self.reference_method_e,
            "F" => self.reference_method_f,
            "G" => self.reference_method_g,
            _ => return None,
        };
        (rating > 0.0).then_some(rating)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BulkDiscounts {
    pub qty100m: f64,
    pub qty500m: f64,
    pub qty1000m: f64,
}

/// UK pricing in £ per metre.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CablePricing {
    pub size: f64,
    pub wholesale_price: f64,
    pub retail_price: f64,
    pub screwfix_price: f64,
    pub cef_price: f64,
    pub edmundson_price: f64,
    pub toolstation_price: f64,
    pub availability: Availability,
    pub lead_time_days: u32,
    pub bulk_discounts: BulkDiscounts,
}

impl CablePricing {
    /// Retail price for `metres` with the applicable bulk discount.
    pub fn price_for_length(&self, metres: f64) -> f64 {
        let discount = if metres >= 1000.0 {
            self.bulk_discounts.qty1000m
        } else if metres >= 500.0 {
            self.bulk_discounts.qty500m
        } else if metres >= 100.0 {
            self.bulk_discounts.qty100m
        } else {
            0.0
        };
        self.retail_price * metres * (1.0 - discount / 100.0)
    }
}

/// Voltage drop data for copper conductors at 70°C.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VoltageDropData {
    pub size: f64,
    pub ac_resistance: f64,
    pub ac_reactance: f64,
    /// mV/A/m
    pub voltage_drop_per_amp_per_metre: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CableData {
    pub cable_type: String,
    pub specification: CableSpecification,
    pub capacities: Vec<CableCapacity>,
    pub pricing: Vec<CablePricing>,
    pub voltage_drops: Vec<VoltageDropData>,
    #[serde(default)]
    pub applications: Vec<String>,
    #[serde(default)]
    pub limitations: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

pub(crate) fn same_size(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

impl CableData {
    pub fn pricing_for(&self, size: f64) -> Option<&CablePricing> {
        self.pricing.iter().find(|p| same_size(p.size, size))
    }

    pub fn voltage_drop_for(&self, size: f64) -> Option<&VoltageDropData> {
        self.voltage_drops.iter().find(|v| same_size(v.size, size))
    }

    pub fn supports_method(&self, method: &str) -> bool {
        let method = method.trim().to_uppercase();
        self.specification
            .installation_methods
            .iter()
            .any(|m| m.eq_ignore_ascii_case(&method))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capacity() -> CableCapacity {
        CableCapacity {
            size: 2.5,
            reference_method_a1: 18.0,
            reference_method_a2: 21.0,
            reference_method_b1: 23.0,
            reference_method_b2: 27.0,
            reference_method_c: 36.0,
            reference_method_d1: 0.0,
            reference_method_d2: 0.0,
            reference_method_e: 39.0,
            reference_method_f: 0.0,
            reference_method_g: 0.0,
        }
    }

    #[test]
    fn test_capacity_for_method() {
        let c = capacity();
        assert_eq!(c.for_method("C"), Some(36.0));
        assert_eq!(c.for_method("a1"), Some(18.0));
        assert_eq!(c.for_method("D1"), None);
        assert_eq!(c.for_method("Z"), None);
    }

    #[test]
    fn test_bulk_discount_tiers() {
        let p = CablePricing {
            size: 2.5,
            wholesale_price: 1.65,
            retail_price: 2.0,
            screwfix_price: 2.55,
            cef_price: 2.15,
            edmundson_price: 2.1,
            toolstation_price: 2.45,
            availability: Availability::InStock,
            lead_time_days: 0,
            bulk_discounts: BulkDiscounts { qty100m: 10.0, qty500m: 20.0, qty1000m: 30.0 },
        };
        assert!((p.price_for_length(50.0) - 100.0).abs() < 1e-9);
        assert!((p.price_for_length(100.0) - 180.0).abs() < 1e-9);
        assert!((p.price_for_length(1000.0) - 1400.0).abs() < 1e-9);
    }
}

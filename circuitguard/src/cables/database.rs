//! Cable selection queries over the loaded cable catalogue.

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::cables::builtin::get_builtin_cables;
use crate::cables::schema::{same_size, CableData, CablePricing};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CableSelection {
    pub cable_type: String,
    pub size: f64,
    /// Current-carrying capacity for the chosen method, amps.
    pub capacity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CostAlternative {
    pub cable_type: String,
    pub size: f64,
    pub price: f64,
    pub savings: f64,
}

/// Cable catalogue keyed by cable type, in load order.
pub struct CableDatabase {
    cables: Vec<CableData>,
}

impl CableDatabase {
    pub fn new() -> Self {
        Self { cables: Vec::new() }
    }

    pub fn with_builtin_cables() -> Self {
        Self {
            cables: get_builtin_cables(),
        }
    }

    /// Process-wide built-in catalogue, parsed on first use.
    pub fn builtin() -> &'static CableDatabase {
        static DB: OnceLock<CableDatabase> = OnceLock::new();
        DB.get_or_init(Self::with_builtin_cables)
    }

    /// Add or replace a cable definition.
    pub fn add_cable(&mut self, cable: CableData) {
        if let Some(existing) = self
            .cables
            .iter_mut()
            .find(|c| c.cable_type == cable.cable_type)
        {
            tracing::debug!("Replacing cable definition {}", cable.cable_type);
            *existing = cable;
        } else {
            self.cables.push(cable);
        }
    }

    pub fn len(&self) -> usize {
        self.cables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cables.is_empty()
    }

    pub fn get_cable_data(&self, cable_type: &str) -> Option<&CableData> {
        self.cables.iter().find(|c| c.cable_type == cable_type)
    }

    pub fn all_cable_types(&self) -> Vec<&str> {
        self.cables.iter().map(|c| c.cable_type.as_str()).collect()
    }

    pub fn cables_by_installation_method(&self, method: &str) -> Vec<&str> {
        self.cables
            .iter()
            .filter(|c| c.supports_method(method))
            .map(|c| c.cable_type.as_str())
            .collect()
    }

    /// Cable types with at least one size rated for `min_current` by `method`.
    pub fn cables_by_current_rating(&self, min_current: f64, method: &str) -> Vec<&str> {
        self.cables
            .iter()
            .filter(|c| {
                c.capacities
                    .iter()
                    .any(|cap| cap.for_method(method).map(|r| r >= min_current).unwrap_or(false))
            })
            .map(|c| c.cable_type.as_str())
            .collect()
    }

    /// Smallest size of `cable_type` whose capacity covers `required_current`.
    pub fn find_optimal_cable_size(
        &self,
        cable_type: &str,
        required_current: f64,
        method: &str,
    ) -> Option<CableSelection> {
        let cable = self.get_cable_data(cable_type)?;
        cable.capacities.iter().find_map(|cap| {
            let rating = cap.for_method(method)?;
            (rating >= required_current).then(|| CableSelection {
                cable_type: cable_type.to_string(),
                size: cap.size,
                capacity: rating,
            })
        })
    }

    pub fn cable_pricing(&self, cable_type: &str, size: f64) -> Option<&CablePricing> {
        self.get_cable_data(cable_type)?.pricing_for(size)
    }

    /// mV/A/m for a cable type and size.
    pub fn voltage_drop_factor(&self, cable_type: &str, size: f64) -> Option<f64> {
        self.get_cable_data(cable_type)?
            .voltage_drop_for(size)
            .map(|v| v.voltage_drop_per_amp_per_metre)
    }

    /// Cheaper cable types at the same size within budget, biggest saving first.
    pub fn cost_effective_alternatives(
        &self,
        cable_type: &str,
        size: f64,
        max_budget: f64,
    ) -> Vec<CostAlternative> {
        let original_price = self
            .cable_pricing(cable_type, size)
            .map(|p| p.retail_price)
            .unwrap_or(0.0);

        let mut alternatives: Vec<CostAlternative> = self
            .cables
            .iter()
            .filter_map(|cable| {
                let pricing = cable.pricing.iter().find(|p| same_size(p.size, size))?;
                (pricing.retail_price <= max_budget && pricing.retail_price < original_price)
                    .then(|| CostAlternative {
                        cable_type: cable.cable_type.clone(),
                        size,
                        price: pricing.retail_price,
                        savings: original_price - pricing.retail_price,
                    })
            })
            .collect();

        alternatives.sort_by(|a, b| b.savings.total_cmp(&a.savings));
        alternatives
    }
}

impl Default for CableDatabase {
    fn default() -> Self {
        Self::with_builtin_cables()
    }
}

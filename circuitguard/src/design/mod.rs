//! Installation design data model
//!
//! Plain data structures describing the circuits an electrician is designing
//! and the installation they live in. Field names follow the camelCase JSON
//! produced by the design forms.

pub mod board;
pub mod migrate;

use serde::{Deserialize, Serialize};

pub use board::{BoardError, BoardSet, DistributionBoard, SpdStatus};
pub use migrate::{has_board_data, migrate_board_data, MigrationReport, BOARD_DATA_VERSION};

/// Nominal UK single-phase supply voltage.
pub const DEFAULT_VOLTAGE: f64 = 230.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Phases {
    #[default]
    Single,
    Three,
}

impl std::str::FromStr for Phases {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "single" | "1" | "single-phase" => Ok(Phases::Single),
            "three" | "3" | "three-phase" => Ok(Phases::Three),
            other => Err(format!("unknown phase arrangement '{}'", other)),
        }
    }
}

/// Locations with additional requirements under BS 7671 Part 7.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SpecialLocation {
    #[default]
    None,
    Bathroom,
    Outdoor,
    SwimmingPool,
    Sauna,
    Agricultural,
    SolarPv,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum EarthingSystem {
    #[serde(rename = "TN-S")]
    TnS,
    #[default]
    #[serde(rename = "TN-C-S")]
    TnCS,
    #[serde(rename = "TT")]
    Tt,
}

impl EarthingSystem {
    /// Typical maximum external earth loop impedance quoted by UK DNOs.
    pub fn typical_max_ze(&self) -> Option<f64> {
        match self {
            EarthingSystem::TnS => Some(0.8),
            EarthingSystem::TnCS => Some(0.35),
            EarthingSystem::Tt => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EarthingSystem::TnS => "TN-S",
            EarthingSystem::TnCS => "TN-C-S",
            EarthingSystem::Tt => "TT",
        }
    }
}

impl std::str::FromStr for EarthingSystem {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().replace(['_', ' '], "-").as_str() {
            "TN-S" | "TNS" => Ok(EarthingSystem::TnS),
            "TN-C-S" | "TNCS" | "PME" => Ok(EarthingSystem::TnCS),
            "TT" => Ok(EarthingSystem::Tt),
            other => Err(format!("unknown earthing system '{}'", other)),
        }
    }
}

/// RCD waveform type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RcdType {
    #[serde(rename = "AC")]
    Ac,
    A,
    F,
    B,
}

/// MCB tripping characteristic.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum DeviceCurve {
    #[default]
    B,
    C,
    D,
}

impl DeviceCurve {
    /// Multiple of In at which the device trips instantaneously.
    pub fn instantaneous_multiple(&self) -> f64 {
        match self {
            DeviceCurve::B => 5.0,
            DeviceCurve::C => 10.0,
            DeviceCurve::D => 20.0,
        }
    }
}

fn default_installation_method() -> String {
    "C".to_string()
}

fn default_cable_type() -> String {
    "pvc-twin-earth".to_string()
}

/// Design requirements for one circuit, as entered on the design form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CircuitInput {
    pub name: String,
    /// Load in watts.
    pub load_power: f64,
    #[serde(default)]
    pub phases: Phases,
    /// Route length in metres.
    pub cable_length: f64,
    pub load_type: String,
    #[serde(default)]
    pub special_location: SpecialLocation,
    #[serde(default)]
    pub rcd_protection: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rcd_type: Option<RcdType>,
    /// BS 7671 reference method letter (A1, B, C, ...).
    #[serde(default = "default_installation_method")]
    pub installation_method: String,
    #[serde(default = "default_cable_type")]
    pub cable_type: String,
}

impl CircuitInput {
    pub fn new(name: impl Into<String>, load_power: f64, load_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            load_power,
            phases: Phases::Single,
            cable_length: 0.0,
            load_type: load_type.into(),
            special_location: SpecialLocation::None,
            rcd_protection: false,
            rcd_type: None,
            installation_method: default_installation_method(),
            cable_type: default_cable_type(),
        }
    }

    pub fn with_length(mut self, metres: f64) -> Self {
        self.cable_length = metres;
        self
    }

    pub fn with_phases(mut self, phases: Phases) -> Self {
        self.phases = phases;
        self
    }

    pub fn with_location(mut self, location: SpecialLocation) -> Self {
        self.special_location = location;
        self
    }

    pub fn with_rcd(mut self, rcd_type: Option<RcdType>) -> Self {
        self.rcd_protection = true;
        self.rcd_type = rcd_type;
        self
    }

    /// Load type key as used by the lookup tables.
    pub fn load_key(&self) -> String {
        self.load_type.trim().to_lowercase().replace([' ', '_'], "-")
    }
}

/// A circuit within a full installation design.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DesignCircuit {
    #[serde(flatten)]
    pub input: CircuitInput,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board_id: Option<String>,
    #[serde(default)]
    pub device_curve: DeviceCurve,
    /// Breaking capacity of the protective device in kA.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ka_rating: Option<f64>,
    /// Protective device rating when already chosen; otherwise suggested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_rating: Option<u32>,
}

impl From<CircuitInput> for DesignCircuit {
    fn from(input: CircuitInput) -> Self {
        Self {
            input,
            board_id: None,
            device_curve: DeviceCurve::B,
            ka_rating: None,
            device_rating: None,
        }
    }
}

fn default_voltage() -> f64 {
    DEFAULT_VOLTAGE
}

/// A complete installation: supply characteristics, boards and circuits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallationDesign {
    pub project_name: String,
    #[serde(default)]
    pub earthing_system: EarthingSystem,
    #[serde(default = "default_voltage")]
    pub voltage: f64,
    /// Measured or declared external earth loop impedance in ohms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ze: Option<f64>,
    #[serde(default)]
    pub boards: Vec<DistributionBoard>,
    pub circuits: Vec<DesignCircuit>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circuit_input_defaults_from_json() {
        let json = r#"{"name":"Kitchen","loadPower":3000,"cableLength":12,"loadType":"sockets"}"#;
        let c: CircuitInput = serde_json::from_str(json).unwrap();
        assert_eq!(c.phases, Phases::Single);
        assert_eq!(c.special_location, SpecialLocation::None);
        assert!(!c.rcd_protection);
        assert_eq!(c.installation_method, "C");
        assert_eq!(c.cable_type, "pvc-twin-earth");
    }

    #[test]
    fn test_enum_wire_names() {
        let e: EarthingSystem = serde_json::from_str("\"TN-C-S\"").unwrap();
        assert_eq!(e, EarthingSystem::TnCS);
        let l: SpecialLocation = serde_json::from_str("\"swimming-pool\"").unwrap();
        assert_eq!(l, SpecialLocation::SwimmingPool);
        let r: RcdType = serde_json::from_str("\"AC\"").unwrap();
        assert_eq!(r, RcdType::Ac);
    }

    #[test]
    fn test_parse_earthing_aliases() {
        assert_eq!("pme".parse::<EarthingSystem>().unwrap(), EarthingSystem::TnCS);
        assert_eq!("tn_s".parse::<EarthingSystem>().unwrap(), EarthingSystem::TnS);
        assert!("IT".parse::<EarthingSystem>().is_err());
    }

    #[test]
    fn test_load_key_normalised() {
        let c = CircuitInput::new("Car", 7360.0, "EV Charger");
        assert_eq!(c.load_key(), "ev-charger");
    }

    #[test]
    fn test_design_circuit_flattens_input() {
        let json = r#"{"name":"Shower","loadPower":9500,"cableLength":8,"loadType":"shower",
                       "rcdProtection":true,"boardId":"main","deviceCurve":"B"}"#;
        let c: DesignCircuit = serde_json::from_str(json).unwrap();
        assert_eq!(c.input.name, "Shower");
        assert_eq!(c.board_id.as_deref(), Some("main"));
        assert!(c.input.rcd_protection);
    }
}

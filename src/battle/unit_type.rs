//! Unit types and their fixed properties

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Type of military unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitType {
    Tank,
    /// Infantry fighting vehicle
    Bmp,
    Infantry,
    Mortar,
    Artillery,
    Uav,
}

impl UnitType {
    pub const ALL: [UnitType; 6] = [
        UnitType::Tank,
        UnitType::Bmp,
        UnitType::Infantry,
        UnitType::Mortar,
        UnitType::Artillery,
        UnitType::Uav,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UnitType::Tank => "tank",
            UnitType::Bmp => "bmp",
            UnitType::Infantry => "infantry",
            UnitType::Mortar => "mortar",
            UnitType::Artillery => "artillery",
            UnitType::Uav => "uav",
        }
    }

    /// Relative combat potential of one unit of this type
    ///
    /// Used for side-level strength reporting, scaled by remaining hp.
    pub fn combat_potential(&self) -> f64 {
        match self {
            UnitType::Infantry => 0.5,
            UnitType::Bmp => 2.0,
            UnitType::Tank => 6.0,
            UnitType::Mortar => 2.0,
            UnitType::Artillery => 3.0,
            UnitType::Uav => 4.0,
        }
    }
}

impl fmt::Display for UnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnitType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        UnitType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == lowered)
            .ok_or_else(|| format!("unknown unit type '{}'", s))
    }
}

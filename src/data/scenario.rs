//! Scenario files: simulation settings, unit table and engagement rules
//!
//! ```toml
//! name = "border clash"
//!
//! [simulation]
//! seed = 42
//! distance_metric = "geographic"
//!
//! [[units]]
//! id = 1
//! name = "T-72B3 Tank #1"
//! side = "A"
//! type = "tank"
//! position = [30.05, 50.05]
//! ...
//!
//! [[rules]]
//! attacker = "tank"
//! target = "bmp"
//! base_accuracy = 0.85
//! max_range = 2.5
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use crate::battle::rules::{EngagementRule, EngagementRuleSet};
use crate::battle::units::UnitSpec;
use crate::core::config::SimulationConfig;
use crate::core::error::{Result, SimError};

/// Complete battle input
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "simulation")]
    pub config: SimulationConfig,
    #[serde(default)]
    pub units: Vec<UnitSpec>,
    #[serde(default)]
    pub rules: Vec<EngagementRule>,
}

impl Scenario {
    /// Parse and validate a scenario from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let scenario: Scenario = toml::from_str(contents)?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn to_toml_string(&self) -> std::result::Result<String, toml::ser::Error> {
        toml::to_string(self)
    }

    /// Check everything a battle would reject, without building one
    pub fn validate(&self) -> Result<()> {
        self.config.validate().map_err(SimError::InvalidConfig)?;
        let mut seen = AHashSet::with_capacity(self.units.len());
        for unit in &self.units {
            unit.validate()?;
            if !seen.insert(unit.id) {
                return Err(SimError::DuplicateUnit(unit.id));
            }
        }
        EngagementRuleSet::new(self.rules.iter().cloned())?;
        Ok(())
    }
}

/// Load and validate a scenario file
pub fn load_scenario(path: impl AsRef<Path>) -> Result<Scenario> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let mut scenario = Scenario::from_toml_str(&contents)?;
    if scenario.name.is_empty() {
        scenario.name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
    }
    tracing::info!(
        path = %path.display(),
        units = scenario.units.len(),
        rules = scenario.rules.len(),
        "Loaded scenario '{}'",
        scenario.name
    );
    Ok(scenario)
}

/// Load `data/scenarios/{name}.toml`
pub fn load_scenario_named(name: &str) -> Result<Scenario> {
    load_scenario(scenario_path(name))
}

/// Get path to a bundled scenario file
pub fn scenario_path(name: &str) -> PathBuf {
    PathBuf::from("data/scenarios").join(format!("{}.toml", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::unit_type::UnitType;
    use crate::core::config::DistanceMetric;
    use crate::core::types::{Side, UnitId};

    const SMALL: &str = r#"
        name = "duel"

        [simulation]
        seed = 9
        max_steps = 50

        [[units]]
        id = 101
        name = "Tank 101"
        side = "A"
        type = "tank"
        position = [0.0, 0.0]
        max_hp = 100.0
        attack_power = 50.0
        range = 2.0
        accuracy = 1.0

        [[units]]
        id = 201
        name = "BMP 201"
        side = "B"
        type = "bmp"
        position = [1.25, 0.0]
        hp = 80.0
        max_hp = 80.0
        attack_power = 20.0
        range = 1.5
        base_accuracy = 0.7
        armor = 9.4

        [[rules]]
        attacker = "tank"
        target = "bmp"
        base_hit_probability = 0.75
        max_range = 2.0
    "#;

    #[test]
    fn test_parse_small_scenario() {
        let scenario = Scenario::from_toml_str(SMALL).unwrap();
        assert_eq!(scenario.name, "duel");
        assert_eq!(scenario.config.seed, 9);
        assert_eq!(scenario.config.step_interval_ms, 500);
        assert_eq!(scenario.config.distance_metric, DistanceMetric::Planar);
        assert_eq!(scenario.units.len(), 2);
        assert_eq!(scenario.units[0].unit_type, UnitType::Tank);
        assert_eq!(scenario.units[1].side, Side::B);
        assert_eq!(scenario.units[1].armor, 9.4);
        assert_eq!(scenario.rules[0].base_accuracy, 0.75);
        assert_eq!(scenario.rules[0].priority, 999);
        assert_eq!(scenario.rules[0].damage_multiplier, 1.0);
    }

    #[test]
    fn test_duplicate_unit_ids_fail() {
        let text = SMALL.replace("id = 201", "id = 101");
        assert!(matches!(
            Scenario::from_toml_str(&text),
            Err(SimError::DuplicateUnit(UnitId(101)))
        ));
    }

    #[test]
    fn test_hp_above_max_fails() {
        let text = SMALL.replace("\n        hp = 80.0", "\n        hp = 95.0");
        assert!(matches!(
            Scenario::from_toml_str(&text),
            Err(SimError::InvalidUnit { .. })
        ));
    }

    #[test]
    fn test_unit_starting_destroyed_fails() {
        let text = SMALL.replace("\n        hp = 80.0", "\n        hp = 0.0");
        assert!(matches!(
            Scenario::from_toml_str(&text),
            Err(SimError::InvalidUnit { id: UnitId(201), .. })
        ));
    }

    #[test]
    fn test_unknown_unit_type_is_parse_error() {
        let text = SMALL.replace("type = \"bmp\"", "type = \"cavalry\"");
        assert!(matches!(
            Scenario::from_toml_str(&text),
            Err(SimError::TomlError(_))
        ));
    }

    #[test]
    fn test_toml_roundtrip() {
        let scenario = Scenario::from_toml_str(SMALL).unwrap();
        let text = scenario.to_toml_string().unwrap();
        let back = Scenario::from_toml_str(&text).unwrap();
        assert_eq!(back, scenario);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        assert!(matches!(
            load_scenario("does/not/exist.toml"),
            Err(SimError::IoError(_))
        ));
    }
}

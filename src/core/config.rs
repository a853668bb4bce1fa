//! Simulation configuration with documented constants
//!
//! Every tunable number of the combat model lives here. A battle owns its
//! own copy; there is no process-wide configuration.

use serde::{Deserialize, Serialize};

use crate::core::types::Position;

/// Kilometres per degree of longitude at the equator
pub const KM_PER_DEG_LON: f64 = 111.32;

/// Kilometres per degree of latitude
pub const KM_PER_DEG_LAT: f64 = 110.54;

/// How distances between positions are measured
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Straight-line distance in raw coordinate units
    #[default]
    Planar,
    /// Positions are (longitude, latitude) degrees; distance is approximate km
    Geographic,
}

impl DistanceMetric {
    pub fn distance(&self, a: &Position, b: &Position) -> f64 {
        match self {
            DistanceMetric::Planar => a.distance(b),
            DistanceMetric::Geographic => {
                let dx = (b.x - a.x) * KM_PER_DEG_LON;
                let dy = (b.y - a.y) * KM_PER_DEG_LAT;
                (dx * dx + dy * dy).sqrt()
            }
        }
    }
}

/// Accuracy multiplier as a function of range fraction (distance / max range)
///
/// Every variant is monotonically non-increasing and stays within [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AccuracyFalloff {
    /// Flat accuracy across the whole engagement window
    #[default]
    None,
    /// Full accuracy up to `effective_fraction` of max range, then a linear
    /// drop to `min_factor` at max range
    Linear {
        effective_fraction: f64,
        min_factor: f64,
    },
}

impl AccuracyFalloff {
    pub fn factor(&self, range_fraction: f64) -> f64 {
        match *self {
            AccuracyFalloff::None => 1.0,
            AccuracyFalloff::Linear {
                effective_fraction,
                min_factor,
            } => {
                let f = range_fraction.max(0.0);
                if f <= effective_fraction {
                    1.0
                } else if f >= 1.0 || effective_fraction >= 1.0 {
                    min_factor.clamp(0.0, 1.0)
                } else {
                    let t = (f - effective_fraction) / (1.0 - effective_fraction);
                    (1.0 - t * (1.0 - min_factor)).clamp(0.0, 1.0)
                }
            }
        }
    }

    fn validate(&self) -> Result<(), String> {
        if let AccuracyFalloff::Linear {
            effective_fraction,
            min_factor,
        } = *self
        {
            if !(0.0..=1.0).contains(&effective_fraction) {
                return Err(format!(
                    "falloff effective_fraction ({}) must be within [0, 1]",
                    effective_fraction
                ));
            }
            if !(0.0..=1.0).contains(&min_factor) {
                return Err(format!(
                    "falloff min_factor ({}) must be within [0, 1]",
                    min_factor
                ));
            }
        }
        Ok(())
    }
}

/// How target armor reduces raw damage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArmorModel {
    /// `reduction = armor * factor`
    Proportional { factor: f64 },
    /// `reduction = raw * min(armor * per_point, max_fraction)`
    Percentage { per_point: f64, max_fraction: f64 },
}

impl Default for ArmorModel {
    fn default() -> Self {
        ArmorModel::Proportional { factor: 0.5 }
    }
}

impl ArmorModel {
    /// Damage absorbed by `armor`, never negative and never above `raw_damage`
    pub fn reduction(&self, armor: f64, raw_damage: f64) -> f64 {
        let armor = armor.max(0.0);
        let raw = raw_damage.max(0.0);
        let reduction = match *self {
            ArmorModel::Proportional { factor } => armor * factor,
            ArmorModel::Percentage {
                per_point,
                max_fraction,
            } => raw * (armor * per_point).min(max_fraction),
        };
        reduction.clamp(0.0, raw)
    }

    fn validate(&self) -> Result<(), String> {
        match *self {
            ArmorModel::Proportional { factor } if factor < 0.0 => {
                Err(format!("armor factor ({}) must be non-negative", factor))
            }
            ArmorModel::Percentage {
                per_point,
                max_fraction,
            } if per_point < 0.0 || !(0.0..=1.0).contains(&max_fraction) => Err(format!(
                "armor percentage model invalid (per_point {}, max_fraction {})",
                per_point, max_fraction
            )),
            _ => Ok(()),
        }
    }
}

/// Configuration for a single battle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seed for the battle RNG. Same seed and inputs give the same event stream.
    pub seed: u64,

    /// Hard step limit; reaching it ends the battle as a timeout
    pub max_steps: u64,

    /// Simulated milliseconds per step, used for event timestamps
    pub step_interval_ms: u64,

    pub distance_metric: DistanceMetric,

    /// Speed multiplier applied when a unit retreats
    pub retreat_speed_multiplier: f64,

    pub accuracy_falloff: AccuracyFalloff,

    pub armor_model: ArmorModel,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            max_steps: 1000,
            step_interval_ms: 500,
            distance_metric: DistanceMetric::Planar,
            retreat_speed_multiplier: 1.5,
            accuracy_falloff: AccuracyFalloff::None,
            armor_model: ArmorModel::default(),
        }
    }
}

impl SimulationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Validate that configuration values are sensible
    pub fn validate(&self) -> Result<(), String> {
        if self.max_steps == 0 {
            return Err("max_steps must be at least 1".into());
        }
        if !(self.retreat_speed_multiplier >= 0.0) {
            return Err(format!(
                "retreat_speed_multiplier ({}) must be non-negative",
                self.retreat_speed_multiplier
            ));
        }
        self.accuracy_falloff.validate()?;
        self.armor_model.validate()?;
        Ok(())
    }
}

//! Shot resolution
//!
//! Pure functions: compute a hit chance, compare a roll against it, and
//! derive damage. Nothing here mutates units; the scheduler applies the
//! outcome. A shot hits iff `roll < hit_chance`.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::battle::rules::EngagementRule;
use crate::battle::units::Unit;
use crate::core::config::SimulationConfig;

/// Result of one shot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ShotResult {
    Miss,
    Hit {
        damage: f64,
        raw_damage: f64,
        armor_reduction: f64,
    },
}

/// Full record of a resolved shot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShotOutcome {
    pub hit_chance: f64,
    pub roll: f64,
    pub result: ShotResult,
}

impl ShotOutcome {
    pub fn is_hit(&self) -> bool {
        matches!(self.result, ShotResult::Hit { .. })
    }

    pub fn damage(&self) -> f64 {
        match self.result {
            ShotResult::Hit { damage, .. } => damage,
            ShotResult::Miss => 0.0,
        }
    }
}

/// Hit probability for `attacker` firing under `rule` at `distance`
///
/// `max_range` is the outer edge of the engagement window in use.
pub fn hit_chance(
    attacker: &Unit,
    rule: &EngagementRule,
    distance: f64,
    max_range: f64,
    config: &SimulationConfig,
) -> f64 {
    let fraction = if max_range > 0.0 {
        distance / max_range
    } else {
        0.0
    };
    let falloff = config.accuracy_falloff.factor(fraction);
    (rule.base_accuracy * attacker.base_accuracy * falloff).clamp(0.0, 1.0)
}

/// Resolve a shot from pre-drawn rolls
///
/// `variance_roll` is only consulted when the rule carries damage variance.
pub fn resolve_with_rolls(
    attacker: &Unit,
    target: &Unit,
    rule: &EngagementRule,
    hit_chance: f64,
    roll: f64,
    variance_roll: f64,
    config: &SimulationConfig,
) -> ShotOutcome {
    if !(roll < hit_chance) {
        return ShotOutcome {
            hit_chance,
            roll,
            result: ShotResult::Miss,
        };
    }

    let mut raw_damage = attacker.attack_power * rule.damage_multiplier;
    if rule.damage_variance > 0.0 {
        let v = rule.damage_variance;
        raw_damage *= 1.0 - v + 2.0 * v * variance_roll;
    }
    let raw_damage = raw_damage.max(0.0);
    let armor_reduction = config.armor_model.reduction(target.armor, raw_damage);
    let damage = (raw_damage - armor_reduction).max(0.0);

    ShotOutcome {
        hit_chance,
        roll,
        result: ShotResult::Hit {
            damage,
            raw_damage,
            armor_reduction,
        },
    }
}

/// Resolve a shot, drawing rolls from the battle RNG
///
/// Draws one value for the hit roll and a second only on a hit with
/// damage variance, so the draw sequence depends solely on outcomes.
pub fn resolve_shot<R: Rng + ?Sized>(
    attacker: &Unit,
    target: &Unit,
    rule: &EngagementRule,
    distance: f64,
    max_range: f64,
    config: &SimulationConfig,
    rng: &mut R,
) -> ShotOutcome {
    let chance = hit_chance(attacker, rule, distance, max_range, config);
    let roll: f64 = rng.gen();
    let variance_roll = if roll < chance && rule.damage_variance > 0.0 {
        rng.gen()
    } else {
        0.5
    };
    resolve_with_rolls(attacker, target, rule, chance, roll, variance_roll, config)
}

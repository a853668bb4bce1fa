//! Engagement rules: which unit types can fire on which, and how well
//!
//! The rule set is built once per battle and never mutated. An absent
//! (attacker, target) pair means that attacker cannot engage that target.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::battle::unit_type::UnitType;
use crate::core::error::{Result, SimError};

/// Priority assigned to pairs with no rule; lower values are preferred
pub const DEFAULT_PRIORITY: u32 = 999;

fn default_damage_multiplier() -> f64 {
    1.0
}

fn default_priority() -> u32 {
    DEFAULT_PRIORITY
}

/// A single attacker-type × target-type entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementRule {
    pub attacker: UnitType,
    pub target: UnitType,
    #[serde(alias = "base_hit_probability")]
    pub base_accuracy: f64,
    /// Mean damage as a factor on the attacker's attack power
    #[serde(default = "default_damage_multiplier")]
    pub damage_multiplier: f64,
    /// Relative damage spread; 0 disables the variance roll
    #[serde(default)]
    pub damage_variance: f64,
    #[serde(default)]
    pub min_range: f64,
    pub max_range: f64,
    #[serde(default = "default_priority")]
    pub priority: u32,
    #[serde(default)]
    pub notes: String,
}

impl EngagementRule {
    pub fn new(attacker: UnitType, target: UnitType, base_accuracy: f64, max_range: f64) -> Self {
        Self {
            attacker,
            target,
            base_accuracy,
            damage_multiplier: 1.0,
            damage_variance: 0.0,
            min_range: 0.0,
            max_range,
            priority: DEFAULT_PRIORITY,
            notes: String::new(),
        }
    }

    pub fn with_damage(mut self, multiplier: f64, variance: f64) -> Self {
        self.damage_multiplier = multiplier;
        self.damage_variance = variance;
        self
    }

    pub fn with_min_range(mut self, min_range: f64) -> Self {
        self.min_range = min_range;
        self
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn in_range(&self, distance: f64) -> bool {
        distance >= self.min_range && distance <= self.max_range
    }

    fn validate(&self) -> Result<()> {
        let fail = |reason: String| {
            Err(SimError::InvalidRule {
                attacker: self.attacker.to_string(),
                target: self.target.to_string(),
                reason,
            })
        };

        if !(0.0..=1.0).contains(&self.base_accuracy) {
            return fail(format!(
                "base_accuracy ({}) must be within [0, 1]",
                self.base_accuracy
            ));
        }
        if !(self.min_range >= 0.0) || !(self.max_range >= self.min_range) {
            return fail(format!(
                "range window [{}, {}] is invalid",
                self.min_range, self.max_range
            ));
        }
        if !(self.damage_multiplier >= 0.0) {
            return fail(format!(
                "damage_multiplier ({}) must be non-negative",
                self.damage_multiplier
            ));
        }
        if !(0.0..1.0).contains(&self.damage_variance) {
            return fail(format!(
                "damage_variance ({}) must be within [0, 1)",
                self.damage_variance
            ));
        }
        Ok(())
    }
}

/// Immutable lookup table of engagement rules
#[derive(Debug, Clone, Default)]
pub struct EngagementRuleSet {
    rules: AHashMap<(UnitType, UnitType), EngagementRule>,
}

impl EngagementRuleSet {
    /// Build from a list of rules, rejecting invalid entries and duplicate pairs
    pub fn new(rules: impl IntoIterator<Item = EngagementRule>) -> Result<Self> {
        let mut map = AHashMap::new();
        for rule in rules {
            rule.validate()?;
            let key = (rule.attacker, rule.target);
            if map.contains_key(&key) {
                return Err(SimError::InvalidRule {
                    attacker: rule.attacker.to_string(),
                    target: rule.target.to_string(),
                    reason: "duplicate rule for this pair".into(),
                });
            }
            map.insert(key, rule);
        }
        Ok(Self { rules: map })
    }

    pub fn lookup(&self, attacker: UnitType, target: UnitType) -> Option<&EngagementRule> {
        self.rules.get(&(attacker, target))
    }

    pub fn priority(&self, attacker: UnitType, target: UnitType) -> u32 {
        self.lookup(attacker, target)
            .map(|r| r.priority)
            .unwrap_or(DEFAULT_PRIORITY)
    }

    pub fn can_engage(&self, attacker: UnitType, target: UnitType, distance: f64) -> bool {
        self.lookup(attacker, target)
            .is_some_and(|r| r.in_range(distance))
    }

    /// Rules where `attacker` is the firing type, best priority first
    pub fn rules_for_attacker(&self, attacker: UnitType) -> Vec<&EngagementRule> {
        let mut out: Vec<_> = self.rules.values().filter(|r| r.attacker == attacker).collect();
        out.sort_by_key(|r| (r.priority, r.target));
        out
    }

    /// Rules where `target` is the receiving type, best priority first
    pub fn rules_against(&self, target: UnitType) -> Vec<&EngagementRule> {
        let mut out: Vec<_> = self.rules.values().filter(|r| r.target == target).collect();
        out.sort_by_key(|r| (r.priority, r.attacker));
        out
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

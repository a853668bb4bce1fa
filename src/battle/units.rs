//! Units: the static spec loaded from a scenario and the live battle record
//!
//! A `UnitSpec` is immutable input. A `Unit` is created from it at battle
//! initialization and is only mutated by the scheduler during a step.

use serde::{Deserialize, Serialize};

use crate::battle::unit_type::UnitType;
use crate::core::error::{Result, SimError};
use crate::core::types::{Position, Side, UnitId};

/// Unit description as supplied by configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitSpec {
    pub id: UnitId,
    pub name: String,
    pub side: Side,
    #[serde(rename = "type")]
    pub unit_type: UnitType,
    pub position: Position,
    /// Initial heading in degrees
    #[serde(default)]
    pub heading: f64,
    /// Starting hp; defaults to `max_hp`
    #[serde(default)]
    pub hp: Option<f64>,
    pub max_hp: f64,
    pub attack_power: f64,
    pub range: f64,
    #[serde(alias = "accuracy")]
    pub base_accuracy: f64,
    #[serde(default)]
    pub armor: f64,
    #[serde(default)]
    pub speed: f64,
    #[serde(default)]
    pub personnel_count: u32,
}

impl UnitSpec {
    /// Minimal spec with full hp and zeroed secondary stats
    pub fn new(id: u32, name: impl Into<String>, side: Side, unit_type: UnitType) -> Self {
        Self {
            id: UnitId(id),
            name: name.into(),
            side,
            unit_type,
            position: Position::default(),
            heading: 0.0,
            hp: None,
            max_hp: 100.0,
            attack_power: 10.0,
            range: 1.0,
            base_accuracy: 1.0,
            armor: 0.0,
            speed: 0.0,
            personnel_count: 0,
        }
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Position::new(x, y);
        self
    }

    pub fn starting_hp(&self) -> f64 {
        self.hp.unwrap_or(self.max_hp)
    }

    /// Range and sanity checks. Any failure is a fatal configuration error.
    pub fn validate(&self) -> Result<()> {
        let fail = |reason: String| {
            Err(SimError::InvalidUnit {
                id: self.id,
                reason,
            })
        };

        if !(self.max_hp > 0.0) {
            return fail(format!("max_hp ({}) must be positive", self.max_hp));
        }
        let hp = self.starting_hp();
        // A unit must enter the battle alive
        if !(hp > 0.0 && hp <= self.max_hp) {
            return fail(format!("hp ({}) must be within (0, {}]", hp, self.max_hp));
        }
        if !(0.0..=1.0).contains(&self.base_accuracy) {
            return fail(format!(
                "base_accuracy ({}) must be within [0, 1]",
                self.base_accuracy
            ));
        }
        for (label, value) in [
            ("attack_power", self.attack_power),
            ("range", self.range),
            ("armor", self.armor),
            ("speed", self.speed),
        ] {
            if !(value >= 0.0) {
                return fail(format!("{} ({}) must be non-negative", label, value));
            }
        }
        if !self.position.x.is_finite() || !self.position.y.is_finite() {
            return fail("position must be finite".into());
        }
        Ok(())
    }
}

/// Live unit state inside a battle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub name: String,
    pub unit_type: UnitType,
    pub side: Side,
    pub position: Position,
    pub heading: f64,
    pub hp: f64,
    pub max_hp: f64,
    pub attack_power: f64,
    pub range: f64,
    pub base_accuracy: f64,
    pub armor: f64,
    pub speed: f64,
    pub personnel_count: u32,

    pub kills: u32,
    pub shots_fired: u32,
    pub hits_landed: u32,

    /// Weak reference by id; may go stale and is cleared before use
    pub current_target: Option<UnitId>,
}

impl Unit {
    pub fn from_spec(spec: &UnitSpec) -> Self {
        Self {
            id: spec.id,
            name: spec.name.clone(),
            unit_type: spec.unit_type,
            side: spec.side,
            position: spec.position,
            heading: spec.heading,
            hp: spec.starting_hp(),
            max_hp: spec.max_hp,
            attack_power: spec.attack_power,
            range: spec.range,
            base_accuracy: spec.base_accuracy,
            armor: spec.armor,
            speed: spec.speed,
            personnel_count: spec.personnel_count,
            kills: 0,
            shots_fired: 0,
            hits_landed: 0,
            current_target: None,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0.0
    }

    pub fn is_damaged(&self) -> bool {
        self.is_alive() && self.hp < self.max_hp
    }

    pub fn hp_fraction(&self) -> f64 {
        self.hp / self.max_hp
    }

    /// Subtract damage, clamping at zero
    ///
    /// Returns true exactly once: on the call that takes the unit from alive
    /// to destroyed.
    pub fn apply_damage(&mut self, damage: f64) -> bool {
        let was_alive = self.is_alive();
        self.hp = (self.hp - damage.max(0.0)).max(0.0);
        debug_assert!(self.hp >= 0.0 && self.hp <= self.max_hp);
        if !self.is_alive() {
            self.current_target = None;
        }
        was_alive && !self.is_alive()
    }

    /// Move by `distance` along a unit direction and update heading
    pub fn move_along(&mut self, dx: f64, dy: f64, distance: f64) {
        if dx == 0.0 && dy == 0.0 {
            return;
        }
        self.position = self.position.offset(dx, dy, distance);
        self.heading = dy.atan2(dx).to_degrees();
    }

    /// Hits over shots as a percentage; zero before the first shot
    pub fn accuracy_percent(&self) -> f64 {
        if self.shots_fired == 0 {
            0.0
        } else {
            self.hits_landed as f64 / self.shots_fired as f64 * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tank() -> Unit {
        Unit::from_spec(&UnitSpec::new(1, "T-72", Side::A, UnitType::Tank))
    }

    #[test]
    fn test_apply_damage_clamps_and_reports_once() {
        let mut unit = tank();
        assert!(!unit.apply_damage(40.0));
        assert_eq!(unit.hp, 60.0);
        assert!(unit.apply_damage(500.0));
        assert_eq!(unit.hp, 0.0);
        assert!(!unit.is_alive());
        assert!(!unit.apply_damage(10.0));
        assert_eq!(unit.hp, 0.0);
    }

    #[test]
    fn test_negative_damage_never_heals() {
        let mut unit = tank();
        unit.apply_damage(30.0);
        unit.apply_damage(-50.0);
        assert_eq!(unit.hp, 70.0);
    }

    #[test]
    fn test_move_along_updates_heading() {
        let mut unit = tank();
        unit.move_along(0.0, 1.0, 2.0);
        assert_eq!(unit.position, Position::new(0.0, 2.0));
        assert!((unit.heading - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_spec_validation() {
        let mut spec = UnitSpec::new(5, "Bad", Side::B, UnitType::Bmp);
        assert!(spec.validate().is_ok());

        spec.hp = Some(150.0);
        assert!(matches!(
            spec.validate(),
            Err(SimError::InvalidUnit { id: UnitId(5), .. })
        ));

        spec.hp = None;
        spec.base_accuracy = 1.2;
        assert!(spec.validate().is_err());
        spec.base_accuracy = 0.7;

        spec.hp = Some(0.0);
        assert!(matches!(
            spec.validate(),
            Err(SimError::InvalidUnit { id: UnitId(5), .. })
        ));
        spec.hp = Some(-1.0);
        assert!(spec.validate().is_err());
        spec.hp = Some(0.5);
        assert!(spec.validate().is_ok());

        spec.hp = None;
        spec.base_accuracy = 1.2;
        assert!(spec.validate().is_err());

        spec.base_accuracy = 0.7;
        spec.max_hp = 0.0;
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_accuracy_percent() {
        let mut unit = tank();
        assert_eq!(unit.accuracy_percent(), 0.0);
        unit.shots_fired = 3;
        unit.hits_landed = 2;
        assert!((unit.accuracy_percent() - 66.666).abs() < 0.01);
    }
}

//! Per-side tallies recomputed after every step

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::battle::state::{BattleState, BattleStatus};
use crate::battle::unit_type::UnitType;
use crate::battle::units::Unit;
use crate::core::types::{round_to, Side, Step};

/// Counts for one unit type on one side
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeStats {
    pub total: u32,
    pub alive: u32,
    pub destroyed: u32,
    pub damaged: u32,
    pub kills: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SideStats {
    pub side: Side,
    pub total: u32,
    pub alive: u32,
    pub destroyed: u32,
    /// Alive but below max hp
    pub damaged: u32,
    pub total_kills: u32,
    pub shots: u32,
    pub hits: u32,
    /// Hits over shots in percent, 2 decimals
    pub accuracy: f64,
    /// Sum of type potential scaled by remaining hp fraction
    pub combat_potential: f64,
    pub by_type: BTreeMap<UnitType, TypeStats>,
}

impl SideStats {
    pub fn empty(side: Side) -> Self {
        Self {
            side,
            total: 0,
            alive: 0,
            destroyed: 0,
            damaged: 0,
            total_kills: 0,
            shots: 0,
            hits: 0,
            accuracy: 0.0,
            combat_potential: 0.0,
            by_type: BTreeMap::new(),
        }
    }

    pub fn collect(side: Side, units: &[Unit]) -> Self {
        let mut stats = Self::empty(side);
        for unit in units.iter().filter(|u| u.side == side) {
            let entry = stats.by_type.entry(unit.unit_type).or_default();
            stats.total += 1;
            entry.total += 1;
            if unit.is_alive() {
                stats.alive += 1;
                entry.alive += 1;
                stats.combat_potential += unit.unit_type.combat_potential() * unit.hp_fraction();
                if unit.is_damaged() {
                    stats.damaged += 1;
                    entry.damaged += 1;
                }
            } else {
                stats.destroyed += 1;
                entry.destroyed += 1;
            }
            stats.total_kills += unit.kills;
            entry.kills += unit.kills;
            stats.shots += unit.shots_fired;
            stats.hits += unit.hits_landed;
        }
        if stats.shots > 0 {
            stats.accuracy = round_to(stats.hits as f64 / stats.shots as f64 * 100.0, 2);
        }
        stats
    }

    /// Fraction of starting potential still in the field
    pub fn potential_ratio(&self, initial_potential: f64) -> f64 {
        if initial_potential > 0.0 {
            self.combat_potential / initial_potential
        } else {
            0.0
        }
    }
}

/// Whole-battle statistics report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleStatistics {
    pub step: Step,
    pub status: BattleStatus,
    pub side_a: SideStats,
    pub side_b: SideStats,
    /// Remaining combat potential over starting potential, per side
    pub potential_ratio_a: f64,
    pub potential_ratio_b: f64,
}

impl BattleStatistics {
    pub fn capture(state: &BattleState, initial: &BattleState) -> Self {
        let side_a = state.stats(Side::A).clone();
        let side_b = state.stats(Side::B).clone();
        Self {
            step: state.step,
            status: state.status,
            potential_ratio_a: side_a.potential_ratio(initial.stats(Side::A).combat_potential),
            potential_ratio_b: side_b.potential_ratio(initial.stats(Side::B).combat_potential),
            side_a,
            side_b,
        }
    }

    pub fn side(&self, side: Side) -> &SideStats {
        match side {
            Side::A => &self.side_a,
            Side::B => &self.side_b,
        }
    }
}

/// Units of `side` with at least one kill, most kills first, ties by id
pub fn top_killers(units: &[Unit], side: Side, limit: usize) -> Vec<&Unit> {
    let mut killers: Vec<&Unit> = units
        .iter()
        .filter(|u| u.side == side && u.kills > 0)
        .collect();
    killers.sort_by(|a, b| b.kills.cmp(&a.kills).then(a.id.cmp(&b.id)));
    killers.truncate(limit);
    killers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::units::UnitSpec;

    fn units() -> Vec<Unit> {
        let mut out: Vec<Unit> = vec![
            UnitSpec::new(1, "t1", Side::A, UnitType::Tank),
            UnitSpec::new(2, "t2", Side::A, UnitType::Tank),
            UnitSpec::new(3, "i1", Side::A, UnitType::Infantry),
            UnitSpec::new(4, "b1", Side::B, UnitType::Bmp),
        ]
        .iter()
        .map(Unit::from_spec)
        .collect();
        out[0].kills = 1;
        out[0].shots_fired = 3;
        out[0].hits_landed = 2;
        out[1].apply_damage(50.0);
        out[2].apply_damage(100.0);
        out
    }

    #[test]
    fn test_collect_side_a() {
        let stats = SideStats::collect(Side::A, &units());
        assert_eq!(stats.total, 3);
        assert_eq!(stats.alive, 2);
        assert_eq!(stats.destroyed, 1);
        assert_eq!(stats.damaged, 1);
        assert_eq!(stats.total_kills, 1);
        assert_eq!(stats.accuracy, 66.67);
        assert!((stats.combat_potential - 9.0).abs() < 1e-9);
        assert_eq!(stats.by_type[&UnitType::Tank].alive, 2);
        assert_eq!(stats.by_type[&UnitType::Infantry].destroyed, 1);
    }

    #[test]
    fn test_no_shots_means_zero_accuracy() {
        let stats = SideStats::collect(Side::B, &units());
        assert_eq!(stats.accuracy, 0.0);
        assert_eq!(stats.alive, 1);
    }

    #[test]
    fn test_top_killers_skips_zero_kills() {
        let list = units();
        let top = top_killers(&list, Side::A, 3);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].name, "t1");
    }
}

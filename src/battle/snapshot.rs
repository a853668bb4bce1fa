//! Read-only per-step view consumed by visualization and control layers

use serde::{Deserialize, Serialize};

use crate::battle::state::{BattleState, BattleStatus};
use crate::battle::stats::SideStats;
use crate::battle::unit_type::UnitType;
use crate::battle::units::Unit;
use crate::core::types::{round_to, Position, Side, Step, UnitId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitSnapshot {
    pub id: UnitId,
    pub name: String,
    #[serde(rename = "type")]
    pub unit_type: UnitType,
    pub side: Side,
    pub position: Position,
    pub heading: f64,
    pub hp: f64,
    pub hp_percent: f64,
    pub max_hp: f64,
    pub kills: u32,
    pub shots_fired: u32,
    pub hits_landed: u32,
    pub accuracy_percent: f64,
    pub personnel_count: u32,
    pub has_target: bool,
    pub is_alive: bool,
}

impl UnitSnapshot {
    fn capture(unit: &Unit, state: &BattleState) -> Self {
        let has_target = unit
            .current_target
            .and_then(|id| state.unit(id))
            .is_some_and(|t| t.is_alive());
        Self {
            id: unit.id,
            name: unit.name.clone(),
            unit_type: unit.unit_type,
            side: unit.side,
            position: unit.position,
            heading: unit.heading,
            hp: unit.hp,
            hp_percent: round_to(unit.hp_fraction() * 100.0, 1),
            max_hp: unit.max_hp,
            kills: unit.kills,
            shots_fired: unit.shots_fired,
            hits_landed: unit.hits_landed,
            accuracy_percent: round_to(unit.accuracy_percent(), 1),
            personnel_count: unit.personnel_count,
            has_target,
            is_alive: unit.is_alive(),
        }
    }
}

/// Headline figures for one side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SideSummary {
    pub alive: u32,
    pub total: u32,
    pub destroyed: u32,
    pub total_kills: u32,
    pub accuracy: f64,
}

impl From<&SideStats> for SideSummary {
    fn from(stats: &SideStats) -> Self {
        Self {
            alive: stats.alive,
            total: stats.total,
            destroyed: stats.destroyed,
            total_kills: stats.total_kills,
            accuracy: stats.accuracy,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleSnapshot {
    pub step: Step,
    pub status: BattleStatus,
    /// Every unit in id order, destroyed ones included
    pub units: Vec<UnitSnapshot>,
    pub side_a: SideSummary,
    pub side_b: SideSummary,
}

impl BattleSnapshot {
    pub fn capture(state: &BattleState) -> Self {
        let mut units: Vec<UnitSnapshot> = state
            .units()
            .iter()
            .map(|u| UnitSnapshot::capture(u, state))
            .collect();
        units.sort_by_key(|u| u.id);
        Self {
            step: state.step,
            status: state.status,
            units,
            side_a: state.stats(Side::A).into(),
            side_b: state.stats(Side::B).into(),
        }
    }

    pub fn side(&self, side: Side) -> &SideSummary {
        match side {
            Side::A => &self.side_a,
            Side::B => &self.side_b,
        }
    }

    pub fn alive_units(&self) -> impl Iterator<Item = &UnitSnapshot> {
        self.units.iter().filter(|u| u.is_alive)
    }
}

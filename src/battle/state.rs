//! Battle state: the owner of every unit, the step counter and the status

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::battle::stats::SideStats;
use crate::battle::units::{Unit, UnitSpec};
use crate::core::error::{Result, SimError};
use crate::core::types::{Side, Step, UnitId};

/// How a finished battle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleOutcome {
    Victory(Side),
    /// Both sides eliminated in the same step
    Draw,
    /// Step limit reached with both sides still standing
    Timeout,
    /// Stopped externally
    Terminated,
}

impl BattleOutcome {
    pub fn winner(&self) -> Option<Side> {
        match self {
            BattleOutcome::Victory(side) => Some(*side),
            _ => None,
        }
    }
}

impl std::fmt::Display for BattleOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BattleOutcome::Victory(side) => write!(f, "Side {} victory", side),
            BattleOutcome::Draw => f.write_str("Draw"),
            BattleOutcome::Timeout => f.write_str("Timeout"),
            BattleOutcome::Terminated => f.write_str("Terminated"),
        }
    }
}

/// Scheduler lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleStatus {
    Initialized,
    Running,
    Finished(BattleOutcome),
}

impl BattleStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, BattleStatus::Finished(_))
    }

    pub fn outcome(&self) -> Option<BattleOutcome> {
        match self {
            BattleStatus::Finished(outcome) => Some(*outcome),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BattleState {
    units: Vec<Unit>,
    index: AHashMap<UnitId, usize>,
    pub step: Step,
    pub status: BattleStatus,
    side_stats: [SideStats; 2],
}

impl BattleState {
    /// Build the initial state. Invalid or duplicate units are rejected.
    pub fn new(specs: &[UnitSpec]) -> Result<Self> {
        let mut units = Vec::with_capacity(specs.len());
        let mut index = AHashMap::with_capacity(specs.len());
        for spec in specs {
            spec.validate()?;
            if index.insert(spec.id, units.len()).is_some() {
                return Err(SimError::DuplicateUnit(spec.id));
            }
            units.push(Unit::from_spec(spec));
        }

        let mut state = Self {
            units,
            index,
            step: 0,
            status: BattleStatus::Initialized,
            side_stats: [SideStats::empty(Side::A), SideStats::empty(Side::B)],
        };
        state.recompute_stats();
        Ok(state)
    }

    /// All units in insertion order, destroyed ones included
    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.index.get(&id).map(|&i| &self.units[i])
    }

    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        match self.index.get(&id) {
            Some(&i) => self.units.get_mut(i),
            None => None,
        }
    }

    /// Mutable access to two distinct units at once
    pub fn pair_mut(&mut self, a: UnitId, b: UnitId) -> Option<(&mut Unit, &mut Unit)> {
        let ia = *self.index.get(&a)?;
        let ib = *self.index.get(&b)?;
        if ia == ib {
            return None;
        }
        if ia < ib {
            let (lo, hi) = self.units.split_at_mut(ib);
            Some((&mut lo[ia], &mut hi[0]))
        } else {
            let (lo, hi) = self.units.split_at_mut(ia);
            Some((&mut hi[0], &mut lo[ib]))
        }
    }

    /// Ids of living units, ascending
    pub fn alive_ids(&self) -> Vec<UnitId> {
        let mut ids: Vec<UnitId> = self
            .units
            .iter()
            .filter(|u| u.is_alive())
            .map(|u| u.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn alive_count(&self, side: Side) -> usize {
        self.units
            .iter()
            .filter(|u| u.side == side && u.is_alive())
            .count()
    }

    pub fn stats(&self, side: Side) -> &SideStats {
        &self.side_stats[side.index()]
    }

    pub fn recompute_stats(&mut self) {
        for side in Side::ALL {
            self.side_stats[side.index()] = SideStats::collect(side, &self.units);
        }
    }

    /// Evaluate end conditions after a completed pass
    ///
    /// Elimination is checked before the step limit, so a battle decided on
    /// its final allowed step is a victory rather than a timeout.
    pub fn check_termination(&self, max_steps: u64) -> Option<BattleOutcome> {
        let a = self.alive_count(Side::A);
        let b = self.alive_count(Side::B);
        match (a, b) {
            (0, 0) => Some(BattleOutcome::Draw),
            (0, _) => Some(BattleOutcome::Victory(Side::B)),
            (_, 0) => Some(BattleOutcome::Victory(Side::A)),
            _ if self.step >= max_steps => Some(BattleOutcome::Timeout),
            _ => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_finished()
    }
}

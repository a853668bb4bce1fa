//! Per-turn decisions
//!
//! Every unit is driven by a `Controller`: either the built-in scripted
//! behaviour or an external `DecisionProvider` (a learned policy, a test
//! script, a closure). Both see the same read-only `BattleView` and return
//! an action from the same closed set.

use serde::{Deserialize, Serialize};

use crate::battle::rules::EngagementRuleSet;
use crate::battle::state::BattleState;
use crate::battle::targeting::{self, TargetingMode};
use crate::battle::units::Unit;
use crate::core::config::SimulationConfig;
use crate::core::types::{Position, Step, UnitId};

const DIAG: f64 = 0.707;

/// Unit movement vector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Direction {
    pub dx: f64,
    pub dy: f64,
}

impl Direction {
    pub const NORTH: Direction = Direction { dx: 0.0, dy: 1.0 };
    pub const SOUTH: Direction = Direction { dx: 0.0, dy: -1.0 };
    pub const EAST: Direction = Direction { dx: 1.0, dy: 0.0 };
    pub const WEST: Direction = Direction { dx: -1.0, dy: 0.0 };
    pub const NORTH_EAST: Direction = Direction { dx: DIAG, dy: DIAG };
    pub const NORTH_WEST: Direction = Direction { dx: -DIAG, dy: DIAG };
    pub const SOUTH_EAST: Direction = Direction { dx: DIAG, dy: -DIAG };
    pub const SOUTH_WEST: Direction = Direction { dx: -DIAG, dy: -DIAG };

    /// Unit vector from `from` to `to`, or none if they coincide
    pub fn toward(from: Position, to: Position) -> Option<Self> {
        let dx = to.x - from.x;
        let dy = to.y - from.y;
        let len = (dx * dx + dy * dy).sqrt();
        if len > 0.0 {
            Some(Self {
                dx: dx / len,
                dy: dy / len,
            })
        } else {
            None
        }
    }

    pub fn reversed(self) -> Self {
        Self {
            dx: -self.dx,
            dy: -self.dy,
        }
    }
}

/// Closed set of actions a unit may take on its turn
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Action {
    Move(Direction),
    Attack(TargetingMode),
    /// Move away from the nearest enemy at boosted speed
    Retreat,
    Hold,
}

impl Action {
    /// Number of entries in the discrete action space
    pub const COUNT: usize = 13;

    /// Map a discrete action index (as used by learned policies)
    ///
    /// 0-7 compass moves (N, S, E, W, NE, NW, SE, SW), 8 hold,
    /// 9-11 attack nearest/weakest/strongest, 12 retreat.
    pub fn from_index(index: usize) -> Option<Self> {
        let action = match index {
            0 => Action::Move(Direction::NORTH),
            1 => Action::Move(Direction::SOUTH),
            2 => Action::Move(Direction::EAST),
            3 => Action::Move(Direction::WEST),
            4 => Action::Move(Direction::NORTH_EAST),
            5 => Action::Move(Direction::NORTH_WEST),
            6 => Action::Move(Direction::SOUTH_EAST),
            7 => Action::Move(Direction::SOUTH_WEST),
            8 => Action::Hold,
            9 => Action::Attack(TargetingMode::Nearest),
            10 => Action::Attack(TargetingMode::Weakest),
            11 => Action::Attack(TargetingMode::Strongest),
            12 => Action::Retreat,
            _ => return None,
        };
        Some(action)
    }
}

/// Which action families are currently meaningful for a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionMask {
    pub can_attack: bool,
    pub can_retreat: bool,
}

impl ActionMask {
    pub fn allows(&self, action: &Action) -> bool {
        match action {
            Action::Move(_) | Action::Hold => true,
            Action::Attack(_) => self.can_attack,
            Action::Retreat => self.can_retreat,
        }
    }

    /// Flat mask over the discrete action space
    pub fn to_array(&self) -> [bool; Action::COUNT] {
        let mut mask = [true; Action::COUNT];
        for (i, slot) in mask.iter_mut().enumerate() {
            if let Some(action) = Action::from_index(i) {
                *slot = self.allows(&action);
            }
        }
        mask
    }
}

/// Read-only view of the battle handed to decision providers
pub struct BattleView<'a> {
    state: &'a BattleState,
    rules: &'a EngagementRuleSet,
    config: &'a SimulationConfig,
}

impl<'a> BattleView<'a> {
    pub fn new(
        state: &'a BattleState,
        rules: &'a EngagementRuleSet,
        config: &'a SimulationConfig,
    ) -> Self {
        Self {
            state,
            rules,
            config,
        }
    }

    pub fn step(&self) -> Step {
        self.state.step
    }

    pub fn units(&self) -> &'a [Unit] {
        self.state.units()
    }

    pub fn unit(&self, id: UnitId) -> Option<&'a Unit> {
        self.state.unit(id)
    }

    pub fn rules(&self) -> &'a EngagementRuleSet {
        self.rules
    }

    pub fn config(&self) -> &'a SimulationConfig {
        self.config
    }

    pub fn distance(&self, a: &Unit, b: &Unit) -> f64 {
        self.config.distance_metric.distance(&a.position, &b.position)
    }

    pub fn alive_enemies(&self, unit: &Unit) -> impl Iterator<Item = &'a Unit> + 'a {
        let side = unit.side;
        self.units()
            .iter()
            .filter(move |u| u.is_alive() && u.side != side)
    }

    pub fn nearest_enemy(&self, unit: &Unit) -> Option<&'a Unit> {
        targeting::nearest_enemy(unit, self.units(), self.config.distance_metric)
    }

    /// Best target currently in range under `mode`
    pub fn target_in_range(&self, unit: &Unit, mode: TargetingMode) -> Option<UnitId> {
        targeting::select_target(
            unit,
            self.units(),
            self.rules,
            self.config.distance_metric,
            mode,
        )
    }

    pub fn action_mask(&self, unit: &Unit) -> ActionMask {
        ActionMask {
            can_attack: self.target_in_range(unit, TargetingMode::Nearest).is_some(),
            can_retreat: self.nearest_enemy(unit).is_some(),
        }
    }
}

/// Source of per-turn actions
pub trait DecisionProvider {
    fn decide(&mut self, unit: &Unit, view: &BattleView<'_>) -> Action;
}

impl<F> DecisionProvider for F
where
    F: FnMut(&Unit, &BattleView<'_>) -> Action,
{
    fn decide(&mut self, unit: &Unit, view: &BattleView<'_>) -> Action {
        self(unit, view)
    }
}

/// Built-in behaviour: fire if anything is in range, otherwise close in
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptedDecision;

impl DecisionProvider for ScriptedDecision {
    fn decide(&mut self, unit: &Unit, view: &BattleView<'_>) -> Action {
        if view.target_in_range(unit, TargetingMode::Priority).is_some() {
            return Action::Attack(TargetingMode::Priority);
        }
        view.nearest_enemy(unit)
            .and_then(|enemy| Direction::toward(unit.position, enemy.position))
            .map(Action::Move)
            .unwrap_or(Action::Hold)
    }
}

/// Decision source bound to a unit
pub enum Controller {
    Scripted(ScriptedDecision),
    External(Box<dyn DecisionProvider + Send>),
}

impl Controller {
    pub fn external(provider: impl DecisionProvider + Send + 'static) -> Self {
        Controller::External(Box::new(provider))
    }

    pub fn is_scripted(&self) -> bool {
        matches!(self, Controller::Scripted(_))
    }

    pub fn decide(&mut self, unit: &Unit, view: &BattleView<'_>) -> Action {
        match self {
            Controller::Scripted(s) => s.decide(unit, view),
            Controller::External(p) => p.decide(unit, view),
        }
    }
}

impl Default for Controller {
    fn default() -> Self {
        Controller::Scripted(ScriptedDecision)
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Controller::Scripted(_) => f.write_str("Controller::Scripted"),
            Controller::External(_) => f.write_str("Controller::External"),
        }
    }
}

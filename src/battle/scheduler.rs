//! Step scheduler
//!
//! Drives a battle one step at a time:
//! 1. Snapshot living unit ids in ascending order
//! 2. For each id still alive at its turn: decide, apply, emit events
//! 3. Recompute side stats and evaluate termination
//!
//! All randomness comes from one seeded `ChaCha8Rng` owned by the battle,
//! so the same scenario and seed reproduce the same event stream.

use ahash::AHashMap;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::battle::decision::{Action, BattleView, Controller, Direction};
use crate::battle::events::{CombatEvent, CombatEventKind, EventSink, NullSink};
use crate::battle::resolution::{resolve_shot, ShotResult};
use crate::battle::rules::EngagementRuleSet;
use crate::battle::snapshot::BattleSnapshot;
use crate::battle::state::{BattleOutcome, BattleState, BattleStatus};
use crate::battle::stats::BattleStatistics;
use crate::battle::targeting::{self, TargetingMode};
use crate::battle::units::Unit;
use crate::core::config::SimulationConfig;
use crate::core::error::{Result, SimError};
use crate::core::types::{Side, Step, UnitId};
use crate::data::scenario::Scenario;

/// Everything a caller needs after one step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepReport {
    pub step: Step,
    pub status: BattleStatus,
    pub running: bool,
    /// Events emitted during this step only
    pub events: Vec<CombatEvent>,
    pub snapshot: BattleSnapshot,
}

pub struct BattleScheduler {
    config: SimulationConfig,
    rules: EngagementRuleSet,
    initial: BattleState,
    state: BattleState,
    rng: ChaCha8Rng,
    controllers: AHashMap<UnitId, Controller>,
    sink: Box<dyn EventSink + Send>,
    history: Vec<CombatEvent>,
}

impl BattleScheduler {
    /// Build a battle from a scenario. Any configuration error is fatal.
    pub fn new(scenario: Scenario) -> Result<Self> {
        scenario.config.validate().map_err(SimError::InvalidConfig)?;
        let rules = EngagementRuleSet::new(scenario.rules)?;
        let initial = BattleState::new(&scenario.units)?;
        let rng = ChaCha8Rng::seed_from_u64(scenario.config.seed);

        Ok(Self {
            config: scenario.config,
            rules,
            state: initial.clone(),
            initial,
            rng,
            controllers: AHashMap::new(),
            sink: Box::new(NullSink),
            history: Vec::new(),
        })
    }

    pub fn with_sink(mut self, sink: impl EventSink + Send + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn set_sink(&mut self, sink: Box<dyn EventSink + Send>) {
        self.sink = sink;
    }

    /// Bind a decision source to one unit; unbound units are scripted
    pub fn assign_controller(&mut self, id: UnitId, controller: Controller) -> Result<()> {
        if self.state.unit(id).is_none() {
            return Err(SimError::UnknownUnit(id));
        }
        self.controllers.insert(id, controller);
        Ok(())
    }

    /// Bind a decision source to every unit of `side`
    pub fn assign_side_controller<F>(&mut self, side: Side, mut make: F)
    where
        F: FnMut(UnitId) -> Controller,
    {
        let ids: Vec<UnitId> = self
            .state
            .units()
            .iter()
            .filter(|u| u.side == side)
            .map(|u| u.id)
            .collect();
        for id in ids {
            self.controllers.insert(id, make(id));
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn rules(&self) -> &EngagementRuleSet {
        &self.rules
    }

    pub fn state(&self) -> &BattleState {
        &self.state
    }

    pub fn status(&self) -> BattleStatus {
        self.state.status
    }

    pub fn current_step(&self) -> Step {
        self.state.step
    }

    pub fn is_running(&self) -> bool {
        !self.state.is_finished()
    }

    /// Every event emitted since construction or the last reset
    pub fn history(&self) -> &[CombatEvent] {
        &self.history
    }

    pub fn view(&self) -> BattleView<'_> {
        BattleView::new(&self.state, &self.rules, &self.config)
    }

    pub fn snapshot(&self) -> BattleSnapshot {
        BattleSnapshot::capture(&self.state)
    }

    pub fn statistics(&self) -> BattleStatistics {
        BattleStatistics::capture(&self.state, &self.initial)
    }

    /// Transition from Initialized to Running; no-op otherwise
    pub fn start(&mut self) {
        if self.state.status != BattleStatus::Initialized {
            return;
        }
        self.state.status = BattleStatus::Running;
        tracing::info!(
            seed = self.config.seed,
            side_a = self.state.alive_count(Side::A),
            side_b = self.state.alive_count(Side::B),
            "Battle started"
        );
    }

    /// Stop the battle; later steps observe Finished and do nothing
    pub fn terminate(&mut self) {
        if self.state.is_finished() {
            return;
        }
        self.finish(BattleOutcome::Terminated);
    }

    /// Restore the initial configuration and reseed the RNG
    ///
    /// Controllers and the sink are kept.
    pub fn reset(&mut self) {
        self.state = self.initial.clone();
        self.state.status = BattleStatus::Running;
        self.rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        self.history.clear();
        tracing::info!(seed = self.config.seed, "Battle reset");
    }

    /// Step until the battle finishes and return how it ended
    pub fn run_to_completion(&mut self) -> BattleOutcome {
        loop {
            if let Some(outcome) = self.state.status.outcome() {
                return outcome;
            }
            self.step();
        }
    }

    /// Advance one step
    pub fn step(&mut self) -> StepReport {
        match self.state.status {
            BattleStatus::Finished(_) => return self.report(Vec::new()),
            BattleStatus::Initialized => self.start(),
            BattleStatus::Running => {}
        }

        self.state.step += 1;
        let mut events = Vec::new();

        // Turn order is fixed for the whole pass
        let order = self.state.alive_ids();
        for id in order {
            if !self.state.unit(id).is_some_and(Unit::is_alive) {
                continue;
            }
            self.clear_stale_target(id);

            let action = {
                let view = BattleView::new(&self.state, &self.rules, &self.config);
                let Some(unit) = self.state.unit(id) else {
                    continue;
                };
                self.controllers.entry(id).or_default().decide(unit, &view)
            };
            self.apply_action(id, action, &mut events);
        }

        self.state.recompute_stats();
        tracing::debug!(
            step = self.state.step,
            shots = events.iter().filter(|e| e.is_shot()).count(),
            hits = events.iter().filter(|e| e.is_hit()).count(),
            kills = events.iter().filter(|e| e.is_destroyed()).count(),
            side_a = self.state.stats(Side::A).alive,
            side_b = self.state.stats(Side::B).alive,
            "Step complete"
        );

        if let Some(outcome) = self.state.check_termination(self.config.max_steps) {
            self.finish(outcome);
        }

        self.report(events)
    }

    fn report(&self, events: Vec<CombatEvent>) -> StepReport {
        StepReport {
            step: self.state.step,
            status: self.state.status,
            running: self.is_running(),
            events,
            snapshot: self.snapshot(),
        }
    }

    fn finish(&mut self, outcome: BattleOutcome) {
        self.state.status = BattleStatus::Finished(outcome);
        tracing::info!(
            step = self.state.step,
            side_a = self.state.alive_count(Side::A),
            side_b = self.state.alive_count(Side::B),
            "Battle ended: {}",
            outcome
        );
    }

    fn clear_stale_target(&mut self, id: UnitId) {
        let stale = match self.state.unit(id).and_then(|u| u.current_target.map(|t| (u.side, t))) {
            Some((side, target)) => !self
                .state
                .unit(target)
                .is_some_and(|t| t.is_alive() && t.side != side),
            None => false,
        };
        if stale {
            if let Some(unit) = self.state.unit_mut(id) {
                unit.current_target = None;
            }
        }
    }

    fn apply_action(&mut self, id: UnitId, action: Action, events: &mut Vec<CombatEvent>) {
        match action {
            Action::Hold => {}
            Action::Move(direction) => {
                if let Some(unit) = self.state.unit_mut(id) {
                    let speed = unit.speed;
                    unit.move_along(direction.dx, direction.dy, speed);
                }
            }
            Action::Retreat => self.execute_retreat(id),
            Action::Attack(mode) => self.execute_attack(id, mode, events),
        }
    }

    fn execute_retreat(&mut self, id: UnitId) {
        let metric = self.config.distance_metric;
        let Some(unit) = self.state.unit(id) else {
            return;
        };
        let Some(enemy) = targeting::nearest_enemy(unit, self.state.units(), metric) else {
            tracing::debug!(unit = %id, "retreat with no enemy to retreat from; holding");
            return;
        };
        let Some(away) = Direction::toward(unit.position, enemy.position).map(Direction::reversed)
        else {
            tracing::debug!(
                unit = %id,
                enemy = %enemy.id,
                "retreat from an enemy at the same position; holding"
            );
            return;
        };

        let multiplier = self.config.retreat_speed_multiplier;
        if let Some(unit) = self.state.unit_mut(id) {
            let distance = unit.speed * multiplier;
            unit.move_along(away.dx, away.dy, distance);
        }
    }

    fn execute_attack(&mut self, id: UnitId, mode: TargetingMode, events: &mut Vec<CombatEvent>) {
        let metric = self.config.distance_metric;
        let step = self.state.step;
        let timestamp = step * self.config.step_interval_ms;

        let Some(actor) = self.state.unit(id) else {
            return;
        };

        // Default mode keeps a target that is still engageable
        let sticky = match (mode, actor.current_target) {
            (TargetingMode::Priority, Some(current)) => self
                .state
                .unit(current)
                .filter(|t| targeting::engagement(actor, t, &self.rules, metric).is_some())
                .map(|t| t.id),
            _ => None,
        };
        let chosen = sticky.or_else(|| {
            targeting::select_target(actor, self.state.units(), &self.rules, metric, mode)
        });

        let Some((target, engagement)) = chosen.and_then(|target_id| {
            let target = self.state.unit(target_id)?;
            let engagement = targeting::engagement(actor, target, &self.rules, metric)?;
            Some((target, engagement))
        }) else {
            tracing::debug!(unit = %id, ?mode, "attack with no valid target; holding");
            if let Some(unit) = self.state.unit_mut(id) {
                unit.current_target = None;
            }
            return;
        };

        let outcome = resolve_shot(
            actor,
            target,
            engagement.rule,
            engagement.distance,
            engagement.max_range,
            &self.config,
            &mut self.rng,
        );
        let target_id = target.id;
        let distance = engagement.distance;

        let mut pending = vec![build_event(
            timestamp,
            step,
            CombatEventKind::Shot,
            actor,
            target,
            distance,
            outcome.hit_chance,
        )];
        if let ShotResult::Hit {
            damage,
            raw_damage,
            armor_reduction,
        } = outcome.result
        {
            pending.push(build_event(
                timestamp,
                step,
                CombatEventKind::Hit {
                    damage,
                    raw_damage,
                    armor_reduction,
                },
                actor,
                target,
                distance,
                outcome.hit_chance,
            ));
        }
        tracing::trace!(
            attacker = %id,
            target = %target_id,
            distance,
            hit_chance = outcome.hit_chance,
            roll = outcome.roll,
            hit = outcome.is_hit(),
            "shot resolved"
        );

        let Some((attacker, target)) = self.state.pair_mut(id, target_id) else {
            return;
        };
        attacker.current_target = Some(target_id);
        attacker.shots_fired += 1;
        if outcome.is_hit() {
            attacker.hits_landed += 1;
            if target.apply_damage(outcome.damage()) {
                attacker.kills += 1;
                pending.push(build_event(
                    timestamp,
                    step,
                    CombatEventKind::Destroyed {
                        total_kills: attacker.kills,
                    },
                    attacker,
                    target,
                    distance,
                    outcome.hit_chance,
                ));
                tracing::debug!(attacker = %id, target = %target_id, "unit destroyed");
            }
        }

        for event in pending {
            self.sink.emit(&event);
            self.history.push(event.clone());
            events.push(event);
        }
    }
}

fn build_event(
    timestamp: u64,
    step: Step,
    kind: CombatEventKind,
    attacker: &Unit,
    target: &Unit,
    distance: f64,
    hit_chance: f64,
) -> CombatEvent {
    CombatEvent {
        timestamp,
        step,
        kind,
        attacker: attacker.into(),
        target: target.into(),
        distance,
        hit_chance,
    }
}

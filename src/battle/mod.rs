//! Battle system - engagement rules, targeting, shot resolution, scheduling
//!
//! One step:
//! - every living unit, in ascending id order, asks its controller for an action
//! - attacks select a target and resolve a shot against the rule table
//! - outcomes mutate state and emit combat events
//! - side stats are recomputed and termination is checked

pub mod decision;
pub mod events;
pub mod resolution;
pub mod rules;
pub mod scheduler;
pub mod snapshot;
pub mod state;
pub mod stats;
pub mod targeting;
pub mod unit_type;
pub mod units;

// Re-exports for convenient access
pub use decision::{
    Action, ActionMask, BattleView, Controller, DecisionProvider, Direction, ScriptedDecision,
};
pub use events::{
    AttackerRef, ChannelSink, CombatEvent, CombatEventKind, EventSink, NullSink, TargetRef,
    VecSink,
};
pub use resolution::{hit_chance, resolve_shot, resolve_with_rolls, ShotOutcome, ShotResult};
pub use rules::{EngagementRule, EngagementRuleSet, DEFAULT_PRIORITY};
pub use scheduler::{BattleScheduler, StepReport};
pub use snapshot::{BattleSnapshot, SideSummary, UnitSnapshot};
pub use state::{BattleOutcome, BattleState, BattleStatus};
pub use stats::{top_killers, BattleStatistics, SideStats, TypeStats};
pub use targeting::{engagement, nearest_enemy, select_target, Engagement, TargetingMode};
pub use unit_type::UnitType;
pub use units::{Unit, UnitSpec};

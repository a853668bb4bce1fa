//! Target acquisition
//!
//! Pure selection over a candidate pool. A candidate qualifies when it is
//! alive, on the opposing side, covered by an engagement rule for the pair,
//! and inside that rule's range window (capped by the attacker's own range).
//! Every ranking ends with ascending unit id so selection is deterministic.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::battle::rules::{EngagementRule, EngagementRuleSet};
use crate::battle::units::Unit;
use crate::core::config::DistanceMetric;
use crate::core::types::UnitId;

/// Ranking used to choose among qualifying candidates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetingMode {
    /// Distance, then engagement priority
    #[default]
    Priority,
    Nearest,
    /// Lowest hp first
    Weakest,
    /// Highest hp first
    Strongest,
}

/// A qualifying target and the geometry of the engagement
#[derive(Debug, Clone, Copy)]
pub struct Engagement<'a> {
    pub target: UnitId,
    pub distance: f64,
    /// Outer edge of the window actually used: min(rule max, attacker range)
    pub max_range: f64,
    pub rule: &'a EngagementRule,
}

/// Check whether `actor` can fire on `target` right now
pub fn engagement<'a>(
    actor: &Unit,
    target: &Unit,
    rules: &'a EngagementRuleSet,
    metric: DistanceMetric,
) -> Option<Engagement<'a>> {
    if !target.is_alive() || target.side == actor.side || target.id == actor.id {
        return None;
    }
    let rule = rules.lookup(actor.unit_type, target.unit_type)?;
    let distance = metric.distance(&actor.position, &target.position);
    let max_range = rule.max_range.min(actor.range);
    if distance < rule.min_range || distance > max_range {
        return None;
    }
    Some(Engagement {
        target: target.id,
        distance,
        max_range,
        rule,
    })
}

type RankKey = (OrderedFloat<f64>, OrderedFloat<f64>, u32, UnitId);

fn rank_key(mode: TargetingMode, candidate: &Unit, e: &Engagement<'_>) -> RankKey {
    let d = OrderedFloat(e.distance);
    match mode {
        TargetingMode::Priority => (d, OrderedFloat(0.0), e.rule.priority, e.target),
        TargetingMode::Nearest => (d, OrderedFloat(0.0), 0, e.target),
        TargetingMode::Weakest => (OrderedFloat(candidate.hp), d, 0, e.target),
        TargetingMode::Strongest => (OrderedFloat(-candidate.hp), d, 0, e.target),
    }
}

/// Pick the best qualifying candidate under `mode`, or none
pub fn select_target<'a, I>(
    actor: &Unit,
    candidates: I,
    rules: &EngagementRuleSet,
    metric: DistanceMetric,
    mode: TargetingMode,
) -> Option<UnitId>
where
    I: IntoIterator<Item = &'a Unit>,
{
    candidates
        .into_iter()
        .filter_map(|c| engagement(actor, c, rules, metric).map(|e| rank_key(mode, c, &e)))
        .min()
        .map(|key| key.3)
}

/// Nearest living enemy regardless of rules or range
pub fn nearest_enemy<'a, I>(
    actor: &Unit,
    candidates: I,
    metric: DistanceMetric,
) -> Option<&'a Unit>
where
    I: IntoIterator<Item = &'a Unit>,
{
    candidates
        .into_iter()
        .filter(|c| c.is_alive() && c.side != actor.side)
        .min_by_key(|c| {
            (
                OrderedFloat(metric.distance(&actor.position, &c.position)),
                c.id,
            )
        })
}

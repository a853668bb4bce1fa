//! Combat events and the sink boundary
//!
//! Events are append-only records handed to an injected `EventSink`. The
//! core never writes them anywhere itself. Serialized form is one JSON
//! object per event with an `event_type` tag of `shot`, `hit` or
//! `destroyed`.

use std::sync::mpsc::Sender;

use serde::{Deserialize, Serialize};

use crate::battle::unit_type::UnitType;
use crate::battle::units::Unit;
use crate::core::types::{round_to, Position, Side, Step, UnitId};

/// Firing unit as seen in an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackerRef {
    pub id: UnitId,
    pub name: String,
    #[serde(rename = "type")]
    pub unit_type: UnitType,
    pub side: Side,
    pub position: Position,
}

impl From<&Unit> for AttackerRef {
    fn from(unit: &Unit) -> Self {
        Self {
            id: unit.id,
            name: unit.name.clone(),
            unit_type: unit.unit_type,
            side: unit.side,
            position: unit.position,
        }
    }
}

/// Receiving unit as seen in an event, with hp rounded to 2 decimals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetRef {
    pub id: UnitId,
    pub name: String,
    #[serde(rename = "type")]
    pub unit_type: UnitType,
    pub side: Side,
    pub position: Position,
    pub hp: f64,
    pub max_hp: f64,
}

impl From<&Unit> for TargetRef {
    fn from(unit: &Unit) -> Self {
        Self {
            id: unit.id,
            name: unit.name.clone(),
            unit_type: unit.unit_type,
            side: unit.side,
            position: unit.position,
            hp: round_to(unit.hp, 2),
            max_hp: unit.max_hp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "lowercase")]
pub enum CombatEventKind {
    Shot,
    Hit {
        damage: f64,
        raw_damage: f64,
        armor_reduction: f64,
    },
    Destroyed {
        total_kills: u32,
    },
}

/// One structured combat event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatEvent {
    /// Simulated milliseconds: step × step interval
    pub timestamp: u64,
    pub step: Step,
    #[serde(flatten)]
    pub kind: CombatEventKind,
    pub attacker: AttackerRef,
    pub target: TargetRef,
    pub distance: f64,
    pub hit_chance: f64,
}

impl CombatEvent {
    pub fn is_shot(&self) -> bool {
        matches!(self.kind, CombatEventKind::Shot)
    }

    pub fn is_hit(&self) -> bool {
        matches!(self.kind, CombatEventKind::Hit { .. })
    }

    pub fn is_destroyed(&self) -> bool {
        matches!(self.kind, CombatEventKind::Destroyed { .. })
    }

    pub fn type_name(&self) -> &'static str {
        match self.kind {
            CombatEventKind::Shot => "shot",
            CombatEventKind::Hit { .. } => "hit",
            CombatEventKind::Destroyed { .. } => "destroyed",
        }
    }

    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Consumer of the combat event stream
///
/// Implementations must not block the simulation.
pub trait EventSink {
    fn emit(&mut self, event: &CombatEvent);
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: &CombatEvent) {}
}

/// Collects events in memory
#[derive(Debug, Default, Clone)]
pub struct VecSink {
    pub events: Vec<CombatEvent>,
}

impl EventSink for VecSink {
    fn emit(&mut self, event: &CombatEvent) {
        self.events.push(event.clone());
    }
}

/// Forwards events over an unbounded channel to another thread
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: Sender<CombatEvent>,
}

impl ChannelSink {
    pub fn new(sender: Sender<CombatEvent>) -> Self {
        Self { sender }
    }
}

impl EventSink for ChannelSink {
    fn emit(&mut self, event: &CombatEvent) {
        if self.sender.send(event.clone()).is_err() {
            tracing::trace!("event receiver dropped; discarding {} event", event.type_name());
        }
    }
}

impl<F: FnMut(&CombatEvent)> EventSink for F {
    fn emit(&mut self, event: &CombatEvent) {
        self(event)
    }
}

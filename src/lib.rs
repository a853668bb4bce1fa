//! Combat Sim - deterministic two-sided tactical combat resolution
//!
//! The core is a step scheduler over a set of units, a data-driven table of
//! engagement rules, pure targeting and shot resolution, and an event
//! stream handed to an injected sink.

pub mod battle;
pub mod core;
pub mod data;

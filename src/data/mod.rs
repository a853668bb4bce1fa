//! Scenario data loading

pub mod scenario;

pub use scenario::{load_scenario, load_scenario_named, scenario_path, Scenario};

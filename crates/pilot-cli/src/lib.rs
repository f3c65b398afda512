//! Scenario files and the tools that run them.
//!
//! - `run_scenario`: loads a JSON scenario and takes ATC instructions from
//!   stdin

pub mod scenario;

pub use scenario::{Scenario, ScenarioAircraft, ScenarioError};

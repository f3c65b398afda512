//! Error types for the simulator runtime.

use thiserror::Error;

use pilot_core::InstructionError;

use crate::connection::ConnectionError;

/// A command that parsed but could not be carried out.
///
/// The display strings are sent back to the controller as-is.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CommandError {
    #[error(transparent)]
    Instruction(#[from] InstructionError),

    #[error("ERROR - Waypoint {0} not found!")]
    WaypointNotFound(String),

    #[error("ERROR - {0} not found in flight plan!")]
    NotInFlightPlan(String),

    #[error("ERROR - No published hold found for waypoint {0}!")]
    NoPublishedHold(String),

    #[error("ERROR - HOLD must follow a waypoint!")]
    HoldWithoutFix,
}

#[derive(Debug, Error)]
pub enum SimError {
    #[error("no performance data for aircraft type {0}")]
    UnknownAircraftType(String),

    #[error("aircraft {0} already exists")]
    DuplicateCallsign(String),

    #[error("failed to start position worker: {0}")]
    Spawn(#[from] std::io::Error),

    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

//! Runtime for simulated pilot clients: per-aircraft tick workers, command
//! handling and the shared session state.

pub mod aircraft;
pub mod commands;
pub mod config;
pub mod connection;
pub mod error;
pub mod navdata;
pub mod registry;
pub mod route;
pub mod timer;
pub mod weather;

pub use aircraft::{SimAircraft, SimContext, SpawnParams};
pub use commands::StatusLogger;
pub use config::SimConfig;
pub use connection::{ConnectionError, ConnectionStatus, NullConnection, PilotConnection, PositionReport, TracingConnection};
pub use error::{CommandError, SimError};
pub use navdata::InMemoryNavData;
pub use registry::AircraftRegistry;
pub use timer::PauseableTimer;
pub use weather::{CalmAtmosphere, UniformWeather};

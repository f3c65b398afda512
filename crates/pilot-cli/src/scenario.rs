//! JSON training scenarios.
//!
//! A scenario lists the fixes and published holds a session needs and the
//! aircraft to spawn into it:
//!
//! ```json
//! {
//!   "name": "KLO arrivals",
//!   "waypoints": [{ "identifier": "KLO", "position": { "lat": 47.46, "lon": 8.55 } }],
//!   "holds": [{ "waypoint": "KLO", "inbound_course_mag": 136, "turn_direction": "left" }],
//!   "aircraft": [{
//!     "callsign": "SWR123", "aircraft_type": "E175",
//!     "lat": 47.2, "lon": 8.9, "heading_mag": 300, "altitude_ft": 9000,
//!     "route": "KLO HOLD", "delay_s": 30
//!   }]
//! }
//! ```

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use pilot_core::{GeoPoint, NavDataSource, PublishedHold, Waypoint};
use pilot_sim::{AircraftRegistry, SimAircraft, SimConfig, SimContext, SimError, SpawnParams};

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("cannot read scenario {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid scenario: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cannot spawn {callsign}: {source}")]
    Spawn {
        callsign: String,
        #[source]
        source: SimError,
    },

    #[error("route for {callsign} rejected: {message}")]
    Route { callsign: String, message: String },
}

/// One aircraft to spawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioAircraft {
    pub callsign: String,
    pub aircraft_type: String,
    pub lat: f64,
    pub lon: f64,
    pub heading_mag: f64,
    pub altitude_ft: f64,
    #[serde(default)]
    pub ias_kts: Option<f64>,
    #[serde(default)]
    pub altimeter_hpa: Option<f64>,
    /// Route string, `HOLD` after a fix for its published hold.
    #[serde(default)]
    pub route: Option<String>,
    /// Seconds of unpaused time before the aircraft connects.
    #[serde(default)]
    pub delay_s: f64,
}

impl ScenarioAircraft {
    pub fn spawn_params(&self) -> SpawnParams {
        let mut params = SpawnParams::new(
            self.aircraft_type.clone(),
            GeoPoint::new(self.lat, self.lon),
            self.altitude_ft,
            self.heading_mag,
        );
        params.ias_kts = self.ias_kts;
        params.altimeter_hpa = self.altimeter_hpa;
        params.delay_ms = (self.delay_s.max(0.0) * 1000.0).round() as u64;
        params
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub waypoints: Vec<Waypoint>,
    #[serde(default)]
    pub holds: Vec<PublishedHold>,
    #[serde(default)]
    pub aircraft: Vec<ScenarioAircraft>,
}

impl Scenario {
    pub fn from_json(text: &str) -> Result<Self, ScenarioError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Add the scenario's fixes and holds to `nav`.
    pub fn register_nav_data(&self, nav: &dyn NavDataSource) {
        for waypoint in &self.waypoints {
            nav.add_waypoint(waypoint.clone());
        }
        for hold in &self.holds {
            nav.add_published_hold(hold.clone());
        }
        info!(
            waypoints = self.waypoints.len(),
            holds = self.holds.len(),
            "Scenario nav data registered"
        );
    }

    /// Create every aircraft, file its route and add it to `registry`.
    ///
    /// Aircraft are left paused and without a running worker. Stops at the
    /// first aircraft that cannot be created or whose route is rejected.
    pub fn spawn(
        &self,
        config: &SimConfig,
        context: &SimContext,
        registry: &AircraftRegistry,
    ) -> Result<Vec<Arc<SimAircraft>>, ScenarioError> {
        let mut spawned = Vec::with_capacity(self.aircraft.len());
        for entry in &self.aircraft {
            let spawn_error = |source| ScenarioError::Spawn {
                callsign: entry.callsign.clone(),
                source,
            };
            let aircraft = SimAircraft::new(
                entry.callsign.clone(),
                entry.spawn_params(),
                config.clone(),
                context.clone(),
            )
            .map_err(spawn_error)?;

            if let Some(route) = entry.route.as_deref().filter(|r| !r.trim().is_empty()) {
                file_route(&aircraft, route)?;
            }

            registry.add(aircraft.clone()).map_err(spawn_error)?;
            spawned.push(aircraft);
        }
        Ok(spawned)
    }
}

fn file_route(aircraft: &SimAircraft, route: &str) -> Result<(), ScenarioError> {
    let last = Mutex::new(String::new());
    let filed = aircraft.handle_commands(&format!("route {route}"), &|msg: &str| {
        *last.lock().unwrap_or_else(PoisonError::into_inner) = msg.to_string();
    });
    if filed {
        return Ok(());
    }
    warn!(callsign = %aircraft.callsign(), route, "Scenario route rejected");
    Err(ScenarioError::Route {
        callsign: aircraft.callsign().to_string(),
        message: last.into_inner().unwrap_or_else(PoisonError::into_inner),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_scenario_defaults() {
        let scenario = Scenario::from_json(r#"{ "aircraft": [] }"#).unwrap();
        assert!(scenario.name.is_none());
        assert!(scenario.waypoints.is_empty());
        assert!(scenario.holds.is_empty());
    }

    #[test]
    fn test_spawn_params_from_entry() {
        let entry: ScenarioAircraft = serde_json::from_str(
            r#"{ "callsign": "A1", "aircraft_type": "E175", "lat": 47.0, "lon": 8.0,
                 "heading_mag": 270, "altitude_ft": 9000, "ias_kts": 220, "delay_s": 2.5 }"#,
        )
        .unwrap();
        let params = entry.spawn_params();
        assert_eq!(params.delay_ms, 2500);
        assert_eq!(params.ias_kts, Some(220.0));
        assert_eq!(params.altimeter_hpa, None);
        assert_eq!(params.position, GeoPoint::new(47.0, 8.0));
    }

    #[test]
    fn test_negative_delay_is_immediate() {
        let entry = ScenarioAircraft {
            callsign: "A1".into(),
            aircraft_type: "E175".into(),
            lat: 0.0,
            lon: 0.0,
            heading_mag: 0.0,
            altitude_ft: 3000.0,
            ias_kts: None,
            altimeter_hpa: None,
            route: None,
            delay_s: -4.0,
        };
        assert_eq!(entry.spawn_params().delay_ms, 0);
    }

    #[test]
    fn test_bad_json_is_an_error() {
        assert!(matches!(
            Scenario::from_json("{ \"aircraft\": 3 }"),
            Err(ScenarioError::Json(_))
        ));
    }
}

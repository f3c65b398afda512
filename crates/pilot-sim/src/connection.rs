//! Network-facing side of a simulated aircraft.
//!
//! The wire protocol lives behind [`PilotConnection`]; the simulator only
//! connects, reports positions and exchanges frequency messages.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use pilot_core::AircraftPosition;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConnectionError {
    #[error("connection refused for {callsign}: {reason}")]
    Refused { callsign: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// Created, spawn delay not yet run out.
    Waiting,
    Connected,
    Disconnected,
}

/// Snapshot sent to the network every tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionReport {
    pub lat: f64,
    pub lon: f64,
    pub indicated_altitude_ft: f64,
    pub pressure_altitude_ft: f64,
    pub ground_speed_kts: f64,
    pub indicated_airspeed_kts: f64,
    pub heading_mag: f64,
    pub heading_true: f64,
    pub track_true: f64,
    pub vertical_speed_fpm: f64,
    pub pitch_deg: f64,
    pub bank_deg: f64,
}

impl From<&AircraftPosition> for PositionReport {
    fn from(pos: &AircraftPosition) -> Self {
        Self {
            lat: pos.lat(),
            lon: pos.lon(),
            indicated_altitude_ft: pos.indicated_altitude_ft(),
            pressure_altitude_ft: pos.pressure_altitude_ft(),
            ground_speed_kts: pos.ground_speed_kts(),
            indicated_airspeed_kts: pos.indicated_airspeed_kts(),
            heading_mag: pos.heading_mag(),
            heading_true: pos.heading_true(),
            track_true: pos.track_true(),
            vertical_speed_fpm: pos.vertical_speed_fpm(),
            pitch_deg: pos.pitch_deg(),
            bank_deg: pos.bank_deg(),
        }
    }
}

pub trait PilotConnection: Send + Sync {
    fn connect(&self, callsign: &str, report: &PositionReport) -> Result<(), ConnectionError>;

    fn disconnect(&self, callsign: &str);

    fn send_position_report(&self, callsign: &str, report: &PositionReport);

    fn send_frequency_message(&self, callsign: &str, frequency: u32, message: &str);
}

/// Accepts everything and sends nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullConnection;

impl PilotConnection for NullConnection {
    fn connect(&self, _callsign: &str, _report: &PositionReport) -> Result<(), ConnectionError> {
        Ok(())
    }

    fn disconnect(&self, _callsign: &str) {}

    fn send_position_report(&self, _callsign: &str, _report: &PositionReport) {}

    fn send_frequency_message(&self, _callsign: &str, _frequency: u32, _message: &str) {}
}

/// Writes all traffic to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingConnection;

impl PilotConnection for TracingConnection {
    fn connect(&self, callsign: &str, report: &PositionReport) -> Result<(), ConnectionError> {
        info!(
            callsign,
            lat = report.lat,
            lon = report.lon,
            altitude_ft = report.indicated_altitude_ft,
            "Pilot connected"
        );
        Ok(())
    }

    fn disconnect(&self, callsign: &str) {
        info!(callsign, "Pilot disconnected");
    }

    fn send_position_report(&self, callsign: &str, report: &PositionReport) {
        debug!(
            callsign,
            lat = format_args!("{:.5}", report.lat),
            lon = format_args!("{:.5}", report.lon),
            alt = format_args!("{:.0}", report.indicated_altitude_ft),
            hdg = format_args!("{:03.0}", report.heading_mag),
            gs = format_args!("{:.0}", report.ground_speed_kts),
            vs = format_args!("{:.0}", report.vertical_speed_fpm),
            "Position"
        );
    }

    fn send_frequency_message(&self, callsign: &str, frequency: u32, message: &str) {
        info!(callsign, frequency, "{}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use pilot_core::{FixedVariation, GeoPoint};

    #[test]
    fn test_report_from_position() {
        let position = AircraftPosition::new(
            GeoPoint::new(47.0, 8.0),
            5000.0,
            90.0,
            250.0,
            Arc::new(FixedVariation(2.0)),
        );
        let report = PositionReport::from(&position);
        assert_eq!(report.lat, 47.0);
        assert_eq!(report.lon, 8.0);
        assert!((report.heading_mag - 90.0).abs() < 1e-9);
        assert!((report.heading_true - 92.0).abs() < 1e-9);
        assert!((report.indicated_airspeed_kts - 250.0).abs() < 0.5);
        assert_eq!(report.bank_deg, 0.0);
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(serde_json::to_string(&ConnectionStatus::Waiting).unwrap(), "\"waiting\"");
        let back: ConnectionStatus = serde_json::from_str("\"disconnected\"").unwrap();
        assert_eq!(back, ConnectionStatus::Disconnected);
    }
}

//! Reference data types and the collaborator interfaces the simulator reads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::{normalize_heading, GeoPoint};
use crate::perf::PerfData;

/// A named fix or an ad-hoc coordinate used as a route point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub identifier: String,
    pub position: GeoPoint,
}

impl Waypoint {
    pub fn new(identifier: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            identifier: identifier.into(),
            position: GeoPoint::new(lat, lon),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnDirection {
    Left,
    Right,
}

impl TurnDirection {
    pub fn is_right(self) -> bool {
        self == TurnDirection::Right
    }

    /// +1 for right, -1 for left.
    pub fn sign(self) -> f64 {
        match self {
            TurnDirection::Left => -1.0,
            TurnDirection::Right => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HoldLegLengthType {
    #[default]
    Default,
    /// Leg length in minutes.
    Time,
    /// Leg length in nautical miles.
    Distance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BearingType {
    True,
    Magnetic,
}

/// Holding pattern published for a fix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishedHold {
    pub waypoint: String,
    pub inbound_course_mag: f64,
    pub turn_direction: TurnDirection,
    #[serde(default)]
    pub leg_length_type: HoldLegLengthType,
    #[serde(default)]
    pub leg_length: f64,
}

/// One sample of gridded weather data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherPoint {
    /// Eastward wind component (m/s).
    pub u_mps: f64,
    /// Northward wind component (m/s).
    pub v_mps: f64,
    pub temp_k: f64,
    pub level_hpa: f64,
    pub geopotential_height_m: f64,
    /// Sea-level pressure at this location, when known.
    #[serde(default)]
    pub surface_pressure_hpa: Option<f64>,
}

impl WeatherPoint {
    /// Direction the wind blows from, true degrees.
    pub fn wind_direction(&self) -> f64 {
        normalize_heading(180.0 + self.u_mps.atan2(self.v_mps).to_degrees())
    }

    pub fn wind_speed_mps(&self) -> f64 {
        self.u_mps.hypot(self.v_mps)
    }
}

/// Waypoint, navaid and hold lookups.
pub trait NavDataSource: Send + Sync {
    fn closest_waypoint_by_identifier(&self, identifier: &str, ref_lat: f64, ref_lon: f64) -> Option<Waypoint>;

    fn published_hold(&self, waypoint_id: &str) -> Option<PublishedHold>;

    fn add_waypoint(&self, waypoint: Waypoint);

    fn add_published_hold(&self, hold: PublishedHold);
}

/// Gridded weather lookup.
pub trait WeatherSource: Send + Sync {
    fn closest_point(&self, position: &GeoPoint, time: DateTime<Utc>) -> Option<WeatherPoint>;
}

/// Magnetic variation model.
pub trait MagneticVariation: Send + Sync {
    /// Variation at a point, positive east.
    fn variation_deg(&self, point: &GeoPoint, date: DateTime<Utc>) -> f64;

    fn true_to_magnetic(&self, true_course: f64, point: &GeoPoint, date: DateTime<Utc>) -> f64 {
        normalize_heading(true_course - self.variation_deg(point, date))
    }

    fn magnetic_to_true(&self, magnetic_course: f64, point: &GeoPoint, date: DateTime<Utc>) -> f64 {
        normalize_heading(magnetic_course + self.variation_deg(point, date))
    }
}

/// Constant variation everywhere.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FixedVariation(pub f64);

impl MagneticVariation for FixedVariation {
    fn variation_deg(&self, _point: &GeoPoint, _date: DateTime<Utc>) -> f64 {
        self.0
    }
}

/// Aircraft performance tables by ICAO type.
pub trait PerfDataSource: Send + Sync {
    fn lookup(&self, icao_type: &str) -> Option<PerfData>;
}

/// Convert a course given as `bearing_type` to true at `point`.
pub fn to_true_course(
    course: f64,
    bearing_type: BearingType,
    point: &GeoPoint,
    magnetic: &dyn MagneticVariation,
) -> f64 {
    match bearing_type {
        BearingType::True => normalize_heading(course),
        BearingType::Magnetic => magnetic.magnetic_to_true(course, point, Utc::now()),
    }
}

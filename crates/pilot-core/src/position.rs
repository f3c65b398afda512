//! Kinematic state of one aircraft.
//!
//! Velocities are meters per second in a local (east, up, north) frame, i.e.
//! x follows longitude, y altitude and z latitude. Every setter recomputes
//! the dependent quantities before returning, so the air and ground
//! velocities, airspeeds, track, heading and altitudes always agree.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use glam::DVec3;

use crate::atmos::{
    self, AirMass, ISA_STD_PRES_HPA, METERS_PER_FOOT, MPS_PER_FPM, MPS_PER_KNOT,
};
use crate::data::{MagneticVariation, WeatherPoint};
use crate::geo::{normalize_heading, GeoPoint};

/// Minimum lateral airspeed kept when the heading is changed (m/s).
const MIN_LATERAL_SPEED_MPS: f64 = MPS_PER_KNOT;

/// Snapshot of the quantities route legs evaluate against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AircraftState {
    pub position: GeoPoint,
    pub track_true: f64,
    pub heading_true: f64,
    pub bank_deg: f64,
    pub ground_speed_kts: f64,
}

#[derive(Clone)]
pub struct AircraftPosition {
    lat: f64,
    lon: f64,
    indicated_alt_ft: f64,
    absolute_alt_ft: f64,
    pressure_alt_ft: f64,
    density_alt_ft: f64,
    altimeter_setting_hpa: f64,
    surface_pressure_hpa: f64,

    air_velocity: DVec3,
    ground_velocity: DVec3,
    heading_true: f64,
    heading_mag: f64,
    track_true: f64,
    tas_kts: f64,
    ias_kts: f64,
    mach: f64,
    ground_speed_kts: f64,

    bank_deg: f64,
    pitch_deg: f64,

    weather: Option<WeatherPoint>,
    magnetic: Arc<dyn MagneticVariation>,
}

impl fmt::Debug for AircraftPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AircraftPosition")
            .field("lat", &self.lat)
            .field("lon", &self.lon)
            .field("indicated_alt_ft", &self.indicated_alt_ft)
            .field("heading_mag", &self.heading_mag)
            .field("track_true", &self.track_true)
            .field("ias_kts", &self.ias_kts)
            .field("ground_speed_kts", &self.ground_speed_kts)
            .field("bank_deg", &self.bank_deg)
            .field("pitch_deg", &self.pitch_deg)
            .finish_non_exhaustive()
    }
}

impl AircraftPosition {
    /// Level flight at `indicated_alt_ft` on `heading_mag` at `ias_kts`, with
    /// the altimeter set to the actual sea-level pressure.
    pub fn new(
        position: GeoPoint,
        indicated_alt_ft: f64,
        heading_mag: f64,
        ias_kts: f64,
        magnetic: Arc<dyn MagneticVariation>,
    ) -> Self {
        let mut pos = Self {
            lat: position.lat,
            lon: position.lon,
            indicated_alt_ft,
            absolute_alt_ft: indicated_alt_ft,
            pressure_alt_ft: indicated_alt_ft,
            density_alt_ft: indicated_alt_ft,
            altimeter_setting_hpa: ISA_STD_PRES_HPA,
            surface_pressure_hpa: ISA_STD_PRES_HPA,
            air_velocity: DVec3::ZERO,
            ground_velocity: DVec3::ZERO,
            heading_true: 0.0,
            heading_mag,
            track_true: 0.0,
            tas_kts: 0.0,
            ias_kts: 0.0,
            mach: 0.0,
            ground_speed_kts: 0.0,
            bank_deg: 0.0,
            pitch_deg: 0.0,
            weather: None,
            magnetic,
        };
        pos.heading_true = pos.magnetic.magnetic_to_true(heading_mag, &pos.geo_point(), Utc::now());
        pos.set_indicated_altitude(indicated_alt_ft);
        pos.set_ias(ias_kts);
        pos
    }

    pub fn geo_point(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon).with_alt(self.absolute_alt_ft)
    }

    pub fn state(&self) -> AircraftState {
        AircraftState {
            position: self.geo_point(),
            track_true: self.track_true,
            heading_true: self.heading_true,
            bank_deg: self.bank_deg,
            ground_speed_kts: self.ground_speed_kts,
        }
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }

    pub fn indicated_altitude_ft(&self) -> f64 {
        self.indicated_alt_ft
    }

    pub fn absolute_altitude_ft(&self) -> f64 {
        self.absolute_alt_ft
    }

    pub fn pressure_altitude_ft(&self) -> f64 {
        self.pressure_alt_ft
    }

    pub fn density_altitude_ft(&self) -> f64 {
        self.density_alt_ft
    }

    pub fn altimeter_setting_hpa(&self) -> f64 {
        self.altimeter_setting_hpa
    }

    pub fn surface_pressure_hpa(&self) -> f64 {
        self.surface_pressure_hpa
    }

    pub fn air_velocity(&self) -> DVec3 {
        self.air_velocity
    }

    pub fn ground_velocity(&self) -> DVec3 {
        self.ground_velocity
    }

    pub fn heading_true(&self) -> f64 {
        self.heading_true
    }

    pub fn heading_mag(&self) -> f64 {
        self.heading_mag
    }

    pub fn track_true(&self) -> f64 {
        self.track_true
    }

    pub fn true_airspeed_kts(&self) -> f64 {
        self.tas_kts
    }

    pub fn indicated_airspeed_kts(&self) -> f64 {
        self.ias_kts
    }

    pub fn mach(&self) -> f64 {
        self.mach
    }

    pub fn ground_speed_kts(&self) -> f64 {
        self.ground_speed_kts
    }

    pub fn vertical_speed_fpm(&self) -> f64 {
        self.ground_velocity.y / MPS_PER_FPM
    }

    /// Flight path angle relative to the air mass, degrees.
    pub fn flight_path_angle_deg(&self) -> f64 {
        let horizontal = self.air_velocity.x.hypot(self.air_velocity.z);
        self.air_velocity.y.atan2(horizontal).to_degrees()
    }

    pub fn bank_deg(&self) -> f64 {
        self.bank_deg
    }

    pub fn pitch_deg(&self) -> f64 {
        self.pitch_deg
    }

    pub fn weather(&self) -> Option<&WeatherPoint> {
        self.weather.as_ref()
    }

    pub fn magnetic(&self) -> &Arc<dyn MagneticVariation> {
        &self.magnetic
    }

    /// Wind vector such that ground velocity = air velocity - wind.
    pub fn wind(&self) -> DVec3 {
        match &self.weather {
            Some(wx) => DVec3::new(-wx.u_mps, 0.0, -wx.v_mps),
            None => DVec3::ZERO,
        }
    }

    /// Static air conditions at the current altitude.
    pub fn air_mass(&self) -> AirMass {
        let alt_m = self.absolute_alt_ft * METERS_PER_FOOT;
        match &self.weather {
            Some(wx) => AirMass::from_reference(
                wx.level_hpa * 100.0,
                wx.geopotential_height_m,
                wx.temp_k,
                alt_m,
            ),
            None => AirMass::isa(alt_m),
        }
    }

    pub fn set_lat_lon(&mut self, position: GeoPoint) {
        self.lat = position.lat;
        self.lon = position.lon;
        self.update_derived();
    }

    pub fn set_indicated_altitude(&mut self, alt_ft: f64) {
        self.indicated_alt_ft = alt_ft;
        self.absolute_alt_ft =
            atmos::absolute_altitude_ft(alt_ft, self.altimeter_setting_hpa, self.surface_pressure_hpa);
        self.update_derived();
    }

    pub fn set_absolute_altitude(&mut self, alt_ft: f64) {
        self.absolute_alt_ft = alt_ft;
        self.indicated_alt_ft =
            atmos::indicated_altitude_ft(alt_ft, self.altimeter_setting_hpa, self.surface_pressure_hpa);
        self.update_derived();
    }

    /// Changing the setting keeps the true altitude and re-reads the altimeter.
    pub fn set_altimeter_setting(&mut self, setting_hpa: f64) {
        self.altimeter_setting_hpa = setting_hpa;
        self.set_absolute_altitude(self.absolute_alt_ft);
    }

    pub fn set_surface_pressure(&mut self, pressure_hpa: f64) {
        self.surface_pressure_hpa = pressure_hpa;
        self.set_absolute_altitude(self.absolute_alt_ft);
    }

    /// Replace the weather sample. The wind, air mass and surface pressure
    /// all follow it.
    pub fn set_weather_point(&mut self, weather: Option<WeatherPoint>) {
        self.weather = weather;
        let surface = weather
            .and_then(|wx| wx.surface_pressure_hpa)
            .unwrap_or(self.surface_pressure_hpa);
        self.set_surface_pressure(surface);
    }

    pub fn set_air_velocity(&mut self, velocity: DVec3) {
        self.air_velocity = velocity;
        let lateral = velocity.x.hypot(velocity.z);
        if lateral > 1e-6 {
            self.heading_true = normalize_heading(velocity.x.atan2(velocity.z).to_degrees());
        }
        self.update_derived();
    }

    /// Point the nose at `heading` keeping the lateral true airspeed.
    pub fn set_heading_true(&mut self, heading: f64) {
        self.heading_true = normalize_heading(heading);
        let lateral = self
            .air_velocity
            .x
            .hypot(self.air_velocity.z)
            .max(MIN_LATERAL_SPEED_MPS);
        let rad = self.heading_true.to_radians();
        self.air_velocity = DVec3::new(lateral * rad.sin(), self.air_velocity.y, lateral * rad.cos());
        self.update_derived();
    }

    pub fn set_heading_mag(&mut self, heading: f64) {
        let heading_true = self
            .magnetic
            .magnetic_to_true(heading, &self.geo_point(), Utc::now());
        self.set_heading_true(heading_true);
    }

    /// Fly `track` over the ground at the current ground speed, crabbing into
    /// the wind as needed.
    pub fn set_track_true(&mut self, track: f64) {
        let gs = self.ground_velocity.x.hypot(self.ground_velocity.z);
        let rad = normalize_heading(track).to_radians();
        let ground = DVec3::new(gs * rad.sin(), self.ground_velocity.y, gs * rad.cos());
        self.set_air_velocity(ground + self.wind());
    }

    /// Set true airspeed, keeping the heading and vertical speed.
    pub fn set_tas(&mut self, tas_kts: f64) {
        let total = tas_kts.max(0.0) * MPS_PER_KNOT;
        let vertical = self.air_velocity.y.clamp(-total, total);
        let lateral = (total * total - vertical * vertical).sqrt();
        let rad = self.heading_true.to_radians();
        self.air_velocity = DVec3::new(lateral * rad.sin(), vertical, lateral * rad.cos());
        self.update_derived();
    }

    pub fn set_ias(&mut self, ias_kts: f64) {
        let (tas, _) = atmos::ias_to_tas(ias_kts, &self.air_mass());
        self.set_tas(tas);
    }

    pub fn set_mach(&mut self, mach: f64) {
        let tas = atmos::mach_to_tas(mach, &self.air_mass());
        self.set_tas(tas);
    }

    /// Set ground speed along the current track.
    pub fn set_ground_speed(&mut self, gs_kts: f64) {
        let gs = gs_kts.max(0.0) * MPS_PER_KNOT;
        let rad = self.track_true.to_radians();
        let ground = DVec3::new(gs * rad.sin(), self.ground_velocity.y, gs * rad.cos());
        self.set_air_velocity(ground + self.wind());
    }

    pub fn set_vertical_speed(&mut self, fpm: f64) {
        self.air_velocity.y = fpm * MPS_PER_FPM;
        self.update_derived();
    }

    pub fn set_bank(&mut self, bank_deg: f64) {
        self.bank_deg = bank_deg.clamp(-90.0, 90.0);
    }

    pub fn set_pitch(&mut self, pitch_deg: f64) {
        self.pitch_deg = pitch_deg.clamp(-90.0, 90.0);
    }

    fn update_derived(&mut self) {
        let air = self.air_mass();
        self.pressure_alt_ft = atmos::pressure_altitude_ft(self.indicated_alt_ft, self.altimeter_setting_hpa);
        self.density_alt_ft = air.density_altitude_ft();

        self.tas_kts = self.air_velocity.length() / MPS_PER_KNOT;
        let (ias, mach) = atmos::tas_to_ias(self.tas_kts, &air);
        self.ias_kts = ias;
        self.mach = mach;

        self.ground_velocity = self.air_velocity - self.wind();
        let gs = self.ground_velocity.x.hypot(self.ground_velocity.z);
        self.ground_speed_kts = gs / MPS_PER_KNOT;
        if gs > 1e-6 {
            self.track_true = normalize_heading(self.ground_velocity.x.atan2(self.ground_velocity.z).to_degrees());
        } else {
            self.track_true = self.heading_true;
        }

        self.heading_mag = self
            .magnetic
            .true_to_magnetic(self.heading_true, &GeoPoint::new(self.lat, self.lon), Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::FixedVariation;

    fn make_position(heading_mag: f64) -> AircraftPosition {
        AircraftPosition::new(
            GeoPoint::new(47.0, 8.0),
            5000.0,
            heading_mag,
            250.0,
            Arc::new(FixedVariation(2.0)),
        )
    }

    fn west_wind(speed_mps: f64) -> WeatherPoint {
        WeatherPoint {
            u_mps: speed_mps,
            v_mps: 0.0,
            temp_k: 288.15,
            level_hpa: 1013.25,
            geopotential_height_m: 0.0,
            surface_pressure_hpa: None,
        }
    }

    #[test]
    fn test_new_position_is_consistent() {
        let pos = make_position(90.0);
        assert!((pos.indicated_airspeed_kts() - 250.0).abs() < 1e-6);
        assert!(pos.true_airspeed_kts() > 250.0);
        assert!((pos.heading_true() - 92.0).abs() < 1e-9);
        assert!((pos.heading_mag() - 90.0).abs() < 1e-9);
        assert!((pos.track_true() - pos.heading_true()).abs() < 1e-9);
        assert!((pos.ground_speed_kts() - pos.true_airspeed_kts()).abs() < 1e-9);
        assert!(pos.vertical_speed_fpm().abs() < 1e-9);
    }

    #[test]
    fn test_ground_velocity_is_air_minus_wind() {
        let mut pos = make_position(0.0);
        pos.set_heading_true(0.0);
        pos.set_weather_point(Some(west_wind(20.0)));

        let diff = pos.air_velocity() - pos.wind() - pos.ground_velocity();
        assert!(diff.length() < 1e-9);
        // Wind from the west drifts a northbound aircraft to the right.
        assert!(pos.track_true() > 0.0 && pos.track_true() < 10.0);
        assert!(pos.ground_speed_kts() > pos.true_airspeed_kts());
    }

    #[test]
    fn test_set_track_crabs_into_wind() {
        let mut pos = make_position(0.0);
        pos.set_weather_point(Some(west_wind(20.0)));
        pos.set_track_true(0.0);
        assert!(pos.track_true().abs() < 1e-6 || (pos.track_true() - 360.0).abs() < 1e-6);
        assert!(pos.heading_true() > 350.0);
    }

    #[test]
    fn test_heading_change_keeps_airspeed() {
        let mut pos = make_position(90.0);
        let tas = pos.true_airspeed_kts();
        pos.set_heading_mag(270.0);
        assert!((pos.true_airspeed_kts() - tas).abs() < 1e-9);
        assert!((pos.heading_mag() - 270.0).abs() < 1e-9);
        assert!((pos.track_true() - 272.0).abs() < 1e-9);
    }

    #[test]
    fn test_altimeter_setting_changes_indicated_altitude_only() {
        let mut pos = make_position(90.0);
        let absolute = pos.absolute_altitude_ft();
        pos.set_altimeter_setting(1000.0);
        assert!((pos.absolute_altitude_ft() - absolute).abs() < 1e-9);
        assert!(pos.indicated_altitude_ft() < absolute);
    }

    #[test]
    fn test_vertical_speed_feeds_ground_velocity() {
        let mut pos = make_position(90.0);
        pos.set_vertical_speed(1500.0);
        assert!((pos.vertical_speed_fpm() - 1500.0).abs() < 1e-6);
        assert!(pos.flight_path_angle_deg() > 0.0);
    }
}

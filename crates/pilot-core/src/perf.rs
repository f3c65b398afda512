//! Aircraft performance data and the point-mass force model.
//!
//! Forces are expressed in the same (east, up, north) frame as
//! [`AircraftPosition`] velocities.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::atmos::{AirMass, ISA_STD_PRES_PA, ISA_STD_TEMP_K, METERS_PER_FOOT, MPS_PER_FPM, STANDARD_GRAVITY};
use crate::autopilot::FlightLimits;
use crate::data::PerfDataSource;
use crate::geo::{calculate_chord, calculate_degrees_turned, calculate_end_heading, calculate_radius_of_turn_m};
use crate::position::AircraftPosition;

/// Angle of attack where the linear part of the lift curve ends (rad).
const LIFT_CURVE_BREAK_RAD: f64 = 0.2;
const STALL_AOA_RAD: f64 = 0.26;
const CL_AT_ZERO_AOA: f64 = 0.07;
const CL_AT_BREAK: f64 = 0.6;

/// Angle-of-attack window the pitch trim is allowed to ask for (rad).
const TRIM_MIN_AOA_RAD: f64 = -0.1;
const TRIM_MAX_AOA_RAD: f64 = 0.195;

/// Altitude capture gain: target vertical speed per foot of error (fpm/ft).
const ALTITUDE_CAPTURE_GAIN: f64 = 6.0;
/// How quickly the vertical speed error is removed (1/s).
const VERTICAL_SPEED_RESPONSE: f64 = 0.5;
const MAX_VERTICAL_ACCEL_MPS2: f64 = 2.0;
/// Lookahead used to damp the speed trim (s).
const SPEED_TREND_LOOKAHEAD_S: f64 = 8.0;
const SPEED_DEADBAND_KTS: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngineType {
    Turbofan,
    Turboprop,
    TurboPiston,
    NaPiston,
}

/// One flap/gear configuration and its speed band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigSetting {
    pub min_kias: u32,
    pub max_kias: u32,
    pub gear_down: bool,
    #[serde(default)]
    pub norm_kias: Option<u32>,
}

/// Reference performance table for one aircraft type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerfData {
    pub icao_type: String,
    pub oew_kg: f64,
    pub mtow_kg: f64,
    pub engine_type: EngineType,
    pub engines: u32,
    /// Per engine, sea level static.
    pub max_thrust_n: f64,
    /// Per engine, sea level static.
    pub idle_thrust_n: f64,
    pub wing_area_sqm: f64,
    pub wing_span_m: f64,
    pub configs: Vec<ConfigSetting>,
}

impl PerfData {
    /// Embraer 175 data set.
    pub fn e175() -> Self {
        Self {
            icao_type: "E75L".to_string(),
            oew_kg: 21_886.0,
            mtow_kg: 38_790.0,
            engine_type: EngineType::Turbofan,
            engines: 2,
            max_thrust_n: 64_000.0,
            idle_thrust_n: 17_800.0,
            wing_area_sqm: 72.72,
            wing_span_m: 28.65,
            configs: vec![
                ConfigSetting { min_kias: 180, max_kias: 320, gear_down: false, norm_kias: Some(250) },
                ConfigSetting { min_kias: 160, max_kias: 230, gear_down: false, norm_kias: Some(210) },
                ConfigSetting { min_kias: 150, max_kias: 215, gear_down: false, norm_kias: None },
                ConfigSetting { min_kias: 140, max_kias: 200, gear_down: true, norm_kias: Some(160) },
                ConfigSetting { min_kias: 110, max_kias: 180, gear_down: true, norm_kias: Some(140) },
            ],
        }
    }

    /// Lowest and highest indicated airspeed across all configurations.
    pub fn speed_range_kias(&self) -> Option<(u32, u32)> {
        let min = self.configs.iter().map(|c| c.min_kias).min()?;
        let max = self.configs.iter().map(|c| c.max_kias).max()?;
        Some((min, max))
    }

    /// Oswald efficiency estimate from the wing's aspect ratio.
    pub fn oswald_efficiency(&self) -> f64 {
        let ar = self.wing_span_m.powi(2) / self.wing_area_sqm;
        1.78 * (1.0 - 0.045 * ar.powf(0.68)) - 0.64
    }
}

/// Built-in performance table. Every type currently maps to the E175 set.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinPerfData;

impl PerfDataSource for BuiltinPerfData {
    fn lookup(&self, icao_type: &str) -> Option<PerfData> {
        let mut data = PerfData::e175();
        if !icao_type.is_empty() {
            data.icao_type = icao_type.to_uppercase();
        }
        Some(data)
    }
}

/// Lift coefficient for an angle of attack.
///
/// Linear through the normal range (extended below zero AoA), a quadratic
/// stall break up to 0.26 rad and no lift beyond.
pub fn lift_coefficient(alpha_rad: f64) -> f64 {
    if alpha_rad < LIFT_CURVE_BREAK_RAD {
        CL_AT_ZERO_AOA + alpha_rad * (CL_AT_BREAK - CL_AT_ZERO_AOA) / LIFT_CURVE_BREAK_RAD
    } else if alpha_rad < STALL_AOA_RAD {
        -223.81 * alpha_rad.powi(2) + 93.119 * alpha_rad - 9.07143
    } else {
        0.0
    }
}

/// Inverse of the linear part of the lift curve.
pub fn angle_of_attack_for_lift(cl: f64) -> f64 {
    (cl - CL_AT_ZERO_AOA) * LIFT_CURVE_BREAK_RAD / (CL_AT_BREAK - CL_AT_ZERO_AOA)
}

pub fn drag_coefficient(alpha_rad: f64) -> f64 {
    2.8 * alpha_rad.powi(2) + 0.01
}

/// 0.5 * rho * V^2 * S * C
pub fn aero_force_n(density: f64, tas_mps: f64, area_sqm: f64, coefficient: f64) -> f64 {
    0.5 * density * tas_mps.powi(2) * area_sqm * coefficient
}

/// Vector of `magnitude` pointing `pitch_deg` above the horizon on `bearing_deg`.
pub fn create_vector(magnitude: f64, pitch_deg: f64, bearing_deg: f64) -> DVec3 {
    let (pitch, bearing) = (pitch_deg.to_radians(), bearing_deg.to_radians());
    let r = magnitude * pitch.cos();
    DVec3::new(r * bearing.sin(), magnitude * pitch.sin(), r * bearing.cos())
}

/// Total thrust for a lever position in `[0, 1]`.
pub fn thrust_at_altitude(perf: &PerfData, thrust_lever: f64, air: &AirMass) -> f64 {
    let per_engine = perf.idle_thrust_n + thrust_lever.clamp(0.0, 1.0) * (perf.max_thrust_n - perf.idle_thrust_n);
    per_engine
        * perf.engines as f64
        * (air.pressure_pa / ISA_STD_PRES_PA)
        * (air.temp_k / ISA_STD_TEMP_K).sqrt()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Forces {
    pub thrust: DVec3,
    pub lift: DVec3,
    pub drag: DVec3,
    pub weight: DVec3,
}

impl Forces {
    pub fn net(&self) -> DVec3 {
        self.thrust + self.lift + self.drag + self.weight
    }
}

/// Forces acting on the aircraft in its current state.
///
/// Lift acts perpendicular to the flight path in the vertical plane of the
/// nose, scaled by the cosine of bank; its horizontal share while banked is
/// represented by the turn applied in [`PerformanceEngine::integrate`].
pub fn calculate_forces(perf: &PerfData, pos: &AircraftPosition, mass_kg: f64, thrust_lever: f64) -> Forces {
    let air = pos.air_mass();
    let velocity = pos.air_velocity();
    let speed = velocity.length();
    let fpa = pos.flight_path_angle_deg();
    let nose = pos.heading_true();
    let alpha = (pos.pitch_deg() - fpa).to_radians();
    let density = air.density();

    let thrust = create_vector(thrust_at_altitude(perf, thrust_lever, &air), pos.pitch_deg(), nose);

    let drag_n = aero_force_n(density, speed, perf.wing_area_sqm, drag_coefficient(alpha));
    let drag = if speed > 1e-6 {
        -velocity / speed * drag_n
    } else {
        DVec3::ZERO
    };

    let lift_n = aero_force_n(density, speed, perf.wing_area_sqm, lift_coefficient(alpha));
    let lift = create_vector(lift_n * pos.bank_deg().to_radians().cos(), fpa + 90.0, nose);

    Forces {
        thrust,
        lift,
        drag,
        weight: DVec3::new(0.0, -mass_kg * STANDARD_GRAVITY, 0.0),
    }
}

/// Integrates one aircraft's motion and trims its pitch and thrust.
#[derive(Debug, Clone)]
pub struct PerformanceEngine {
    perf: PerfData,
    mass_kg: f64,
    thrust_lever: f64,
    prev_ias_kts: Option<f64>,
}

impl PerformanceEngine {
    pub fn new(perf: PerfData) -> Self {
        let mass_kg = perf.mtow_kg;
        Self {
            perf,
            mass_kg,
            thrust_lever: 0.8,
            prev_ias_kts: None,
        }
    }

    pub fn perf(&self) -> &PerfData {
        &self.perf
    }

    pub fn mass_kg(&self) -> f64 {
        self.mass_kg
    }

    pub fn set_mass_kg(&mut self, mass_kg: f64) {
        self.mass_kg = mass_kg.max(self.perf.oew_kg);
    }

    pub fn thrust_lever(&self) -> f64 {
        self.thrust_lever
    }

    pub fn set_thrust_lever(&mut self, lever: f64) {
        self.thrust_lever = lever.clamp(0.0, 1.0);
    }

    /// Advance `pos` by one tick.
    pub fn integrate(&mut self, pos: &mut AircraftPosition, interval_ms: u64) {
        let dt = interval_ms as f64 / 1000.0;

        let forces = calculate_forces(&self.perf, pos, self.mass_kg, self.thrust_lever);
        let accel = forces.net() / self.mass_kg;
        pos.set_air_velocity(pos.air_velocity() + accel * dt);

        let start = pos.geo_point();
        let distance_m = pos.ground_velocity().x.hypot(pos.ground_velocity().z) * dt;
        let bank = pos.bank_deg();
        if bank.abs() > 1e-3 {
            let radius_m = calculate_radius_of_turn_m(bank, pos.ground_speed_kts());
            let degrees = calculate_degrees_turned(distance_m, radius_m);
            let right = bank > 0.0;
            let (chord_bearing, chord_m) = calculate_chord(pos.track_true(), degrees, radius_m, right);
            pos.set_lat_lon(start.moved_by(chord_bearing, chord_m));
            pos.set_heading_true(calculate_end_heading(pos.heading_true(), degrees, right));
        } else {
            pos.set_lat_lon(start.moved_by(pos.track_true(), distance_m));
        }

        let climb_ft = pos.ground_velocity().y * dt / METERS_PER_FOOT;
        pos.set_absolute_altitude(pos.absolute_altitude_ft() + climb_ft);
    }

    /// Nudge pitch and thrust by at most one step each towards holding
    /// `target_alt_ft` (indicated) and `target_ias_kts`.
    pub fn trim(
        &mut self,
        pos: &mut AircraftPosition,
        target_alt_ft: f64,
        target_ias_kts: f64,
        limits: &FlightLimits,
        interval_ms: u64,
    ) {
        let dt = (interval_ms as f64 / 1000.0).max(1e-3);

        let pitch_target = self.pitch_for_vertical_speed(pos, self.target_vertical_speed_fpm(pos, target_alt_ft, limits));
        pos.set_pitch(step_towards(pos.pitch_deg(), pitch_target, limits.pitch_step_deg));

        let ias = pos.indicated_airspeed_kts();
        let trend = self.prev_ias_kts.map_or(0.0, |prev| (ias - prev) / dt);
        self.prev_ias_kts = Some(ias);
        let predicted = ias + trend * SPEED_TREND_LOOKAHEAD_S;
        if predicted < target_ias_kts - SPEED_DEADBAND_KTS {
            self.set_thrust_lever(self.thrust_lever + limits.throttle_step);
        } else if predicted > target_ias_kts + SPEED_DEADBAND_KTS {
            self.set_thrust_lever(self.thrust_lever - limits.throttle_step);
        }
    }

    /// Snap pitch and thrust to the values that hold level unaccelerated
    /// flight in the current state.
    pub fn trim_for_level_flight(&mut self, pos: &mut AircraftPosition) {
        pos.set_vertical_speed(0.0);
        // Pitch depends on thrust through its vertical share, so settle twice.
        for _ in 0..2 {
            pos.set_pitch(self.pitch_for_vertical_speed(pos, 0.0));
            let forces = calculate_forces(&self.perf, pos, self.mass_kg, self.thrust_lever);
            let air = pos.air_mass();
            let lapse = (air.pressure_pa / ISA_STD_PRES_PA) * (air.temp_k / ISA_STD_TEMP_K).sqrt();
            let drag_n = forces.drag.length();
            let per_engine = drag_n / (self.perf.engines as f64 * lapse).max(1e-6);
            let lever = (per_engine - self.perf.idle_thrust_n) / (self.perf.max_thrust_n - self.perf.idle_thrust_n);
            self.set_thrust_lever(lever);
        }
        self.prev_ias_kts = None;
    }

    fn target_vertical_speed_fpm(&self, pos: &AircraftPosition, target_alt_ft: f64, limits: &FlightLimits) -> f64 {
        let error_ft = target_alt_ft - pos.indicated_altitude_ft();
        (error_ft * ALTITUDE_CAPTURE_GAIN).clamp(-limits.max_vertical_speed_fpm, limits.max_vertical_speed_fpm)
    }

    /// Pitch whose lift drives the vertical speed towards `target_fpm`.
    fn pitch_for_vertical_speed(&self, pos: &AircraftPosition, target_fpm: f64) -> f64 {
        let velocity = pos.air_velocity();
        let speed = velocity.length().max(1.0);
        let fpa = pos.flight_path_angle_deg();

        let vertical_accel = ((target_fpm * MPS_PER_FPM - velocity.y) * VERTICAL_SPEED_RESPONSE)
            .clamp(-MAX_VERTICAL_ACCEL_MPS2, MAX_VERTICAL_ACCEL_MPS2);

        let forces = calculate_forces(&self.perf, pos, self.mass_kg, self.thrust_lever);
        let lift_vertical = self.mass_kg * (STANDARD_GRAVITY + vertical_accel) - forces.thrust.y - forces.drag.y;
        let tilt = (pos.bank_deg().to_radians().cos() * fpa.to_radians().cos()).max(0.2);
        let lift_n = lift_vertical / tilt;

        let dynamic = aero_force_n(pos.air_mass().density(), speed, self.perf.wing_area_sqm, 1.0);
        let alpha = angle_of_attack_for_lift(lift_n / dynamic).clamp(TRIM_MIN_AOA_RAD, TRIM_MAX_AOA_RAD);
        fpa + alpha.to_degrees()
    }
}

fn step_towards(current: f64, target: f64, step: f64) -> f64 {
    if (target - current).abs() <= step {
        target
    } else if target > current {
        current + step
    } else {
        current - step
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::FixedVariation;
    use crate::geo::GeoPoint;
    use std::sync::Arc;

    fn level_position() -> AircraftPosition {
        AircraftPosition::new(GeoPoint::new(47.0, 8.0), 5000.0, 90.0, 250.0, Arc::new(FixedVariation(0.0)))
    }

    #[test]
    fn test_lift_curve_is_continuous() {
        assert!((lift_coefficient(0.0) - 0.07).abs() < 1e-12);
        assert!((lift_coefficient(0.1999999) - 0.6).abs() < 1e-5);
        assert!((lift_coefficient(0.2) - 0.6).abs() < 1e-4);
        assert_eq!(lift_coefficient(0.3), 0.0);
        assert!(lift_coefficient(-0.05) < 0.07);
        assert!((angle_of_attack_for_lift(lift_coefficient(0.12)) - 0.12).abs() < 1e-12);
    }

    #[test]
    fn test_create_vector_components() {
        let v = create_vector(10.0, 0.0, 90.0);
        assert!((v.x - 10.0).abs() < 1e-9);
        assert!(v.y.abs() < 1e-9 && v.z.abs() < 1e-9);

        let up = create_vector(10.0, 90.0, 0.0);
        assert!((up.y - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_thrust_lapses_with_altitude() {
        let perf = PerfData::e175();
        let sea_level = thrust_at_altitude(&perf, 1.0, &AirMass::isa(0.0));
        assert!((sea_level - 128_000.0).abs() < 1e-6);
        let high = thrust_at_altitude(&perf, 1.0, &AirMass::isa(3000.0));
        assert!(high < sea_level);
    }

    #[test]
    fn test_level_trim_balances_forces() {
        let mut engine = PerformanceEngine::new(PerfData::e175());
        let mut pos = level_position();
        engine.trim_for_level_flight(&mut pos);

        let net = calculate_forces(engine.perf(), &pos, engine.mass_kg(), engine.thrust_lever()).net();
        let accel = net / engine.mass_kg();
        assert!(accel.y.abs() < 0.05, "vertical accel {}", accel.y);
        assert!(pos.pitch_deg() > 0.0 && pos.pitch_deg() < 15.0);
        assert!(engine.thrust_lever() > 0.0 && engine.thrust_lever() < 1.0);
    }

    #[test]
    fn test_integrate_moves_along_track() {
        let mut engine = PerformanceEngine::new(PerfData::e175());
        let mut pos = level_position();
        engine.trim_for_level_flight(&mut pos);
        let start = pos.geo_point();
        let gs_mps = pos.ground_speed_kts() * crate::atmos::MPS_PER_KNOT;

        engine.integrate(&mut pos, 1000);

        let moved = start.distance_m(&pos.geo_point());
        assert!((moved - gs_mps).abs() < 2.0, "moved {moved} expected {gs_mps}");
        assert!((start.initial_bearing_to(&pos.geo_point()) - 90.0).abs() < 0.1);
        assert!((pos.indicated_altitude_ft() - 5000.0).abs() < 5.0);
    }

    #[test]
    fn test_integrate_turns_with_bank() {
        let mut engine = PerformanceEngine::new(PerfData::e175());
        let mut pos = level_position();
        engine.trim_for_level_flight(&mut pos);
        pos.set_bank(25.0);
        let heading = pos.heading_true();

        engine.integrate(&mut pos, 1000);

        let turned = crate::geo::turn_amount(heading, pos.heading_true());
        // ~2 degrees per second at this speed and bank
        assert!(turned > 1.5 && turned < 2.5, "turned {turned}");
    }

    #[test]
    fn test_trim_steps_are_bounded() {
        let limits = FlightLimits::default();
        let mut engine = PerformanceEngine::new(PerfData::e175());
        let mut pos = level_position();
        engine.trim_for_level_flight(&mut pos);
        let pitch = pos.pitch_deg();
        let lever = engine.thrust_lever();

        engine.trim(&mut pos, 10_000.0, 280.0, &limits, 100);

        assert!((pos.pitch_deg() - pitch).abs() <= limits.pitch_step_deg + 1e-9);
        assert!(pos.pitch_deg() > pitch);
        assert!((engine.thrust_lever() - lever - limits.throttle_step).abs() < 1e-9);
    }
}

//! Lateral guidance law and the attitude-level autopilot.

use serde::{Deserialize, Serialize};

use crate::data::TurnDirection;
use crate::fms::CourseInterceptInfo;
use crate::geo::{
    calculate_bank_for_radius, calculate_distance_travelled_m, calculate_radius_of_turn_m, normalize_heading,
    turn_amount,
};
use crate::perf::PerformanceEngine;
use crate::position::AircraftPosition;

/// Along-track threshold for the waypoint-passed edge trigger (m).
pub const MIN_XTK_M: f64 = 3.0;

/// Bank assumed when estimating turn lead at lower banks.
pub const STANDARD_BANK_DEG: f64 = 25.0;

/// Intercept angle per meter of cross-track error.
const INTERCEPT_GAIN_DEG_PER_M: f64 = 0.02;
const MAX_INTERCEPT_DEG: f64 = 45.0;

/// Bank per degree of track error.
const BANK_GAIN: f64 = 1.5;

/// Heading error under which a forced turn direction is released.
const FORCED_TURN_RELEASE_DEG: f64 = 5.0;

/// Attitude and trim limits applied by the autopilot and trim.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlightLimits {
    pub max_bank_deg: f64,
    /// Degrees per second.
    pub roll_rate_deg: f64,
    /// Max pitch change per tick.
    pub pitch_step_deg: f64,
    /// Max thrust lever change per tick.
    pub throttle_step: f64,
    pub max_vertical_speed_fpm: f64,
}

impl Default for FlightLimits {
    fn default() -> Self {
        Self {
            max_bank_deg: 25.0,
            roll_rate_deg: 5.0,
            pitch_step_deg: 0.1,
            throttle_step: 0.01,
            max_vertical_speed_fpm: 1500.0,
        }
    }
}

/// Track to fly this tick to converge on `required_course`.
///
/// While the aircraft is still closing on the course line and further from
/// it than the distance a turn onto the course would take, the current track
/// is kept. Otherwise the demanded track is the required course with an
/// intercept angle proportional to the cross-track error.
pub fn calculate_demanded_track_on_current_track(
    cross_track_m: f64,
    current_track: f64,
    required_course: f64,
    bank_deg: f64,
    ground_speed_kts: f64,
    interval_ms: u64,
) -> f64 {
    let intercept = (cross_track_m * INTERCEPT_GAIN_DEG_PER_M).clamp(-MAX_INTERCEPT_DEG, MAX_INTERCEPT_DEG);
    let demanded = normalize_heading(required_course - intercept);

    let track_delta = turn_amount(current_track, required_course);
    if track_delta.abs() < f64::EPSILON {
        return demanded;
    }

    let radius_m = calculate_radius_of_turn_m(bank_deg.abs().max(STANDARD_BANK_DEG), ground_speed_kts);
    let lead_m = radius_m * (1.0 - track_delta.abs().to_radians().cos())
        + calculate_distance_travelled_m(ground_speed_kts, interval_ms);

    let closing = cross_track_m * track_delta > 0.0;
    if closing && cross_track_m.abs() > lead_m {
        current_track
    } else {
        demanded
    }
}

/// Whether the guidance law asks to start turning onto `required_course` now.
pub fn should_start_turn(
    cross_track_m: f64,
    current_track: f64,
    required_course: f64,
    bank_deg: f64,
    ground_speed_kts: f64,
    interval_ms: u64,
) -> bool {
    let track_delta = turn_amount(current_track, required_course);
    if track_delta.abs() < f64::EPSILON {
        return false;
    }
    let demanded = calculate_demanded_track_on_current_track(
        cross_track_m,
        current_track,
        required_course,
        bank_deg,
        ground_speed_kts,
        interval_ms,
    );
    let requested = turn_amount(current_track, demanded);
    (track_delta > 0.0 && requested > 0.0) || (track_delta < 0.0 && requested < 0.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LateralMode {
    HeadingHold {
        heading_mag: f64,
        turn: Option<TurnDirection>,
    },
    Lnav,
}

/// Lateral mode plus the assigned vertical and speed targets.
#[derive(Debug, Clone, PartialEq)]
pub struct Autopilot {
    lateral: LateralMode,
    lnav_armed: bool,
    assigned_altitude_ft: f64,
    assigned_ias_kts: f64,
}

impl Autopilot {
    pub fn new(heading_mag: f64, altitude_ft: f64, ias_kts: f64) -> Self {
        Self {
            lateral: LateralMode::HeadingHold {
                heading_mag,
                turn: None,
            },
            lnav_armed: false,
            assigned_altitude_ft: altitude_ft,
            assigned_ias_kts: ias_kts,
        }
    }

    pub fn lateral(&self) -> LateralMode {
        self.lateral
    }

    pub fn lnav_armed(&self) -> bool {
        self.lnav_armed
    }

    pub fn assigned_altitude_ft(&self) -> f64 {
        self.assigned_altitude_ft
    }

    pub fn assigned_ias_kts(&self) -> f64 {
        self.assigned_ias_kts
    }

    pub fn set_assigned_altitude(&mut self, altitude_ft: f64) {
        self.assigned_altitude_ft = altitude_ft;
    }

    pub fn set_assigned_ias(&mut self, ias_kts: f64) {
        self.assigned_ias_kts = ias_kts;
    }

    /// Fly a heading. Drops LNAV and any armed LNAV.
    pub fn fly_heading(&mut self, heading_mag: f64, turn: Option<TurnDirection>) {
        self.lateral = LateralMode::HeadingHold {
            heading_mag: normalize_heading(heading_mag),
            turn,
        };
        self.lnav_armed = false;
    }

    pub fn arm_lnav(&mut self) {
        if self.lateral != LateralMode::Lnav {
            self.lnav_armed = true;
        }
    }

    pub fn engage_lnav(&mut self) {
        self.lateral = LateralMode::Lnav;
        self.lnav_armed = false;
    }

    /// Roll towards the bank the current lateral mode asks for.
    ///
    /// `guidance` is the FMS output for this tick; LNAV without guidance
    /// holds wings level.
    pub fn update_lateral(
        &mut self,
        pos: &mut AircraftPosition,
        guidance: Option<&CourseInterceptInfo>,
        limits: &FlightLimits,
        interval_ms: u64,
    ) {
        let target_bank = match self.lateral {
            LateralMode::HeadingHold { heading_mag, turn } => {
                let mut error = turn_amount(pos.heading_mag(), heading_mag);
                match turn {
                    Some(TurnDirection::Right) if error < -FORCED_TURN_RELEASE_DEG => error += 360.0,
                    Some(TurnDirection::Left) if error > FORCED_TURN_RELEASE_DEG => error -= 360.0,
                    _ => {}
                }
                if turn.is_some() && error.abs() < FORCED_TURN_RELEASE_DEG {
                    self.lateral = LateralMode::HeadingHold {
                        heading_mag,
                        turn: None,
                    };
                }
                error * BANK_GAIN
            }
            LateralMode::Lnav => match guidance {
                Some(info) => {
                    let demanded = calculate_demanded_track_on_current_track(
                        info.cross_track_m,
                        pos.track_true(),
                        info.required_true_course,
                        pos.bank_deg(),
                        pos.ground_speed_kts(),
                        interval_ms,
                    );
                    let feed_forward = match (info.turn_radius_m, info.turn_direction) {
                        (Some(radius), Some(dir)) => {
                            calculate_bank_for_radius(radius, pos.ground_speed_kts()) * dir.sign()
                        }
                        _ => 0.0,
                    };
                    turn_amount(pos.track_true(), demanded) * BANK_GAIN + feed_forward
                }
                None => 0.0,
            },
        };

        let target_bank = target_bank.clamp(-limits.max_bank_deg, limits.max_bank_deg);
        let max_step = limits.roll_rate_deg * interval_ms as f64 / 1000.0;
        let bank = pos.bank_deg();
        let step = (target_bank - bank).clamp(-max_step, max_step);
        pos.set_bank(bank + step);
    }

    /// Hand the assigned altitude and speed to the trim.
    pub fn update_vertical(
        &self,
        engine: &mut PerformanceEngine,
        pos: &mut AircraftPosition,
        limits: &FlightLimits,
        interval_ms: u64,
    ) {
        engine.trim(pos, self.assigned_altitude_ft, self.assigned_ias_kts, limits, interval_ms);
    }
}

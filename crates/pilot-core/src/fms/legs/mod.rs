//! Lateral path segments flown by the FMS.

mod course_to_fix;
mod direct_to_fix;
mod disco;
mod hold;
mod radius_to_fix;
mod track_to_fix;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use course_to_fix::CourseToFixLeg;
pub use direct_to_fix::DirectToFixLeg;
pub use disco::DiscoLeg;
pub use hold::{HoldPhase, HoldToManualLeg, HOLD_SPEED_KTS, HOLD_TURN_RATE_DEG_S};
pub use radius_to_fix::{RadiusToFixLeg, RfPhase, TurnCircle};
pub use track_to_fix::TrackToFixLeg;

use crate::autopilot::should_start_turn;
use crate::data::TurnDirection;
use crate::fms::point::SharedFmsPoint;
use crate::geo::CourseOffset;
use crate::position::AircraftState;

/// Guidance for one tick: where the path is and how far is left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CourseInterceptInfo {
    pub required_true_course: f64,
    /// Positive right of the path.
    pub cross_track_m: f64,
    /// Distance left to the leg's termination point.
    pub along_track_m: f64,
    /// Set while the path is a constant-radius turn.
    pub turn_radius_m: Option<f64>,
    pub turn_direction: Option<TurnDirection>,
}

impl CourseInterceptInfo {
    pub fn straight(offset: CourseOffset) -> Self {
        Self {
            required_true_course: offset.required_course,
            cross_track_m: offset.cross_track_m,
            along_track_m: offset.along_track_m,
            turn_radius_m: None,
            turn_direction: None,
        }
    }

    pub fn turning(offset: CourseOffset, radius_m: f64, direction: TurnDirection) -> Self {
        Self {
            turn_radius_m: Some(radius_m),
            turn_direction: Some(direction),
            ..Self::straight(offset)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RouteLegType {
    TrackToFix,
    CourseToFix,
    RadiusToFix,
    HoldToManual,
    DirectToFix,
    Discontinuity,
}

#[derive(Debug)]
pub enum RouteLeg {
    TrackToFix(TrackToFixLeg),
    CourseToFix(CourseToFixLeg),
    RadiusToFix(RadiusToFixLeg),
    HoldToManual(HoldToManualLeg),
    DirectToFix(DirectToFixLeg),
    Disco(DiscoLeg),
}

impl RouteLeg {
    pub fn leg_type(&self) -> RouteLegType {
        match self {
            RouteLeg::TrackToFix(_) => RouteLegType::TrackToFix,
            RouteLeg::CourseToFix(_) => RouteLegType::CourseToFix,
            RouteLeg::RadiusToFix(_) => RouteLegType::RadiusToFix,
            RouteLeg::HoldToManual(_) => RouteLegType::HoldToManual,
            RouteLeg::DirectToFix(_) => RouteLegType::DirectToFix,
            RouteLeg::Disco(_) => RouteLegType::Discontinuity,
        }
    }

    pub fn start_point(&self) -> Option<&SharedFmsPoint> {
        match self {
            RouteLeg::TrackToFix(leg) => Some(leg.start_point()),
            RouteLeg::RadiusToFix(leg) => Some(leg.start_point()),
            RouteLeg::HoldToManual(leg) => Some(leg.fix()),
            RouteLeg::CourseToFix(_) | RouteLeg::DirectToFix(_) | RouteLeg::Disco(_) => None,
        }
    }

    pub fn end_point(&self) -> Option<&SharedFmsPoint> {
        match self {
            RouteLeg::TrackToFix(leg) => Some(leg.end_point()),
            RouteLeg::CourseToFix(leg) => Some(leg.end_point()),
            RouteLeg::RadiusToFix(leg) => Some(leg.end_point()),
            RouteLeg::HoldToManual(leg) => Some(leg.fix()),
            RouteLeg::DirectToFix(leg) => Some(leg.end_point()),
            RouteLeg::Disco(_) => None,
        }
    }

    /// Course at the start of the leg, when it is fixed in advance.
    pub fn initial_true_course(&self) -> Option<f64> {
        match self {
            RouteLeg::TrackToFix(leg) => Some(leg.initial_true_course()),
            RouteLeg::RadiusToFix(leg) => Some(leg.initial_true_course()),
            RouteLeg::HoldToManual(leg) => Some(leg.inbound_true_course()),
            RouteLeg::DirectToFix(leg) => Some(leg.initial_true_course()),
            RouteLeg::CourseToFix(_) | RouteLeg::Disco(_) => None,
        }
    }

    pub fn final_true_course(&self) -> Option<f64> {
        match self {
            RouteLeg::TrackToFix(leg) => Some(leg.final_true_course()),
            RouteLeg::CourseToFix(leg) => Some(leg.true_course()),
            RouteLeg::RadiusToFix(leg) => Some(leg.final_true_course()),
            RouteLeg::HoldToManual(leg) => Some(leg.inbound_true_course()),
            RouteLeg::DirectToFix(leg) => Some(leg.final_true_course()),
            RouteLeg::Disco(leg) => leg.course(),
        }
    }

    pub fn course_intercept_info(&self, state: &AircraftState) -> CourseInterceptInfo {
        match self {
            RouteLeg::TrackToFix(leg) => leg.course_intercept_info(state),
            RouteLeg::CourseToFix(leg) => leg.course_intercept_info(state),
            RouteLeg::RadiusToFix(leg) => leg.course_intercept_info(state),
            RouteLeg::HoldToManual(leg) => leg.course_intercept_info(state),
            RouteLeg::DirectToFix(leg) => leg.course_intercept_info(state),
            RouteLeg::Disco(leg) => leg.course_intercept_info(state),
        }
    }

    pub fn has_leg_terminated(&self, state: &AircraftState) -> bool {
        match self {
            RouteLeg::TrackToFix(leg) => leg.has_leg_terminated(state),
            RouteLeg::CourseToFix(leg) => leg.has_leg_terminated(state),
            RouteLeg::RadiusToFix(leg) => leg.has_leg_terminated(state),
            RouteLeg::HoldToManual(leg) => leg.has_leg_terminated(state),
            RouteLeg::DirectToFix(leg) => leg.has_leg_terminated(state),
            RouteLeg::Disco(_) => false,
        }
    }

    /// Whether turning onto this leg should begin now.
    pub fn should_activate_leg(&self, state: &AircraftState, interval_ms: u64) -> bool {
        if let RouteLeg::Disco(_) = self {
            return false;
        }
        let info = self.course_intercept_info(state);
        should_start_turn(
            info.cross_track_m,
            state.track_true,
            info.required_true_course,
            state.bank_deg,
            state.ground_speed_kts,
            interval_ms,
        )
    }

    /// Advance internal phase state.
    ///
    /// Returns true on the tick the aircraft passes the leg's end point.
    pub fn process_leg(&mut self, state: &AircraftState, interval_ms: u64) -> bool {
        match self {
            RouteLeg::TrackToFix(leg) => leg.process_leg(state),
            RouteLeg::CourseToFix(leg) => leg.process_leg(state),
            RouteLeg::RadiusToFix(leg) => leg.process_leg(state, interval_ms),
            RouteLeg::HoldToManual(leg) => leg.process_leg(state),
            RouteLeg::DirectToFix(leg) => leg.process_leg(state),
            RouteLeg::Disco(_) => false,
        }
    }

    pub fn as_hold_mut(&mut self) -> Option<&mut HoldToManualLeg> {
        match self {
            RouteLeg::HoldToManual(leg) => Some(leg),
            _ => None,
        }
    }
}

impl fmt::Display for RouteLeg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteLeg::TrackToFix(leg) => leg.fmt(f),
            RouteLeg::CourseToFix(leg) => leg.fmt(f),
            RouteLeg::RadiusToFix(leg) => leg.fmt(f),
            RouteLeg::HoldToManual(leg) => leg.fmt(f),
            RouteLeg::DirectToFix(leg) => leg.fmt(f),
            RouteLeg::Disco(leg) => leg.fmt(f),
        }
    }
}

/// Edge trigger for passing an end point: fires once when the along-track
/// distance drops through the threshold.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct PassDetector {
    prev_along_track_m: Option<f64>,
}

impl PassDetector {
    pub(crate) fn update(&mut self, along_track_m: f64) -> bool {
        use crate::autopilot::MIN_XTK_M;
        let fired = along_track_m <= MIN_XTK_M && self.prev_along_track_m.is_some_and(|prev| prev >= MIN_XTK_M);
        self.prev_along_track_m = Some(along_track_m);
        fired
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::geo::GeoPoint;
    use crate::position::AircraftState;

    pub fn state_at(position: GeoPoint, track: f64) -> AircraftState {
        AircraftState {
            position,
            track_true: track,
            heading_true: track,
            bank_deg: 0.0,
            ground_speed_kts: 250.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_detector_fires_once() {
        let mut detector = PassDetector::default();
        assert!(!detector.update(100.0));
        assert!(!detector.update(20.0));
        assert!(detector.update(-5.0));
        assert!(!detector.update(-20.0));
    }

    #[test]
    fn test_pass_detector_needs_a_previous_sample() {
        let mut detector = PassDetector::default();
        assert!(!detector.update(-5.0));
    }
}

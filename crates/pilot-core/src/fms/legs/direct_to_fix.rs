use std::fmt;

use super::{CourseInterceptInfo, TrackToFixLeg};
use crate::fms::point::{FmsPoint, SharedFmsPoint};
use crate::data::Waypoint;
use crate::geo::GeoPoint;
use crate::position::AircraftState;

/// Direct track from where the aircraft was when the leg was created.
#[derive(Debug)]
pub struct DirectToFixLeg {
    origin: GeoPoint,
    track: TrackToFixLeg,
}

impl DirectToFixLeg {
    pub fn new(origin: GeoPoint, end: SharedFmsPoint) -> Self {
        let start = FmsPoint::shared(Waypoint {
            identifier: "*PPOS".to_string(),
            position: origin,
        });
        let hint = origin.initial_bearing_to(&end.point().position);
        Self {
            origin,
            track: TrackToFixLeg::with_course_hint(start, end, hint),
        }
    }

    pub fn origin(&self) -> &GeoPoint {
        &self.origin
    }

    pub fn end_point(&self) -> &SharedFmsPoint {
        self.track.end_point()
    }

    pub fn initial_true_course(&self) -> f64 {
        self.track.initial_true_course()
    }

    pub fn final_true_course(&self) -> f64 {
        self.track.final_true_course()
    }

    pub fn course_intercept_info(&self, state: &AircraftState) -> CourseInterceptInfo {
        self.track.course_intercept_info(state)
    }

    pub fn has_leg_terminated(&self, state: &AircraftState) -> bool {
        self.track.has_leg_terminated(state)
    }

    pub fn process_leg(&mut self, state: &AircraftState) -> bool {
        self.track.process_leg(state)
    }
}

impl fmt::Display for DirectToFixLeg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "=(DF)=> {}", self.end_point())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fms::legs::test_support::state_at;

    #[test]
    fn test_direct_course_from_origin() {
        let origin = GeoPoint::new(0.0, 0.0);
        let leg = DirectToFixLeg::new(origin, FmsPoint::shared(Waypoint::new("NTH", 1.0, 0.0)));
        assert!(leg.initial_true_course().abs() < 1e-9);
        let info = leg.course_intercept_info(&state_at(origin, 90.0));
        assert!(info.cross_track_m.abs() < 1e-6);
        assert!((info.along_track_m - 111_195.0).abs() < 100.0);
        assert_eq!(leg.to_string(), "=(DF)=> NTH");
    }
}

use std::fmt;

use super::{CourseInterceptInfo, PassDetector};
use crate::fms::point::SharedFmsPoint;
use crate::geo::{calculate_cross_track_error, GeoPoint};
use crate::position::AircraftState;

/// Segments shorter than this take their course from a hint.
const DEGENERATE_SEGMENT_M: f64 = 1.0;

/// Great-circle track between two route points.
#[derive(Debug)]
pub struct TrackToFixLeg {
    start: SharedFmsPoint,
    end: SharedFmsPoint,
    initial_course: f64,
    final_course: f64,
    pass: PassDetector,
}

impl TrackToFixLeg {
    pub fn new(start: SharedFmsPoint, end: SharedFmsPoint) -> Self {
        let hint = start.point().position.initial_bearing_to(&end.point().position);
        Self::with_course_hint(start, end, hint)
    }

    /// Like [`TrackToFixLeg::new`], but a zero-length segment flies `hint`.
    pub fn with_course_hint(start: SharedFmsPoint, end: SharedFmsPoint, hint: f64) -> Self {
        let (a, b) = (&start.point().position, &end.point().position);
        let (initial_course, final_course) = if a.distance_m(b) < DEGENERATE_SEGMENT_M {
            (hint, hint)
        } else {
            (a.initial_bearing_to(b), a.final_bearing_to(b))
        };
        Self {
            start,
            end,
            initial_course,
            final_course,
            pass: PassDetector::default(),
        }
    }

    pub fn start_point(&self) -> &SharedFmsPoint {
        &self.start
    }

    pub fn end_point(&self) -> &SharedFmsPoint {
        &self.end
    }

    pub fn initial_true_course(&self) -> f64 {
        self.initial_course
    }

    pub fn final_true_course(&self) -> f64 {
        self.final_course
    }

    pub fn course_intercept_info(&self, state: &AircraftState) -> CourseInterceptInfo {
        self.info_at(&state.position)
    }

    pub(crate) fn info_at(&self, position: &GeoPoint) -> CourseInterceptInfo {
        CourseInterceptInfo::straight(calculate_cross_track_error(
            position,
            &self.end.point().position,
            self.final_course,
        ))
    }

    pub fn has_leg_terminated(&self, state: &AircraftState) -> bool {
        self.course_intercept_info(state).along_track_m <= 0.0
    }

    pub fn process_leg(&mut self, state: &AircraftState) -> bool {
        let along = self.course_intercept_info(state).along_track_m;
        self.pass.update(along)
    }
}

impl fmt::Display for TrackToFixLeg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} =(TF)=> {}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Waypoint;
    use crate::fms::legs::test_support::state_at;
    use crate::fms::point::FmsPoint;

    fn eastbound() -> TrackToFixLeg {
        TrackToFixLeg::new(
            FmsPoint::shared(Waypoint::new("AAA", 0.0, 0.0)),
            FmsPoint::shared(Waypoint::new("BBB", 0.0, 1.0)),
        )
    }

    #[test]
    fn test_on_course_point_has_no_cross_track() {
        let leg = eastbound();
        let pos = GeoPoint::new(0.0, 0.25);
        let info = leg.course_intercept_info(&state_at(pos, 90.0));
        assert!(info.cross_track_m.abs() < 1e-6);
        let to_go = pos.distance_m(&GeoPoint::new(0.0, 1.0));
        assert!((info.along_track_m - to_go).abs() < 1.0);
        assert!((info.required_true_course - 90.0).abs() < 1e-6);
    }

    #[test]
    fn test_cross_track_sign() {
        let leg = eastbound();
        // South of an eastbound course is right of it.
        let info = leg.course_intercept_info(&state_at(GeoPoint::new(-0.01, 0.5), 90.0));
        assert!(info.cross_track_m > 1000.0);
    }

    #[test]
    fn test_terminates_after_passing_end() {
        let mut leg = eastbound();
        let mut passed = 0;
        for i in 0..50 {
            let lon = 0.951 + i as f64 * 0.002;
            let state = state_at(GeoPoint::new(0.0, lon), 90.0);
            let terminated = leg.has_leg_terminated(&state);
            assert_eq!(terminated, lon > 1.0, "lon {lon}");
            if leg.process_leg(&state) {
                passed += 1;
            }
        }
        assert_eq!(passed, 1);
    }

    #[test]
    fn test_zero_length_uses_hint() {
        let a = FmsPoint::shared(Waypoint::new("AAA", 10.0, 10.0));
        let leg = TrackToFixLeg::with_course_hint(a.clone(), a, 135.0);
        assert_eq!(leg.initial_true_course(), 135.0);
        assert_eq!(leg.final_true_course(), 135.0);
    }

    #[test]
    fn test_display() {
        assert_eq!(eastbound().to_string(), "AAA =(TF)=> BBB");
    }
}

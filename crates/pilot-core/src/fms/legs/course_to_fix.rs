use std::fmt;

use super::{CourseInterceptInfo, PassDetector};
use crate::data::{to_true_course, BearingType, MagneticVariation};
use crate::fms::point::SharedFmsPoint;
use crate::geo::calculate_cross_track_error;
use crate::position::AircraftState;

/// Fixed course into a route point.
#[derive(Debug)]
pub struct CourseToFixLeg {
    end: SharedFmsPoint,
    bearing_type: BearingType,
    course: f64,
    true_course: f64,
    pass: PassDetector,
}

impl CourseToFixLeg {
    /// A magnetic `course` is converted with the variation at the end point.
    pub fn new(end: SharedFmsPoint, bearing_type: BearingType, course: f64, magnetic: &dyn MagneticVariation) -> Self {
        let true_course = to_true_course(course, bearing_type, &end.point().position, magnetic);
        Self {
            end,
            bearing_type,
            course,
            true_course,
            pass: PassDetector::default(),
        }
    }

    pub fn end_point(&self) -> &SharedFmsPoint {
        &self.end
    }

    pub fn true_course(&self) -> f64 {
        self.true_course
    }

    pub fn course_intercept_info(&self, state: &AircraftState) -> CourseInterceptInfo {
        CourseInterceptInfo::straight(calculate_cross_track_error(
            &state.position,
            &self.end.point().position,
            self.true_course,
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

impl fmt::Display for CourseToFixLeg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = match self.bearing_type {
            BearingType::Magnetic => "",
            BearingType::True => "T",
        };
        write!(f, "{:03.0}{} =(CF)=> {}", self.course, suffix, self.end)
    }
}

use std::fmt;

use super::CourseInterceptInfo;
use crate::position::AircraftState;

/// Route discontinuity. Keeps the last known course and never ends.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscoLeg {
    course: Option<f64>,
}

impl DiscoLeg {
    pub fn new(course: Option<f64>) -> Self {
        Self { course }
    }

    pub fn course(&self) -> Option<f64> {
        self.course
    }

    pub fn course_intercept_info(&self, state: &AircraftState) -> CourseInterceptInfo {
        CourseInterceptInfo {
            required_true_course: self.course.unwrap_or(state.track_true),
            cross_track_m: 0.0,
            along_track_m: 0.0,
            turn_radius_m: None,
            turn_direction: None,
        }
    }
}

impl fmt::Display for DiscoLeg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "---DISCONTINUITY---")
    }
}

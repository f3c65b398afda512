use std::fmt;

use tracing::warn;

use super::{CourseInterceptInfo, TrackToFixLeg};
use crate::data::{TurnDirection, Waypoint};
use crate::fms::point::{FmsPoint, SharedFmsPoint};
use crate::geo::{
    arc_sweep, calculate_arc_course_info, calculate_cross_track_error, course_line_delta, find_intersection,
    normalize_heading, turn_amount, GeoPoint,
};
use crate::position::AircraftState;

/// Course lines closer than this are treated as parallel.
const PARALLEL_THRESHOLD_DEG: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RfPhase {
    TrackToRf,
    InRf,
    TrackFromRf,
}

/// Constant-radius turn joining the inbound and outbound course lines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurnCircle {
    pub center: GeoPoint,
    pub radius_m: f64,
    /// Where the turn starts, on the initial course line.
    pub tangent_a: GeoPoint,
    /// Where the turn ends, on the final course line.
    pub tangent_b: GeoPoint,
    pub clockwise: bool,
}

impl TurnCircle {
    /// Turn joining a line through `start` on `initial_course` to a line
    /// through `end` on `final_course`.
    pub fn between(start: &GeoPoint, initial_course: f64, end: &GeoPoint, final_course: f64) -> Option<Self> {
        let (tangent_a, tangent_b, center) = if course_line_delta(initial_course, final_course) < PARALLEL_THRESHOLD_DEG {
            parallel_tangents(start, initial_course, end, final_course)?
        } else {
            crossing_tangents(start, initial_course, end, final_course)?
        };

        let radius_m = center.distance_m(&tangent_a);
        if !radius_m.is_finite() || radius_m < 1.0 {
            return None;
        }
        let clockwise = turn_amount(initial_course, tangent_a.initial_bearing_to(&center)) > 0.0;
        Some(Self {
            center,
            radius_m,
            tangent_a,
            tangent_b,
            clockwise,
        })
    }

    pub fn radial_a(&self) -> f64 {
        self.center.initial_bearing_to(&self.tangent_a)
    }

    pub fn radial_b(&self) -> f64 {
        self.center.initial_bearing_to(&self.tangent_b)
    }

    pub fn direction(&self) -> TurnDirection {
        if self.clockwise {
            TurnDirection::Right
        } else {
            TurnDirection::Left
        }
    }

    pub fn arc_length_m(&self) -> f64 {
        arc_sweep(self.radial_a(), self.radial_b(), self.clockwise).to_radians() * self.radius_m
    }
}

/// Half-circle between (near) parallel lines. The turn starts at the start
/// point when it lies before the end point along the final course, and
/// finishes at the end point otherwise.
fn parallel_tangents(
    start: &GeoPoint,
    initial_course: f64,
    end: &GeoPoint,
    final_course: f64,
) -> Option<(GeoPoint, GeoPoint, GeoPoint)> {
    let along = calculate_cross_track_error(start, end, final_course).along_track_m;
    let (a, b) = if along > 0.0 {
        let b = find_intersection(start, initial_course + 90.0, end, final_course)?;
        (*start, b)
    } else {
        let a = find_intersection(start, initial_course, end, final_course + 90.0)?;
        (a, *end)
    };
    let center = a.moved_by(a.initial_bearing_to(&b), a.distance_m(&b) / 2.0);
    Some((a, b, center))
}

/// Circle inscribed in the angle between two crossing course lines.
///
/// Both tangent points sit the same distance from the crossing. One of
/// them is pinned to a leg point (the nearer one when flying towards the
/// crossing, the farther one otherwise) and the other is found by dropping
/// a perpendicular from the centre onto the other line.
fn crossing_tangents(
    start: &GeoPoint,
    initial_course: f64,
    end: &GeoPoint,
    final_course: f64,
) -> Option<(GeoPoint, GeoPoint, GeoPoint)> {
    let crossing = find_intersection(start, initial_course, end, final_course)?;

    // Line courses at the crossing itself.
    let course_in = calculate_cross_track_error(&crossing, start, initial_course).required_course;
    let course_out = calculate_cross_track_error(&crossing, end, final_course).required_course;
    let back_to_start = normalize_heading(course_in + 180.0);
    let bisector = normalize_heading(back_to_start + turn_amount(back_to_start, course_out) / 2.0);

    let heading_into = calculate_cross_track_error(start, &crossing, initial_course).along_track_m > 0.0;
    let start_is_nearer = crossing.distance_m(start) <= crossing.distance_m(end);
    let pin_start = heading_into == start_is_nearer;

    if pin_start {
        let center = find_intersection(start, initial_course + 90.0, &crossing, bisector)?;
        let b = find_intersection(end, final_course, &center, final_course + 90.0)?;
        Some((*start, b, center))
    } else {
        let center = find_intersection(end, final_course + 90.0, &crossing, bisector)?;
        let a = find_intersection(start, initial_course, &center, initial_course + 90.0)?;
        Some((a, *end, center))
    }
}

/// Radius-to-fix leg: a track onto the turn, the turn itself and a track
/// from the turn to the end point.
#[derive(Debug)]
pub struct RadiusToFixLeg {
    start: SharedFmsPoint,
    end: SharedFmsPoint,
    initial_course: f64,
    final_course: f64,
    circle: Option<TurnCircle>,
    phase: RfPhase,
    to_rf: Option<TrackToFixLeg>,
    from_rf: TrackToFixLeg,
}

impl RadiusToFixLeg {
    pub fn new(start: SharedFmsPoint, end: SharedFmsPoint, initial_course: f64, final_course: f64) -> Self {
        let initial_course = normalize_heading(initial_course);
        let final_course = normalize_heading(final_course);
        let circle = TurnCircle::between(
            &start.point().position,
            initial_course,
            &end.point().position,
            final_course,
        );

        match circle {
            Some(circle) => {
                let a = FmsPoint::shared(Waypoint {
                    identifier: format!("{}-RF", start.identifier()),
                    position: circle.tangent_a,
                });
                let b = FmsPoint::shared(Waypoint {
                    identifier: format!("RF-{}", end.identifier()),
                    position: circle.tangent_b,
                });
                let to_rf = TrackToFixLeg::with_course_hint(start.clone(), a, initial_course);
                let from_rf = TrackToFixLeg::with_course_hint(b, end.clone(), final_course);
                Self {
                    start,
                    end,
                    initial_course,
                    final_course,
                    circle: Some(circle),
                    phase: RfPhase::TrackToRf,
                    to_rf: Some(to_rf),
                    from_rf,
                }
            }
            None => {
                warn!(
                    start = %start,
                    end = %end,
                    "No turn circle between RF courses, flying direct track instead"
                );
                let from_rf = TrackToFixLeg::with_course_hint(start.clone(), end.clone(), final_course);
                Self {
                    start,
                    end,
                    initial_course,
                    final_course,
                    circle: None,
                    phase: RfPhase::TrackFromRf,
                    to_rf: None,
                    from_rf,
                }
            }
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

    pub fn phase(&self) -> RfPhase {
        self.phase
    }

    pub fn turn_circle(&self) -> Option<&TurnCircle> {
        self.circle.as_ref()
    }

    fn arc_info(&self, circle: &TurnCircle, position: &GeoPoint) -> CourseInterceptInfo {
        let offset = calculate_arc_course_info(
            position,
            &circle.center,
            circle.radial_a(),
            circle.radial_b(),
            circle.radius_m,
            circle.clockwise,
        );
        CourseInterceptInfo::turning(offset, circle.radius_m, circle.direction())
    }

    fn phase_info(&self, position: &GeoPoint) -> CourseInterceptInfo {
        match (self.phase, &self.circle, &self.to_rf) {
            (RfPhase::TrackToRf, Some(_), Some(to_rf)) => to_rf.info_at(position),
            (RfPhase::InRf, Some(circle), _) => self.arc_info(circle, position),
            _ => self.from_rf.info_at(position),
        }
    }

    pub fn course_intercept_info(&self, state: &AircraftState) -> CourseInterceptInfo {
        let mut info = self.phase_info(&state.position);
        if let Some(circle) = &self.circle {
            let tail_m = circle.tangent_b.distance_m(&self.end.point().position);
            info.along_track_m += match self.phase {
                RfPhase::TrackToRf => circle.arc_length_m() + tail_m,
                RfPhase::InRf => tail_m,
                RfPhase::TrackFromRf => 0.0,
            };
        }
        info
    }

    pub fn has_leg_terminated(&self, state: &AircraftState) -> bool {
        self.phase == RfPhase::TrackFromRf && self.from_rf.info_at(&state.position).along_track_m <= 0.0
    }

    /// Moves through the phases as each part is flown.
    pub fn process_leg(&mut self, state: &AircraftState, _interval_ms: u64) -> bool {
        loop {
            let next = match self.phase {
                RfPhase::TrackToRf if self.phase_info(&state.position).along_track_m <= 0.0 => RfPhase::InRf,
                RfPhase::InRf if self.phase_info(&state.position).along_track_m <= 0.0 => RfPhase::TrackFromRf,
                _ => break,
            };
            self.phase = next;
        }

        if self.phase == RfPhase::TrackFromRf {
            self.from_rf.process_leg(state)
        } else {
            false
        }
    }
}

impl fmt::Display for RadiusToFixLeg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} =(RF)=> {}", self.start, self.end)
    }
}

use std::f64::consts::PI;
use std::fmt;

use super::{CourseInterceptInfo, PassDetector};
use crate::atmos::{METERS_PER_NMI, MPS_PER_KNOT};
use crate::data::{to_true_course, BearingType, HoldLegLengthType, MagneticVariation, TurnDirection};
use crate::fms::point::SharedFmsPoint;
use crate::geo::{calculate_arc_course_info, calculate_cross_track_error, normalize_heading, GeoPoint};
use crate::position::AircraftState;

pub const HOLD_SPEED_KTS: f64 = 230.0;
pub const HOLD_TURN_RATE_DEG_S: f64 = 3.0;
const DEFAULT_LEG_MINUTES: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldPhase {
    TurnOutbound,
    Outbound,
    TurnInbound,
    Inbound,
}

/// Fixed points of the racetrack, all derived from the fix.
#[derive(Debug, Clone, Copy)]
struct Racetrack {
    outbound_center: GeoPoint,
    outbound_start: GeoPoint,
    outbound_end: GeoPoint,
    inbound_center: GeoPoint,
    inbound_start: GeoPoint,
}

/// Racetrack hold at a fix, flown until exit is armed.
#[derive(Debug)]
pub struct HoldToManualLeg {
    fix: SharedFmsPoint,
    inbound_course: f64,
    inbound_true: f64,
    turn_direction: TurnDirection,
    leg_length_type: HoldLegLengthType,
    leg_length: f64,
    radius_m: f64,
    leg_length_m: f64,
    track: Racetrack,
    phase: HoldPhase,
    exit_armed: bool,
    pass: PassDetector,
}

impl HoldToManualLeg {
    pub fn new(
        fix: SharedFmsPoint,
        bearing_type: BearingType,
        inbound_course: f64,
        turn_direction: TurnDirection,
        leg_length_type: HoldLegLengthType,
        leg_length: f64,
        magnetic: &dyn MagneticVariation,
    ) -> Self {
        let inbound_true = to_true_course(inbound_course, bearing_type, &fix.point().position, magnetic);
        let radius_m = standard_radius_m();
        let leg_length_m = leg_length_m(leg_length_type, leg_length);
        let track = Racetrack::build(&fix.point().position, inbound_true, turn_direction, radius_m, leg_length_m);
        Self {
            fix,
            inbound_course,
            inbound_true,
            turn_direction,
            leg_length_type,
            leg_length,
            radius_m,
            leg_length_m,
            track,
            phase: HoldPhase::TurnOutbound,
            exit_armed: false,
            pass: PassDetector::default(),
        }
    }

    pub fn fix(&self) -> &SharedFmsPoint {
        &self.fix
    }

    pub fn inbound_true_course(&self) -> f64 {
        self.inbound_true
    }

    pub fn turn_direction(&self) -> TurnDirection {
        self.turn_direction
    }

    pub fn leg_length_m(&self) -> f64 {
        self.leg_length_m
    }

    pub fn radius_m(&self) -> f64 {
        self.radius_m
    }

    pub fn phase(&self) -> HoldPhase {
        self.phase
    }

    pub fn exit_armed(&self) -> bool {
        self.exit_armed
    }

    /// Leave the hold the next time the fix is crossed inbound.
    pub fn arm_exit(&mut self) {
        self.exit_armed = true;
    }

    fn clockwise(&self) -> bool {
        self.turn_direction.is_right()
    }

    fn half_circle_m(&self) -> f64 {
        PI * self.radius_m
    }

    /// Guidance for the current phase only.
    fn phase_info(&self, position: &GeoPoint) -> CourseInterceptInfo {
        let t = &self.track;
        let fix = &self.fix.point().position;
        match self.phase {
            HoldPhase::TurnOutbound => CourseInterceptInfo::turning(
                calculate_arc_course_info(
                    position,
                    &t.outbound_center,
                    t.outbound_center.initial_bearing_to(fix),
                    t.outbound_center.initial_bearing_to(&t.outbound_start),
                    self.radius_m,
                    self.clockwise(),
                ),
                self.radius_m,
                self.turn_direction,
            ),
            HoldPhase::Outbound => CourseInterceptInfo::straight(calculate_cross_track_error(
                position,
                &t.outbound_end,
                t.outbound_start.final_bearing_to(&t.outbound_end),
            )),
            HoldPhase::TurnInbound => CourseInterceptInfo::turning(
                calculate_arc_course_info(
                    position,
                    &t.inbound_center,
                    t.inbound_center.initial_bearing_to(&t.outbound_end),
                    t.inbound_center.initial_bearing_to(&t.inbound_start),
                    self.radius_m,
                    self.clockwise(),
                ),
                self.radius_m,
                self.turn_direction,
            ),
            HoldPhase::Inbound => {
                CourseInterceptInfo::straight(calculate_cross_track_error(position, fix, self.inbound_true))
            }
        }
    }

    /// Along-track is the distance around the pattern back to the fix.
    pub fn course_intercept_info(&self, state: &AircraftState) -> CourseInterceptInfo {
        let mut info = self.phase_info(&state.position);
        info.along_track_m += match self.phase {
            HoldPhase::TurnOutbound => 2.0 * self.leg_length_m + self.half_circle_m(),
            HoldPhase::Outbound => self.leg_length_m + self.half_circle_m(),
            HoldPhase::TurnInbound => self.leg_length_m,
            HoldPhase::Inbound => 0.0,
        };
        info
    }

    pub fn has_leg_terminated(&self, state: &AircraftState) -> bool {
        self.exit_armed
            && self.phase == HoldPhase::Inbound
            && self.phase_info(&state.position).along_track_m <= 0.0
    }

    /// Moves around the racetrack. Returns true when the fix is crossed
    /// inbound.
    pub fn process_leg(&mut self, state: &AircraftState) -> bool {
        let along = self.phase_info(&state.position).along_track_m;
        match self.phase {
            HoldPhase::TurnOutbound if along <= 0.0 => self.phase = HoldPhase::Outbound,
            HoldPhase::Outbound if along <= 0.0 => self.phase = HoldPhase::TurnInbound,
            HoldPhase::TurnInbound if along <= 0.0 => {
                self.phase = HoldPhase::Inbound;
                // Fresh edge for the next fix crossing.
                self.pass = PassDetector::default();
            }
            HoldPhase::Inbound => {
                let crossed = self.pass.update(along);
                if along <= 0.0 && !self.exit_armed {
                    self.phase = HoldPhase::TurnOutbound;
                }
                return crossed;
            }
            _ => {}
        }
        false
    }
}

impl Racetrack {
    fn build(fix: &GeoPoint, inbound: f64, turn: TurnDirection, radius_m: f64, leg_length_m: f64) -> Self {
        let side = normalize_heading(inbound + 90.0 * turn.sign());
        let outbound = normalize_heading(inbound + 180.0);

        let outbound_center = fix.moved_by(side, radius_m);
        let outbound_start = fix.moved_by(side, 2.0 * radius_m);
        let outbound_end = outbound_start.moved_by(outbound, leg_length_m);
        let inbound_start = fix.moved_by(outbound, leg_length_m);
        let inbound_center = outbound_end.moved_by(outbound_end.initial_bearing_to(&inbound_start), radius_m);

        Self {
            outbound_center,
            outbound_start,
            outbound_end,
            inbound_center,
            inbound_start,
        }
    }
}

/// Radius of a standard-rate turn at hold speed.
fn standard_radius_m() -> f64 {
    HOLD_SPEED_KTS * MPS_PER_KNOT / HOLD_TURN_RATE_DEG_S.to_radians()
}

fn leg_length_m(kind: HoldLegLengthType, length: f64) -> f64 {
    let minutes_m = |minutes: f64| HOLD_SPEED_KTS * MPS_PER_KNOT * minutes * 60.0;
    match kind {
        HoldLegLengthType::Time if length > 0.0 => minutes_m(length),
        HoldLegLengthType::Distance if length > 0.0 => length * METERS_PER_NMI,
        _ => minutes_m(DEFAULT_LEG_MINUTES),
    }
}

impl fmt::Display for HoldToManualLeg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = match self.turn_direction {
            TurnDirection::Left => 'L',
            TurnDirection::Right => 'R',
        };
        write!(f, "{} =(HM)=> {:03.0}/{}", self.fix, self.inbound_course, dir)?;
        match self.leg_length_type {
            HoldLegLengthType::Default => Ok(()),
            HoldLegLengthType::Time => write!(f, "/{}MIN", self.leg_length),
            HoldLegLengthType::Distance => write!(f, "/{}NM", self.leg_length),
        }
    }
}

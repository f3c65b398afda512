//! Flight management: route points, legs and the sequencing state machine.
//!
//! The route is an active leg plus an ordered queue of pending legs, all
//! behind one mutex. The tick thread calls [`AircraftFms::on_position_update`]
//! and command threads edit the route through the other methods; the lock
//! is only held for the duration of one call.

pub mod factory;
pub mod legs;
pub mod point;

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use crate::data::{BearingType, HoldLegLengthType, MagneticVariation, TurnDirection, Waypoint};
use crate::geo::turn_amount;
use crate::position::AircraftState;

pub use factory::{LegBuildError, LegFactory, NavDataLeg};
pub use legs::{
    CourseInterceptInfo, CourseToFixLeg, DirectToFixLeg, DiscoLeg, HoldPhase, HoldToManualLeg, RadiusToFixLeg,
    RfPhase, RouteLeg, RouteLegType, TrackToFixLeg, TurnCircle,
};
pub use point::{Constraint, ConstraintType, FmsPoint, FmsPointConstraints, SharedFmsPoint};

/// Minimum course change between legs that warrants an anticipated turn.
const MIN_ANTICIPATION_DELTA_DEG: f64 = 0.5;

/// Something the FMS did during a tick.
#[derive(Debug, Clone, PartialEq)]
pub enum FmsEvent {
    WaypointPassed(Waypoint),
    /// Display string of the newly active leg.
    LegActivated(String),
}

/// Result of one sequencing step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FmsUpdate {
    pub events: Vec<FmsEvent>,
    /// Guidance to fly this tick. `None` with no route.
    pub guidance: Option<CourseInterceptInfo>,
}

#[derive(Debug, Default)]
struct RouteSequence {
    active: Option<RouteLeg>,
    pending: VecDeque<RouteLeg>,
    suspended: bool,
    guidance: Option<CourseInterceptInfo>,
    /// Turning onto the first pending leg ahead of the active leg's end.
    anticipating: bool,
    /// The active leg's end point has already been reported as passed.
    active_end_reported: bool,
}

impl RouteSequence {
    fn activate_next(&mut self, events: &mut Vec<FmsEvent>) {
        if let Some(next) = self.pending.pop_front() {
            info!(leg = %next, "Leg activated");
            events.push(FmsEvent::LegActivated(next.to_string()));
            self.set_active(next);
        }
    }

    fn set_active(&mut self, leg: RouteLeg) {
        self.active = Some(leg);
        self.anticipating = false;
        self.active_end_reported = false;
    }

    fn report_active_end(&mut self, events: &mut Vec<FmsEvent>) {
        if self.active_end_reported {
            return;
        }
        if let Some(end) = self.active.as_ref().and_then(RouteLeg::end_point) {
            info!(waypoint = %end.identifier(), "Waypoint passed");
            events.push(FmsEvent::WaypointPassed(end.point().clone()));
            self.active_end_reported = true;
        }
    }
}

/// Route and lateral sequencing for one aircraft.
#[derive(Debug, Default)]
pub struct AircraftFms {
    route: Mutex<RouteSequence>,
}

/// Whether more than half of `leg_turn` has been flown when `turned`
/// degrees have been turned, both signed positive right.
fn half_turn_complete(leg_turn: f64, turned: f64) -> bool {
    leg_turn != 0.0 && turned * leg_turn.signum() > leg_turn.abs() / 2.0
}

impl AircraftFms {
    pub fn new() -> Self {
        Self::default()
    }

    fn route(&self) -> MutexGuard<'_, RouteSequence> {
        self.route.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Advance the leg sequence for one tick and produce guidance.
    pub fn on_position_update(&self, state: &AircraftState, interval_ms: u64) -> FmsUpdate {
        let mut route = self.route();
        let mut events = Vec::new();

        if route.active.is_none() {
            if route.pending.is_empty() {
                route.guidance = None;
                return FmsUpdate::default();
            }
            route.activate_next(&mut events);
        }

        let (passed, terminated) = match route.active.as_mut() {
            Some(leg) => (leg.process_leg(state, interval_ms), leg.has_leg_terminated(state)),
            None => return FmsUpdate { events, guidance: None },
        };
        if passed || terminated {
            route.report_active_end(&mut events);
        }

        if !route.suspended && !route.pending.is_empty() {
            if terminated {
                route.activate_next(&mut events);
            } else if let Some(guidance) = Self::anticipate(&mut route, state, interval_ms, &mut events) {
                route.guidance = Some(guidance);
                return FmsUpdate {
                    events,
                    guidance: Some(guidance),
                };
            }
        }

        let guidance = route.active.as_ref().map(|leg| leg.course_intercept_info(state));
        route.guidance = guidance;
        FmsUpdate { events, guidance }
    }

    /// Fly-by turn onto the next leg before the active one has ended.
    ///
    /// Returns the guidance to fly when the turn is in progress.
    fn anticipate(
        route: &mut RouteSequence,
        state: &AircraftState,
        interval_ms: u64,
        events: &mut Vec<FmsEvent>,
    ) -> Option<CourseInterceptInfo> {
        let RouteSequence {
            active,
            pending,
            anticipating,
            ..
        } = &mut *route;
        let active = active.as_ref()?;
        let next = pending.front_mut()?;

        let fly_by = active.end_point().is_some_and(|p| !p.is_fly_over());
        let (Some(active_final), Some(next_initial)) = (active.final_true_course(), next.initial_true_course()) else {
            return None;
        };
        if !fly_by || turn_amount(active_final, next_initial).abs() <= MIN_ANTICIPATION_DELTA_DEG {
            return None;
        }
        if !*anticipating {
            if !next.should_activate_leg(state, interval_ms) {
                return None;
            }
            debug!(next = %next, "Starting anticipated turn");
            *anticipating = true;
        }

        next.process_leg(state, interval_ms);
        let guidance = next.course_intercept_info(state);

        let current_course = active.course_intercept_info(state).required_true_course;
        let leg_turn = turn_amount(current_course, guidance.required_true_course);
        let turned = turn_amount(current_course, state.track_true);
        if half_turn_complete(leg_turn, turned) {
            route.report_active_end(events);
            route.activate_next(events);
        }
        Some(guidance)
    }

    /// Guidance cached by the last update.
    pub fn guidance(&self) -> Option<CourseInterceptInfo> {
        self.route().guidance
    }

    pub fn is_suspended(&self) -> bool {
        self.route().suspended
    }

    pub fn set_suspended(&self, suspended: bool) {
        self.route().suspended = suspended;
    }

    pub fn add_route_leg(&self, leg: RouteLeg) {
        self.route().pending.push_back(leg);
    }

    /// Make the first pending leg active, dropping the current one.
    pub fn activate_next_leg(&self) -> Option<String> {
        let mut route = self.route();
        let mut events = Vec::new();
        route.activate_next(&mut events);
        route.active.as_ref().map(ToString::to_string)
    }

    pub fn active_leg(&self) -> Option<String> {
        self.route().active.as_ref().map(ToString::to_string)
    }

    pub fn active_leg_type(&self) -> Option<RouteLegType> {
        self.route().active.as_ref().map(RouteLeg::leg_type)
    }

    /// Display strings of the pending legs, in order.
    pub fn route_legs(&self) -> Vec<String> {
        self.route().pending.iter().map(ToString::to_string).collect()
    }

    pub fn pending_leg_count(&self) -> usize {
        self.route().pending.len()
    }

    pub fn has_route(&self) -> bool {
        let route = self.route();
        route.active.is_some() || !route.pending.is_empty()
    }

    /// Route point of the leg ending at `point`, if any.
    pub fn leg_to_point(&self, point: &Waypoint) -> Option<SharedFmsPoint> {
        let route = self.route();
        route
            .active
            .iter()
            .chain(route.pending.iter())
            .filter_map(RouteLeg::end_point)
            .find(|p| p.point() == point)
            .cloned()
    }

    /// End point of the last leg in the route.
    pub fn last_route_point(&self) -> Option<SharedFmsPoint> {
        let route = self.route();
        route
            .pending
            .iter()
            .rev()
            .chain(route.active.iter())
            .find_map(RouteLeg::end_point)
            .cloned()
    }

    /// Whether LNAV should engage: the guidance law wants to turn onto the
    /// active leg, or the first pending leg when nothing is active.
    pub fn should_activate_lnav(&self, state: &AircraftState, interval_ms: u64) -> bool {
        let route = self.route();
        match route.active.as_ref().or(route.pending.front()) {
            Some(leg) => leg.should_activate_leg(state, interval_ms),
            None => false,
        }
    }

    /// Fly direct to `point` from the aircraft's current position, or on
    /// `course_mag` into it when given.
    ///
    /// A point already in the route truncates everything before it.
    /// Otherwise the direct leg is followed by a discontinuity.
    pub fn activate_direct_to(
        &self,
        point: &Waypoint,
        course_mag: Option<f64>,
        state: &AircraftState,
        magnetic: &dyn MagneticVariation,
    ) {
        let mut route = self.route();

        let mut found: Option<(usize, SharedFmsPoint)> = None;
        if let Some(active) = route.active.take() {
            if let Some(start) = active.start_point().filter(|p| p.point() == point).cloned() {
                found = Some((0, start));
                route.pending.push_front(active);
            } else if let Some(end) = active.end_point().filter(|p| p.point() == point).cloned() {
                found = Some((0, end));
            }
        }
        if found.is_none() {
            found = route.pending.iter().enumerate().find_map(|(i, leg)| {
                if let Some(start) = leg.start_point().filter(|p| p.point() == point) {
                    Some((i, start.clone()))
                } else {
                    leg.end_point()
                        .filter(|p| p.point() == point)
                        .map(|end| (i + 1, end.clone()))
                }
            });
        }

        let target = found
            .as_ref()
            .map(|(_, p)| p.clone())
            .unwrap_or_else(|| FmsPoint::shared(point.clone()));
        let direct = match course_mag {
            Some(course) => RouteLeg::CourseToFix(CourseToFixLeg::new(target, BearingType::Magnetic, course, magnetic)),
            None => RouteLeg::DirectToFix(DirectToFixLeg::new(state.position, target)),
        };

        match found {
            Some((index, _)) => {
                let index = index.min(route.pending.len());
                route.pending.drain(..index);
            }
            None => {
                let course = direct.final_true_course();
                route.pending.push_front(RouteLeg::Disco(DiscoLeg::new(course)));
            }
        }

        info!(leg = %direct, "Direct to activated");
        route.set_active(direct);
        route.guidance = None;
    }

    /// Insert a hold after the leg ending at `point`. The point becomes
    /// fly-over. Returns false when no leg ends at `point`.
    pub fn add_hold(
        &self,
        point: &Waypoint,
        inbound_course_mag: f64,
        turn_direction: TurnDirection,
        leg_length_type: HoldLegLengthType,
        leg_length: f64,
        magnetic: &dyn MagneticVariation,
    ) -> bool {
        let mut route = self.route();

        let active_end = route.active.as_ref().and_then(RouteLeg::end_point).filter(|p| p.point() == point).cloned();
        let found = match active_end {
            Some(end) => Some((0, end)),
            None => route.pending.iter().enumerate().find_map(|(i, leg)| {
                leg.end_point()
                    .filter(|p| p.point() == point)
                    .map(|end| (i + 1, end.clone()))
            }),
        };

        let Some((index, fix)) = found else {
            return false;
        };

        fix.set_fly_over(true);
        let hold = HoldToManualLeg::new(
            fix,
            BearingType::Magnetic,
            inbound_course_mag,
            turn_direction,
            leg_length_type,
            leg_length,
            magnetic,
        );
        info!(leg = %hold, "Hold added");
        route.pending.insert(index, RouteLeg::HoldToManual(hold));
        true
    }

    /// Arm the active hold to exit at its fix. False when not holding.
    pub fn exit_hold(&self) -> bool {
        let mut route = self.route();
        match route.active.as_mut().and_then(RouteLeg::as_hold_mut) {
            Some(hold) => {
                hold.arm_exit();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::FixedVariation;
    use crate::geo::GeoPoint;

    fn tf(a: &SharedFmsPoint, b: &SharedFmsPoint) -> RouteLeg {
        RouteLeg::TrackToFix(TrackToFixLeg::new(a.clone(), b.clone()))
    }

    fn state(position: GeoPoint, track: f64) -> AircraftState {
        AircraftState {
            position,
            track_true: track,
            heading_true: track,
            bank_deg: 0.0,
            ground_speed_kts: 250.0,
        }
    }

    #[test]
    fn test_half_turn_is_symmetric() {
        assert!(half_turn_complete(90.0, 46.0));
        assert!(!half_turn_complete(90.0, 44.0));
        assert!(half_turn_complete(-90.0, -46.0));
        assert!(!half_turn_complete(-90.0, -44.0));
        assert!(!half_turn_complete(-90.0, 46.0));
        assert!(!half_turn_complete(0.0, 10.0));
    }

    #[test]
    fn test_empty_route_is_a_no_op() {
        let fms = AircraftFms::new();
        let update = fms.on_position_update(&state(GeoPoint::new(0.0, 0.0), 90.0), 100);
        assert_eq!(update, FmsUpdate::default());
        assert!(!fms.has_route());
    }

    #[test]
    fn test_first_update_activates_leg() {
        let fms = AircraftFms::new();
        let a = FmsPoint::shared(Waypoint::new("A", 0.0, 0.0));
        let b = FmsPoint::shared(Waypoint::new("B", 0.0, 1.0));
        fms.add_route_leg(tf(&a, &b));

        let update = fms.on_position_update(&state(GeoPoint::new(0.0, 0.1), 90.0), 100);
        assert_eq!(update.events, vec![FmsEvent::LegActivated("A =(TF)=> B".into())]);
        let guidance = update.guidance.unwrap();
        assert!((guidance.required_true_course - 90.0).abs() < 1e-6);
        assert_eq!(fms.guidance(), Some(guidance));
    }

    #[test]
    fn test_last_route_point_and_leg_to_point() {
        let fms = AircraftFms::new();
        let a = FmsPoint::shared(Waypoint::new("A", 0.0, 0.0));
        let b = FmsPoint::shared(Waypoint::new("B", 0.0, 1.0));
        let c = FmsPoint::shared(Waypoint::new("C", 1.0, 1.0));
        fms.add_route_leg(tf(&a, &b));
        fms.add_route_leg(tf(&b, &c));
        assert_eq!(fms.last_route_point().unwrap().identifier(), "C");
        assert!(fms.leg_to_point(b.point()).is_some());
        assert!(fms.leg_to_point(&Waypoint::new("X", 5.0, 5.0)).is_none());
    }

    #[test]
    fn test_exit_hold_requires_active_hold() {
        let fms = AircraftFms::new();
        assert!(!fms.exit_hold());
        let a = FmsPoint::shared(Waypoint::new("A", 0.0, 0.0));
        let b = FmsPoint::shared(Waypoint::new("B", 0.0, 1.0));
        fms.add_route_leg(tf(&a, &b));
        assert!(fms.add_hold(b.point(), 90.0, TurnDirection::Right, HoldLegLengthType::Default, 0.0, &FixedVariation(0.0)));
        fms.activate_next_leg();
        fms.activate_next_leg();
        assert_eq!(fms.active_leg_type(), Some(RouteLegType::HoldToManual));
        assert!(fms.exit_hold());
    }
}

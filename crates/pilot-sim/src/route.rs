//! Route amendments built from waypoint identifiers.
//!
//! A route is resolved completely before anything is handed to the FMS, so
//! an unknown waypoint leaves the flight plan untouched.

use tracing::debug;

use pilot_core::fms::{HoldToManualLeg, TrackToFixLeg};
use pilot_core::{
    AircraftFms, AircraftState, BearingType, FmsPoint, GeoPoint, MagneticVariation, NavDataSource, RouteEntry,
    RouteLeg, SharedFmsPoint,
};

use crate::error::CommandError;

/// Legs resolved from a route string, ready to append.
#[derive(Debug)]
pub struct RoutePlan {
    legs: Vec<RouteLeg>,
    /// First point of the amendment when the route was empty.
    entry_point: Option<SharedFmsPoint>,
    fly_over: Vec<SharedFmsPoint>,
}

impl RoutePlan {
    /// Resolve `entries` after `last_point`, the current end of the route.
    ///
    /// Identifiers are looked up nearest the previous point, or `reference`
    /// for the first one. `HOLD` appends the published hold at the point
    /// before it.
    pub fn resolve(
        entries: &[RouteEntry],
        last_point: Option<SharedFmsPoint>,
        reference: &GeoPoint,
        nav: &dyn NavDataSource,
        magnetic: &dyn MagneticVariation,
    ) -> Result<Self, CommandError> {
        let starts_empty = last_point.is_none();
        let mut previous = last_point;
        let mut plan = Self {
            legs: Vec::new(),
            entry_point: None,
            fly_over: Vec::new(),
        };

        for entry in entries {
            match entry {
                RouteEntry::Hold => {
                    let fix = previous.clone().ok_or(CommandError::HoldWithoutFix)?;
                    let hold = nav
                        .published_hold(fix.identifier())
                        .ok_or_else(|| CommandError::NoPublishedHold(fix.identifier().to_string()))?;
                    plan.legs.push(RouteLeg::HoldToManual(HoldToManualLeg::new(
                        fix.clone(),
                        BearingType::Magnetic,
                        hold.inbound_course_mag,
                        hold.turn_direction,
                        hold.leg_length_type,
                        hold.leg_length,
                        magnetic,
                    )));
                    plan.fly_over.push(fix);
                }
                RouteEntry::Waypoint(id) => {
                    let near = previous.as_ref().map_or(*reference, |p| p.point().position);
                    let waypoint = nav
                        .closest_waypoint_by_identifier(id, near.lat, near.lon)
                        .ok_or_else(|| CommandError::WaypointNotFound(id.clone()))?;
                    let point = FmsPoint::shared(waypoint);
                    match &previous {
                        Some(prev) => plan
                            .legs
                            .push(RouteLeg::TrackToFix(TrackToFixLeg::new(prev.clone(), point.clone()))),
                        None => plan.entry_point = Some(point.clone()),
                    }
                    previous = Some(point);
                }
            }
        }

        if !starts_empty {
            plan.entry_point = None;
        }
        Ok(plan)
    }

    pub fn leg_count(&self) -> usize {
        self.legs.len()
    }

    /// Append the legs. A route that was empty is joined direct from the
    /// aircraft's position.
    pub fn apply(self, fms: &AircraftFms, state: &AircraftState, magnetic: &dyn MagneticVariation) {
        for point in &self.fly_over {
            point.set_fly_over(true);
        }
        for leg in self.legs {
            debug!(leg = %leg, "Route leg appended");
            fms.add_route_leg(leg);
        }
        if let Some(entry) = self.entry_point {
            fms.activate_direct_to(entry.point(), None, state, magnetic);
        }
    }
}

//! Builds route legs from procedure leg descriptors.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::legs::{CourseToFixLeg, DirectToFixLeg, HoldToManualLeg, RadiusToFixLeg, RouteLeg, TrackToFixLeg};
use super::point::{FmsPoint, SharedFmsPoint};
use crate::data::{BearingType, HoldLegLengthType, MagneticVariation, TurnDirection, Waypoint};

/// One leg as published in a procedure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NavDataLeg {
    /// Only seeds the start point of the following leg.
    InitialFix { fix: Waypoint },
    TrackToFix { fix: Waypoint },
    CourseToFix { fix: Waypoint, course_mag: f64 },
    DirectToFix { fix: Waypoint },
    /// Turn from the previous leg's course onto `final_course_mag`.
    RadiusToFix { fix: Waypoint, final_course_mag: f64 },
    HoldToManual {
        fix: Waypoint,
        inbound_course_mag: f64,
        turn_direction: TurnDirection,
        #[serde(default)]
        leg_length_type: HoldLegLengthType,
        #[serde(default)]
        leg_length: f64,
    },
}

impl NavDataLeg {
    pub fn fix(&self) -> &Waypoint {
        match self {
            NavDataLeg::InitialFix { fix }
            | NavDataLeg::TrackToFix { fix }
            | NavDataLeg::CourseToFix { fix, .. }
            | NavDataLeg::DirectToFix { fix }
            | NavDataLeg::RadiusToFix { fix, .. }
            | NavDataLeg::HoldToManual { fix, .. } => fix,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum LegBuildError {
    #[error("{leg} leg to {fix} has no preceding fix")]
    MissingStartPoint { leg: &'static str, fix: String },

    #[error("RF leg to {fix} has no inbound course")]
    MissingInboundCourse { fix: String },
}

/// Turns a sequence of [`NavDataLeg`]s into route legs that share their
/// route points.
pub struct LegFactory<'a> {
    magnetic: &'a dyn MagneticVariation,
}

impl<'a> LegFactory<'a> {
    pub fn new(magnetic: &'a dyn MagneticVariation) -> Self {
        Self { magnetic }
    }

    pub fn build(&self, legs: &[NavDataLeg]) -> Result<Vec<RouteLeg>, LegBuildError> {
        let mut route: Vec<RouteLeg> = Vec::with_capacity(legs.len());
        let mut previous: Option<SharedFmsPoint> = None;

        for leg in legs {
            // A hold shares its fix with the leg before it.
            let point = match (leg, &previous) {
                (NavDataLeg::HoldToManual { fix, .. }, Some(prev)) if prev.point() == fix => prev.clone(),
                _ => FmsPoint::shared(leg.fix().clone()),
            };

            let built = match leg {
                NavDataLeg::InitialFix { .. } => None,
                NavDataLeg::TrackToFix { fix } => {
                    let start = previous.clone().ok_or_else(|| LegBuildError::MissingStartPoint {
                        leg: "TF",
                        fix: fix.identifier.clone(),
                    })?;
                    Some(RouteLeg::TrackToFix(TrackToFixLeg::new(start, point.clone())))
                }
                NavDataLeg::CourseToFix { course_mag, .. } => Some(RouteLeg::CourseToFix(CourseToFixLeg::new(
                    point.clone(),
                    BearingType::Magnetic,
                    *course_mag,
                    self.magnetic,
                ))),
                NavDataLeg::DirectToFix { fix } => {
                    let start = previous.as_ref().ok_or_else(|| LegBuildError::MissingStartPoint {
                        leg: "DF",
                        fix: fix.identifier.clone(),
                    })?;
                    Some(RouteLeg::DirectToFix(DirectToFixLeg::new(start.point().position, point.clone())))
                }
                NavDataLeg::RadiusToFix { fix, final_course_mag } => {
                    let start = previous.clone().ok_or_else(|| LegBuildError::MissingStartPoint {
                        leg: "RF",
                        fix: fix.identifier.clone(),
                    })?;
                    let initial = route
                        .last()
                        .and_then(RouteLeg::final_true_course)
                        .ok_or_else(|| LegBuildError::MissingInboundCourse {
                            fix: fix.identifier.clone(),
                        })?;
                    let final_true = self.magnetic.magnetic_to_true(
                        *final_course_mag,
                        &fix.position,
                        chrono::Utc::now(),
                    );
                    Some(RouteLeg::RadiusToFix(RadiusToFixLeg::new(start, point.clone(), initial, final_true)))
                }
                NavDataLeg::HoldToManual {
                    inbound_course_mag,
                    turn_direction,
                    leg_length_type,
                    leg_length,
                    ..
                } => {
                    point.set_fly_over(true);
                    Some(RouteLeg::HoldToManual(HoldToManualLeg::new(
                        point.clone(),
                        BearingType::Magnetic,
                        *inbound_course_mag,
                        *turn_direction,
                        *leg_length_type,
                        *leg_length,
                        self.magnetic,
                    )))
                }
            };

            if let Some(built) = built {
                debug!(leg = %built, "Built route leg");
                route.push(built);
            }
            previous = Some(point);
        }

        Ok(route)
    }
}

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::data::Waypoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConstraintType {
    #[default]
    Free,
    Less,
    Exact,
    More,
}

/// Altitude or speed restriction at a route point.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Constraint {
    pub kind: ConstraintType,
    pub value: f64,
}

impl Constraint {
    pub fn new(kind: ConstraintType, value: f64) -> Self {
        Self { kind, value }
    }

    pub fn satisfies(&self, actual: f64) -> bool {
        match self.kind {
            ConstraintType::Free => true,
            ConstraintType::Less => actual <= self.value,
            ConstraintType::Exact => (actual - self.value).abs() < 1e-6,
            ConstraintType::More => actual >= self.value,
        }
    }
}

/// Route point shared between the leg that ends at it and the leg that
/// starts from it.
pub struct FmsPoint {
    point: Waypoint,
    fly_over: AtomicBool,
    constraints: Mutex<FmsPointConstraints>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FmsPointConstraints {
    pub upper_altitude: Constraint,
    pub lower_altitude: Constraint,
    pub speed: Constraint,
}

impl FmsPointConstraints {
    /// Altitude in feet, speed in knots.
    pub fn satisfied_by(&self, altitude_ft: f64, ias_kts: f64) -> bool {
        self.upper_altitude.satisfies(altitude_ft)
            && self.lower_altitude.satisfies(altitude_ft)
            && self.speed.satisfies(ias_kts)
    }
}

pub type SharedFmsPoint = Arc<FmsPoint>;

impl FmsPoint {
    pub fn new(point: Waypoint) -> Self {
        Self {
            point,
            fly_over: AtomicBool::new(false),
            constraints: Mutex::new(FmsPointConstraints::default()),
        }
    }

    pub fn shared(point: Waypoint) -> SharedFmsPoint {
        Arc::new(Self::new(point))
    }

    pub fn point(&self) -> &Waypoint {
        &self.point
    }

    pub fn identifier(&self) -> &str {
        &self.point.identifier
    }

    pub fn is_fly_over(&self) -> bool {
        self.fly_over.load(Ordering::Acquire)
    }

    pub fn set_fly_over(&self, fly_over: bool) {
        self.fly_over.store(fly_over, Ordering::Release);
    }

    pub fn constraints(&self) -> FmsPointConstraints {
        *self.constraints.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_constraints(&self, constraints: FmsPointConstraints) {
        *self.constraints.lock().unwrap_or_else(PoisonError::into_inner) = constraints;
    }

    /// Same route point: either the same shared node or the same fix.
    pub fn same_point(a: &SharedFmsPoint, b: &SharedFmsPoint) -> bool {
        Arc::ptr_eq(a, b) || a.point == b.point
    }
}

impl fmt::Debug for FmsPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FmsPoint")
            .field("point", &self.point)
            .field("fly_over", &self.is_fly_over())
            .finish()
    }
}

impl fmt::Display for FmsPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_fly_over() {
            write!(f, "{}(FO)", self.point.identifier)
        } else {
            write!(f, "{}", self.point.identifier)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_checks() {
        assert!(Constraint::default().satisfies(12_345.0));
        assert!(Constraint::new(ConstraintType::Less, 250.0).satisfies(240.0));
        assert!(!Constraint::new(ConstraintType::Less, 250.0).satisfies(260.0));
        assert!(Constraint::new(ConstraintType::More, 5000.0).satisfies(5000.0));
        assert!(!Constraint::new(ConstraintType::Exact, 7000.0).satisfies(7100.0));
    }

    #[test]
    fn test_fly_over_is_visible_through_every_handle() {
        let point = FmsPoint::shared(Waypoint::new("KLO", 47.45, 8.55));
        let other = Arc::clone(&point);
        point.set_fly_over(true);
        assert!(other.is_fly_over());
        assert_eq!(other.to_string(), "KLO(FO)");
    }

    #[test]
    fn test_window_constraint() {
        let point = FmsPoint::shared(Waypoint::new("GIPOL", 47.0, 8.0));
        point.set_constraints(FmsPointConstraints {
            upper_altitude: Constraint::new(ConstraintType::Less, 9000.0),
            lower_altitude: Constraint::new(ConstraintType::More, 7000.0),
            speed: Constraint::new(ConstraintType::Less, 250.0),
        });
        let c = point.constraints();
        assert!(c.satisfied_by(8000.0, 230.0));
        assert!(!c.satisfied_by(9500.0, 230.0));
        assert!(!c.satisfied_by(8000.0, 260.0));
    }
}

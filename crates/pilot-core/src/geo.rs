//! Great-circle geometry for route legs and position integration.
//!
//! Courses and bearings are true degrees in `[0, 360)`. Turn amounts are
//! signed degrees in `(-180, 180]`, positive for a right turn. Cross-track
//! error is positive when the point lies right of the course line and
//! along-track distance is the signed distance remaining to the reference
//! point.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::atmos::{MPS_PER_KNOT, STANDARD_GRAVITY};

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Minimum distance at which two points are treated as distinct.
const COINCIDENT_M: f64 = 0.5;

/// A latitude/longitude with an optional altitude in feet.
///
/// Equality compares latitude and longitude only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_ft: Option<f64>,
}

impl PartialEq for GeoPoint {
    fn eq(&self, other: &Self) -> bool {
        self.lat == other.lat && self.lon == other.lon
    }
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat: lat.clamp(-90.0, 90.0),
            lon: normalize_longitude(lon),
            alt_ft: None,
        }
    }

    pub fn with_alt(mut self, alt_ft: f64) -> Self {
        self.alt_ft = Some(alt_ft);
        self
    }

    pub fn distance_m(&self, other: &GeoPoint) -> f64 {
        haversine_distance(self.lat, self.lon, other.lat, other.lon)
    }

    /// Initial great-circle bearing towards `other`, in degrees.
    pub fn initial_bearing_to(&self, other: &GeoPoint) -> f64 {
        normalize_heading(bearing(self.lat, self.lon, other.lat, other.lon).to_degrees())
    }

    /// Bearing on arrival at `other` when flying the great circle from here.
    pub fn final_bearing_to(&self, other: &GeoPoint) -> f64 {
        normalize_heading(other.initial_bearing_to(self) + 180.0)
    }

    /// Point reached by flying `distance_m` on initial bearing `bearing_deg`.
    /// Negative distances move backwards along the same great circle.
    pub fn moved_by(&self, bearing_deg: f64, distance_m: f64) -> GeoPoint {
        let (lat, lon) = offset_by_bearing(self.lat, self.lon, distance_m, bearing_deg.to_radians());
        GeoPoint {
            lat,
            lon: normalize_longitude(lon),
            alt_ft: self.alt_ft,
        }
    }

    /// Unit vector from the earth's centre (n-vector).
    pub fn to_n_vector(&self) -> DVec3 {
        let (phi, lambda) = (self.lat.to_radians(), self.lon.to_radians());
        DVec3::new(phi.cos() * lambda.cos(), phi.cos() * lambda.sin(), phi.sin())
    }

    pub fn from_n_vector(v: DVec3) -> GeoPoint {
        let lat = v.z.atan2((v.x * v.x + v.y * v.y).sqrt()).to_degrees();
        let lon = v.y.atan2(v.x).to_degrees();
        GeoPoint::new(lat, lon)
    }
}

/// Great-circle distance between two points in meters.
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Initial bearing from point 1 to point 2, in radians.
pub fn bearing(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_lambda = (lon2 - lon1).to_radians();

    let x = delta_lambda.sin() * phi2.cos();
    let y = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();

    x.atan2(y)
}

/// Destination reached from (lat, lon) along `bearing_rad` for `distance_m`.
pub fn offset_by_bearing(lat: f64, lon: f64, distance_m: f64, bearing_rad: f64) -> (f64, f64) {
    if distance_m.abs() <= f64::EPSILON {
        return (lat, lon);
    }

    let lat1 = lat.to_radians();
    let lon1 = lon.to_radians();
    let angular_distance = distance_m / EARTH_RADIUS_M;

    let sin_lat1 = lat1.sin();
    let cos_lat1 = lat1.cos();
    let sin_ad = angular_distance.sin();
    let cos_ad = angular_distance.cos();

    let sin_lat2 = sin_lat1 * cos_ad + cos_lat1 * sin_ad * bearing_rad.cos();
    let lat2 = sin_lat2.clamp(-1.0, 1.0).asin();

    let y = bearing_rad.sin() * sin_ad * cos_lat1;
    let x = cos_ad - sin_lat1 * sin_lat2;
    let lon2 = lon1 + y.atan2(x);

    (lat2.to_degrees(), lon2.to_degrees())
}

/// Normalize a heading into `[0, 360)`.
pub fn normalize_heading(heading: f64) -> f64 {
    let h = heading.rem_euclid(360.0);
    if h >= 360.0 {
        0.0
    } else {
        h
    }
}

/// Normalize a longitude into `(-180, 180]`.
pub fn normalize_longitude(lon: f64) -> f64 {
    let l = (lon + 180.0).rem_euclid(360.0) - 180.0;
    if l <= -180.0 {
        l + 360.0
    } else {
        l
    }
}

/// Signed turn from `from` to `to` in `(-180, 180]`; positive turns right.
pub fn turn_amount(from: f64, to: f64) -> f64 {
    let delta = normalize_heading(to - from);
    if delta > 180.0 {
        delta - 360.0
    } else {
        delta
    }
}

/// Angle between two course lines, ignoring direction, in `[0, 90]`.
pub fn course_line_delta(course_a: f64, course_b: f64) -> f64 {
    let delta = turn_amount(course_a, course_b).abs();
    delta.min(180.0 - delta)
}

/// Normal of the great circle through `point` on `bearing_deg`.
fn great_circle_normal(point: &GeoPoint, bearing_deg: f64) -> DVec3 {
    let (phi, lambda) = (point.lat.to_radians(), point.lon.to_radians());
    let theta = bearing_deg.to_radians();
    let north = DVec3::new(-phi.sin() * lambda.cos(), -phi.sin() * lambda.sin(), phi.cos());
    let east = DVec3::new(-lambda.sin(), lambda.cos(), 0.0);
    let direction = north * theta.cos() + east * theta.sin();
    point.to_n_vector().cross(direction)
}

/// Intersection of the great circle through `p1` on `brg1` with the one
/// through `p2` on `brg2`.
///
/// Great circles meet twice; the intersection on the same side of the earth
/// as the two reference points is returned. `None` when the circles coincide.
pub fn find_intersection(p1: &GeoPoint, brg1: f64, p2: &GeoPoint, brg2: f64) -> Option<GeoPoint> {
    let line = great_circle_normal(p1, brg1).cross(great_circle_normal(p2, brg2));
    if line.length() < 1e-12 {
        return None;
    }
    let candidate = line.normalize();
    let reference = p1.to_n_vector() + p2.to_n_vector();
    let chosen = if reference.dot(candidate) >= 0.0 {
        candidate
    } else {
        -candidate
    };
    Some(GeoPoint::from_n_vector(chosen))
}

/// Course offset of a point relative to a course line or arc.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CourseOffset {
    /// Course of the path abeam the point.
    pub required_course: f64,
    pub cross_track_m: f64,
    pub along_track_m: f64,
}

/// Offset of `point` from the great circle passing through `waypoint` on
/// `course` (the course flown when arriving at the waypoint).
pub fn calculate_cross_track_error(point: &GeoPoint, waypoint: &GeoPoint, course: f64) -> CourseOffset {
    let course = normalize_heading(course);
    let d13 = waypoint.distance_m(point) / EARTH_RADIUS_M;
    if d13 * EARTH_RADIUS_M < 1e-6 {
        return CourseOffset {
            required_course: course,
            cross_track_m: 0.0,
            along_track_m: 0.0,
        };
    }

    let theta13 = waypoint.initial_bearing_to(point).to_radians();
    let relative = theta13 - course.to_radians();
    let xt = (d13.sin() * relative.sin()).clamp(-1.0, 1.0).asin();
    let at = (d13.cos() / xt.cos()).clamp(-1.0, 1.0).acos();
    // Distance past the waypoint along the course.
    let past_m = if relative.cos() >= 0.0 { at } else { -at } * EARTH_RADIUS_M;

    let required_course = if past_m.abs() < 1.0 {
        course
    } else {
        let abeam = waypoint.moved_by(course, past_m);
        if past_m > 0.0 {
            waypoint.final_bearing_to(&abeam)
        } else {
            abeam.initial_bearing_to(waypoint)
        }
    };

    CourseOffset {
        required_course,
        cross_track_m: xt * EARTH_RADIUS_M,
        along_track_m: -past_m,
    }
}

/// Offset of `point` from a constant-radius arc around `center` that runs
/// from `start_radial` to `end_radial`.
///
/// The along-track distance is the arc length left to the end radial and goes
/// negative once the point has swept past it.
pub fn calculate_arc_course_info(
    point: &GeoPoint,
    center: &GeoPoint,
    start_radial: f64,
    end_radial: f64,
    radius_m: f64,
    clockwise: bool,
) -> CourseOffset {
    let radial = center.initial_bearing_to(point);
    let dist = center.distance_m(point);

    let (required_course, cross_track_m) = if clockwise {
        (normalize_heading(radial + 90.0), radius_m - dist)
    } else {
        (normalize_heading(radial - 90.0), dist - radius_m)
    };

    let total = arc_sweep(start_radial, end_radial, clockwise);
    let mut remaining = arc_sweep(radial, end_radial, clockwise);
    if remaining > total {
        // Outside the arc's sector: either short of the start or past the end.
        let past_end = 360.0 - remaining;
        let before_start = remaining - total;
        if past_end < before_start {
            remaining = -past_end;
        }
    }

    CourseOffset {
        required_course,
        cross_track_m,
        along_track_m: remaining.to_radians() * radius_m,
    }
}

/// Angle swept from `from` to `to` in the direction of travel, in `[0, 360)`.
pub fn arc_sweep(from_radial: f64, to_radial: f64, clockwise: bool) -> f64 {
    if clockwise {
        normalize_heading(to_radial - from_radial)
    } else {
        normalize_heading(from_radial - to_radial)
    }
}

/// Radius of a coordinated turn in meters. Infinite for wings level.
pub fn calculate_radius_of_turn_m(bank_deg: f64, ground_speed_kts: f64) -> f64 {
    let tan_bank = bank_deg.abs().to_radians().tan();
    if tan_bank < 1e-9 {
        return f64::INFINITY;
    }
    let v = ground_speed_kts.max(0.0) * MPS_PER_KNOT;
    v * v / (STANDARD_GRAVITY * tan_bank)
}

/// Bank angle that flies a turn of `radius_m` at the given ground speed.
pub fn calculate_bank_for_radius(radius_m: f64, ground_speed_kts: f64) -> f64 {
    if !radius_m.is_finite() || radius_m <= 0.0 {
        return 0.0;
    }
    let v = ground_speed_kts.max(0.0) * MPS_PER_KNOT;
    (v * v / (STANDARD_GRAVITY * radius_m)).atan().to_degrees()
}

pub fn calculate_degrees_turned(distance_m: f64, radius_m: f64) -> f64 {
    if !radius_m.is_finite() || radius_m <= 0.0 {
        return 0.0;
    }
    (distance_m / radius_m).to_degrees()
}

pub fn calculate_end_heading(start_heading: f64, degrees_turned: f64, right: bool) -> f64 {
    if right {
        normalize_heading(start_heading + degrees_turned)
    } else {
        normalize_heading(start_heading - degrees_turned)
    }
}

/// Chord across a turn: (bearing, length in meters).
pub fn calculate_chord(start_heading: f64, degrees_turned: f64, radius_m: f64, right: bool) -> (f64, f64) {
    let half = degrees_turned / 2.0;
    let chord_bearing = calculate_end_heading(start_heading, half, right);
    let chord_length = 2.0 * radius_m * half.to_radians().sin();
    (chord_bearing, chord_length)
}

pub fn calculate_distance_travelled_m(ground_speed_kts: f64, interval_ms: u64) -> f64 {
    ground_speed_kts * MPS_PER_KNOT * interval_ms as f64 / 1000.0
}

/// Whether two points are within half a meter of each other.
pub fn is_coincident(a: &GeoPoint, b: &GeoPoint) -> bool {
    a.distance_m(b) < COINCIDENT_M
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_known_distance() {
        // ~111km between these points (1 degree latitude)
        let dist = haversine_distance(0.0, 0.0, 1.0, 0.0);
        assert!((dist - 111_194.0).abs() < 100.0);
    }

    #[test]
    fn test_haversine_same_point() {
        let dist = haversine_distance(33.6846, -117.8265, 33.6846, -117.8265);
        assert!(dist < 0.001);
    }

    #[test]
    fn turn_amount_is_zero_for_same_course_and_antisymmetric() {
        for a in (0..360).step_by(7) {
            let a = a as f64 + 0.25;
            assert_eq!(turn_amount(a, a), 0.0);
            for b in (0..360).step_by(11) {
                let b = b as f64;
                let t = turn_amount(a, b);
                assert!(t > -180.0 && t <= 180.0);
                if (t.abs() - 180.0).abs() > 1e-9 {
                    assert!((t + turn_amount(b, a)).abs() < 1e-9, "a={a} b={b}");
                }
            }
        }
        assert_eq!(turn_amount(350.0, 10.0), 20.0);
        assert_eq!(turn_amount(10.0, 350.0), -20.0);
        assert_eq!(turn_amount(90.0, 270.0), 180.0);
    }

    #[test]
    fn test_normalize_longitude_range() {
        assert_eq!(normalize_longitude(180.0), 180.0);
        assert_eq!(normalize_longitude(-180.0), 180.0);
        assert!((normalize_longitude(190.0) + 170.0).abs() < 1e-9);
        assert_eq!(normalize_heading(-90.0), 270.0);
        assert_eq!(normalize_heading(360.0), 0.0);
    }

    #[test]
    fn test_point_on_course_line_has_no_cross_track() {
        let waypoint = GeoPoint::new(47.0, 8.0);
        let point = waypoint.moved_by(270.0, 10_000.0);
        let course = point.final_bearing_to(&waypoint);

        let offset = calculate_cross_track_error(&point, &waypoint, course);
        assert!(offset.cross_track_m.abs() < 0.01, "xtk {}", offset.cross_track_m);
        assert!((offset.along_track_m - point.distance_m(&waypoint)).abs() < 0.01);
        assert!(turn_amount(offset.required_course, point.initial_bearing_to(&waypoint)).abs() < 1e-4);
    }

    #[test]
    fn test_cross_track_sign_and_past_waypoint() {
        let waypoint = GeoPoint::new(0.0, 0.0);
        // Eastbound course; a point north of the line is left of course.
        let left = GeoPoint::new(0.01, -0.05);
        let offset = calculate_cross_track_error(&left, &waypoint, 90.0);
        assert!(offset.cross_track_m < -1000.0);
        assert!(offset.along_track_m > 5000.0);

        let right_past = GeoPoint::new(-0.01, 0.05);
        let offset = calculate_cross_track_error(&right_past, &waypoint, 90.0);
        assert!(offset.cross_track_m > 1000.0);
        assert!(offset.along_track_m < -5000.0);
    }

    #[test]
    fn test_intersection_of_perpendicular_courses() {
        let west = GeoPoint::new(0.0, -0.1);
        let south = GeoPoint::new(-0.1, 0.0);
        let x = find_intersection(&west, 90.0, &south, 0.0).expect("lines cross");
        assert!(x.distance_m(&GeoPoint::new(0.0, 0.0)) < 1.0);

        // Rays pointing away from each other still intersect as lines.
        let x = find_intersection(&west, 270.0, &south, 180.0).expect("lines cross");
        assert!(x.distance_m(&GeoPoint::new(0.0, 0.0)) < 1.0);
    }

    #[test]
    fn test_arc_course_info_on_circle() {
        let center = GeoPoint::new(0.0, 0.0);
        let radius = 5000.0;
        // Clockwise quarter circle from radial 270 to radial 0.
        let start = center.moved_by(270.0, radius);
        let info = calculate_arc_course_info(&start, &center, 270.0, 0.0, radius, true);
        assert!(info.cross_track_m.abs() < 0.5);
        assert!((info.required_course - 0.0).abs() < 1e-6 || (info.required_course - 360.0).abs() < 1e-6);
        let quarter = std::f64::consts::FRAC_PI_2 * radius;
        assert!((info.along_track_m - quarter).abs() < 1.0);

        let mid = center.moved_by(315.0, radius - 100.0);
        let info = calculate_arc_course_info(&mid, &center, 270.0, 0.0, radius, true);
        // Inside a right-hand turn is right of track.
        assert!((info.cross_track_m - 100.0).abs() < 0.5);
        assert!((info.along_track_m - quarter / 2.0).abs() < 1.0);

        let past = center.moved_by(10.0, radius);
        let info = calculate_arc_course_info(&past, &center, 270.0, 0.0, radius, true);
        assert!(info.along_track_m < 0.0);
    }

    #[test]
    fn test_turn_radius_and_chord() {
        // 250kts at 25 degrees of bank is roughly 3.6km.
        let r = calculate_radius_of_turn_m(25.0, 250.0);
        assert!((r - 3_617.0).abs() < 5.0, "radius {r}");
        assert!(calculate_radius_of_turn_m(0.0, 250.0).is_infinite());
        assert!((calculate_bank_for_radius(r, 250.0) - 25.0).abs() < 1e-9);

        let (brg, len) = calculate_chord(90.0, 90.0, 1000.0, true);
        assert!((brg - 135.0).abs() < 1e-9);
        assert!((len - 1000.0 * 2f64.sqrt()).abs() < 1e-6);
    }
}

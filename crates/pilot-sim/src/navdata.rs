//! In-memory waypoint and published-hold store.

use dashmap::DashMap;
use tracing::debug;

use pilot_core::geo::haversine_distance;
use pilot_core::{NavDataSource, PublishedHold, Waypoint};

/// Waypoints keyed by identifier. Several fixes may share an identifier;
/// lookups pick the one nearest the reference position.
#[derive(Debug, Default)]
pub struct InMemoryNavData {
    waypoints: DashMap<String, Vec<Waypoint>>,
    holds: DashMap<String, PublishedHold>,
}

impl InMemoryNavData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn waypoint_count(&self) -> usize {
        self.waypoints.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn hold_count(&self) -> usize {
        self.holds.len()
    }
}

impl NavDataSource for InMemoryNavData {
    fn closest_waypoint_by_identifier(&self, identifier: &str, ref_lat: f64, ref_lon: f64) -> Option<Waypoint> {
        let entry = self.waypoints.get(&identifier.to_uppercase())?;
        entry
            .value()
            .iter()
            .map(|wp| {
                let d = haversine_distance(ref_lat, ref_lon, wp.position.lat, wp.position.lon);
                (d, wp)
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, wp)| wp.clone())
    }

    fn published_hold(&self, waypoint_id: &str) -> Option<PublishedHold> {
        self.holds.get(&waypoint_id.to_uppercase()).map(|h| h.value().clone())
    }

    fn add_waypoint(&self, waypoint: Waypoint) {
        debug!(waypoint = %waypoint.identifier, "Waypoint added");
        self.waypoints
            .entry(waypoint.identifier.to_uppercase())
            .or_default()
            .push(waypoint);
    }

    fn add_published_hold(&self, hold: PublishedHold) {
        debug!(waypoint = %hold.waypoint, "Published hold added");
        self.holds.insert(hold.waypoint.to_uppercase(), hold);
    }
}

//! Concurrent map of the aircraft in a session.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::info;

use crate::aircraft::SimAircraft;
use crate::error::SimError;

#[derive(Debug, Default)]
pub struct AircraftRegistry {
    aircraft: DashMap<String, Arc<SimAircraft>>,
}

impl AircraftRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, aircraft: Arc<SimAircraft>) -> Result<(), SimError> {
        match self.aircraft.entry(aircraft.callsign().to_string()) {
            Entry::Occupied(_) => Err(SimError::DuplicateCallsign(aircraft.callsign().to_string())),
            Entry::Vacant(slot) => {
                info!(callsign = %aircraft.callsign(), "Aircraft registered");
                slot.insert(aircraft);
                Ok(())
            }
        }
    }

    pub fn get(&self, callsign: &str) -> Option<Arc<SimAircraft>> {
        self.aircraft.get(callsign).map(|r| r.value().clone())
    }

    /// Remove and stop an aircraft. False if it was not registered.
    pub fn remove(&self, callsign: &str) -> bool {
        match self.aircraft.remove(callsign) {
            Some((_, aircraft)) => {
                aircraft.stop();
                true
            }
            None => false,
        }
    }

    /// Callsigns in alphabetical order.
    pub fn list(&self) -> Vec<String> {
        let mut callsigns: Vec<String> = self.aircraft.iter().map(|r| r.key().clone()).collect();
        callsigns.sort();
        callsigns
    }

    pub fn len(&self) -> usize {
        self.aircraft.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aircraft.is_empty()
    }

    fn snapshot(&self) -> Vec<Arc<SimAircraft>> {
        self.aircraft.iter().map(|r| r.value().clone()).collect()
    }

    pub fn pause_all(&self) {
        for aircraft in self.snapshot() {
            aircraft.pause();
        }
    }

    pub fn resume_all(&self) {
        for aircraft in self.snapshot() {
            aircraft.resume();
        }
    }

    /// Start every aircraft's position worker.
    pub fn start_all(&self) -> Result<(), SimError> {
        for aircraft in self.snapshot() {
            aircraft.start()?;
        }
        Ok(())
    }

    pub fn stop_all(&self) {
        for callsign in self.list() {
            self.remove(&callsign);
        }
    }

    /// Offer a frequency message to every aircraft. Returns how many
    /// took it as addressed to them.
    pub fn dispatch_frequency_message(&self, frequency: u32, message: &str) -> usize {
        self.snapshot()
            .iter()
            .filter(|aircraft| aircraft.on_frequency_message(frequency, message))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aircraft::{SimContext, SpawnParams};
    use crate::config::SimConfig;
    use crate::connection::ConnectionStatus;
    use crate::navdata::InMemoryNavData;
    use pilot_core::GeoPoint;

    fn aircraft(callsign: &str) -> Arc<SimAircraft> {
        SimAircraft::new(
            callsign,
            SpawnParams::new("E175", GeoPoint::new(47.0, 8.0), 5000.0, 90.0),
            SimConfig::default(),
            SimContext::offline(Arc::new(InMemoryNavData::new())),
        )
        .unwrap()
    }

    #[test]
    fn test_add_get_remove() {
        let registry = AircraftRegistry::new();
        registry.add(aircraft("B2")).unwrap();
        registry.add(aircraft("A1")).unwrap();
        assert!(matches!(
            registry.add(aircraft("A1")),
            Err(SimError::DuplicateCallsign(cs)) if cs == "A1"
        ));
        assert_eq!(registry.list(), vec!["A1".to_string(), "B2".to_string()]);

        let a1 = registry.get("A1").unwrap();
        assert!(registry.remove("A1"));
        assert_eq!(a1.status(), ConnectionStatus::Disconnected);
        assert!(!registry.remove("A1"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_pause_and_resume_all() {
        let registry = AircraftRegistry::new();
        registry.add(aircraft("A1")).unwrap();
        registry.add(aircraft("B2")).unwrap();
        registry.resume_all();
        assert!(registry.snapshot().iter().all(|a| !a.is_paused()));
        registry.pause_all();
        assert!(registry.snapshot().iter().all(|a| a.is_paused()));
    }

    #[test]
    fn test_frequency_message_reaches_addressee_only() {
        let registry = AircraftRegistry::new();
        registry.add(aircraft("A1")).unwrap();
        registry.add(aircraft("B2")).unwrap();
        let taken = registry.dispatch_frequency_message(199_998, "B2, fh 180");
        assert_eq!(taken, 1);
        assert_eq!(
            registry.get("B2").unwrap().autopilot().lateral(),
            pilot_core::LateralMode::HeadingHold {
                heading_mag: 180.0,
                turn: None
            }
        );
        assert_eq!(registry.dispatch_frequency_message(122_800, "B2, fh 090"), 0);
    }
}

//! Loading scenarios into a session.

use std::path::PathBuf;
use std::sync::Arc;

use pilot_cli::{Scenario, ScenarioError};
use pilot_core::RouteLegType;
use pilot_sim::{AircraftRegistry, ConnectionStatus, InMemoryNavData, SimConfig, SimContext, SimError};

fn demo_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../demos/klo_arrivals.json")
}

fn session(scenario: &Scenario) -> (Arc<InMemoryNavData>, SimContext, AircraftRegistry) {
    let nav = Arc::new(InMemoryNavData::new());
    scenario.register_nav_data(nav.as_ref());
    let context = SimContext::offline(nav.clone());
    (nav, context, AircraftRegistry::new())
}

#[test]
fn test_demo_scenario_loads() {
    let scenario = Scenario::load(demo_path()).unwrap();
    assert_eq!(scenario.name.as_deref(), Some("KLO arrivals"));

    let (nav, context, registry) = session(&scenario);
    assert_eq!(nav.waypoint_count(), 4);
    assert_eq!(nav.hold_count(), 3);

    let spawned = scenario.spawn(&SimConfig::default(), &context, &registry).unwrap();
    assert_eq!(spawned.len(), 3);
    assert_eq!(registry.list(), vec!["DLH7YA", "EZY45K", "SWR123"]);

    let swr = registry.get("SWR123").unwrap();
    assert_eq!(swr.fms().active_leg_type(), Some(RouteLegType::DirectToFix));
    assert_eq!(
        swr.fms().route_legs(),
        vec!["GIPOL =(TF)=> KLO(FO)", "KLO(FO) =(HM)=> 136/L"]
    );
    assert!(swr.autopilot().lnav_armed());

    let ezy = registry.get("EZY45K").unwrap();
    assert_eq!(ezy.altimeter_setting_hpa(), 1008.0);
    assert!((ezy.position_report().indicated_airspeed_kts - 230.0).abs() < 0.5);

    let dlh = registry.get("DLH7YA").unwrap();
    assert!(!dlh.fms().has_route());
}

#[test]
fn test_spawn_delay_holds_back_connection() {
    let scenario = Scenario::load(demo_path()).unwrap();
    let (_, context, registry) = session(&scenario);
    scenario.spawn(&SimConfig::default(), &context, &registry).unwrap();

    registry.resume_all();
    for callsign in registry.list() {
        registry.get(&callsign).unwrap().advance(100);
    }
    assert_eq!(registry.get("SWR123").unwrap().status(), ConnectionStatus::Connected);
    assert_eq!(registry.get("EZY45K").unwrap().status(), ConnectionStatus::Waiting);
    assert_eq!(registry.get("DLH7YA").unwrap().status(), ConnectionStatus::Waiting);
}

#[test]
fn test_rejected_route_names_the_problem() {
    let scenario = Scenario::from_json(
        r#"{
            "waypoints": [{ "identifier": "AAA", "position": { "lat": 0.0, "lon": 0.1 } }],
            "aircraft": [{ "callsign": "X1", "aircraft_type": "E175", "lat": 0, "lon": 0,
                           "heading_mag": 90, "altitude_ft": 5000, "route": "AAA NOPE" }]
        }"#,
    )
    .unwrap();
    let (_, context, registry) = session(&scenario);

    let err = scenario.spawn(&SimConfig::default(), &context, &registry).unwrap_err();
    match err {
        ScenarioError::Route { callsign, message } => {
            assert_eq!(callsign, "X1");
            assert_eq!(message, "ERROR - Waypoint NOPE not found!");
        }
        other => panic!("unexpected error {other}"),
    }
    assert!(registry.is_empty());
}

#[test]
fn test_duplicate_callsign_is_rejected() {
    let scenario = Scenario::from_json(
        r#"{ "aircraft": [
            { "callsign": "X1", "aircraft_type": "E175", "lat": 0, "lon": 0, "heading_mag": 90, "altitude_ft": 5000 },
            { "callsign": "X1", "aircraft_type": "E175", "lat": 1, "lon": 1, "heading_mag": 90, "altitude_ft": 6000 }
        ] }"#,
    )
    .unwrap();
    let (_, context, registry) = session(&scenario);

    let err = scenario.spawn(&SimConfig::default(), &context, &registry).unwrap_err();
    assert!(matches!(
        err,
        ScenarioError::Spawn { source: SimError::DuplicateCallsign(_), .. }
    ));
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_missing_file() {
    let err = Scenario::load("/nonexistent/scenario.json").unwrap_err();
    assert!(matches!(err, ScenarioError::Io { .. }));
}

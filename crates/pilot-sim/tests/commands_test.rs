//! Instruction handling through `SimAircraft::handle_commands` and the
//! command frequency.

use std::sync::{Arc, Mutex};

use pilot_core::atmos::ISA_STD_PRES_HPA;
use pilot_core::{
    GeoPoint, HoldLegLengthType, LateralMode, NavDataSource, PublishedHold, RouteLegType, TurnDirection, Waypoint,
};
use pilot_sim::{
    ConnectionError, InMemoryNavData, PilotConnection, PositionReport, SimAircraft, SimConfig, SimContext,
    SpawnParams,
};

#[derive(Default)]
struct RecordingConnection {
    messages: Mutex<Vec<(u32, String)>>,
}

impl PilotConnection for RecordingConnection {
    fn connect(&self, _callsign: &str, _report: &PositionReport) -> Result<(), ConnectionError> {
        Ok(())
    }

    fn disconnect(&self, _callsign: &str) {}

    fn send_position_report(&self, _callsign: &str, _report: &PositionReport) {}

    fn send_frequency_message(&self, _callsign: &str, frequency: u32, message: &str) {
        self.messages.lock().unwrap().push((frequency, message.to_string()));
    }
}

struct Harness {
    aircraft: Arc<SimAircraft>,
    nav: Arc<InMemoryNavData>,
    lines: Arc<Mutex<Vec<String>>>,
}

impl Harness {
    fn new() -> Self {
        Self::with_connection(Arc::new(RecordingConnection::default()))
    }

    fn with_connection(connection: Arc<RecordingConnection>) -> Self {
        let nav = Arc::new(InMemoryNavData::new());
        nav.add_waypoint(Waypoint::new("AAA", 0.0, 0.1));
        nav.add_waypoint(Waypoint::new("BBB", 0.0, 0.2));
        nav.add_waypoint(Waypoint::new("CCC", 0.2, 0.2));
        nav.add_waypoint(Waypoint::new("KLO", 1.0, 1.0));
        nav.add_published_hold(PublishedHold {
            waypoint: "CCC".into(),
            inbound_course_mag: 180.0,
            turn_direction: TurnDirection::Right,
            leg_length_type: HoldLegLengthType::Default,
            leg_length: -1.0,
        });

        let aircraft = SimAircraft::new(
            "TST1",
            SpawnParams::new("E175", GeoPoint::new(0.0, 0.0), 5000.0, 90.0),
            SimConfig::default(),
            SimContext::offline(nav.clone()).with_connection(connection),
        )
        .unwrap();
        Self {
            aircraft,
            nav,
            lines: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn run(&self, text: &str) -> bool {
        let sink = self.lines.clone();
        self.aircraft
            .handle_commands(text, &move |msg: &str| sink.lock().unwrap().push(msg.to_string()))
    }

    fn take_lines(&self) -> Vec<String> {
        std::mem::take(&mut *self.lines.lock().unwrap())
    }
}

#[test]
fn test_flight_level_selects_standard_pressure() {
    let h = Harness::new();
    assert!(h.run("alt A4000 QNH 1003"));
    assert_eq!(
        h.take_lines(),
        vec!["TST1 maintaining A4000.", "TST1 pressure set to 1003hPa."]
    );
    assert!((h.aircraft.altimeter_setting_hpa() - 1003.0).abs() < 1e-9);

    assert!(h.run("alt FL120"));
    assert_eq!(h.take_lines(), vec!["TST1 maintaining FL120."]);
    assert_eq!(h.aircraft.altimeter_setting_hpa(), ISA_STD_PRES_HPA);
    assert_eq!(h.aircraft.autopilot().assigned_altitude_ft(), 12_000.0);
}

#[test]
fn test_inches_setting_is_converted() {
    let h = Harness::new();
    assert!(h.run("alt 5000 ALT 2992"));
    assert_eq!(
        h.take_lines(),
        vec!["TST1 maintaining 5000.", "TST1 pressure set to 29.92inHg."]
    );
    assert!((h.aircraft.altimeter_setting_hpa() - 1013.2).abs() < 0.1);
}

#[test]
fn test_bad_altitude_is_reported() {
    let h = Harness::new();
    assert!(!h.run("alt FLabc"));
    assert_eq!(h.take_lines(), vec!["ERROR: Altitude FLabc not valid!"]);
    assert_eq!(h.aircraft.autopilot().assigned_altitude_ft(), 5000.0);
}

#[test]
fn test_first_failure_stops_the_rest() {
    let h = Harness::new();
    assert!(!h.run("fh 180 alt XYZ spd 200"));
    assert_eq!(
        h.take_lines(),
        vec!["TST1 flying heading 180 degrees.", "ERROR: Altitude XYZ not valid!"]
    );
    let autopilot = h.aircraft.autopilot();
    assert_eq!(
        autopilot.lateral(),
        LateralMode::HeadingHold {
            heading_mag: 180.0,
            turn: None
        }
    );
    assert_eq!(autopilot.assigned_ias_kts(), 250.0);
}

#[test]
fn test_heading_and_speed() {
    let h = Harness::new();
    assert!(h.run("tl 045 spd 210"));
    assert_eq!(
        h.take_lines(),
        vec!["TST1 flying heading 045 degrees.", "TST1 maintaining 210 knots."]
    );
    let autopilot = h.aircraft.autopilot();
    assert_eq!(
        autopilot.lateral(),
        LateralMode::HeadingHold {
            heading_mag: 45.0,
            turn: Some(TurnDirection::Left)
        }
    );
    assert_eq!(autopilot.assigned_ias_kts(), 210.0);
}

#[test]
fn test_hold_errors() {
    let h = Harness::new();
    assert!(!h.run("hold XXX"));
    assert!(!h.run("hold KLO 090/R"));
    assert!(!h.run("hold KLO"));
    assert_eq!(
        h.take_lines(),
        vec![
            "ERROR - Waypoint XXX not found!",
            "ERROR - KLO not found in flight plan!",
            "ERROR - No published hold found for waypoint KLO!",
        ]
    );
}

#[test]
fn test_route_then_explicit_hold() {
    let h = Harness::new();
    assert!(h.run("route AAA BBB CCC"));
    assert_eq!(h.take_lines(), vec!["TST1 cleared via AAA BBB CCC."]);
    assert_eq!(h.aircraft.fms().active_leg_type(), Some(RouteLegType::DirectToFix));
    assert!(h.aircraft.autopilot().lnav_armed());

    assert!(h.run("hold BBB 270/L/5NM"));
    assert_eq!(
        h.take_lines(),
        vec!["TST1 will hold at BBB, inbound course 270, Left turns, 5nm."]
    );
    assert_eq!(h.aircraft.fms().route_legs()[1], "BBB(FO) =(HM)=> 270/L/5NM");

    // The given hold becomes the published one for later clearances.
    let published = h.nav.published_hold("BBB").unwrap();
    assert_eq!(published.inbound_course_mag, 270.0);
    assert_eq!(published.turn_direction, TurnDirection::Left);
}

#[test]
fn test_published_hold_in_route() {
    let h = Harness::new();
    assert!(!h.run("route HOLD"));
    assert_eq!(h.take_lines(), vec!["ERROR - HOLD must follow a waypoint!"]);

    assert!(h.run("route AAA CCC HOLD"));
    assert_eq!(h.take_lines(), vec!["TST1 cleared via AAA CCC HOLD."]);
    let legs = h.aircraft.fms().route_legs();
    assert_eq!(legs.last().map(String::as_str), Some("CCC(FO) =(HM)=> 180/R"));

    assert!(h.run("hold CCC"));
    assert_eq!(h.take_lines(), vec!["TST1 will hold at CCC as published."]);
}

#[test]
fn test_route_with_unknown_waypoint_changes_nothing() {
    let h = Harness::new();
    assert!(!h.run("route AAA NOPE BBB"));
    assert_eq!(h.take_lines(), vec!["ERROR - Waypoint NOPE not found!"]);
    assert!(!h.aircraft.fms().has_route());
    assert!(!h.aircraft.autopilot().lnav_armed());
}

#[test]
fn test_direct_to_arms_lnav() {
    let h = Harness::new();
    assert!(h.run("route AAA BBB CCC"));
    assert!(h.run("fh 090"));
    assert_eq!(h.aircraft.autopilot().lateral(), LateralMode::HeadingHold { heading_mag: 90.0, turn: None });
    assert!(!h.aircraft.autopilot().lnav_armed());

    h.take_lines();
    assert!(h.run("dct BBB"));
    assert_eq!(h.take_lines(), vec!["TST1 proceeding direct BBB."]);
    assert!(h.aircraft.autopilot().lnav_armed());
    assert_eq!(h.aircraft.fms().route_legs(), vec!["BBB =(TF)=> CCC".to_string()]);

    h.aircraft.resume();
    h.aircraft.advance(100);
    assert_eq!(h.aircraft.autopilot().lateral(), LateralMode::Lnav);
}

#[test]
fn test_frequency_message_replies_without_callsign() {
    let connection = Arc::new(RecordingConnection::default());
    let h = Harness::with_connection(connection.clone());
    let freq = h.aircraft.config().command_frequency;

    assert!(!h.aircraft.on_frequency_message(freq, "OTHER, fh 090"));
    assert!(!h.aircraft.on_frequency_message(122_800, "TST1, fh 090"));
    assert!(h.aircraft.on_frequency_message(freq, "TST1, fh 270 hold XXX"));

    assert_eq!(
        *connection.messages.lock().unwrap(),
        vec![
            (freq, "flying heading 270 degrees.".to_string()),
            (freq, "ERROR - Waypoint XXX not found!".to_string()),
        ]
    );
}

//! One simulated pilot client.
//!
//! Each aircraft owns a position worker thread that advances the flight
//! model at the configured tick interval. The worker is the only writer of
//! the aircraft's position. Commands change the autopilot targets and the
//! FMS route from other threads; each of those is behind its own lock and
//! only held for the duration of the change.
//!
//! Lock order is flight, then control, then the FMS route.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::thread::{self, JoinHandle};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use pilot_core::atmos::ISA_STD_PRES_HPA;
use pilot_core::{
    turn_amount, AircraftFms, AircraftPosition, AircraftState, Autopilot, BuiltinPerfData, CourseInterceptInfo,
    FixedVariation, FlightLimits, FmsEvent, GeoPoint, MagneticVariation, NavDataSource, PerfDataSource,
    PerformanceEngine, WeatherSource, MIN_XTK_M,
};

use crate::commands::{self, StatusLogger};
use crate::config::SimConfig;
use crate::connection::{ConnectionStatus, NullConnection, PilotConnection, PositionReport};
use crate::error::SimError;
use crate::timer::PauseableTimer;
use crate::weather::CalmAtmosphere;

/// Track error under which an aircraft on the course line counts as
/// established for LNAV engagement (degrees).
const ESTABLISHED_TRACK_DEG: f64 = 1.0;

/// External services an aircraft reads from and reports to.
#[derive(Clone)]
pub struct SimContext {
    pub nav: Arc<dyn NavDataSource>,
    pub weather: Arc<dyn WeatherSource>,
    pub magnetic: Arc<dyn MagneticVariation>,
    pub perf: Arc<dyn PerfDataSource>,
    pub connection: Arc<dyn PilotConnection>,
}

impl SimContext {
    /// Calm standard atmosphere, no magnetic variation, built-in performance
    /// data and no network.
    pub fn offline(nav: Arc<dyn NavDataSource>) -> Self {
        Self {
            nav,
            weather: Arc::new(CalmAtmosphere),
            magnetic: Arc::new(FixedVariation(0.0)),
            perf: Arc::new(BuiltinPerfData),
            connection: Arc::new(NullConnection),
        }
    }

    pub fn with_connection(mut self, connection: Arc<dyn PilotConnection>) -> Self {
        self.connection = connection;
        self
    }

    pub fn with_weather(mut self, weather: Arc<dyn WeatherSource>) -> Self {
        self.weather = weather;
        self
    }

    pub fn with_magnetic(mut self, magnetic: Arc<dyn MagneticVariation>) -> Self {
        self.magnetic = magnetic;
        self
    }
}

/// Initial state of a new aircraft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnParams {
    pub aircraft_type: String,
    pub position: GeoPoint,
    pub indicated_altitude_ft: f64,
    pub heading_mag: f64,
    /// Defaults to the configured speed.
    #[serde(default)]
    pub ias_kts: Option<f64>,
    /// Defaults to standard pressure.
    #[serde(default)]
    pub altimeter_hpa: Option<f64>,
    /// Time before the aircraft connects, counted while unpaused.
    #[serde(default)]
    pub delay_ms: u64,
}

impl SpawnParams {
    pub fn new(aircraft_type: impl Into<String>, position: GeoPoint, indicated_altitude_ft: f64, heading_mag: f64) -> Self {
        Self {
            aircraft_type: aircraft_type.into(),
            position,
            indicated_altitude_ft,
            heading_mag,
            ias_kts: None,
            altimeter_hpa: None,
            delay_ms: 0,
        }
    }
}

struct FlightState {
    position: AircraftPosition,
    engine: PerformanceEngine,
}

pub(crate) struct ControlState {
    pub(crate) autopilot: Autopilot,
    /// Setting the worker applies to the altimeter on its next tick.
    pub(crate) altimeter_setting_hpa: f64,
}

pub struct SimAircraft {
    callsign: String,
    aircraft_type: String,
    config: SimConfig,
    limits: FlightLimits,
    context: SimContext,
    fms: AircraftFms,
    flight: Mutex<FlightState>,
    control: Mutex<ControlState>,
    status: Mutex<ConnectionStatus>,
    delay: Mutex<PauseableTimer>,
    paused: AtomicBool,
    running: AtomicBool,
    worker: Mutex<Option<JoinHandle<()>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Already on the course line and tracking along it.
fn established_on(guidance: Option<&CourseInterceptInfo>, state: &AircraftState) -> bool {
    guidance.is_some_and(|g| {
        g.cross_track_m.abs() < MIN_XTK_M
            && turn_amount(state.track_true, g.required_true_course).abs() < ESTABLISHED_TRACK_DEG
    })
}

impl SimAircraft {
    /// Create a paused aircraft trimmed for level flight.
    pub fn new(
        callsign: impl Into<String>,
        params: SpawnParams,
        config: SimConfig,
        context: SimContext,
    ) -> Result<Arc<Self>, SimError> {
        let callsign = callsign.into();
        let perf = context
            .perf
            .lookup(&params.aircraft_type)
            .ok_or_else(|| SimError::UnknownAircraftType(params.aircraft_type.clone()))?;
        let ias_kts = params.ias_kts.unwrap_or(config.default_ias_kts);
        let altimeter_hpa = params.altimeter_hpa.unwrap_or(ISA_STD_PRES_HPA);

        let mut position = AircraftPosition::new(
            params.position,
            params.indicated_altitude_ft,
            params.heading_mag,
            ias_kts,
            context.magnetic.clone(),
        );
        position.set_weather_point(context.weather.closest_point(&params.position, Utc::now()));
        position.set_altimeter_setting(altimeter_hpa);
        position.set_indicated_altitude(params.indicated_altitude_ft);
        position.set_ias(ias_kts);

        let mut engine = PerformanceEngine::new(perf);
        engine.trim_for_level_flight(&mut position);

        info!(
            callsign = %callsign,
            aircraft_type = %params.aircraft_type,
            lat = params.position.lat,
            lon = params.position.lon,
            altitude_ft = params.indicated_altitude_ft,
            "Aircraft created"
        );

        Ok(Arc::new(Self {
            limits: config.limits(),
            aircraft_type: params.aircraft_type,
            fms: AircraftFms::new(),
            flight: Mutex::new(FlightState { position, engine }),
            control: Mutex::new(ControlState {
                autopilot: Autopilot::new(params.heading_mag, params.indicated_altitude_ft, ias_kts),
                altimeter_setting_hpa: altimeter_hpa,
            }),
            status: Mutex::new(ConnectionStatus::Waiting),
            delay: Mutex::new(PauseableTimer::new(params.delay_ms)),
            paused: AtomicBool::new(true),
            running: AtomicBool::new(false),
            worker: Mutex::new(None),
            callsign,
            config,
            context,
        }))
    }

    pub fn callsign(&self) -> &str {
        &self.callsign
    }

    pub fn aircraft_type(&self) -> &str {
        &self.aircraft_type
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn context(&self) -> &SimContext {
        &self.context
    }

    pub fn fms(&self) -> &AircraftFms {
        &self.fms
    }

    pub fn status(&self) -> ConnectionStatus {
        *lock(&self.status)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn position_report(&self) -> PositionReport {
        PositionReport::from(&lock(&self.flight).position)
    }

    pub fn state(&self) -> AircraftState {
        lock(&self.flight).position.state()
    }

    pub fn surface_pressure_hpa(&self) -> f64 {
        lock(&self.flight).position.surface_pressure_hpa()
    }

    pub fn thrust_lever(&self) -> f64 {
        lock(&self.flight).engine.thrust_lever()
    }

    /// Snapshot of the autopilot targets and mode.
    pub fn autopilot(&self) -> Autopilot {
        self.control().autopilot.clone()
    }

    pub fn altimeter_setting_hpa(&self) -> f64 {
        self.control().altimeter_setting_hpa
    }

    pub(crate) fn control(&self) -> MutexGuard<'_, ControlState> {
        lock(&self.control)
    }

    pub fn pause(&self) {
        if !self.paused.swap(true, Ordering::SeqCst) {
            lock(&self.delay).pause();
            info!(callsign = %self.callsign, "Aircraft paused");
        }
    }

    pub fn resume(&self) {
        if self.paused.swap(false, Ordering::SeqCst) {
            if self.status() == ConnectionStatus::Waiting {
                lock(&self.delay).start();
            }
            info!(callsign = %self.callsign, "Aircraft resumed");
        }
    }

    /// Start the position worker. An aircraft without a spawn delay
    /// connects straight away.
    pub fn start(self: &Arc<Self>) -> Result<(), SimError> {
        let mut worker = lock(&self.worker);
        if worker.is_some() {
            return Ok(());
        }

        if self.status() == ConnectionStatus::Waiting && lock(&self.delay).is_elapsed() {
            self.connect()?;
        }

        self.running.store(true, Ordering::SeqCst);
        let weak: Weak<Self> = Arc::downgrade(self);
        let interval = self.config.tick_interval();
        let interval_ms = self.config.tick_interval_ms;
        let handle = thread::Builder::new()
            .name(format!("{} position worker", self.callsign))
            .spawn(move || loop {
                let Some(aircraft) = weak.upgrade() else {
                    break;
                };
                if !aircraft.is_running() {
                    break;
                }
                aircraft.advance(interval_ms);
                drop(aircraft);
                thread::sleep(interval);
            });
        match handle {
            Ok(handle) => {
                *worker = Some(handle);
                debug!(callsign = %self.callsign, "Position worker started");
                Ok(())
            }
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                Err(SimError::Spawn(e))
            }
        }
    }

    /// Stop the worker, wait for its current tick to finish and disconnect.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        lock(&self.delay).cancel();
        self.join_worker();

        let mut status = lock(&self.status);
        if *status == ConnectionStatus::Connected {
            self.context.connection.disconnect(&self.callsign);
        }
        if *status != ConnectionStatus::Disconnected {
            *status = ConnectionStatus::Disconnected;
            info!(callsign = %self.callsign, "Aircraft stopped");
        }
    }

    fn join_worker(&self) {
        let handle = lock(&self.worker).take();
        if let Some(handle) = handle {
            if handle.thread().id() == thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                warn!(callsign = %self.callsign, "Position worker panicked");
            }
        }
    }

    fn connect(&self) -> Result<(), SimError> {
        let report = self.position_report();
        match self.context.connection.connect(&self.callsign, &report) {
            Ok(()) => {
                *lock(&self.status) = ConnectionStatus::Connected;
                info!(callsign = %self.callsign, "Aircraft connected");
                Ok(())
            }
            Err(e) => {
                *lock(&self.status) = ConnectionStatus::Disconnected;
                warn!(callsign = %self.callsign, error = %e, "Connection failed");
                Err(e.into())
            }
        }
    }

    /// Run one tick of `interval_ms`.
    ///
    /// Paused aircraft do nothing. A waiting aircraft counts down its spawn
    /// delay and connects when it runs out.
    pub fn advance(&self, interval_ms: u64) {
        if self.is_paused() {
            return;
        }

        match self.status() {
            ConnectionStatus::Disconnected => return,
            ConnectionStatus::Connected => {}
            ConnectionStatus::Waiting => {
                let due = {
                    let mut delay = lock(&self.delay);
                    delay.is_elapsed() || delay.tick(interval_ms)
                };
                if !due || self.connect().is_err() {
                    return;
                }
            }
        }

        self.step(interval_ms);
    }

    fn step(&self, interval_ms: u64) {
        let limits = self.limits;
        let mut flight = lock(&self.flight);
        let FlightState { position, engine } = &mut *flight;

        let altimeter = self.control().altimeter_setting_hpa;
        if (position.altimeter_setting_hpa() - altimeter).abs() > f64::EPSILON {
            position.set_altimeter_setting(altimeter);
        }
        position.set_weather_point(self.context.weather.closest_point(&position.geo_point(), Utc::now()));

        engine.integrate(position, interval_ms);
        self.control().autopilot.update_vertical(engine, position, &limits, interval_ms);

        let state = position.state();
        let update = self.fms.on_position_update(&state, interval_ms);
        for event in &update.events {
            match event {
                FmsEvent::WaypointPassed(wp) => {
                    info!(callsign = %self.callsign, waypoint = %wp.identifier, "Waypoint passed");
                }
                FmsEvent::LegActivated(leg) => {
                    info!(callsign = %self.callsign, leg = %leg, "Leg activated");
                }
            }
        }

        {
            let mut control = self.control();
            if control.autopilot.lnav_armed()
                && (established_on(update.guidance.as_ref(), &state)
                    || self.fms.should_activate_lnav(&state, interval_ms))
            {
                control.autopilot.engage_lnav();
                info!(callsign = %self.callsign, "LNAV engaged");
            }
            control
                .autopilot
                .update_lateral(position, update.guidance.as_ref(), &limits, interval_ms);
        }

        let report = PositionReport::from(&*position);
        drop(flight);

        trace!(
            callsign = %self.callsign,
            alt = report.indicated_altitude_ft,
            hdg = report.heading_mag,
            ias = report.indicated_airspeed_kts,
            "Tick"
        );
        self.context.connection.send_position_report(&self.callsign, &report);
    }

    /// Handle a text message heard on `frequency`.
    ///
    /// Messages on the command frequency addressed `"<CALLSIGN>, ..."` are
    /// run as instructions, stopping at the first one that fails. Replies go
    /// back out on the same frequency. Returns false for messages not meant
    /// for this aircraft.
    pub fn on_frequency_message(&self, frequency: u32, message: &str) -> bool {
        if frequency != self.config.command_frequency {
            return false;
        }
        let Some(text) = message.strip_prefix(&format!("{}, ", self.callsign)) else {
            return false;
        };

        let own_prefix = format!("{} ", self.callsign);
        let reply = |msg: &str| {
            let out = msg.replace(&own_prefix, "");
            self.context
                .connection
                .send_frequency_message(&self.callsign, frequency, &out);
        };
        commands::handle_command_text(self, text, &reply);
        true
    }

    /// Run instruction text, reporting through `status`.
    pub fn handle_commands(&self, text: &str, status: &StatusLogger) -> bool {
        commands::handle_command_text(self, text, status)
    }
}

impl Drop for SimAircraft {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.join_worker();
    }
}

impl std::fmt::Debug for SimAircraft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimAircraft")
            .field("callsign", &self.callsign)
            .field("aircraft_type", &self.aircraft_type)
            .field("status", &self.status())
            .field("paused", &self.is_paused())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navdata::InMemoryNavData;

    fn aircraft(delay_ms: u64) -> Arc<SimAircraft> {
        let mut params = SpawnParams::new("E175", GeoPoint::new(47.0, 8.0), 5000.0, 90.0);
        params.delay_ms = delay_ms;
        SimAircraft::new(
            "TEST1",
            params,
            SimConfig::default(),
            SimContext::offline(Arc::new(InMemoryNavData::new())),
        )
        .unwrap()
    }

    #[test]
    fn test_starts_paused_and_waiting() {
        let ac = aircraft(0);
        assert!(ac.is_paused());
        assert_eq!(ac.status(), ConnectionStatus::Waiting);
        let before = ac.position_report();
        ac.advance(100);
        assert_eq!(ac.position_report(), before);
    }

    #[test]
    fn test_spawn_delay_counts_unpaused_ticks() {
        let ac = aircraft(300);
        ac.resume();
        ac.advance(100);
        ac.advance(100);
        assert_eq!(ac.status(), ConnectionStatus::Waiting);
        ac.pause();
        ac.advance(100);
        ac.resume();
        ac.advance(100);
        assert_eq!(ac.status(), ConnectionStatus::Connected);
    }

    #[test]
    fn test_tick_moves_aircraft() {
        let ac = aircraft(0);
        ac.resume();
        let before = ac.position_report();
        for _ in 0..10 {
            ac.advance(100);
        }
        let after = ac.position_report();
        assert!(after.lon > before.lon);
        assert!((after.indicated_altitude_ft - 5000.0).abs() < 20.0);
    }

    #[test]
    fn test_spawns_level_at_assigned_speed() {
        let ac = aircraft(0);
        let report = ac.position_report();
        assert!((report.indicated_airspeed_kts - 250.0).abs() < 0.5);
        assert!(report.vertical_speed_fpm.abs() < 1.0);
        assert!((report.heading_mag - 90.0).abs() < 1e-6);
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        struct NoPerf;
        impl PerfDataSource for NoPerf {
            fn lookup(&self, _icao_type: &str) -> Option<pilot_core::PerfData> {
                None
            }
        }
        let mut context = SimContext::offline(Arc::new(InMemoryNavData::new()));
        context.perf = Arc::new(NoPerf);
        let params = SpawnParams::new("ZZZZ", GeoPoint::new(0.0, 0.0), 5000.0, 0.0);
        let err = SimAircraft::new("X", params, SimConfig::default(), context).unwrap_err();
        assert!(matches!(err, SimError::UnknownAircraftType(t) if t == "ZZZZ"));
    }

    #[test]
    fn test_established_on_course() {
        let state = AircraftState {
            position: GeoPoint::new(0.0, 0.0),
            track_true: 90.0,
            heading_true: 90.0,
            bank_deg: 0.0,
            ground_speed_kts: 250.0,
        };
        let on = CourseInterceptInfo {
            required_true_course: 90.0,
            cross_track_m: 0.5,
            along_track_m: 1000.0,
            turn_radius_m: None,
            turn_direction: None,
        };
        assert!(established_on(Some(&on), &state));
        let off = CourseInterceptInfo {
            cross_track_m: 500.0,
            ..on
        };
        assert!(!established_on(Some(&off), &state));
        assert!(!established_on(None, &state));
    }
}

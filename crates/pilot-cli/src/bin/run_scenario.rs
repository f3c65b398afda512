//! Run a training scenario and fly ATC instructions typed on stdin.
//!
//! Input lines:
//!   SWR123, alt FL120 fh 270     instructions for one aircraft
//!   pause | resume               freeze or release every aircraft
//!   list                         show aircraft and their state
//!   remove SWR123                take an aircraft out of the session
//!   quit
//!
//! Usage:
//!   cargo run -p pilot-cli --bin run_scenario -- scenario.json

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pilot_cli::Scenario;
use pilot_sim::{AircraftRegistry, InMemoryNavData, SimConfig, SimContext, TracingConnection};

#[derive(Parser, Debug)]
#[command(author, version, about = "Simulated pilots for ATC training scenarios")]
struct Args {
    /// Scenario file (JSON)
    scenario: PathBuf,

    /// Tick interval in milliseconds (overrides PILOT_SIM_TICK_MS)
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Leave every aircraft paused after loading
    #[arg(long, default_value_t = false)]
    paused: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("pilot_sim=info".parse()?))
        .init();

    let args = Args::parse();

    let mut config = SimConfig::from_env();
    if let Some(tick_ms) = args.tick_ms {
        config.tick_interval_ms = tick_ms.max(1);
    }

    let scenario = Scenario::load(&args.scenario)?;
    let nav = Arc::new(InMemoryNavData::new());
    scenario.register_nav_data(nav.as_ref());

    let context = SimContext::offline(nav).with_connection(Arc::new(TracingConnection));
    let registry = AircraftRegistry::new();
    let spawned = scenario.spawn(&config, &context, &registry)?;
    info!(
        scenario = scenario.name.as_deref().unwrap_or("unnamed"),
        aircraft = spawned.len(),
        "Scenario loaded"
    );
    drop(spawned);

    registry.start_all()?;
    if !args.paused {
        registry.resume_all();
    }

    println!("\n{} aircraft. Type '<CALLSIGN>, <instructions>' or 'quit'.\n", registry.len());

    for line in io::stdin().lock().lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line.split_once(' ') {
            _ if line.eq_ignore_ascii_case("quit") => break,
            _ if line.eq_ignore_ascii_case("pause") => registry.pause_all(),
            _ if line.eq_ignore_ascii_case("resume") => registry.resume_all(),
            _ if line.eq_ignore_ascii_case("list") => {
                for callsign in registry.list() {
                    if let Some(aircraft) = registry.get(&callsign) {
                        let report = aircraft.position_report();
                        println!(
                            "  {:<8} {:?} alt {:>6.0} hdg {:03.0} ias {:>3.0} leg {}",
                            callsign,
                            aircraft.status(),
                            report.indicated_altitude_ft,
                            report.heading_mag,
                            report.indicated_airspeed_kts,
                            aircraft.fms().active_leg().unwrap_or_else(|| "-".into())
                        );
                    }
                }
            }
            Some((cmd, callsign)) if cmd.eq_ignore_ascii_case("remove") => {
                if !registry.remove(callsign.trim()) {
                    warn!(callsign = callsign.trim(), "No such aircraft");
                }
            }
            _ => {
                let taken = registry.dispatch_frequency_message(config.command_frequency, line);
                if taken == 0 {
                    warn!(message = line, "No aircraft answered");
                }
            }
        }
    }

    registry.stop_all();
    info!("Scenario finished");
    Ok(())
}

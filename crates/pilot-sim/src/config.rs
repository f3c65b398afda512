//! Simulator configuration from environment.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use pilot_core::FlightLimits;

/// Settings shared by every simulated aircraft.
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    /// Physics tick interval (ms).
    pub tick_interval_ms: u64,
    /// Frequency ATC instructions are read from, in kHz x 1000 (199.998 MHz).
    pub command_frequency: u32,
    pub max_bank_deg: f64,
    /// Degrees per second.
    pub roll_rate_deg: f64,
    /// Max pitch change per tick (degrees).
    pub pitch_step_deg: f64,
    /// Max thrust lever change per tick.
    pub throttle_step: f64,
    /// Climb and descent limit (fpm).
    pub max_vertical_speed_fpm: f64,
    /// Speed flown until ATC assigns one (kts).
    pub default_ias_kts: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        let limits = FlightLimits::default();
        Self {
            tick_interval_ms: 100,
            command_frequency: 199_998,
            max_bank_deg: limits.max_bank_deg,
            roll_rate_deg: limits.roll_rate_deg,
            pitch_step_deg: limits.pitch_step_deg,
            throttle_step: limits.throttle_step,
            max_vertical_speed_fpm: limits.max_vertical_speed_fpm,
            default_ias_kts: 250.0,
        }
    }
}

impl SimConfig {
    /// Read `PILOT_SIM_*` variables, falling back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            tick_interval_ms: env_or("PILOT_SIM_TICK_MS", defaults.tick_interval_ms).max(1),
            command_frequency: env_or("PILOT_SIM_COMMAND_FREQUENCY", defaults.command_frequency),
            max_bank_deg: env_or("PILOT_SIM_MAX_BANK_DEG", defaults.max_bank_deg),
            roll_rate_deg: env_or("PILOT_SIM_ROLL_RATE_DEG", defaults.roll_rate_deg),
            pitch_step_deg: env_or("PILOT_SIM_PITCH_STEP_DEG", defaults.pitch_step_deg),
            throttle_step: env_or("PILOT_SIM_THROTTLE_STEP", defaults.throttle_step),
            max_vertical_speed_fpm: env_or("PILOT_SIM_MAX_VS_FPM", defaults.max_vertical_speed_fpm),
            default_ias_kts: env_or("PILOT_SIM_DEFAULT_IAS_KTS", defaults.default_ias_kts),
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn limits(&self) -> FlightLimits {
        FlightLimits {
            max_bank_deg: self.max_bank_deg,
            roll_rate_deg: self.roll_rate_deg,
            pitch_step_deg: self.pitch_step_deg,
            throttle_step: self.throttle_step,
            max_vertical_speed_fpm: self.max_vertical_speed_fpm,
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

//! ISA atmosphere, airspeed and altitude conversions.
//!
//! Altitudes are feet, speeds are knots and pressures are hectopascals at
//! the public surface. Internally the formulas run in SI units.

use serde::{Deserialize, Serialize};

pub const METERS_PER_FOOT: f64 = 0.3048;
pub const METERS_PER_NMI: f64 = 1852.0;
pub const MPS_PER_KNOT: f64 = 1852.0 / 3600.0;
pub const MPS_PER_FPM: f64 = METERS_PER_FOOT / 60.0;
pub const HPA_PER_INHG: f64 = 33.8639;

pub const STANDARD_GRAVITY: f64 = 9.80665;
pub const ISA_STD_PRES_HPA: f64 = 1013.25;
pub const ISA_STD_PRES_PA: f64 = 101_325.0;
pub const ISA_STD_TEMP_K: f64 = 288.15;
pub const ISA_STD_DENSITY: f64 = 1.225;
/// Temperature lapse rate in the troposphere (K/m).
pub const ISA_LAPSE_RATE: f64 = 0.0065;
pub const ISA_TROPOPAUSE_M: f64 = 11_000.0;
pub const ISA_TROPOPAUSE_TEMP_K: f64 = 216.65;
pub const R_AIR: f64 = 287.052_87;
pub const GAMMA_AIR: f64 = 1.4;

const PRESSURE_ALT_EXPONENT: f64 = 0.190_263;
const PRESSURE_ALT_SCALE_FT: f64 = 145_442.16;

/// Exponent of the barometric formula, g / (L * R).
fn barometric_exponent() -> f64 {
    STANDARD_GRAVITY / (ISA_LAPSE_RATE * R_AIR)
}

pub fn speed_of_sound_mps(temp_k: f64) -> f64 {
    (GAMMA_AIR * R_AIR * temp_k.max(1.0)).sqrt()
}

fn sea_level_speed_of_sound_mps() -> f64 {
    speed_of_sound_mps(ISA_STD_TEMP_K)
}

/// Static conditions of the air mass surrounding the aircraft.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AirMass {
    pub pressure_pa: f64,
    pub temp_k: f64,
}

impl AirMass {
    /// Standard atmosphere at a geometric altitude in meters.
    pub fn isa(alt_m: f64) -> Self {
        if alt_m <= ISA_TROPOPAUSE_M {
            let temp_k = ISA_STD_TEMP_K - ISA_LAPSE_RATE * alt_m;
            let pressure_pa = ISA_STD_PRES_PA * (temp_k / ISA_STD_TEMP_K).powf(barometric_exponent());
            Self { pressure_pa, temp_k }
        } else {
            let base = Self::isa(ISA_TROPOPAUSE_M);
            let pressure_pa = base.pressure_pa
                * (-STANDARD_GRAVITY * (alt_m - ISA_TROPOPAUSE_M) / (R_AIR * ISA_TROPOPAUSE_TEMP_K))
                    .exp();
            Self {
                pressure_pa,
                temp_k: ISA_TROPOPAUSE_TEMP_K,
            }
        }
    }

    /// Extrapolate from a reference level (e.g. a weather grid level) to `alt_m`
    /// using the standard lapse rate.
    pub fn from_reference(level_pa: f64, level_height_m: f64, level_temp_k: f64, alt_m: f64) -> Self {
        let temp_k = (level_temp_k - ISA_LAPSE_RATE * (alt_m - level_height_m)).max(ISA_TROPOPAUSE_TEMP_K);
        let pressure_pa = level_pa * (temp_k / level_temp_k.max(1.0)).powf(barometric_exponent());
        Self { pressure_pa, temp_k }
    }

    pub fn density(&self) -> f64 {
        self.pressure_pa / (R_AIR * self.temp_k.max(1.0))
    }

    pub fn speed_of_sound_mps(&self) -> f64 {
        speed_of_sound_mps(self.temp_k)
    }

    /// Density altitude in feet.
    pub fn density_altitude_ft(&self) -> f64 {
        let ratio = self.density() / ISA_STD_DENSITY;
        let alt_m = (ISA_STD_TEMP_K / ISA_LAPSE_RATE) * (1.0 - ratio.powf(1.0 / (barometric_exponent() - 1.0)));
        alt_m / METERS_PER_FOOT
    }
}

/// Convert indicated airspeed to (true airspeed, mach).
pub fn ias_to_tas(ias_kts: f64, air: &AirMass) -> (f64, f64) {
    let a0 = sea_level_speed_of_sound_mps();
    let ias_mps = ias_kts.max(0.0) * MPS_PER_KNOT;
    let qc = ISA_STD_PRES_PA * ((1.0 + 0.2 * (ias_mps / a0).powi(2)).powf(3.5) - 1.0);
    let mach = (5.0 * ((qc / air.pressure_pa + 1.0).powf(2.0 / 7.0) - 1.0)).max(0.0).sqrt();
    (mach * air.speed_of_sound_mps() / MPS_PER_KNOT, mach)
}

/// Convert true airspeed to (indicated airspeed, mach).
pub fn tas_to_ias(tas_kts: f64, air: &AirMass) -> (f64, f64) {
    let a0 = sea_level_speed_of_sound_mps();
    let mach = tas_kts.max(0.0) * MPS_PER_KNOT / air.speed_of_sound_mps();
    let qc = air.pressure_pa * ((1.0 + 0.2 * mach * mach).powf(3.5) - 1.0);
    let ias_mps = a0 * (5.0 * ((qc / ISA_STD_PRES_PA + 1.0).powf(2.0 / 7.0) - 1.0)).max(0.0).sqrt();
    (ias_mps / MPS_PER_KNOT, mach)
}

pub fn mach_to_tas(mach: f64, air: &AirMass) -> f64 {
    mach.max(0.0) * air.speed_of_sound_mps() / MPS_PER_KNOT
}

fn setting_offset_ft(setting_hpa: f64) -> f64 {
    PRESSURE_ALT_SCALE_FT * (1.0 - (setting_hpa / ISA_STD_PRES_HPA).powf(PRESSURE_ALT_EXPONENT))
}

/// Pressure altitude for an altimeter reading taken with `altimeter_hpa` set.
pub fn pressure_altitude_ft(indicated_ft: f64, altimeter_hpa: f64) -> f64 {
    indicated_ft + setting_offset_ft(altimeter_hpa)
}

/// Altitude above mean sea level for a reading taken with `altimeter_hpa` set
/// while the actual sea-level pressure is `surface_hpa`.
pub fn absolute_altitude_ft(indicated_ft: f64, altimeter_hpa: f64, surface_hpa: f64) -> f64 {
    indicated_ft + setting_offset_ft(altimeter_hpa) - setting_offset_ft(surface_hpa)
}

pub fn indicated_altitude_ft(absolute_ft: f64, altimeter_hpa: f64, surface_hpa: f64) -> f64 {
    absolute_ft - setting_offset_ft(altimeter_hpa) + setting_offset_ft(surface_hpa)
}

pub fn inhg_to_hpa(inhg: f64) -> f64 {
    inhg * HPA_PER_INHG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isa_sea_level() {
        let air = AirMass::isa(0.0);
        assert!((air.pressure_pa - ISA_STD_PRES_PA).abs() < 1e-6);
        assert!((air.density() - ISA_STD_DENSITY).abs() < 1e-3);
        assert!(air.density_altitude_ft().abs() < 1.0);
    }

    #[test]
    fn test_isa_at_ten_thousand_feet() {
        let air = AirMass::isa(10_000.0 * METERS_PER_FOOT);
        // 696.8 hPa and 268.3 K in the standard tables
        assert!((air.pressure_pa / 100.0 - 696.8).abs() < 1.0);
        assert!((air.temp_k - 268.34).abs() < 0.1);
    }

    #[test]
    fn ias_equals_tas_at_standard_sea_level() {
        let air = AirMass::isa(0.0);
        let (tas, mach) = ias_to_tas(250.0, &air);
        assert!((tas - 250.0).abs() < 0.01);
        assert!((mach - 0.378).abs() < 0.001);
    }

    #[test]
    fn tas_grows_with_altitude_and_converts_back() {
        let air = AirMass::isa(10_000.0 * METERS_PER_FOOT);
        let (tas, _) = ias_to_tas(250.0, &air);
        assert!(tas > 280.0 && tas < 300.0, "tas {tas}");
        let (ias, _) = tas_to_ias(tas, &air);
        assert!((ias - 250.0).abs() < 1e-6);
    }

    #[test]
    fn altimeter_setting_offsets_altitudes() {
        // Low pressure: a standard setting over-reads true altitude by ~27ft/hPa.
        let abs = absolute_altitude_ft(5000.0, ISA_STD_PRES_HPA, 1000.0);
        assert!((abs - (5000.0 - 13.25 * 27.4)).abs() < 15.0, "abs {abs}");

        // Correct QNH set: indicated is true altitude.
        assert!((absolute_altitude_ft(5000.0, 1000.0, 1000.0) - 5000.0).abs() < 1e-9);

        let ind = indicated_altitude_ft(abs, ISA_STD_PRES_HPA, 1000.0);
        assert!((ind - 5000.0).abs() < 1e-9);
        assert!((pressure_altitude_ft(5000.0, ISA_STD_PRES_HPA) - 5000.0).abs() < 1e-9);
    }
}

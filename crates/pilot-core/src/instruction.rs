//! Typed ATC instructions parsed from whitespace-separated tokens.
//!
//! ```text
//! alt FL120 | alt A5000 [QNH 1003 | ALT 2992]
//! fh 270 | tl 090 | tr 180
//! hold KLO [136/L[/5NM|/2MIN]]
//! route KLO GIPOL HOLD RILAX
//! dct KLO
//! spd 250
//! ```

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::atmos::HPA_PER_INHG;
use crate::data::{HoldLegLengthType, TurnDirection};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum InstructionError {
    #[error("ERROR: {0} requires at least 1 argument!")]
    MissingArgument(&'static str),

    #[error("ERROR: Altitude {0} not valid!")]
    InvalidAltitude(String),

    #[error("ERROR: Pressure {0} not valid!")]
    InvalidPressure(String),

    #[error("ERROR: Heading {0} not valid!")]
    InvalidHeading(String),

    #[error("ERROR: Speed {0} not valid!")]
    InvalidSpeed(String),

    #[error("ERROR: Unknown command {0}!")]
    UnknownCommand(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AltimeterSetting {
    Hpa(f64),
    InHg(f64),
}

impl AltimeterSetting {
    pub fn hpa(&self) -> f64 {
        match *self {
            AltimeterSetting::Hpa(hpa) => hpa,
            AltimeterSetting::InHg(inhg) => inhg * HPA_PER_INHG,
        }
    }
}

impl fmt::Display for AltimeterSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AltimeterSetting::Hpa(hpa) => write!(f, "{hpa}hPa"),
            AltimeterSetting::InHg(inhg) => write!(f, "{inhg:05.2}inHg"),
        }
    }
}

/// Inbound course, turn direction and leg length given with a hold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HoldPattern {
    pub inbound_course_mag: f64,
    pub turn_direction: TurnDirection,
    pub leg_length_type: HoldLegLengthType,
    pub leg_length: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteEntry {
    Waypoint(String),
    /// Published hold at the preceding waypoint.
    Hold,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instruction {
    Altitude {
        altitude_ft: f64,
        flight_level: bool,
        altimeter: Option<AltimeterSetting>,
        /// As given, e.g. `FL120`.
        raw: String,
    },
    Heading {
        heading_mag: u16,
        turn: Option<TurnDirection>,
    },
    Hold {
        waypoint: String,
        pattern: Option<HoldPattern>,
    },
    Route(Vec<RouteEntry>),
    DirectTo {
        waypoint: String,
    },
    Speed {
        ias_kts: f64,
    },
}

/// Split a message into instruction tokens.
pub fn tokenize(text: &str) -> VecDeque<String> {
    text.split_whitespace().map(str::to_string).collect()
}

impl Instruction {
    /// Parse the instruction at the front of `tokens`, consuming its
    /// keyword and arguments. A route takes every remaining token.
    pub fn parse_next(tokens: &mut VecDeque<String>) -> Result<Instruction, InstructionError> {
        let keyword = tokens
            .pop_front()
            .ok_or(InstructionError::MissingArgument("Command"))?;
        match keyword.to_lowercase().as_str() {
            "alt" => parse_altitude(tokens),
            "fh" => parse_heading(tokens, None),
            "tl" => parse_heading(tokens, Some(TurnDirection::Left)),
            "tr" => parse_heading(tokens, Some(TurnDirection::Right)),
            "hold" => parse_hold(tokens),
            "route" => parse_route(tokens),
            "dct" => {
                let waypoint = tokens
                    .pop_front()
                    .ok_or(InstructionError::MissingArgument("Direct"))?;
                Ok(Instruction::DirectTo {
                    waypoint: waypoint.to_uppercase(),
                })
            }
            "spd" => {
                let raw = tokens.pop_front().ok_or(InstructionError::MissingArgument("Speed"))?;
                match raw.parse::<f64>() {
                    Ok(ias_kts) if ias_kts > 0.0 => Ok(Instruction::Speed { ias_kts }),
                    _ => Err(InstructionError::InvalidSpeed(raw)),
                }
            }
            _ => Err(InstructionError::UnknownCommand(keyword)),
        }
    }

    /// Parse every instruction in `text`.
    pub fn parse_all(text: &str) -> Result<Vec<Instruction>, InstructionError> {
        let mut tokens = tokenize(text);
        let mut out = Vec::new();
        while !tokens.is_empty() {
            out.push(Self::parse_next(&mut tokens)?);
        }
        Ok(out)
    }
}

fn parse_altitude(tokens: &mut VecDeque<String>) -> Result<Instruction, InstructionError> {
    let raw = tokens.pop_front().ok_or(InstructionError::MissingArgument("Altitude"))?;
    let upper = raw.to_uppercase();

    let (digits, flight_level) = if let Some(rest) = upper.strip_prefix("FL") {
        (rest, true)
    } else if let Some(rest) = upper.strip_prefix('A') {
        (rest, false)
    } else {
        (upper.as_str(), false)
    };
    let value: u32 = digits
        .parse()
        .map_err(|_| InstructionError::InvalidAltitude(raw.clone()))?;
    let altitude_ft = if flight_level {
        f64::from(value) * 100.0
    } else {
        f64::from(value)
    };

    let altimeter = match (tokens.front().map(|t| t.to_lowercase()), tokens.get(1)) {
        (Some(kind), Some(value)) if kind == "qnh" || kind == "alt" => {
            let parsed: f64 = value
                .parse()
                .map_err(|_| InstructionError::InvalidPressure(value.clone()))?;
            tokens.pop_front();
            tokens.pop_front();
            if kind == "qnh" {
                Some(AltimeterSetting::Hpa(parsed))
            } else {
                let inhg = if parsed >= 100.0 { parsed / 100.0 } else { parsed };
                Some(AltimeterSetting::InHg(inhg))
            }
        }
        _ => None,
    };

    Ok(Instruction::Altitude {
        altitude_ft,
        flight_level,
        altimeter,
        raw,
    })
}

fn parse_heading(tokens: &mut VecDeque<String>, turn: Option<TurnDirection>) -> Result<Instruction, InstructionError> {
    let raw = tokens.pop_front().ok_or(InstructionError::MissingArgument("Fly Heading"))?;
    match raw.parse::<u16>() {
        Ok(heading) if heading <= 360 => Ok(Instruction::Heading {
            heading_mag: if heading == 0 { 360 } else { heading },
            turn,
        }),
        _ => Err(InstructionError::InvalidHeading(raw)),
    }
}

fn parse_hold(tokens: &mut VecDeque<String>) -> Result<Instruction, InstructionError> {
    let waypoint = tokens
        .pop_front()
        .ok_or(InstructionError::MissingArgument("Hold"))?
        .to_uppercase();

    let pattern = tokens.front().and_then(|t| parse_hold_pattern(t));
    if pattern.is_some() {
        tokens.pop_front();
    }
    Ok(Instruction::Hold { waypoint, pattern })
}

/// `crs[/L|R[/nNM|nMIN]]`. A leg length that does not parse falls back to
/// the default length.
fn parse_hold_pattern(token: &str) -> Option<HoldPattern> {
    let mut items = token.split('/');
    let inbound_course_mag: f64 = items.next()?.parse().ok()?;

    let turn_direction = match items.next() {
        Some(dir) if dir.to_uppercase().starts_with('L') => TurnDirection::Left,
        _ => TurnDirection::Right,
    };

    let (leg_length_type, leg_length) = match items.next() {
        Some(length) => {
            let lower = length.to_lowercase();
            let (kind, number) = match lower.strip_suffix("nm") {
                Some(n) => (HoldLegLengthType::Distance, n),
                None => (HoldLegLengthType::Time, lower.strip_suffix("min").unwrap_or(&lower)),
            };
            match number.parse::<f64>() {
                Ok(value) => (kind, value),
                Err(_) => (HoldLegLengthType::Default, -1.0),
            }
        }
        None => (HoldLegLengthType::Default, -1.0),
    };

    Some(HoldPattern {
        inbound_course_mag,
        turn_direction,
        leg_length_type,
        leg_length,
    })
}

fn parse_route(tokens: &mut VecDeque<String>) -> Result<Instruction, InstructionError> {
    if tokens.is_empty() {
        return Err(InstructionError::MissingArgument("Route"));
    }
    let entries = tokens
        .drain(..)
        .map(|t| {
            let upper = t.to_uppercase();
            if upper == "HOLD" {
                RouteEntry::Hold
            } else {
                RouteEntry::Waypoint(upper)
            }
        })
        .collect();
    Ok(Instruction::Route(entries))
}

//! Applies ATC instructions to a simulated aircraft.
//!
//! Every outcome is reported as a human-readable line through a
//! [`StatusLogger`] and traced. A failing instruction leaves the aircraft
//! as it was.

use tracing::{debug, info, warn};

use pilot_core::atmos::ISA_STD_PRES_HPA;
use pilot_core::instruction::tokenize;
use pilot_core::{
    HoldLegLengthType, HoldPattern, Instruction, PublishedHold, RouteEntry, TurnDirection, Waypoint,
};

use crate::aircraft::SimAircraft;
use crate::error::CommandError;
use crate::route::RoutePlan;

/// Receives status and error lines meant for the controller.
pub type StatusLogger<'a> = dyn Fn(&str) + Send + Sync + 'a;

/// Run every instruction in `text`, stopping at the first failure.
///
/// Returns true when all of them succeeded.
pub fn handle_command_text(aircraft: &SimAircraft, text: &str, status: &StatusLogger) -> bool {
    let mut tokens = tokenize(text);
    while !tokens.is_empty() {
        let result = Instruction::parse_next(&mut tokens)
            .map_err(CommandError::from)
            .and_then(|instruction| execute(aircraft, &instruction, status));
        if let Err(e) = result {
            fail(aircraft, status, &e);
            return false;
        }
    }
    true
}

/// Apply one parsed instruction.
pub fn handle_instruction(aircraft: &SimAircraft, instruction: &Instruction, status: &StatusLogger) -> bool {
    match execute(aircraft, instruction, status) {
        Ok(()) => true,
        Err(e) => {
            fail(aircraft, status, &e);
            false
        }
    }
}

fn report(aircraft: &SimAircraft, status: &StatusLogger, message: String) {
    info!(callsign = %aircraft.callsign(), "{}", message);
    status(&message);
}

fn fail(aircraft: &SimAircraft, status: &StatusLogger, error: &CommandError) {
    let message = error.to_string();
    warn!(callsign = %aircraft.callsign(), "{}", message);
    status(&message);
}

fn execute(aircraft: &SimAircraft, instruction: &Instruction, status: &StatusLogger) -> Result<(), CommandError> {
    let cs = aircraft.callsign();
    match instruction {
        Instruction::Altitude {
            altitude_ft,
            flight_level,
            altimeter,
            raw,
        } => {
            report(aircraft, status, format!("{cs} maintaining {raw}."));
            if let Some(setting) = altimeter {
                report(aircraft, status, format!("{cs} pressure set to {setting}."));
            }

            let surface = aircraft.surface_pressure_hpa();
            let mut control = aircraft.control();
            let current = control.altimeter_setting_hpa;
            let on_standard = (current - ISA_STD_PRES_HPA).abs() < 1e-6;
            let setting = match (flight_level, altimeter) {
                (true, _) => ISA_STD_PRES_HPA,
                (false, Some(given)) => given.hpa(),
                (false, None) if on_standard => surface,
                (false, None) => current,
            };
            if (setting - current).abs() > 1e-6 {
                debug!(callsign = %cs, from = current, to = setting, "Altimeter reset");
            }
            control.altimeter_setting_hpa = setting;
            control.autopilot.set_assigned_altitude(*altitude_ft);
            Ok(())
        }

        Instruction::Heading { heading_mag, turn } => {
            aircraft.control().autopilot.fly_heading(f64::from(*heading_mag), *turn);
            report(aircraft, status, format!("{cs} flying heading {heading_mag:03} degrees."));
            Ok(())
        }

        Instruction::Speed { ias_kts } => {
            aircraft.control().autopilot.set_assigned_ias(*ias_kts);
            report(aircraft, status, format!("{cs} maintaining {ias_kts:.0} knots."));
            Ok(())
        }

        Instruction::Hold { waypoint, pattern } => {
            let wp = find_waypoint(aircraft, waypoint)?;
            match pattern {
                Some(pattern) => hold_as_given(aircraft, &wp, pattern, status),
                None => hold_as_published(aircraft, &wp, status),
            }
        }

        Instruction::DirectTo { waypoint } => {
            let wp = find_waypoint(aircraft, waypoint)?;
            let state = aircraft.state();
            aircraft
                .fms()
                .activate_direct_to(&wp, None, &state, aircraft.context().magnetic.as_ref());
            aircraft.control().autopilot.arm_lnav();
            report(aircraft, status, format!("{cs} proceeding direct {}.", wp.identifier));
            Ok(())
        }

        Instruction::Route(entries) => {
            let state = aircraft.state();
            let context = aircraft.context();
            let plan = RoutePlan::resolve(
                entries,
                aircraft.fms().last_route_point(),
                &state.position,
                context.nav.as_ref(),
                context.magnetic.as_ref(),
            )?;
            plan.apply(aircraft.fms(), &state, context.magnetic.as_ref());
            aircraft.control().autopilot.arm_lnav();

            let route: Vec<&str> = entries
                .iter()
                .map(|e| match e {
                    RouteEntry::Waypoint(id) => id.as_str(),
                    RouteEntry::Hold => "HOLD",
                })
                .collect();
            report(aircraft, status, format!("{cs} cleared via {}.", route.join(" ")));
            Ok(())
        }
    }
}

fn find_waypoint(aircraft: &SimAircraft, identifier: &str) -> Result<Waypoint, CommandError> {
    let here = aircraft.state().position;
    aircraft
        .context()
        .nav
        .closest_waypoint_by_identifier(identifier, here.lat, here.lon)
        .ok_or_else(|| CommandError::WaypointNotFound(identifier.to_string()))
}

fn hold_as_given(
    aircraft: &SimAircraft,
    wp: &Waypoint,
    pattern: &HoldPattern,
    status: &StatusLogger,
) -> Result<(), CommandError> {
    let context = aircraft.context();
    let added = aircraft.fms().add_hold(
        wp,
        pattern.inbound_course_mag,
        pattern.turn_direction,
        pattern.leg_length_type,
        pattern.leg_length,
        context.magnetic.as_ref(),
    );
    if !added {
        return Err(CommandError::NotInFlightPlan(wp.identifier.clone()));
    }

    if context.nav.published_hold(&wp.identifier).is_none() {
        context.nav.add_published_hold(PublishedHold {
            waypoint: wp.identifier.clone(),
            inbound_course_mag: pattern.inbound_course_mag,
            turn_direction: pattern.turn_direction,
            leg_length_type: pattern.leg_length_type,
            leg_length: pattern.leg_length,
        });
    }

    let turns = match pattern.turn_direction {
        TurnDirection::Left => "Left",
        TurnDirection::Right => "Right",
    };
    let length = match pattern.leg_length_type {
        HoldLegLengthType::Distance => format!(", {}nm", pattern.leg_length),
        HoldLegLengthType::Time => format!(", {}min", pattern.leg_length),
        HoldLegLengthType::Default => String::new(),
    };
    report(
        aircraft,
        status,
        format!(
            "{} will hold at {}, inbound course {:03.0}, {} turns{}.",
            aircraft.callsign(),
            wp.identifier,
            pattern.inbound_course_mag,
            turns,
            length
        ),
    );
    Ok(())
}

fn hold_as_published(aircraft: &SimAircraft, wp: &Waypoint, status: &StatusLogger) -> Result<(), CommandError> {
    let context = aircraft.context();
    let hold = context
        .nav
        .published_hold(&wp.identifier)
        .ok_or_else(|| CommandError::NoPublishedHold(wp.identifier.clone()))?;

    let added = aircraft.fms().add_hold(
        wp,
        hold.inbound_course_mag,
        hold.turn_direction,
        hold.leg_length_type,
        hold.leg_length,
        context.magnetic.as_ref(),
    );
    if !added {
        return Err(CommandError::NotInFlightPlan(wp.identifier.clone()));
    }
    report(
        aircraft,
        status,
        format!("{} will hold at {} as published.", aircraft.callsign(), wp.identifier),
    );
    Ok(())
}

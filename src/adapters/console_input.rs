//! Console command reader for the simulated board.
//!
//! One command per line:
//!
//! ```text
//!   open|close|stop hot|cold     remote valve commands
//!   press open|close hot|cold    panel button press
//!   heater | clear | status | quit
//!   wet|dry 1|2                  flip a simulated leak probe
//!   fault|ok hot|cold            assert/release a valve driver fault
//!   temp water|heater <°C>|broken  set a simulated temperature probe
//! ```

use crate::app::commands::AppCommand;
use crate::devices::{ValveId, Zone};
use crate::drivers::board::SimHandles;
use crate::valves::Direction;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConsoleInput {
    Command(AppCommand),
    Probe { zone: Zone, wet: bool },
    Fault { valve: ValveId, asserted: bool },
    /// `None` breaks the probe.
    Temp { probe: TempPoint, celsius: Option<f32> },
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TempPoint {
    HotWater,
    Heater,
}

pub const HELP: &str = "open|close|stop hot|cold, press open|close hot|cold, heater, clear, \
                        status, wet|dry 1|2, fault|ok hot|cold, temp water|heater <C>|broken, quit";

pub fn parse(line: &str) -> Result<ConsoleInput, &'static str> {
    let mut words = line.split_whitespace();
    let verb = words.next().ok_or("empty line")?;
    let arg = words.next();
    let valve = |token: Option<&str>| token.and_then(ValveId::parse).ok_or("expected hot or cold");
    let zone = |token: Option<&str>| token.and_then(Zone::parse).ok_or("expected zone 1 or 2");

    let input = match verb {
        "open" => ConsoleInput::Command(AppCommand::OpenValve(valve(arg)?)),
        "close" => ConsoleInput::Command(AppCommand::CloseValve(valve(arg)?)),
        "stop" => ConsoleInput::Command(AppCommand::StopValve(valve(arg)?)),
        "press" => {
            let direction = match arg {
                Some("open") => Direction::Open,
                Some("close") => Direction::Close,
                _ => return Err("expected press open|close"),
            };
            ConsoleInput::Command(AppCommand::ValveButton {
                valve: valve(words.next())?,
                direction,
            })
        }
        "heater" => ConsoleInput::Command(AppCommand::ToggleHeater),
        "clear" => ConsoleInput::Command(AppCommand::ClearAlarm),
        "status" => ConsoleInput::Command(AppCommand::ReportStatus),
        "quit" | "exit" => ConsoleInput::Command(AppCommand::Shutdown),
        "wet" => ConsoleInput::Probe { zone: zone(arg)?, wet: true },
        "dry" => ConsoleInput::Probe { zone: zone(arg)?, wet: false },
        "fault" => ConsoleInput::Fault { valve: valve(arg)?, asserted: true },
        "ok" => ConsoleInput::Fault { valve: valve(arg)?, asserted: false },
        "temp" => {
            let probe = match arg {
                Some("water") => TempPoint::HotWater,
                Some("heater") => TempPoint::Heater,
                _ => return Err("expected temp water|heater"),
            };
            let celsius = match words.next() {
                Some("broken") => None,
                Some(v) => Some(v.parse::<f32>().map_err(|_| "expected a temperature")?),
                None => return Err("expected a temperature or broken"),
            };
            ConsoleInput::Temp { probe, celsius }
        }
        "help" | "?" => ConsoleInput::Help,
        _ => return Err("unknown command"),
    };
    Ok(input)
}

/// Apply a pin-level input to the simulated board.  Returns the command to
/// submit, if the line was one.
pub fn apply(input: ConsoleInput, sim: &SimHandles) -> Option<AppCommand> {
    match input {
        ConsoleInput::Command(cmd) => Some(cmd),
        ConsoleInput::Probe { zone, wet } => {
            // probes pull the line LOW when wet
            match zone {
                Zone::Zone1 => sim.zone_1.set_level(!wet),
                Zone::Zone2 => sim.zone_2.set_level(!wet),
            }
            None
        }
        ConsoleInput::Fault { valve, asserted } => {
            match valve {
                ValveId::Hot => sim.hot_fault.set_level(!asserted),
                ValveId::Cold => sim.cold_fault.set_level(!asserted),
            }
            None
        }
        ConsoleInput::Temp { probe, celsius } => {
            let probe = match probe {
                TempPoint::HotWater => &sim.hot_water_temp,
                TempPoint::Heater => &sim.heater_temp,
            };
            match celsius {
                Some(c) => {
                    probe.set_broken(false);
                    probe.set(c);
                }
                None => probe.set_broken(true),
            }
            None
        }
        ConsoleInput::Help => None,
    }
}

//! Outbound application events.
//!
//! The [`LeakController`](super::service::LeakController) and the
//! [`LeakGuard`](crate::leak::LeakGuard) emit these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them (serial log, status page, telemetry).

use serde::Serialize;

use crate::devices::{ValveId, ZoneLabel};
use crate::error::Error;
use crate::leak::AlarmState;
use crate::state::{HeaterState, LeakState, LoadSource, Temperature, ValveState};
use crate::valves::Direction;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The controller finished startup.
    Started { source: LoadSource, leak_at_boot: bool },

    // ── Alarm ─────────────────────────────────────────────────
    /// Emergency shutdown ran for these zones.
    LeakDetected { zones: ZoneLabel },
    /// The affected zones changed while the alarm was already active.
    AlarmRelabelled { zones: ZoneLabel },
    /// Alarm silenced while `zones` are still wet.
    AlarmAcknowledged { zones: ZoneLabel },
    /// Every zone is dry again.
    AlarmCleared,
    /// A wet reading at power-on did not survive the re-check.
    BootLeakDismissed,

    // ── Valves / heater ───────────────────────────────────────
    ValveStarted { valve: ValveId, direction: Direction },
    ValveStopped { valve: ValveId },
    ValveCompleted { valve: ValveId, state: ValveState },
    ValveFaulted { valve: ValveId },
    HeaterChanged(HeaterState),
    /// A temperature probe crossed the consecutive-error threshold.
    TemperatureSensorFailed { device: &'static str },

    /// A manual command was refused.
    CommandRejected { command: &'static str, reason: Error },

    // ── Persistence ───────────────────────────────────────────
    StateFlushed { records: usize },
    PersistenceFailed { failures: u8, degraded: bool },

    /// Reply to [`AppCommand::ReportStatus`](super::commands::AppCommand::ReportStatus).
    Status(StatusSnapshot),

    /// Valves stopped, alarm silenced, state flushed.
    Stopped,
}

/// A point-in-time view of the controller suitable for logging or a status
/// endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub alarm: AlarmState,
    pub affected: Option<ZoneLabel>,
    pub acknowledged: bool,
    pub hot_water_valve: Option<ValveState>,
    pub cold_water_valve: Option<ValveState>,
    pub valves_moving: bool,
    pub zone_1: Option<LeakState>,
    pub zone_2: Option<LeakState>,
    pub heater: Option<HeaterState>,
    pub hot_water_temp: Option<Temperature>,
    pub heater_temp: Option<Temperature>,
    pub pending_writes: usize,
    pub write_failures: u8,
    pub degraded: bool,
}

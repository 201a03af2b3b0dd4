//! Inbound commands to the application service.
//!
//! These represent actions requested by the outside world (panel buttons,
//! console, HTTP API) that the [`LeakController`](super::service::LeakController)
//! interprets and acts upon.

use crate::devices::ValveId;
use crate::valves::Direction;

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    /// Remote open.  Conflicts and lockout surface as errors.
    OpenValve(ValveId),

    /// Remote close.
    CloseValve(ValveId),

    /// Cancel any travel on this valve without committing a terminal state.
    StopValve(ValveId),

    /// A panel button press.  During an alarm the press acknowledges the
    /// alarm instead; a travel in progress is stopped before the new one
    /// starts.
    ValveButton { valve: ValveId, direction: Direction },

    /// Flip the heater relay.  Refused while a leak is detected.
    ToggleHeater,

    /// Acknowledge or clear the leak alarm.
    ClearAlarm,

    /// Emit a [`StatusSnapshot`](super::events::StatusSnapshot).
    ReportStatus,

    /// Stop the runtime after a final flush.
    Shutdown,
}

impl AppCommand {
    /// Short name for logs and rejection events.
    pub fn name(&self) -> &'static str {
        match self {
            Self::OpenValve(_) => "open_valve",
            Self::CloseValve(_) => "close_valve",
            Self::StopValve(_) => "stop_valve",
            Self::ValveButton { .. } => "valve_button",
            Self::ToggleHeater => "toggle_heater",
            Self::ClearAlarm => "clear_alarm",
            Self::ReportStatus => "report_status",
            Self::Shutdown => "shutdown",
        }
    }
}

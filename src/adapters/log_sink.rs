//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the logger (UART / USB-CDC on the device, stderr on host builds).
//! A status page or telemetry adapter would implement the same trait.

use log::{error, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started { source, leak_at_boot } => {
                info!("START | state={:?} | leak_at_boot={}", source, leak_at_boot);
            }
            AppEvent::LeakDetected { zones } => error!("ALARM | leak in {} | valves closing, heater off", zones),
            AppEvent::AlarmRelabelled { zones } => warn!("ALARM | now covering {}", zones),
            AppEvent::AlarmAcknowledged { zones } => info!("ALARM | acknowledged, {} still wet", zones),
            AppEvent::AlarmCleared => info!("ALARM | cleared, all zones dry"),
            AppEvent::BootLeakDismissed => info!("ALARM | power-on reading dismissed"),
            AppEvent::ValveStarted { valve, direction } => {
                info!("VALVE | {} {}", valve.device_name(), direction.verb());
            }
            AppEvent::ValveStopped { valve } => info!("VALVE | {} stopped", valve.device_name()),
            AppEvent::ValveCompleted { valve, state } => {
                info!("VALVE | {} {}", valve.device_name(), state.as_str());
            }
            AppEvent::ValveFaulted { valve } => error!("VALVE | {} fault", valve.device_name()),
            AppEvent::HeaterChanged(state) => info!("HEATER | {}", state.as_str()),
            AppEvent::TemperatureSensorFailed { device } => error!("TEMP | {} probe failed", device),
            AppEvent::CommandRejected { command, reason } => warn!("CMD | {} rejected: {}", command, reason),
            AppEvent::StateFlushed { records } => info!("STORE | flushed {} record(s)", records),
            AppEvent::PersistenceFailed { failures, degraded } => {
                if *degraded {
                    error!("STORE | degraded after {} failed writes, state kept in memory", failures);
                } else {
                    warn!("STORE | write failed ({} in a row)", failures);
                }
            }
            AppEvent::Status(status) => match serde_json::to_string(status) {
                Ok(json) => info!("STATUS | {}", json),
                Err(e) => warn!("STATUS | encode failed: {}", e),
            },
            AppEvent::Stopped => info!("STOP | controller stopped"),
        }
    }
}

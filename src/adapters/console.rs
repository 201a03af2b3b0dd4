//! Log-backed display and buzzer adapters.
//!
//! Stand-ins for the character LCD and the two buzzers on boards (and host
//! builds) without them.  Every call becomes one log line.

use log::{info, warn};

use crate::app::ports::{AlarmSoundPort, ControlSoundPort, DisplayPort, PortError};
use crate::devices::ZoneLabel;

/// Renders screens as log lines.  Progress is logged in 25 % steps per
/// device so a 21 s travel does not flood the console.
#[derive(Default)]
pub struct LogDisplay {
    alarm_shown: bool,
    last_step: Option<(String, u8)>,
}

impl LogDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alarm_shown(&self) -> bool {
        self.alarm_shown
    }
}

impl DisplayPort for LogDisplay {
    fn show_alarm(&mut self, title: &str, zones: ZoneLabel) -> Result<(), PortError> {
        self.alarm_shown = true;
        warn!("LCD: [{}] {}", title, zones);
        Ok(())
    }

    fn reset_alarm(&mut self) -> Result<(), PortError> {
        if self.alarm_shown {
            self.alarm_shown = false;
            info!("LCD: back to normal rotation");
        }
        Ok(())
    }

    fn show_progress(&mut self, title: &str, device_id: &str, fraction: f32) -> Result<(), PortError> {
        let step = (fraction.clamp(0.0, 1.0) * 4.0) as u8;
        let key = (device_id.to_string(), step);
        if self.last_step.as_ref() == Some(&key) {
            return Ok(());
        }
        self.last_step = Some(key);
        info!("LCD: {} {:>3}%", title, (fraction.clamp(0.0, 1.0) * 100.0) as u8);
        Ok(())
    }

    fn show_error(&mut self, message: &str) -> Result<(), PortError> {
        warn!("LCD: ERROR {}", message);
        Ok(())
    }
}

/// Alarm buzzer stand-in.
#[derive(Default)]
pub struct LogAlarm {
    sounding: bool,
}

impl LogAlarm {
    pub fn is_sounding(&self) -> bool {
        self.sounding
    }
}

impl AlarmSoundPort for LogAlarm {
    fn play_alarm(&mut self) -> Result<(), PortError> {
        self.sounding = true;
        warn!("BUZZER: alarm on");
        Ok(())
    }

    fn off(&mut self) -> Result<(), PortError> {
        if self.sounding {
            self.sounding = false;
            info!("BUZZER: alarm off");
        }
        Ok(())
    }
}

/// Control buzzer stand-in.
#[derive(Default)]
pub struct LogTones;

impl ControlSoundPort for LogTones {
    fn play_confirm(&mut self) -> Result<(), PortError> {
        info!("BUZZER: confirm");
        Ok(())
    }

    fn play_error(&mut self) -> Result<(), PortError> {
        info!("BUZZER: error");
        Ok(())
    }

    fn play_startup(&mut self) -> Result<(), PortError> {
        info!("BUZZER: startup");
        Ok(())
    }
}

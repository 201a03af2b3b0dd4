//! Progress reporting for valve travel.
//!
//! One reporter per valve identity, chosen when the controller is built.

use log::debug;

use crate::app::ports::SharedDisplay;
use crate::devices::ValveId;

/// Receives travel progress (`0.0..=1.0`) for one valve.
pub trait ValveProgress {
    fn report_open_progress(&mut self, fraction: f32);
    fn report_close_progress(&mut self, fraction: f32);
}

/// Discards progress.
pub struct NoProgress;

impl ValveProgress for NoProgress {
    fn report_open_progress(&mut self, _fraction: f32) {}
    fn report_close_progress(&mut self, _fraction: f32) {}
}

/// Pushes progress bars to the display, titled by valve identity
/// (`"Hot opening..."`, `"Cold closing..."`).  The display is optional.
pub struct DisplayProgress {
    valve: ValveId,
    display: Option<SharedDisplay>,
}

impl DisplayProgress {
    pub fn new(valve: ValveId, display: Option<SharedDisplay>) -> Self {
        Self { valve, display }
    }

    fn push(&mut self, verb: &str, fraction: f32) {
        let Some(display) = &self.display else {
            return;
        };
        let title = format!("{} {}...", self.valve.label(), verb);
        let device_id = format!("{}_{}", verb, self.valve.device_name());
        match display.try_borrow_mut() {
            Ok(mut d) => {
                if let Err(e) = d.show_progress(&title, &device_id, fraction) {
                    debug!("VALVE: progress not shown: {}", e);
                }
            }
            Err(_) => debug!("VALVE: display busy, progress frame dropped"),
        }
    }
}

impl ValveProgress for DisplayProgress {
    fn report_open_progress(&mut self, fraction: f32) {
        self.push("opening", fraction);
    }

    fn report_close_progress(&mut self, fraction: f32) {
        self.push("closing", fraction);
    }
}

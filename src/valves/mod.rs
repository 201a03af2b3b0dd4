//! Motorised water-line valves.
//!
//! | Type               | Role                                         |
//! |--------------------|----------------------------------------------|
//! | `ValveActuator`    | one direction, timed drive, terminal commit  |
//! | `ValveController`  | one valve, mutual exclusion, emergency close |
//! | `WaterLineValves`  | the hot + cold pair                          |

pub mod actuator;
pub mod controller;
pub mod progress;

pub use actuator::{Direction, DriveSession, TickOutcome, ValveActuator};
pub use controller::ValveController;
pub use progress::{DisplayProgress, NoProgress, ValveProgress};

use log::error;

use crate::devices::ValveId;
use crate::error::ValveError;
use crate::state::StateStore;

/// The hot and cold supply valves.
pub struct WaterLineValves {
    hot: ValveController,
    cold: ValveController,
}

impl WaterLineValves {
    pub fn new(hot: ValveController, cold: ValveController) -> Self {
        Self { hot, cold }
    }

    pub fn get(&self, id: ValveId) -> &ValveController {
        match id {
            ValveId::Hot => &self.hot,
            ValveId::Cold => &self.cold,
        }
    }

    pub fn get_mut(&mut self, id: ValveId) -> &mut ValveController {
        match id {
            ValveId::Hot => &mut self.hot,
            ValveId::Cold => &mut self.cold,
        }
    }

    /// Emergency-close both valves.  Both are attempted; the first failure
    /// is returned.
    pub fn emergency_close(&mut self, store: &mut StateStore) -> Result<(), ValveError> {
        let hot = self.hot.emergency_close(store);
        let cold = self.cold.emergency_close(store);
        for (id, result) in [(ValveId::Hot, hot), (ValveId::Cold, cold)] {
            if let Err(e) = result {
                error!("VALVE: emergency close of {} failed: {}", id, e);
            }
        }
        hot.and(cold)
    }

    pub fn force_stop(&mut self) -> bool {
        let hot = self.hot.force_stop();
        let cold = self.cold.force_stop();
        hot || cold
    }

    pub fn is_in_progress(&self) -> bool {
        self.hot.is_in_progress() || self.cold.is_in_progress()
    }

    /// Tick both valves.
    pub fn tick(&mut self, store: &mut StateStore) -> [(ValveId, TickOutcome); 2] {
        [
            (ValveId::Hot, self.hot.tick(store)),
            (ValveId::Cold, self.cold.tick(store)),
        ]
    }
}

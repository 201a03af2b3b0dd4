//! One motorised valve: an open actuator, a close actuator and an optional
//! fault-feedback input.
//!
//! At most one actuator drives at a time.  Manual `open`/`close` never
//! preempt each other; `emergency_close` does.

use log::{info, warn};

use crate::devices::ValveId;
use crate::drivers::gpio::{DrivePin, SensePin};
use crate::error::ValveError;
use crate::state::{StateStore, ValveState};

use super::actuator::{Direction, TickOutcome, ValveActuator};
use super::progress::ValveProgress;

pub struct ValveController {
    valve: ValveId,
    opener: ValveActuator,
    closer: ValveActuator,
    /// Driver fault line, asserted LOW (overload, short, over-temperature).
    feedback: Option<Box<dyn SensePin>>,
    progress: Box<dyn ValveProgress>,
}

impl ValveController {
    pub fn new(
        valve: ValveId,
        open_pin: Box<dyn DrivePin>,
        close_pin: Box<dyn DrivePin>,
        travel_secs: u32,
        progress: Box<dyn ValveProgress>,
    ) -> Self {
        Self {
            valve,
            opener: ValveActuator::new(valve, Direction::Open, open_pin, travel_secs),
            closer: ValveActuator::new(valve, Direction::Close, close_pin, travel_secs),
            feedback: None,
            progress,
        }
    }

    pub fn with_feedback(mut self, pin: Box<dyn SensePin>) -> Self {
        self.feedback = Some(pin);
        self
    }

    pub fn id(&self) -> ValveId {
        self.valve
    }

    // ── Commands ──────────────────────────────────────────────

    pub fn open(&mut self, store: &mut StateStore) -> Result<(), ValveError> {
        if self.closer.is_active() {
            return Err(ValveError::OppositeDirectionActive);
        }
        self.opener.start(store, true)
    }

    pub fn close(&mut self, store: &mut StateStore) -> Result<(), ValveError> {
        if self.opener.is_active() {
            return Err(ValveError::OppositeDirectionActive);
        }
        self.closer.start(store, true)
    }

    /// Cancel both directions.  Returns whether anything was running.
    pub fn force_stop(&mut self) -> bool {
        let opened = self.opener.cancel();
        let closed = self.closer.cancel();
        opened || closed
    }

    /// Stop whatever is running and close without progress reporting.
    pub fn emergency_close(&mut self, store: &mut StateStore) -> Result<(), ValveError> {
        self.force_stop();
        info!("VALVE: {} emergency close", self.valve);
        self.closer.start(store, false)
    }

    /// Advance the active drive by one second, checking the fault line first.
    pub fn tick(&mut self, store: &mut StateStore) -> TickOutcome {
        if self.is_in_progress() && self.fault_asserted() {
            warn!("VALVE: {} driver reports a fault", self.valve);
            if self.opener.is_active() {
                self.opener.fault(store);
            }
            if self.closer.is_active() {
                self.closer.fault(store);
            }
            return TickOutcome::Faulted;
        }
        match (self.opener.is_active(), self.closer.is_active()) {
            (true, _) => self.opener.tick(store, self.progress.as_mut()),
            (_, true) => self.closer.tick(store, self.progress.as_mut()),
            _ => TickOutcome::Idle,
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn is_in_progress(&self) -> bool {
        self.opener.is_active() || self.closer.is_active()
    }

    pub fn active_direction(&self) -> Option<Direction> {
        if self.opener.is_active() {
            Some(Direction::Open)
        } else if self.closer.is_active() {
            Some(Direction::Close)
        } else {
            None
        }
    }

    pub fn state(&self, store: &StateStore) -> Option<ValveState> {
        store.valve(self.valve)
    }

    pub fn is_open(&self, store: &StateStore) -> bool {
        self.state(store) == Some(ValveState::Opened)
    }

    pub fn is_closed(&self, store: &StateStore) -> bool {
        self.state(store) == Some(ValveState::Closed)
    }

    /// The stored value says the valve is travelling but nothing is driving
    /// it: a manual stop, or a restart mid-travel.  The physical position is
    /// unknown until the next full open or close.
    pub fn is_travel_interrupted(&self, store: &StateStore) -> bool {
        matches!(self.state(store), Some(ValveState::Opening | ValveState::Closing)) && !self.is_in_progress()
    }

    fn fault_asserted(&mut self) -> bool {
        let Some(pin) = self.feedback.as_mut() else {
            return false;
        };
        match pin.is_high() {
            Ok(high) => !high,
            Err(e) => {
                warn!("VALVE: {} feedback read failed: {}", self.valve, e);
                false
            }
        }
    }
}

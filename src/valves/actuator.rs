//! Timed drive for one direction of one valve.
//!
//! ```text
//!   Idle ──start──▶ Driving ──remaining = 0──▶ Completed (Opened/Closed)
//!                      ├──cancel──────────────▶ Cancelled (no commit)
//!                      └──drive fault─────────▶ Faulted   (Error)
//! ```
//!
//! The actuator has no timer of its own: the runtime calls [`tick`] once
//! per second.  Cancellation clears the session, which the next tick
//! observes as "nothing to do".
//!
//! [`tick`]: ValveActuator::tick

use log::{error, info, warn};

use crate::devices::ValveId;
use crate::drivers::gpio::DrivePin;
use crate::error::ValveError;
use crate::state::{StateStore, ValveState};

use super::progress::ValveProgress;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Open,
    Close,
}

impl Direction {
    pub const fn in_progress(self) -> ValveState {
        match self {
            Self::Open => ValveState::Opening,
            Self::Close => ValveState::Closing,
        }
    }

    pub const fn terminal(self) -> ValveState {
        match self {
            Self::Open => ValveState::Opened,
            Self::Close => ValveState::Closed,
        }
    }

    pub const fn verb(self) -> &'static str {
        match self {
            Self::Open => "opening",
            Self::Close => "closing",
        }
    }
}

/// A running drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriveSession {
    pub remaining: u32,
    pub total: u32,
    pub report_progress: bool,
}

impl DriveSession {
    pub fn fraction(&self) -> f32 {
        (self.total - self.remaining) as f32 / self.total as f32
    }
}

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    Idle,
    Driving { fraction: f32 },
    Completed(ValveState),
    Faulted,
}

pub struct ValveActuator {
    valve: ValveId,
    direction: Direction,
    travel_secs: u32,
    pin: Box<dyn DrivePin>,
    session: Option<DriveSession>,
}

impl ValveActuator {
    pub fn new(valve: ValveId, direction: Direction, mut pin: Box<dyn DrivePin>, travel_secs: u32) -> Self {
        if pin.set_low().is_err() {
            warn!("VALVE: {} {} output could not be released at init", valve, direction.verb());
        }
        Self {
            valve,
            direction,
            travel_secs: travel_secs.max(1),
            pin,
            session: None,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<DriveSession> {
        self.session
    }

    /// Write the in-progress value, energise the output and begin counting.
    pub fn start(&mut self, store: &mut StateStore, report_progress: bool) -> Result<(), ValveError> {
        if self.session.is_some() {
            return Err(ValveError::AlreadyActive);
        }
        self.commit(store, self.direction.in_progress());
        if self.pin.set_high().is_err() {
            self.fault(store);
            return Err(ValveError::DriveFault);
        }
        self.session = Some(DriveSession {
            remaining: self.travel_secs,
            total: self.travel_secs,
            report_progress,
        });
        info!(
            "VALVE: {} {} started ({}s{})",
            self.valve,
            self.direction.verb(),
            self.travel_secs,
            if report_progress { "" } else { ", silent" }
        );
        Ok(())
    }

    /// Advance by one second of travel.
    pub fn tick(&mut self, store: &mut StateStore, progress: &mut dyn ValveProgress) -> TickOutcome {
        let Some(session) = self.session.as_mut() else {
            return TickOutcome::Idle;
        };
        session.remaining = session.remaining.saturating_sub(1);
        let fraction = session.fraction();
        if session.report_progress {
            match self.direction {
                Direction::Open => progress.report_open_progress(fraction),
                Direction::Close => progress.report_close_progress(fraction),
            }
        }
        if session.remaining > 0 {
            return TickOutcome::Driving { fraction };
        }

        self.session = None;
        if self.pin.set_low().is_err() {
            error!("VALVE: {} output stuck after {}", self.valve, self.direction.verb());
            self.commit(store, ValveState::Error);
            return TickOutcome::Faulted;
        }
        let terminal = self.direction.terminal();
        self.commit(store, terminal);
        info!("VALVE: {} {}", self.valve, terminal.as_str());
        TickOutcome::Completed(terminal)
    }

    /// Cancel without committing a terminal value.  Returns whether a drive
    /// was running.
    pub fn cancel(&mut self) -> bool {
        if self.pin.set_low().is_err() {
            error!("VALVE: {} {} output could not be released", self.valve, self.direction.verb());
        }
        let was_active = self.session.take().is_some();
        if was_active {
            info!("VALVE: {} {} cancelled", self.valve, self.direction.verb());
        }
        was_active
    }

    /// De-energise (best effort), commit `Error` and clear the session.
    pub fn fault(&mut self, store: &mut StateStore) {
        let _ = self.pin.set_low();
        self.session = None;
        self.commit(store, ValveState::Error);
        error!("VALVE: {} drive fault while {}", self.valve, self.direction.verb());
    }

    fn commit(&self, store: &mut StateStore, state: ValveState) {
        if let Err(e) = store.set_valve(self.valve, state) {
            error!("VALVE: could not record {} for {}: {}", state.as_str(), self.valve, e);
        }
    }
}

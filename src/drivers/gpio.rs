//! Boolean GPIO abstractions.
//!
//! The core only ever needs "drive this line high/low" and "is this line
//! high".  [`DrivePin`] and [`SensePin`] are object-safe wrappers over the
//! `embedded-hal` 1.0 digital traits so each component can own its pin as a
//! `Box<dyn ...>` regardless of the concrete HAL type.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: `esp-idf-hal` `PinDriver`s implement the `embedded-hal`
//! traits and get these impls for free.
//! On host/test: [`SimPin`] holds the level in an atomic so a console thread
//! or a test can flip inputs while the control thread reads them.

use core::convert::Infallible;
use core::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use embedded_hal::digital::{ErrorType, InputPin, OutputPin};

/// A pin operation failed at the HAL level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinFault;

impl fmt::Display for PinFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("GPIO operation failed")
    }
}

/// Digital output owned by exactly one component.
pub trait DrivePin {
    fn set_high(&mut self) -> Result<(), PinFault>;
    fn set_low(&mut self) -> Result<(), PinFault>;
}

/// Digital input.
pub trait SensePin {
    fn is_high(&mut self) -> Result<bool, PinFault>;
}

impl<P: OutputPin> DrivePin for P {
    fn set_high(&mut self) -> Result<(), PinFault> {
        OutputPin::set_high(self).map_err(|_| PinFault)
    }

    fn set_low(&mut self) -> Result<(), PinFault> {
        OutputPin::set_low(self).map_err(|_| PinFault)
    }
}

impl<P: InputPin> SensePin for P {
    fn is_high(&mut self) -> Result<bool, PinFault> {
        InputPin::is_high(self).map_err(|_| PinFault)
    }
}

// ── Simulated pin ─────────────────────────────────────────────

/// Shared-level pin for simulation.  Clones observe the same line.
#[derive(Debug, Clone)]
pub struct SimPin {
    level: Arc<AtomicBool>,
    edges: Arc<AtomicUsize>,
}

impl SimPin {
    pub fn new(high: bool) -> Self {
        Self {
            level: Arc::new(AtomicBool::new(high)),
            edges: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn level(&self) -> bool {
        self.level.load(Ordering::SeqCst)
    }

    pub fn set_level(&self, high: bool) {
        if self.level.swap(high, Ordering::SeqCst) != high {
            self.edges.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Number of level changes since creation.
    pub fn edge_count(&self) -> usize {
        self.edges.load(Ordering::SeqCst)
    }
}

impl ErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.set_level(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.set_level(true);
        Ok(())
    }
}

impl InputPin for SimPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.level())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.level())
    }
}

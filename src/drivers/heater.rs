//! Heater power relay.
//!
//! Owns the relay pin (active HIGH).  The on/off state is tracked here
//! because the output line cannot be read back through [`DrivePin`].
//! At boot the last persisted state is restored with [`restore`].

use log::{info, warn};

use crate::app::ports::{HeaterPort, PortError};
use crate::error::{Error, Result};
use crate::state::{HeaterState, StateStore};

use super::gpio::DrivePin;

pub struct HeaterSwitch {
    pin: Box<dyn DrivePin>,
    on: bool,
}

impl HeaterSwitch {
    /// Create the switch with the relay released.
    pub fn new(mut pin: Box<dyn DrivePin>) -> Self {
        if pin.set_low().is_err() {
            warn!("HEATER: could not release relay at init");
        }
        Self { pin, on: false }
    }
}

/// Re-apply the persisted heater state, if any.
pub fn restore(heater: &mut dyn HeaterPort, store: &StateStore) {
    let result = match store.heater() {
        Some(HeaterState::On) => heater.power_on(),
        Some(HeaterState::Off) => heater.power_off(),
        None => return,
    };
    match result {
        Ok(()) => info!("HEATER: restored power {}", if heater.is_on() { "on" } else { "off" }),
        Err(e) => warn!("HEATER: restore failed: {}", e),
    }
}

/// Flip the relay and record the new state.
pub fn toggle(heater: &mut dyn HeaterPort, store: &mut StateStore) -> Result<HeaterState> {
    let next = if heater.is_on() { HeaterState::Off } else { HeaterState::On };
    let switched = match next {
        HeaterState::On => heater.power_on(),
        HeaterState::Off => heater.power_off(),
    };
    if let Err(e) = switched {
        warn!("HEATER: switching {} failed: {}", next.as_str(), e);
        return Err(Error::Peripheral("heater relay"));
    }
    store.set_heater(next)?;
    info!("HEATER: power {}", next.as_str());
    Ok(next)
}

impl HeaterPort for HeaterSwitch {
    fn power_on(&mut self) -> core::result::Result<(), PortError> {
        self.pin.set_high().map_err(|_| PortError::Io)?;
        self.on = true;
        Ok(())
    }

    fn power_off(&mut self) -> core::result::Result<(), PortError> {
        self.pin.set_low().map_err(|_| PortError::Io)?;
        self.on = false;
        Ok(())
    }

    fn is_on(&self) -> bool {
        self.on
    }
}

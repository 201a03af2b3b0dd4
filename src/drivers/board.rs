//! Board bring-up: claim every GPIO named in [`pins`](crate::pins) once.
//!
//! - **`target_os = "espidf"`**: `esp-idf-hal` `PinDriver`s; inputs get
//!   the internal pull-up so an open probe reads dry.
//! - **`not(target_os = "espidf")`**: [`SimPin`]s, with the handles
//!   returned separately so the console and tests can drive them.

use crate::sensors::{SimProbe, TempProbe};

use super::gpio::{DrivePin, SensePin, SimPin};

/// Every pin the controller owns, type-erased.
pub struct BoardPins {
    pub hot_open: Box<dyn DrivePin>,
    pub hot_close: Box<dyn DrivePin>,
    pub hot_fault: Box<dyn SensePin>,
    pub cold_open: Box<dyn DrivePin>,
    pub cold_close: Box<dyn DrivePin>,
    pub cold_fault: Box<dyn SensePin>,
    pub heater: Box<dyn DrivePin>,
    pub zone_1: Box<dyn SensePin>,
    pub zone_2: Box<dyn SensePin>,
    pub hot_water_temp: Box<dyn TempProbe>,
    pub heater_temp: Box<dyn TempProbe>,
}

/// Host-side handles onto the simulated board.
#[derive(Clone)]
pub struct SimHandles {
    pub hot_open: SimPin,
    pub hot_close: SimPin,
    pub hot_fault: SimPin,
    pub cold_open: SimPin,
    pub cold_close: SimPin,
    pub cold_fault: SimPin,
    pub heater: SimPin,
    pub zone_1: SimPin,
    pub zone_2: SimPin,
    pub hot_water_temp: SimProbe,
    pub heater_temp: SimProbe,
}

/// Outputs start low; fault lines and leak probes start high (healthy, dry).
/// Temperature probes read a warm idle system.
pub fn simulated() -> (BoardPins, SimHandles) {
    let h = SimHandles {
        hot_open: SimPin::new(false),
        hot_close: SimPin::new(false),
        hot_fault: SimPin::new(true),
        cold_open: SimPin::new(false),
        cold_close: SimPin::new(false),
        cold_fault: SimPin::new(true),
        heater: SimPin::new(false),
        zone_1: SimPin::new(true),
        zone_2: SimPin::new(true),
        hot_water_temp: SimProbe::new(45.0),
        heater_temp: SimProbe::new(55.0),
    };
    let pins = BoardPins {
        hot_open: Box::new(h.hot_open.clone()),
        hot_close: Box::new(h.hot_close.clone()),
        hot_fault: Box::new(h.hot_fault.clone()),
        cold_open: Box::new(h.cold_open.clone()),
        cold_close: Box::new(h.cold_close.clone()),
        cold_fault: Box::new(h.cold_fault.clone()),
        heater: Box::new(h.heater.clone()),
        zone_1: Box::new(h.zone_1.clone()),
        zone_2: Box::new(h.zone_2.clone()),
        hot_water_temp: Box::new(h.hot_water_temp.clone()),
        heater_temp: Box::new(h.heater_temp.clone()),
    };
    (pins, h)
}

#[cfg(target_os = "espidf")]
pub fn take_board() -> crate::error::Result<BoardPins> {
    use esp_idf_hal::gpio::{AnyIOPin, AnyOutputPin, PinDriver, Pull};
    use log::info;

    use crate::error::Error;
    use crate::pins;
    use crate::sensors::MissingProbe;

    fn output(gpio: i32) -> crate::error::Result<Box<dyn DrivePin>> {
        // SAFETY: each GPIO number in `pins` is claimed exactly once, here.
        let pin = unsafe { AnyOutputPin::new(gpio) };
        let mut driver = PinDriver::output(pin).map_err(|_| Error::Init("gpio output"))?;
        driver.set_low().map_err(|_| Error::Init("gpio output"))?;
        Ok(Box::new(driver))
    }

    fn input(gpio: i32) -> crate::error::Result<Box<dyn SensePin>> {
        // SAFETY: as above.
        let pin = unsafe { AnyIOPin::new(gpio) };
        let mut driver = PinDriver::input(pin).map_err(|_| Error::Init("gpio input"))?;
        driver.set_pull(Pull::Up).map_err(|_| Error::Init("gpio pull-up"))?;
        Ok(Box::new(driver))
    }

    let board = BoardPins {
        hot_open: output(pins::HOT_VALVE_OPEN_GPIO)?,
        hot_close: output(pins::HOT_VALVE_CLOSE_GPIO)?,
        hot_fault: input(pins::HOT_VALVE_FAULT_GPIO)?,
        cold_open: output(pins::COLD_VALVE_OPEN_GPIO)?,
        cold_close: output(pins::COLD_VALVE_CLOSE_GPIO)?,
        cold_fault: input(pins::COLD_VALVE_FAULT_GPIO)?,
        heater: output(pins::HEATER_RELAY_GPIO)?,
        zone_1: input(pins::LEAK_ZONE_1_GPIO)?,
        zone_2: input(pins::LEAK_ZONE_2_GPIO)?,
        // TODO: DS18B20 one-wire driver on HOT_WATER_TEMP_GPIO / HEATER_TEMP_GPIO.
        hot_water_temp: Box::new(MissingProbe),
        heater_temp: Box::new(MissingProbe),
    };
    info!("APP: board GPIO configured");
    Ok(board)
}

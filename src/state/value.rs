//! Device values.
//!
//! `Value` is a closed variant: every device class has its own enum and a
//! value of one class can never be stored on a device of another.  The
//! serialized forms are the strings the state file has always used
//! (`"opened"`, `"no_leak"`, `"on"`, …); temperatures are plain numbers
//! with two string markers for sensor problems.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::devices::Section;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValveState {
    Closed,
    Opened,
    Opening,
    Closing,
    Error,
}

impl ValveState {
    /// Opened, Closed and Error are terminal; Opening/Closing are timed.
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Opening | Self::Closing)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Opened => "opened",
            Self::Opening => "opening",
            Self::Closing => "closing",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeakState {
    NoLeak,
    Leak,
}

impl LeakState {
    pub const fn from_wet(wet: bool) -> Self {
        if wet { Self::Leak } else { Self::NoLeak }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoLeak => "no_leak",
            Self::Leak => "leak",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaterState {
    On,
    Off,
}

impl HeaterState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
        }
    }
}

/// A temperature reading, or the reason there is none.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "TemperatureRepr", into = "TemperatureRepr")]
pub enum Temperature {
    Celsius(f32),
    NoSensor,
    SensorError,
}

impl Temperature {
    /// Non-finite readings are sensor errors; they would otherwise defeat
    /// change detection (`NaN != NaN`).
    pub fn reading(celsius: f32) -> Self {
        if celsius.is_finite() {
            Self::Celsius(celsius)
        } else {
            Self::SensorError
        }
    }

    pub const fn celsius(self) -> Option<f32> {
        match self {
            Self::Celsius(c) => Some(c),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum TemperatureRepr {
    Celsius(f32),
    Marker(TemperatureMarker),
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum TemperatureMarker {
    NoSensor,
    SensorError,
}

impl From<TemperatureRepr> for Temperature {
    fn from(repr: TemperatureRepr) -> Self {
        match repr {
            TemperatureRepr::Celsius(c) => Temperature::reading(c),
            TemperatureRepr::Marker(TemperatureMarker::NoSensor) => Temperature::NoSensor,
            TemperatureRepr::Marker(TemperatureMarker::SensorError) => Temperature::SensorError,
        }
    }
}

impl From<Temperature> for TemperatureRepr {
    fn from(t: Temperature) -> Self {
        match t {
            Temperature::Celsius(c) => TemperatureRepr::Celsius(c),
            Temperature::NoSensor => TemperatureRepr::Marker(TemperatureMarker::NoSensor),
            Temperature::SensorError => TemperatureRepr::Marker(TemperatureMarker::SensorError),
        }
    }
}

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Valve(ValveState),
    Leak(LeakState),
    Temperature(Temperature),
    Heater(HeaterState),
}

impl Value {
    pub const fn section(&self) -> Section {
        match self {
            Self::Valve(_) => Section::Valve,
            Self::Leak(_) => Section::Leak,
            Self::Temperature(_) => Section::Temperature,
            Self::Heater(_) => Section::Heater,
        }
    }

    pub const fn as_valve(self) -> Option<ValveState> {
        match self {
            Self::Valve(v) => Some(v),
            _ => None,
        }
    }

    pub const fn as_leak(self) -> Option<LeakState> {
        match self {
            Self::Leak(v) => Some(v),
            _ => None,
        }
    }

    pub const fn as_temperature(self) -> Option<Temperature> {
        match self {
            Self::Temperature(v) => Some(v),
            _ => None,
        }
    }

    pub const fn as_heater(self) -> Option<HeaterState> {
        match self {
            Self::Heater(v) => Some(v),
            _ => None,
        }
    }

    /// JSON form used in the state file.
    pub fn to_json(&self) -> serde_json::Value {
        let encoded = match self {
            Self::Valve(v) => serde_json::to_value(v),
            Self::Leak(v) => serde_json::to_value(v),
            Self::Temperature(v) => serde_json::to_value(v),
            Self::Heater(v) => serde_json::to_value(v),
        };
        // Unit variants and finite floats always encode.
        encoded.unwrap_or(serde_json::Value::Null)
    }

    /// Decode a state-file value for a device of `section`.
    ///
    /// `null` means "never set".  Anything that is not a valid value for the
    /// section is rejected.
    pub fn from_json(section: Section, raw: &serde_json::Value) -> Result<Option<Self>, ValueDecodeError> {
        if raw.is_null() {
            return Ok(None);
        }
        let decoded = match section {
            Section::Valve => serde_json::from_value(raw.clone()).map(Self::Valve),
            Section::Leak => serde_json::from_value(raw.clone()).map(Self::Leak),
            Section::Temperature => serde_json::from_value(raw.clone()).map(Self::Temperature),
            Section::Heater => serde_json::from_value(raw.clone()).map(Self::Heater),
        };
        decoded.map(Some).map_err(|_| ValueDecodeError { section })
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Valve(v) => f.write_str(v.as_str()),
            Self::Leak(v) => f.write_str(v.as_str()),
            Self::Heater(v) => f.write_str(v.as_str()),
            Self::Temperature(Temperature::Celsius(c)) => write!(f, "{c:.1}"),
            Self::Temperature(Temperature::NoSensor) => f.write_str("no_sensor"),
            Self::Temperature(Temperature::SensorError) => f.write_str("sensor_error"),
        }
    }
}

/// A stored value did not decode for its section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueDecodeError {
    pub section: Section,
}

impl fmt::Display for ValueDecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {} value", self.section)
    }
}

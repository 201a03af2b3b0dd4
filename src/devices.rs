//! The fixed device table.
//!
//! The controller manages exactly seven devices, known at compile time: two
//! motorised valves, two leak zones, two temperature points and the heater
//! power switch.  Devices are never added or removed at runtime.

use core::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Device class.  Each class is one top-level section of the state file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Valve,
    Leak,
    Temperature,
    Heater,
}

impl Section {
    pub const ALL: [Section; 4] = [
        Section::Valve,
        Section::Leak,
        Section::Temperature,
        Section::Heater,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Valve => "valve",
            Self::Leak => "leak",
            Self::Temperature => "temperature",
            Self::Heater => "heater",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Device names
// ---------------------------------------------------------------------------

pub const HOT_WATER_VALVE: &str = "hot_water_valve";
pub const COLD_WATER_VALVE: &str = "cold_water_valve";
pub const ZONE_1: &str = "zone_1";
pub const ZONE_2: &str = "zone_2";
pub const HOT_WATER_TEMP: &str = "hot_water_temp";
pub const HEATER_TEMP: &str = "heater_temp";
pub const HEATER_POWER_SWITCH: &str = "heater_power_switch";

/// One entry of the device table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceSpec {
    pub section: Section,
    pub name: &'static str,
}

/// Number of devices in [`DEVICES`].
pub const DEVICE_COUNT: usize = 7;

pub const DEVICES: [DeviceSpec; DEVICE_COUNT] = [
    DeviceSpec { section: Section::Valve, name: HOT_WATER_VALVE },
    DeviceSpec { section: Section::Valve, name: COLD_WATER_VALVE },
    DeviceSpec { section: Section::Leak, name: ZONE_1 },
    DeviceSpec { section: Section::Leak, name: ZONE_2 },
    DeviceSpec { section: Section::Temperature, name: HOT_WATER_TEMP },
    DeviceSpec { section: Section::Temperature, name: HEATER_TEMP },
    DeviceSpec { section: Section::Heater, name: HEATER_POWER_SWITCH },
];

// ---------------------------------------------------------------------------
// Valves
// ---------------------------------------------------------------------------

/// Water-line valve identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValveId {
    Hot,
    Cold,
}

impl ValveId {
    pub const ALL: [ValveId; 2] = [ValveId::Hot, ValveId::Cold];

    /// Device name in the state table.
    pub const fn device_name(self) -> &'static str {
        match self {
            Self::Hot => HOT_WATER_VALVE,
            Self::Cold => COLD_WATER_VALVE,
        }
    }

    /// Short label used in progress titles.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Hot => "Hot",
            Self::Cold => "Cold",
        }
    }

    /// Parse a console/API token (`hot`, `cold` or the full device name).
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "hot" | HOT_WATER_VALVE => Some(Self::Hot),
            "cold" | COLD_WATER_VALVE => Some(Self::Cold),
            _ => None,
        }
    }
}

impl fmt::Display for ValveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.device_name())
    }
}

// ---------------------------------------------------------------------------
// Leak zones
// ---------------------------------------------------------------------------

/// Physical leak-sensor location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    Zone1,
    Zone2,
}

impl Zone {
    pub const ALL: [Zone; 2] = [Zone::Zone1, Zone::Zone2];

    pub const fn device_name(self) -> &'static str {
        match self {
            Self::Zone1 => ZONE_1,
            Self::Zone2 => ZONE_2,
        }
    }

    pub const fn index(self) -> usize {
        match self {
            Self::Zone1 => 0,
            Self::Zone2 => 1,
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "1" | ZONE_1 => Some(Self::Zone1),
            "2" | ZONE_2 => Some(Self::Zone2),
            _ => None,
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.device_name())
    }
}

/// Which zones an alarm covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneLabel {
    Zone1,
    Zone2,
    Both,
}

impl ZoneLabel {
    /// Label for a per-zone triggered set; `None` when nothing is triggered.
    pub const fn from_triggered(triggered: [bool; 2]) -> Option<Self> {
        match triggered {
            [true, true] => Some(Self::Both),
            [true, false] => Some(Self::Zone1),
            [false, true] => Some(Self::Zone2),
            [false, false] => None,
        }
    }
}

impl fmt::Display for ZoneLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zone1 => f.write_str("Zone 1"),
            Self::Zone2 => f.write_str("Zone 2"),
            Self::Both => f.write_str("Zone 1 & Zone 2"),
        }
    }
}

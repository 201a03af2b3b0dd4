//! GPIO pin assignments for the LeakGuard controller board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Hot-water valve (motor driver, one input per direction)
// ---------------------------------------------------------------------------

/// Digital output: HIGH drives the valve towards open.
pub const HOT_VALVE_OPEN_GPIO: i32 = 0;
/// Digital output: HIGH drives the valve towards closed.
pub const HOT_VALVE_CLOSE_GPIO: i32 = 1;
/// Digital input: driver fault line, LOW = fault.
pub const HOT_VALVE_FAULT_GPIO: i32 = 2;

// ---------------------------------------------------------------------------
// Cold-water valve
// ---------------------------------------------------------------------------

pub const COLD_VALVE_OPEN_GPIO: i32 = 3;
pub const COLD_VALVE_CLOSE_GPIO: i32 = 4;
pub const COLD_VALVE_FAULT_GPIO: i32 = 5;

// ---------------------------------------------------------------------------
// Heater
// ---------------------------------------------------------------------------

/// Digital output: heater power relay (active HIGH).
pub const HEATER_RELAY_GPIO: i32 = 11;

// ---------------------------------------------------------------------------
// Leak sensors (open-drain probes with pull-up, LOW = wet)
// ---------------------------------------------------------------------------

pub const LEAK_ZONE_1_GPIO: i32 = 14;
pub const LEAK_ZONE_2_GPIO: i32 = 15;

// ---------------------------------------------------------------------------
// Temperature probes (one-wire DS18B20)
// ---------------------------------------------------------------------------

pub const HOT_WATER_TEMP_GPIO: i32 = 12;
pub const HEATER_TEMP_GPIO: i32 = 13;

// ---------------------------------------------------------------------------
// Buzzers and panel (driven by external adapters)
// ---------------------------------------------------------------------------

pub const BUZZER_CONTROL_GPIO: i32 = 16;
pub const BUZZER_ALARM_GPIO: i32 = 17;

//! Pin abstractions, the heater relay driver and board bring-up.

pub mod board;
pub mod gpio;
pub mod heater;

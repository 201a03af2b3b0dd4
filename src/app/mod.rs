//! Application core: domain orchestration with no direct I/O.
//!
//! This module holds the controller service, its inbound commands and
//! outbound events.  All interaction with hardware and storage happens
//! through **port traits** defined in [`ports`], keeping this layer fully
//! testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;

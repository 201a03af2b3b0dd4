//! LeakGuard controller library.
//!
//! Water-leak prevention for a domestic supply: two motorised valves, a
//! heater relay and two leak probes, with crash-safe state persistence.
//! All ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod devices;
pub mod drivers;
pub mod error;
pub mod leak;
pub mod pins;
pub mod runtime;
pub mod sensors;
pub mod state;
pub mod valves;

pub use error::{Error, Result};

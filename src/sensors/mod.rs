//! Sensor subsystems other than the leak probes.

pub mod temperature;

pub use temperature::{MissingProbe, SimProbe, TempMonitor, TempOutcome, TempProbe, TempSettings};

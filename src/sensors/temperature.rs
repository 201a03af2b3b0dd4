//! Temperature probes on the hot-water line and the heater.
//!
//! A [`TempProbe`] yields raw Celsius readings.  [`TempMonitor`] validates
//! and rounds each one, counts consecutive bad reads, and decides whether a
//! reading goes to disk or only into memory:
//!
//! ```text
//!   |Δ since last persisted| >= threshold  ─┐
//!   every Nth reading                      ─┴─▶ set_temperature (batched flush)
//!   otherwise                               ──▶ update_silent   (memory only)
//! ```
//!
//! ## Dual-target design
//!
//! On ESP-IDF: no one-wire driver is wired yet, so both probes are
//! [`MissingProbe`] stubs that report "no sensor".
//! On host/test: [`SimProbe`] holds the reading in an atomic for injection.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use log::{debug, error, info, warn};

use crate::app::ports::PortError;
use crate::config::SystemConfig;
use crate::devices::Section;
use crate::error::Result;
use crate::state::{StateStore, Temperature, Trend, Value};

/// Readings outside this range are treated as probe errors.
const VALID_RANGE_C: core::ops::RangeInclusive<f32> = -10.0..=100.0;

/// Source of raw temperature readings.
pub trait TempProbe {
    fn read_celsius(&mut self) -> core::result::Result<f32, PortError>;

    /// `false` for a stub standing in for a probe that was never found.
    fn is_present(&self) -> bool {
        true
    }
}

// ── Stubs ─────────────────────────────────────────────────────

/// Placeholder for an absent probe.
#[derive(Debug, Default)]
pub struct MissingProbe;

impl TempProbe for MissingProbe {
    fn read_celsius(&mut self) -> core::result::Result<f32, PortError> {
        Err(PortError::Unavailable)
    }

    fn is_present(&self) -> bool {
        false
    }
}

/// Shared-value probe for simulation.  Clones observe the same reading.
#[derive(Debug, Clone)]
pub struct SimProbe {
    bits: Arc<AtomicU32>,
    broken: Arc<AtomicBool>,
}

impl SimProbe {
    pub fn new(celsius: f32) -> Self {
        Self {
            bits: Arc::new(AtomicU32::new(celsius.to_bits())),
            broken: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn set(&self, celsius: f32) {
        self.bits.store(celsius.to_bits(), Ordering::Relaxed);
    }

    /// While broken every read fails.
    pub fn set_broken(&self, broken: bool) {
        self.broken.store(broken, Ordering::Relaxed);
    }
}

impl TempProbe for SimProbe {
    fn read_celsius(&mut self) -> core::result::Result<f32, PortError> {
        if self.broken.load(Ordering::Relaxed) {
            return Err(PortError::Io);
        }
        Ok(f32::from_bits(self.bits.load(Ordering::Relaxed)))
    }
}

// ── Monitor ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempSettings {
    pub change_threshold_c: f32,
    pub write_frequency: u8,
    pub max_errors: u8,
}

impl TempSettings {
    pub fn from_config(config: &SystemConfig) -> Self {
        Self {
            change_threshold_c: config.temp_change_threshold_c,
            write_frequency: config.temp_write_frequency.max(1),
            max_errors: config.temp_max_errors.max(1),
        }
    }
}

impl Default for TempSettings {
    fn default() -> Self {
        Self::from_config(&SystemConfig::default())
    }
}

/// What one [`TempMonitor::poll`] did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TempOutcome {
    /// Reading stored and queued for the next batched flush.
    Persisted(f32),
    /// Reading stored in memory only.
    MemoryOnly(f32),
    /// The probe is a stub; `NoSensor` is stored.
    Missing,
    /// Bad read; `errors` consecutive so far.
    Rejected { errors: u8 },
    /// This read crossed the error threshold; `SensorError` is stored.
    Failed,
}

pub struct TempMonitor {
    device: &'static str,
    probe: Box<dyn TempProbe>,
    settings: TempSettings,
    errors: u8,
    failed: bool,
    since_write: u8,
    last_persisted: Option<f32>,
}

impl TempMonitor {
    pub fn new(device: &'static str, probe: Box<dyn TempProbe>, settings: TempSettings) -> Self {
        if probe.is_present() {
            info!("TEMP: {} probe ready", device);
        } else {
            warn!("TEMP: {} probe not found, using stub", device);
        }
        Self {
            device,
            probe,
            settings,
            errors: 0,
            failed: false,
            since_write: 0,
            last_persisted: None,
        }
    }

    pub fn device(&self) -> &'static str {
        self.device
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    pub fn error_count(&self) -> u8 {
        self.errors
    }

    /// Read the probe once and record the result in `store`.
    ///
    /// A failed probe keeps being read; the first valid reading brings it
    /// back.
    pub fn poll(&mut self, store: &mut StateStore) -> Result<TempOutcome> {
        if !self.probe.is_present() {
            store.set_temperature(self.device, Temperature::NoSensor)?;
            return Ok(TempOutcome::Missing);
        }

        let celsius = match self.probe.read_celsius() {
            Ok(c) if VALID_RANGE_C.contains(&c) => round_tenth(c),
            Ok(c) => return self.reject(store, &format!("{c} °C out of range")),
            Err(e) => return self.reject(store, &e.to_string()),
        };

        if self.failed {
            info!("TEMP: {} probe recovered", self.device);
            self.failed = false;
        }
        self.errors = 0;
        self.record(store, celsius)
    }

    fn record(&mut self, store: &mut StateStore, celsius: f32) -> Result<TempOutcome> {
        let significant = self
            .last_persisted
            .is_none_or(|last| (celsius - last).abs() >= self.settings.change_threshold_c);
        self.since_write += 1;
        let periodic = self.since_write >= self.settings.write_frequency;
        if periodic {
            self.since_write = 0;
        }

        let outcome = if significant || periodic {
            if !store.set_temperature(self.device, Temperature::Celsius(celsius))? {
                // Already in memory from a memory-only write.
                store.schedule(Section::Temperature, self.device, false)?;
            }
            self.last_persisted = Some(celsius);
            TempOutcome::Persisted(celsius)
        } else {
            store.update_silent(
                Section::Temperature,
                self.device,
                Value::Temperature(Temperature::Celsius(celsius)),
            )?;
            TempOutcome::MemoryOnly(celsius)
        };

        let arrow = store.temperature_trend(self.device).map_or("", Trend::arrow);
        debug!("TEMP: {} {:.1}°C{} ({:?})", self.device, celsius, arrow, outcome);
        Ok(outcome)
    }

    fn reject(&mut self, store: &mut StateStore, reason: &str) -> Result<TempOutcome> {
        self.errors = self.errors.saturating_add(1);
        if self.failed {
            debug!("TEMP: {} still failing: {}", self.device, reason);
            return Ok(TempOutcome::Rejected { errors: self.errors });
        }
        warn!("TEMP: {} bad read #{}: {}", self.device, self.errors, reason);
        if self.errors < self.settings.max_errors {
            return Ok(TempOutcome::Rejected { errors: self.errors });
        }

        self.failed = true;
        self.last_persisted = None;
        error!("TEMP: {} probe marked failed after {} bad reads", self.device, self.errors);
        store.set_temperature(self.device, Temperature::SensorError)?;
        Ok(TempOutcome::Failed)
    }
}

fn round_tenth(celsius: f32) -> f32 {
    (celsius * 10.0).round() / 10.0
}

//! System configuration parameters
//!
//! All tunable parameters for the LeakGuard controller.
//! Values can be overridden by the JSON config file (see
//! [`JsonConfigFile`](crate::adapters::config_file::JsonConfigFile)).

use serde::{Deserialize, Serialize};

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    // --- Valves ---
    /// Full-travel drive time of a motorised valve (seconds)
    pub valve_travel_secs: u32,

    // --- Leak sensing ---
    /// Interval between debounced leak samples (milliseconds)
    pub leak_sample_interval_ms: u32,
    /// Raw reads per debounced sample
    pub leak_debounce_reads: u8,
    /// Wet reads required for a sample to count as wet
    pub leak_debounce_wet_votes: u8,
    /// Delay before re-checking a zone that was wet at power-on (milliseconds)
    pub startup_stabilization_ms: u32,

    // --- Temperature probes ---
    /// Interval between probe reads (seconds)
    pub temp_poll_interval_secs: u32,
    /// Change since the last persisted reading that forces a disk write (°C)
    pub temp_change_threshold_c: f32,
    /// Every Nth reading is persisted even without a significant change
    pub temp_write_frequency: u8,
    /// Consecutive bad reads before a probe is marked failed
    pub temp_max_errors: u8,

    // --- State persistence ---
    pub state_primary_path: String,
    pub state_backup_path: String,
    pub state_temp_path: String,
    /// Flush-loop tick (seconds)
    pub flush_tick_secs: u32,
    /// Minimum spacing of non-critical flushes (seconds)
    pub state_write_interval_secs: u32,
    /// Consecutive write failures before persistence is marked degraded
    pub max_write_failures: u8,
    /// Writes are refused when the volume has less free space than this
    pub min_free_bytes: u64,

    // --- Logging ---
    /// `error`, `warn`, `info`, `debug` or `trace`
    pub log_level: String,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Valves
            valve_travel_secs: 21,

            // Leak sensing
            leak_sample_interval_ms: 1000, // 1 Hz
            leak_debounce_reads: 3,
            leak_debounce_wet_votes: 2,
            startup_stabilization_ms: 2000,

            // Temperature probes
            temp_poll_interval_secs: 30,
            temp_change_threshold_c: 0.5,
            temp_write_frequency: 2,
            temp_max_errors: 5,

            // State persistence
            state_primary_path: "state/state.json".into(),
            state_backup_path: "state/state_backup.json".into(),
            state_temp_path: "state/state_temp.json".into(),
            flush_tick_secs: 5,
            state_write_interval_secs: 30,
            max_write_failures: 5,
            min_free_bytes: 8192,

            log_level: "info".into(),
        }
    }
}

impl SystemConfig {
    pub fn log_level_filter(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Info)
    }
}

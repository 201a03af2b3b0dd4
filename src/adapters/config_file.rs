//! JSON configuration file adapter.
//!
//! Implements [`ConfigPort`] on a single JSON file.  A missing file yields
//! [`SystemConfig::default()`]; fields absent from the file take their
//! defaults.  Every value is range-checked on load and before save.

use std::path::PathBuf;

use log::{info, warn};

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::SystemConfig;

pub struct JsonConfigFile {
    path: PathBuf,
}

impl JsonConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

// ── Config validation ─────────────────────────────────────────

/// Validate config ranges before accepting or persisting.  Invalid fields
/// are rejected, not clamped.
pub fn validate_config(cfg: &SystemConfig) -> Result<(), ConfigError> {
    if !(1..=300).contains(&cfg.valve_travel_secs) {
        return Err(ConfigError::ValidationFailed("valve_travel_secs must be 1–300"));
    }
    if !(100..=10_000).contains(&cfg.leak_sample_interval_ms) {
        return Err(ConfigError::ValidationFailed(
            "leak_sample_interval_ms must be 100–10000",
        ));
    }
    if !(1..=15).contains(&cfg.leak_debounce_reads) {
        return Err(ConfigError::ValidationFailed("leak_debounce_reads must be 1–15"));
    }
    if cfg.leak_debounce_wet_votes == 0 || cfg.leak_debounce_wet_votes > cfg.leak_debounce_reads {
        return Err(ConfigError::ValidationFailed(
            "leak_debounce_wet_votes must be 1..=leak_debounce_reads",
        ));
    }
    if cfg.startup_stabilization_ms > 30_000 {
        return Err(ConfigError::ValidationFailed(
            "startup_stabilization_ms must be 0–30000",
        ));
    }
    if !(1..=3600).contains(&cfg.temp_poll_interval_secs) {
        return Err(ConfigError::ValidationFailed("temp_poll_interval_secs must be 1–3600"));
    }
    if !(0.0..=10.0).contains(&cfg.temp_change_threshold_c) {
        return Err(ConfigError::ValidationFailed("temp_change_threshold_c must be 0–10"));
    }
    if cfg.temp_write_frequency == 0 {
        return Err(ConfigError::ValidationFailed("temp_write_frequency must be >= 1"));
    }
    if cfg.temp_max_errors == 0 {
        return Err(ConfigError::ValidationFailed("temp_max_errors must be >= 1"));
    }
    if !(1..=600).contains(&cfg.flush_tick_secs) {
        return Err(ConfigError::ValidationFailed("flush_tick_secs must be 1–600"));
    }
    if cfg.state_write_interval_secs < cfg.flush_tick_secs {
        return Err(ConfigError::ValidationFailed(
            "state_write_interval_secs must be >= flush_tick_secs",
        ));
    }
    if cfg.max_write_failures == 0 {
        return Err(ConfigError::ValidationFailed("max_write_failures must be >= 1"));
    }
    let paths = [
        &cfg.state_primary_path,
        &cfg.state_backup_path,
        &cfg.state_temp_path,
    ];
    if paths.iter().any(|p| p.is_empty()) {
        return Err(ConfigError::ValidationFailed("state paths must not be empty"));
    }
    if paths[0] == paths[1] || paths[0] == paths[2] || paths[1] == paths[2] {
        return Err(ConfigError::ValidationFailed("state paths must be distinct"));
    }
    if cfg.log_level.parse::<log::LevelFilter>().is_err() {
        return Err(ConfigError::ValidationFailed(
            "log_level must be off, error, warn, info, debug or trace",
        ));
    }
    Ok(())
}

impl ConfigPort for JsonConfigFile {
    fn load(&self) -> Result<SystemConfig, ConfigError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("APP: no config at {}, using defaults", self.path.display());
                return Ok(SystemConfig::default());
            }
            Err(e) => {
                warn!("APP: config read failed: {}", e);
                return Err(ConfigError::IoError);
            }
        };
        let cfg: SystemConfig = serde_json::from_slice(&bytes).map_err(|_| ConfigError::Corrupted)?;
        validate_config(&cfg)?;
        info!("APP: loaded config from {}", self.path.display());
        Ok(cfg)
    }

    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError> {
        validate_config(config)?;
        let json = serde_json::to_vec_pretty(config).map_err(|_| ConfigError::IoError)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|_| ConfigError::IoError)?;
        }
        std::fs::write(&self.path, json).map_err(|_| ConfigError::IoError)?;
        info!("APP: config saved to {}", self.path.display());
        Ok(())
    }
}

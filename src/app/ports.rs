//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ StateStore / valves / LeakGuard (domain)
//! ```
//!
//! Driven adapters (display, buzzer, heater relay, filesystem, clock, event
//! sinks) implement these traits.  The domain core never touches a concrete
//! peripheral; every collaborator is injected at construction or at the
//! call site.

use std::cell::RefCell;
use std::rc::Rc;

use chrono::NaiveDateTime;

use crate::config::SystemConfig;
use crate::devices::ZoneLabel;

// ───────────────────────────────────────────────────────────────
// Display port (domain → character display)
// ───────────────────────────────────────────────────────────────

/// Human-interface screen.  Rendering and screen rotation live behind this
/// trait; the core only pushes alarm, progress and error screens.
pub trait DisplayPort {
    fn show_alarm(&mut self, title: &str, zones: ZoneLabel) -> Result<(), PortError>;

    /// Leave the alarm screen and return to normal rotation.
    fn reset_alarm(&mut self) -> Result<(), PortError>;

    /// `fraction` is in `0.0..=1.0`.
    fn show_progress(&mut self, title: &str, device_id: &str, fraction: f32) -> Result<(), PortError>;

    fn show_error(&mut self, message: &str) -> Result<(), PortError>;
}

/// The display is shared by the valve progress reporters and the leak guard.
pub type SharedDisplay = Rc<RefCell<dyn DisplayPort>>;

// ───────────────────────────────────────────────────────────────
// Sound ports (domain → buzzers)
// ───────────────────────────────────────────────────────────────

/// The repeating leak alarm.
pub trait AlarmSoundPort {
    fn play_alarm(&mut self) -> Result<(), PortError>;
    fn off(&mut self) -> Result<(), PortError>;
}

/// Short feedback tones for manual actions.
pub trait ControlSoundPort {
    fn play_confirm(&mut self) -> Result<(), PortError>;
    fn play_error(&mut self) -> Result<(), PortError>;
    fn play_startup(&mut self) -> Result<(), PortError>;
}

// ───────────────────────────────────────────────────────────────
// Heater port (domain → heater power relay)
// ───────────────────────────────────────────────────────────────

pub trait HeaterPort {
    fn power_on(&mut self) -> Result<(), PortError>;
    fn power_off(&mut self) -> Result<(), PortError>;
    fn is_on(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

pub trait Clock {
    /// Local wall-clock time for `last_changed` stamping.
    fn now(&self) -> NaiveDateTime;

    /// Monotonic milliseconds, used for flush-interval gating.
    fn monotonic_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// File port (domain ↔ flash filesystem)
// ───────────────────────────────────────────────────────────────

/// Whole-file storage used by the [`StateStore`](crate::state::StateStore).
///
/// Each `write` replaces the file in one call.  Crash safety for the state
/// document comes from the temp-file + rename sequence built on top of
/// these primitives, not from the backend.
pub trait FilePort {
    fn read(&self, path: &str) -> Result<Vec<u8>, StorageError>;

    fn write(&mut self, path: &str, data: &[u8]) -> Result<(), StorageError>;

    fn copy(&mut self, from: &str, to: &str) -> Result<(), StorageError>;

    /// Replace `to` with `from` atomically.
    fn rename(&mut self, from: &str, to: &str) -> Result<(), StorageError>;

    /// Returns `Ok(())` even if the file didn't exist.
    fn remove(&mut self, path: &str) -> Result<(), StorageError>;

    fn exists(&self, path: &str) -> bool;

    /// Free space on the volume holding `path`, if the backend can tell.
    fn available_bytes(&self, path: &str) -> Option<u64>;
}

// ───────────────────────────────────────────────────────────────
// Configuration port (domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// Implementations MUST validate config values before accepting or
/// persisting them.  Invalid ranges are rejected with
/// [`ConfigError::ValidationFailed`], not silently clamped.
pub trait ConfigPort {
    /// Returns [`SystemConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<SystemConfig, ConfigError>;

    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from collaborator ports (display, buzzers, heater).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortError {
    /// The peripheral is absent or was never initialised.
    Unavailable,
    /// The peripheral rejected the command.
    Io,
}

/// Errors from [`ConfigPort`] operations.
#[derive(Debug)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`FilePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    NotFound,
    /// Not enough free space for the write.
    Full,
    IoError,
}

impl core::fmt::Display for PortError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Unavailable => write!(f, "peripheral unavailable"),
            Self::Io => write!(f, "peripheral I/O error"),
        }
    }
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "file not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

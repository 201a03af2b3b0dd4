//! Unified error types for the LeakGuard controller.
//!
//! A single `Error` enum that every subsystem converts into, so the control
//! loops handle failures uniformly.  Raw I/O errors never cross the
//! StateStore, valve or leak-guard boundaries; they are mapped to one of the
//! variants below first.

use core::fmt;

use crate::devices::Section;

/// Maximum device-name length carried inside [`Error::UnknownDevice`].
pub const MAX_NAME_LEN: usize = 32;

// ---------------------------------------------------------------------------
// Top-level controller error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A read or write addressed a device outside the fixed device table.
    /// Always a programming error.
    UnknownDevice {
        section: Section,
        name: heapless::String<MAX_NAME_LEN>,
    },
    /// A value of one device class was written to a device of another.
    SectionMismatch { expected: Section, found: Section },
    /// A valve command was rejected or the drive failed.
    Valve(ValveError),
    /// The durable state file could not be read or written.
    Persistence(PersistenceError),
    /// The action is refused while a leak alarm is raised.
    LeakLockout,
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// A peripheral rejected a runtime command.
    Peripheral(&'static str),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl Error {
    /// Build an [`Error::UnknownDevice`], truncating over-long names.
    pub fn unknown_device(section: Section, name: &str) -> Self {
        let mut owned = heapless::String::new();
        for ch in name.chars() {
            if owned.push(ch).is_err() {
                break;
            }
        }
        Self::UnknownDevice {
            section,
            name: owned,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownDevice { section, name } => {
                write!(f, "unknown device '{name}' in section '{section}'")
            }
            Self::SectionMismatch { expected, found } => {
                write!(f, "{found} value written to a {expected} device")
            }
            Self::Valve(e) => write!(f, "valve: {e}"),
            Self::Persistence(e) => write!(f, "persistence: {e}"),
            Self::LeakLockout => write!(f, "action forbidden while a leak is detected"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Peripheral(name) => write!(f, "{name} did not respond"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Valve errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValveError {
    /// The other direction of this valve is still driving.
    OppositeDirectionActive,
    /// This direction is already driving.
    AlreadyActive,
    /// The drive output could not be switched or the driver reported a fault.
    DriveFault,
}

impl fmt::Display for ValveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OppositeDirectionActive => write!(f, "opposite direction is active"),
            Self::AlreadyActive => write!(f, "already active"),
            Self::DriveFault => write!(f, "drive fault"),
        }
    }
}

impl std::error::Error for Error {}

impl From<ValveError> for Error {
    fn from(e: ValveError) -> Self {
        Self::Valve(e)
    }
}

// ---------------------------------------------------------------------------
// Persistence errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceError {
    /// Writing the temp file, refreshing the backup or the final rename failed.
    WriteFailed,
    /// The state file could not be read.
    LoadFailed,
    /// The state file was read but is not a valid state document.
    InvalidStateData,
    /// Consecutive write failures reached the threshold; durability is
    /// degraded to the in-memory emergency snapshot.
    Degraded,
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WriteFailed => write!(f, "state write failed"),
            Self::LoadFailed => write!(f, "state load failed"),
            Self::InvalidStateData => write!(f, "invalid state data"),
            Self::Degraded => write!(f, "persistence degraded"),
        }
    }
}

impl From<PersistenceError> for Error {
    fn from(e: PersistenceError) -> Self {
        Self::Persistence(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Controller-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;

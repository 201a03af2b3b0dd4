//! On-disk state document.
//!
//! ```json
//! {
//!   "valve":       { "hot_water_valve": { "state": "opened", "preview_state": "opening",
//!                                         "last_changed": "2024-05-01T12:00:21" }, ... },
//!   "leak":        { ... },
//!   "temperature": { ... },
//!   "heater":      { ... }
//! }
//! ```
//!
//! All four sections are required; a document missing any of them fails to
//! deserialize and is treated as invalid.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::devices::Section;
use crate::error::PersistenceError;

use super::value::Value;

/// ISO-8601 without offset, second resolution.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

pub fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT).ok()
}

/// One device entry.  `preview_state` is the previous value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateRecord {
    pub state: serde_json::Value,
    pub preview_state: serde_json::Value,
    pub last_changed: Option<String>,
}

/// Typed contents of a [`StateRecord`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodedRecord {
    pub current: Option<Value>,
    pub previous: Option<Value>,
    pub last_changed: Option<NaiveDateTime>,
}

impl StateRecord {
    pub fn decode(&self, section: Section) -> Result<DecodedRecord, PersistenceError> {
        let current =
            Value::from_json(section, &self.state).map_err(|_| PersistenceError::InvalidStateData)?;
        let previous = Value::from_json(section, &self.preview_state)
            .map_err(|_| PersistenceError::InvalidStateData)?;
        let last_changed = match &self.last_changed {
            None => None,
            Some(raw) => Some(parse_timestamp(raw).ok_or(PersistenceError::InvalidStateData)?),
        };
        Ok(DecodedRecord {
            current,
            previous,
            last_changed,
        })
    }
}

pub type SectionMap = BTreeMap<String, StateRecord>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateDocument {
    pub valve: SectionMap,
    pub leak: SectionMap,
    pub temperature: SectionMap,
    pub heater: SectionMap,
}

impl StateDocument {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PersistenceError> {
        serde_json::from_slice(bytes).map_err(|_| PersistenceError::InvalidStateData)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, PersistenceError> {
        serde_json::to_vec(self).map_err(|_| PersistenceError::WriteFailed)
    }

    pub fn section(&self, section: Section) -> &SectionMap {
        match section {
            Section::Valve => &self.valve,
            Section::Leak => &self.leak,
            Section::Temperature => &self.temperature,
            Section::Heater => &self.heater,
        }
    }

    pub fn section_mut(&mut self, section: Section) -> &mut SectionMap {
        match section {
            Section::Valve => &mut self.valve,
            Section::Leak => &mut self.leak,
            Section::Temperature => &mut self.temperature,
            Section::Heater => &mut self.heater,
        }
    }

    pub fn record(&self, section: Section, name: &str) -> Option<&StateRecord> {
        self.section(section).get(name)
    }
}

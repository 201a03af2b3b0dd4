//! The device-state store.
//!
//! [`StateStore`] is the single owner of every device value.  Writes go
//! through [`DeviceState`] (identical writes are no-ops) and changed keys are
//! put on a dirty list tagged critical or not.  A periodic flush merges the
//! dirty records into the state file with a crash-safe replace:
//!
//! ```text
//!   primary ──copy──▶ backup
//!   merged  ──write─▶ temp ──rename──▶ primary
//! ```
//!
//! A crash at any point leaves the primary either fully old or fully new.
//! The filesystem is passed in per call, like every other port.

use chrono::NaiveDateTime;
use heapless::FnvIndexMap;
use log::{debug, error, info, warn};

use crate::app::ports::{Clock, FilePort, StorageError};
use crate::config::SystemConfig;
use crate::devices::{DEVICES, HEATER_POWER_SWITCH, Section, ValveId, Zone};
use crate::error::{Error, PersistenceError, Result};

use super::device::{DeviceState, Notify, StateObserver};
use super::document::{DecodedRecord, StateDocument};
use super::value::{HeaterState, LeakState, Temperature, Value, ValveState};

/// Display format for [`StateStore::action_time`].
const ACTION_TIME_FORMAT: &str = "%d.%m.%y %H:%M";

/// Where [`StateStore::load`] found its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Primary,
    Backup,
    /// Neither file was usable; fresh defaults were synthesized.
    Defaults,
}

/// Result of a flush attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing was dirty.
    Clean,
    /// Dirty, but neither the interval nor a critical write forces a flush.
    NotDue,
    /// Every dirty payload matched what is already on disk.
    Suppressed,
    /// The state file was replaced with this many changed records.
    Written { records: usize },
}

/// Direction of a temperature's last change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Up,
    Down,
    Steady,
    Unknown,
}

impl Trend {
    pub const fn arrow(self) -> &'static str {
        match self {
            Self::Up => "↑",
            Self::Down => "↓",
            Self::Steady | Self::Unknown => "",
        }
    }
}

/// Paths and limits taken from [`SystemConfig`].
#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub primary_path: String,
    pub backup_path: String,
    pub temp_path: String,
    pub write_interval_ms: u64,
    pub max_write_failures: u8,
    pub min_free_bytes: u64,
}

impl StoreSettings {
    pub fn from_config(config: &SystemConfig) -> Self {
        Self {
            primary_path: config.state_primary_path.clone(),
            backup_path: config.state_backup_path.clone(),
            temp_path: config.state_temp_path.clone(),
            write_interval_ms: u64::from(config.state_write_interval_secs) * 1000,
            max_write_failures: config.max_write_failures,
            min_free_bytes: config.min_free_bytes,
        }
    }
}

struct Slot {
    state: DeviceState,
    /// Serialized record last written to (or loaded from) disk.
    last_written: Option<String>,
}

impl Slot {
    fn payload(&self) -> Option<String> {
        serde_json::to_string(&self.state.record()).ok()
    }
}

pub struct StateStore {
    settings: StoreSettings,
    clock: Box<dyn Clock>,
    slots: Vec<Slot>,
    /// Slot index → critical flag.
    dirty: FnvIndexMap<usize, bool, 8>,
    last_flush_ms: u64,
    write_failures: u8,
    degraded: bool,
    emergency: Option<StateDocument>,
}

impl StateStore {
    pub fn new(config: &SystemConfig, clock: Box<dyn Clock>) -> Self {
        Self::with_settings(StoreSettings::from_config(config), clock)
    }

    pub fn with_settings(settings: StoreSettings, clock: Box<dyn Clock>) -> Self {
        let slots = DEVICES
            .iter()
            .map(|d| Slot {
                state: DeviceState::new(d.section, d.name),
                last_written: None,
            })
            .collect();
        let last_flush_ms = clock.monotonic_ms();
        Self {
            settings,
            clock,
            slots,
            dirty: FnvIndexMap::new(),
            last_flush_ms,
            write_failures: 0,
            degraded: false,
            emergency: None,
        }
    }

    // ── Writes ────────────────────────────────────────────────

    /// Write a value and, if it changed, schedule it for persistence.
    ///
    /// Returns whether the value changed.
    pub fn update(&mut self, section: Section, name: &str, value: Value, critical: bool) -> Result<bool> {
        let idx = self.checked_index(section, name, &value)?;
        let now = self.clock.now();
        let changed = self.slots[idx].state.set(value, now, Notify::Yes);
        if changed {
            self.mark_dirty(idx, critical);
        }
        Ok(changed)
    }

    /// Memory-only write: no observers, no persistence.
    pub fn update_silent(&mut self, section: Section, name: &str, value: Value) -> Result<bool> {
        let idx = self.checked_index(section, name, &value)?;
        let now = self.clock.now();
        Ok(self.slots[idx].state.set(value, now, Notify::No))
    }

    /// Queue a record for the next flush without changing it, e.g. after a
    /// run of memory-only writes.  Flush still skips it if the disk copy
    /// already matches.
    pub fn schedule(&mut self, section: Section, name: &str, critical: bool) -> Result<()> {
        let idx = self.index_of(section, name)?;
        self.mark_dirty(idx, critical);
        Ok(())
    }

    pub fn set_valve(&mut self, valve: ValveId, state: ValveState) -> Result<bool> {
        self.update(Section::Valve, valve.device_name(), Value::Valve(state), true)
    }

    pub fn set_leak(&mut self, zone: Zone, state: LeakState) -> Result<bool> {
        self.update(Section::Leak, zone.device_name(), Value::Leak(state), true)
    }

    pub fn set_heater(&mut self, state: HeaterState) -> Result<bool> {
        self.update(Section::Heater, HEATER_POWER_SWITCH, Value::Heater(state), true)
    }

    /// Temperatures are batched: they never force an early flush.
    pub fn set_temperature(&mut self, name: &str, reading: Temperature) -> Result<bool> {
        self.update(Section::Temperature, name, Value::Temperature(reading), false)
    }

    pub fn subscribe(&mut self, section: Section, name: &str, observer: Box<dyn StateObserver>) -> Result<()> {
        let idx = self.index_of(section, name)?;
        self.slots[idx].state.subscribe(observer);
        Ok(())
    }

    // ── Reads ─────────────────────────────────────────────────

    pub fn get(&self, section: Section, name: &str) -> Result<Option<Value>> {
        Ok(self.device(section, name)?.current())
    }

    pub fn get_previous(&self, section: Section, name: &str) -> Result<Option<Value>> {
        Ok(self.device(section, name)?.previous())
    }

    pub fn get_last_changed(&self, section: Section, name: &str) -> Result<Option<NaiveDateTime>> {
        Ok(self.device(section, name)?.last_changed())
    }

    /// Last change as `dd.mm.yy HH:MM`, or `"Unknown"`.
    pub fn action_time(&self, section: Section, name: &str) -> Result<String> {
        Ok(self
            .get_last_changed(section, name)?
            .map_or_else(|| "Unknown".to_string(), |ts| ts.format(ACTION_TIME_FORMAT).to_string()))
    }

    pub fn valve(&self, valve: ValveId) -> Option<ValveState> {
        self.typed(Section::Valve, valve.device_name()).and_then(Value::as_valve)
    }

    pub fn leak(&self, zone: Zone) -> Option<LeakState> {
        self.typed(Section::Leak, zone.device_name()).and_then(Value::as_leak)
    }

    pub fn heater(&self) -> Option<HeaterState> {
        self.typed(Section::Heater, HEATER_POWER_SWITCH).and_then(Value::as_heater)
    }

    pub fn temperature(&self, name: &str) -> Option<Temperature> {
        self.typed(Section::Temperature, name).and_then(Value::as_temperature)
    }

    pub fn temperature_trend(&self, name: &str) -> Result<Trend> {
        let device = self.device(Section::Temperature, name)?;
        let celsius = |v: Option<Value>| v.and_then(Value::as_temperature).and_then(Temperature::celsius);
        Ok(match (celsius(device.current()), celsius(device.previous())) {
            (Some(now), Some(before)) if now > before => Trend::Up,
            (Some(now), Some(before)) if now < before => Trend::Down,
            (Some(_), Some(_)) => Trend::Steady,
            _ => Trend::Unknown,
        })
    }

    // ── Persistence status ────────────────────────────────────

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    pub fn dirty_count(&self) -> usize {
        self.dirty.len()
    }

    pub fn has_critical_pending(&self) -> bool {
        self.dirty.values().any(|critical| *critical)
    }

    pub fn write_failures(&self) -> u8 {
        self.write_failures
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Last in-memory snapshot taken after persistence degraded.
    pub fn emergency_snapshot(&self) -> Option<&StateDocument> {
        self.emergency.as_ref()
    }

    /// Full document built from memory.
    pub fn snapshot(&self) -> StateDocument {
        let mut doc = StateDocument::default();
        for slot in &self.slots {
            doc.section_mut(slot.state.section())
                .insert(slot.state.name().to_string(), slot.state.record());
        }
        doc
    }

    // ── Load / recovery ──────────────────────────────────────

    /// Rehydrate from disk: primary, then backup, then fresh defaults.
    ///
    /// Leak values are never restored; they are re-derived from live sensor
    /// reads.  Valve, heater and temperature values are.
    pub fn load(&mut self, fs: &mut impl FilePort) -> LoadSource {
        let candidates = [
            (self.settings.primary_path.clone(), LoadSource::Primary),
            (self.settings.backup_path.clone(), LoadSource::Backup),
        ];
        for (path, source) in candidates {
            match self.read_validated(fs, &path) {
                Ok((doc, decoded)) => {
                    self.apply_loaded(&doc, &decoded);
                    info!("STATES: loaded device state from {}", path);
                    return source;
                }
                Err(e) => warn!("STATES: {} rejected: {}", path, e),
            }
        }

        warn!("STATES: no usable state file, writing defaults");
        let doc = self.snapshot();
        match doc.to_bytes() {
            Ok(bytes) => match self.write_atomically(fs, &bytes, false) {
                Ok(()) => self.record_written(0..self.slots.len()),
                Err(e) => {
                    error!("STATES: writing defaults failed: {}", e);
                    for idx in 0..self.slots.len() {
                        self.mark_dirty(idx, false);
                    }
                }
            },
            Err(e) => error!("STATES: encoding defaults failed: {}", e),
        }
        LoadSource::Defaults
    }

    fn read_validated(
        &self,
        fs: &impl FilePort,
        path: &str,
    ) -> core::result::Result<(StateDocument, Vec<Option<DecodedRecord>>), PersistenceError> {
        let bytes = fs.read(path).map_err(|_| PersistenceError::LoadFailed)?;
        let doc = StateDocument::from_bytes(&bytes)?;
        // Decode everything before applying anything.
        let decoded = self
            .slots
            .iter()
            .map(|slot| {
                doc.record(slot.state.section(), slot.state.name())
                    .map(|r| r.decode(slot.state.section()))
                    .transpose()
            })
            .collect::<core::result::Result<Vec<_>, _>>()?;
        Ok((doc, decoded))
    }

    fn apply_loaded(&mut self, doc: &StateDocument, decoded: &[Option<DecodedRecord>]) {
        for (slot, record) in self.slots.iter_mut().zip(decoded) {
            let section = slot.state.section();
            let on_disk = doc.record(section, slot.state.name());
            if section == Section::Leak {
                slot.last_written = on_disk.and_then(|r| serde_json::to_string(r).ok());
                continue;
            }
            if let Some(r) = record {
                slot.state.restore(r.current, r.previous, r.last_changed);
                slot.last_written = slot.payload();
            }
        }
        self.dirty.clear();
    }

    // ── Flush ─────────────────────────────────────────────────

    /// Flush if anything is dirty and either the write interval elapsed or a
    /// critical change is pending.
    pub fn flush_if_due(&mut self, fs: &mut impl FilePort) -> Result<FlushOutcome> {
        if self.dirty.is_empty() {
            return Ok(FlushOutcome::Clean);
        }
        let elapsed = self.clock.monotonic_ms().saturating_sub(self.last_flush_ms);
        if !self.has_critical_pending() && elapsed < self.settings.write_interval_ms {
            return Ok(FlushOutcome::NotDue);
        }
        self.flush(fs)
    }

    /// Flush now, ignoring the interval.  Unchanged payloads are still
    /// suppressed.
    pub fn force_flush(&mut self, fs: &mut impl FilePort) -> Result<FlushOutcome> {
        if self.dirty.is_empty() {
            return Ok(FlushOutcome::Clean);
        }
        self.flush(fs)
    }

    fn flush(&mut self, fs: &mut impl FilePort) -> Result<FlushOutcome> {
        let primary = fs
            .read(&self.settings.primary_path)
            .map_err(|_| PersistenceError::LoadFailed)
            .and_then(|bytes| StateDocument::from_bytes(&bytes));
        let primary_valid = primary.is_ok();
        let mut doc = primary.unwrap_or_default();

        let mut changed = Vec::new();
        for (&idx, _) in &self.dirty {
            let slot = &self.slots[idx];
            let Some(payload) = slot.payload() else {
                continue;
            };
            if slot.last_written.as_deref() == Some(payload.as_str()) {
                continue;
            }
            doc.section_mut(slot.state.section())
                .insert(slot.state.name().to_string(), slot.state.record());
            changed.push(idx);
        }
        // Keep the file's sections complete even when starting from an
        // empty document.
        for (idx, slot) in self.slots.iter().enumerate() {
            let section = doc.section_mut(slot.state.section());
            if !section.contains_key(slot.state.name()) {
                section.insert(slot.state.name().to_string(), slot.state.record());
                changed.push(idx);
            }
        }

        if changed.is_empty() {
            debug!("STATES: {} dirty record(s) unchanged on disk, write skipped", self.dirty.len());
            self.finish_flush();
            return Ok(FlushOutcome::Suppressed);
        }

        let result = doc
            .to_bytes()
            .map_err(|_| StorageError::IoError)
            .and_then(|bytes| self.write_atomically(fs, &bytes, primary_valid));
        match result {
            Ok(()) => {
                let records = changed.len();
                self.record_written(changed);
                self.finish_flush();
                self.write_failures = 0;
                if self.degraded {
                    info!("STATES: persistence recovered");
                    self.degraded = false;
                    self.emergency = None;
                }
                debug!("STATES: state file written ({} record(s))", records);
                Ok(FlushOutcome::Written { records })
            }
            Err(e) => {
                self.write_failures = self.write_failures.saturating_add(1);
                if self.write_failures >= self.settings.max_write_failures {
                    self.degraded = true;
                    self.emergency = Some(self.snapshot());
                    error!(
                        "STATES: {} consecutive write failures ({}), keeping in-memory snapshot",
                        self.write_failures, e
                    );
                    Err(Error::Persistence(PersistenceError::Degraded))
                } else {
                    warn!(
                        "STATES: write failed ({}), retry next tick [{}/{}]",
                        e, self.write_failures, self.settings.max_write_failures
                    );
                    Err(Error::Persistence(PersistenceError::WriteFailed))
                }
            }
        }
    }

    /// Backup refresh, temp write, rename.  The temp file is removed on any
    /// failure after it was created.
    fn write_atomically(
        &self,
        fs: &mut impl FilePort,
        bytes: &[u8],
        refresh_backup: bool,
    ) -> core::result::Result<(), StorageError> {
        let s = &self.settings;
        if let Some(free) = fs.available_bytes(&s.primary_path) {
            if free < s.min_free_bytes {
                warn!("STATES: only {} bytes free, need {}", free, s.min_free_bytes);
                return Err(StorageError::Full);
            }
        }
        // A primary that failed to parse must not overwrite the last good backup.
        if refresh_backup && fs.exists(&s.primary_path) {
            fs.copy(&s.primary_path, &s.backup_path)?;
        }
        if let Err(e) = fs.write(&s.temp_path, bytes) {
            let _ = fs.remove(&s.temp_path);
            return Err(e);
        }
        if let Err(e) = fs.rename(&s.temp_path, &s.primary_path) {
            let _ = fs.remove(&s.temp_path);
            return Err(e);
        }
        Ok(())
    }

    fn record_written(&mut self, indices: impl IntoIterator<Item = usize>) {
        for idx in indices {
            let payload = self.slots[idx].payload();
            self.slots[idx].last_written = payload;
        }
    }

    fn finish_flush(&mut self) {
        self.dirty.clear();
        self.last_flush_ms = self.clock.monotonic_ms();
    }

    // ── Internal ──────────────────────────────────────────────

    fn index_of(&self, section: Section, name: &str) -> Result<usize> {
        self.slots
            .iter()
            .position(|s| s.state.section() == section && s.state.name() == name)
            .ok_or_else(|| Error::unknown_device(section, name))
    }

    fn checked_index(&self, section: Section, name: &str, value: &Value) -> Result<usize> {
        if value.section() != section {
            return Err(Error::SectionMismatch {
                expected: section,
                found: value.section(),
            });
        }
        self.index_of(section, name)
    }

    fn device(&self, section: Section, name: &str) -> Result<&DeviceState> {
        let idx = self.index_of(section, name)?;
        Ok(&self.slots[idx].state)
    }

    fn typed(&self, section: Section, name: &str) -> Option<Value> {
        self.get(section, name).ok().flatten()
    }

    fn mark_dirty(&mut self, idx: usize, critical: bool) {
        let critical = critical || self.dirty.get(&idx).copied().unwrap_or(false);
        if self.dirty.insert(idx, critical).is_err() {
            // Capacity exceeds the device table; unreachable in practice.
            error!("STATES: dirty set full, dropping slot {}", idx);
        }
    }
}

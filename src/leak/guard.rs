//! Site-wide leak alarm and emergency shutdown.
//!
//! ```text
//!            wet edge                     clear(), still wet
//!   CLEAR ─────────────▶ ACTIVE ─────────────────────────▶ ACKNOWLEDGED
//!     ▲                    ▲  │                                │
//!     │                    │  └── zone relabel (no re-action)  │
//!     │                    └────── new wet edge (re-alarm) ────┤
//!     └──────────────── all zones dry ◀────────────────────────┘
//! ```
//!
//! Entering ACTIVE runs the emergency action once: close both valves,
//! cut heater power, start the alarm sound, show the alarm screen.  Every
//! step is attempted even when an earlier one fails.  Recovery to CLEAR
//! silences the alarm but does not re-open valves or re-power the heater.

use core::cell::RefCell;

use log::{debug, error, info, warn};
use serde::Serialize;

use crate::app::events::AppEvent;
use crate::app::ports::{AlarmSoundPort, DisplayPort, EventSink, HeaterPort, PortError};
use crate::devices::{Zone, ZoneLabel};
use crate::state::{HeaterState, LeakState, StateStore};
use crate::valves::WaterLineValves;

use super::channel::LeakChannel;

pub const ALARM_TITLE: &str = "LEAK DETECTED";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlarmState {
    Clear,
    Active,
    Acknowledged,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlarmRecord {
    pub triggered: [bool; 2],
    pub acknowledged: bool,
    /// `None` iff no zone is triggered.
    pub affected: Option<ZoneLabel>,
}

/// Everything the guard acts on, borrowed for one call.
pub struct GuardIo<'a> {
    pub store: &'a mut StateStore,
    pub valves: &'a mut WaterLineValves,
    pub heater: &'a mut dyn HeaterPort,
    pub alarm: &'a mut dyn AlarmSoundPort,
    pub display: &'a RefCell<dyn DisplayPort + 'static>,
    pub sink: &'a mut dyn EventSink,
}

impl GuardIo<'_> {
    fn display(&self, action: &str, f: impl FnOnce(&mut dyn DisplayPort) -> Result<(), PortError>) {
        match self.display.try_borrow_mut() {
            Ok(mut d) => {
                if let Err(e) = f(&mut *d) {
                    error!("LEAK: display {} failed: {}", action, e);
                }
            }
            Err(_) => warn!("LEAK: display busy, {} skipped", action),
        }
    }

    fn record_leak(&mut self, zone: Zone, wet: bool) {
        if let Err(e) = self.store.set_leak(zone, LeakState::from_wet(wet)) {
            error!("LEAK: could not record {}: {}", zone, e);
        }
    }
}

pub struct LeakGuard {
    channels: [LeakChannel; 2],
    state: AlarmState,
    record: AlarmRecord,
    startup_pending: bool,
    emergencies: u32,
}

impl LeakGuard {
    pub fn new(zone_1: LeakChannel, zone_2: LeakChannel) -> Self {
        let startup_pending = zone_1.last_reported() || zone_2.last_reported();
        Self {
            channels: [zone_1, zone_2],
            state: AlarmState::Clear,
            record: AlarmRecord::default(),
            startup_pending,
            emergencies: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Record live dry zones and start sampling.  If a zone read wet at
    /// construction, sampling waits for [`verify_startup`].
    ///
    /// [`verify_startup`]: LeakGuard::verify_startup
    pub fn start(&mut self, io: &mut GuardIo<'_>) {
        for ch in &self.channels {
            if !ch.last_reported() {
                io.record_leak(ch.zone(), false);
            }
        }
        if self.startup_pending {
            warn!("LEAK: zone wet at power-on, re-checking after stabilisation");
            return;
        }
        self.start_sampling();
    }

    pub fn stop(&mut self) {
        for ch in &mut self.channels {
            ch.stop();
        }
        info!("LEAK: monitoring stopped");
    }

    pub fn startup_pending(&self) -> bool {
        self.startup_pending
    }

    /// Second look at a zone that was wet at power-on.
    pub fn verify_startup(&mut self, io: &mut GuardIo<'_>) {
        if !self.startup_pending {
            return;
        }
        self.startup_pending = false;
        let wet = [self.channels[0].resync(), self.channels[1].resync()];
        for (ch, wet) in self.channels.iter().zip(wet) {
            io.record_leak(ch.zone(), wet);
        }
        match ZoneLabel::from_triggered(wet) {
            Some(label) => {
                error!("LEAK: power-on leak confirmed in {}", label);
                self.record.triggered = wet;
                self.enter_active(label, io);
            }
            None => {
                info!("LEAK: power-on wet reading was transient, ignored");
                io.sink.emit(&AppEvent::BootLeakDismissed);
            }
        }
        self.start_sampling();
    }

    // ── Sampling ──────────────────────────────────────────────

    /// Take one debounced sample per zone and advance the alarm.
    pub fn poll(&mut self, io: &mut GuardIo<'_>) {
        if self.startup_pending {
            return;
        }
        let edges = [self.channels[0].sample(), self.channels[1].sample()];
        self.evaluate(edges, io);
    }

    fn evaluate(&mut self, edges: [Option<bool>; 2], io: &mut GuardIo<'_>) {
        for (ch, edge) in self.channels.iter().zip(edges) {
            if let Some(wet) = edge {
                info!("LEAK: {} {}", ch.zone(), if wet { "wet" } else { "dry" });
                io.record_leak(ch.zone(), wet);
            }
        }

        let wet_now = [self.channels[0].last_reported(), self.channels[1].last_reported()];
        let Some(label) = ZoneLabel::from_triggered(wet_now) else {
            if self.state != AlarmState::Clear {
                self.recover(io);
            }
            return;
        };
        self.record.triggered = wet_now;

        let new_wet = edges.contains(&Some(true));
        match self.state {
            AlarmState::Clear => self.enter_active(label, io),
            AlarmState::Acknowledged if new_wet => {
                warn!("LEAK: new leak while acknowledged, re-alarming");
                self.record.acknowledged = false;
                self.enter_active(label, io);
            }
            AlarmState::Acknowledged => self.record.affected = Some(label),
            AlarmState::Active => {
                if self.record.affected != Some(label) {
                    self.record.affected = Some(label);
                    io.display("show_alarm", |d| d.show_alarm(ALARM_TITLE, label));
                    io.sink.emit(&AppEvent::AlarmRelabelled { zones: label });
                }
            }
        }
    }

    // ── Acknowledgement ──────────────────────────────────────

    /// Silence the alarm.  Zones are re-read directly: if all are dry the
    /// alarm clears, otherwise it is acknowledged.  Valves and heater stay
    /// off either way.
    pub fn clear(&mut self, io: &mut GuardIo<'_>) -> AlarmState {
        if self.state == AlarmState::Clear {
            debug!("LEAK: clear requested with no alarm");
            return AlarmState::Clear;
        }
        let wet = [self.channels[0].is_wet(), self.channels[1].is_wet()];
        let Some(label) = ZoneLabel::from_triggered(wet) else {
            for ch in &mut self.channels {
                ch.resync();
            }
            self.recover(io);
            return AlarmState::Clear;
        };

        if let Err(e) = io.alarm.off() {
            error!("LEAK: alarm sound could not be stopped: {}", e);
        }
        io.display("reset_alarm", |d| d.reset_alarm());
        self.state = AlarmState::Acknowledged;
        self.record.acknowledged = true;
        self.record.triggered = wet;
        self.record.affected = Some(label);
        info!("LEAK: alarm acknowledged, {} still wet", label);
        io.sink.emit(&AppEvent::AlarmAcknowledged { zones: label });
        AlarmState::Acknowledged
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> AlarmState {
        self.state
    }

    pub fn record(&self) -> AlarmRecord {
        self.record
    }

    pub fn is_detected_leaks(&self) -> bool {
        self.state != AlarmState::Clear
    }

    /// How often the emergency action has run since boot.
    pub fn emergency_count(&self) -> u32 {
        self.emergencies
    }

    pub fn channel(&self, zone: Zone) -> &LeakChannel {
        &self.channels[zone.index()]
    }

    // ── Internal ──────────────────────────────────────────────

    fn start_sampling(&mut self) {
        for ch in &mut self.channels {
            ch.start();
        }
        info!("LEAK: monitoring {} and {}", self.channels[0].zone(), self.channels[1].zone());
    }

    fn enter_active(&mut self, label: ZoneLabel, io: &mut GuardIo<'_>) {
        self.state = AlarmState::Active;
        self.record.affected = Some(label);
        self.emergencies += 1;
        error!("LEAK: leak detected in {}, emergency shutdown", label);

        // 1. Valves
        if let Err(e) = io.valves.emergency_close(io.store) {
            error!("LEAK: emergency valve close incomplete: {}", e);
        }

        // 2. Heater
        match io.heater.power_off() {
            Ok(()) => {
                if let Err(e) = io.store.set_heater(HeaterState::Off) {
                    error!("LEAK: could not record heater off: {}", e);
                }
            }
            Err(e) => error!("LEAK: heater power-off failed: {}", e),
        }

        // 3. Alarm sound
        if let Err(e) = io.alarm.play_alarm() {
            error!("LEAK: alarm sound failed: {}", e);
        }

        // 4. Display
        io.display("show_alarm", |d| d.show_alarm(ALARM_TITLE, label));

        // 5. Per-zone state
        for (ch, wet) in self.channels.iter().zip(self.record.triggered) {
            if wet {
                io.record_leak(ch.zone(), true);
            }
        }

        io.sink.emit(&AppEvent::LeakDetected { zones: label });
    }

    fn recover(&mut self, io: &mut GuardIo<'_>) {
        self.state = AlarmState::Clear;
        self.record = AlarmRecord::default();
        if let Err(e) = io.alarm.off() {
            error!("LEAK: alarm sound could not be stopped: {}", e);
        }
        io.display("reset_alarm", |d| d.reset_alarm());
        for ch in &self.channels {
            io.record_leak(ch.zone(), false);
        }
        info!("LEAK: all zones dry, alarm cleared");
        io.sink.emit(&AppEvent::AlarmCleared);
    }
}

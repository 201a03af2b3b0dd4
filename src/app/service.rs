//! Application service: the hexagonal core.
//!
//! [`LeakController`] owns the state store, the valve pair, the leak guard
//! and the collaborator handles.  It exposes a hardware-agnostic API driven
//! by the runtime loops; filesystem and event sinks are injected at call
//! sites, making the whole service testable with mock adapters.
//!
//! ```text
//!  SensePin ──▶ ┌─────────────────────────────┐ ──▶ EventSink
//!               │        LeakController        │
//!  FilePort ◀──▶│ StateStore · Valves · Guard  │──▶ Display / Buzzers / Heater
//!               └─────────────────────────────┘
//! ```

use log::{debug, error, info, warn};

use crate::config::SystemConfig;
use crate::devices::{self, ValveId, Zone};
use crate::drivers::board::BoardPins;
use crate::drivers::heater::{self, HeaterSwitch};
use crate::error::{Error, Result};
use crate::leak::{Debounce, GuardIo, LeakChannel, LeakGuard};
use crate::sensors::{TempMonitor, TempOutcome, TempSettings};
use crate::state::{FlushOutcome, LoadSource, StateStore};
use crate::valves::{Direction, DisplayProgress, TickOutcome, ValveController, WaterLineValves};

use super::commands::AppCommand;
use super::events::{AppEvent, StatusSnapshot};
use super::ports::{AlarmSoundPort, Clock, ControlSoundPort, EventSink, FilePort, HeaterPort, SharedDisplay};

// ───────────────────────────────────────────────────────────────
// Peripherals
// ───────────────────────────────────────────────────────────────

/// Collaborators the core drives but does not own the behaviour of.
pub struct Peripherals {
    pub heater: Box<dyn HeaterPort>,
    pub display: SharedDisplay,
    pub alarm: Box<dyn AlarmSoundPort>,
    pub control: Box<dyn ControlSoundPort>,
}

// ───────────────────────────────────────────────────────────────
// LeakController
// ───────────────────────────────────────────────────────────────

pub struct LeakController {
    store: StateStore,
    valves: WaterLineValves,
    guard: LeakGuard,
    temps: Vec<TempMonitor>,
    hw: Peripherals,
}

impl LeakController {
    /// Does **not** load state or start monitoring. Call [`start`] next.
    ///
    /// [`start`]: LeakController::start
    pub fn new(store: StateStore, valves: WaterLineValves, guard: LeakGuard, hw: Peripherals) -> Self {
        Self {
            store,
            valves,
            guard,
            temps: Vec::new(),
            hw,
        }
    }

    /// Attach a temperature probe monitor, polled by [`sample_temperatures`].
    ///
    /// [`sample_temperatures`]: LeakController::sample_temperatures
    pub fn with_temperature(mut self, monitor: TempMonitor) -> Self {
        self.temps.push(monitor);
        self
    }

    /// Wire a controller onto a claimed board.  Valve progress goes to the
    /// shared display.
    pub fn from_board(
        config: &SystemConfig,
        board: BoardPins,
        clock: Box<dyn Clock>,
        display: SharedDisplay,
        alarm: Box<dyn AlarmSoundPort>,
        control: Box<dyn ControlSoundPort>,
    ) -> Self {
        let travel = config.valve_travel_secs;
        let valve = |id: ValveId, open, close, fault| {
            let progress = DisplayProgress::new(id, Some(display.clone()));
            ValveController::new(id, open, close, travel, Box::new(progress)).with_feedback(fault)
        };
        let valves = WaterLineValves::new(
            valve(ValveId::Hot, board.hot_open, board.hot_close, board.hot_fault),
            valve(ValveId::Cold, board.cold_open, board.cold_close, board.cold_fault),
        );

        let debounce = Debounce::from_config(config);
        let guard = LeakGuard::new(
            LeakChannel::new(Zone::Zone1, board.zone_1, debounce),
            LeakChannel::new(Zone::Zone2, board.zone_2, debounce),
        );

        let hw = Peripherals {
            heater: Box::new(HeaterSwitch::new(board.heater)),
            display,
            alarm,
            control,
        };
        let temps = TempSettings::from_config(config);
        Self::new(StateStore::new(config, clock), valves, guard, hw)
            .with_temperature(TempMonitor::new(devices::HOT_WATER_TEMP, board.hot_water_temp, temps))
            .with_temperature(TempMonitor::new(devices::HEATER_TEMP, board.heater_temp, temps))
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Load persisted state, restore the heater, start leak monitoring.
    pub fn start(&mut self, fs: &mut impl FilePort, sink: &mut impl EventSink) -> LoadSource {
        let source = self.store.load(fs);
        heater::restore(self.hw.heater.as_mut(), &self.store);

        for id in ValveId::ALL {
            if self.valves.get(id).is_travel_interrupted(&self.store) {
                warn!("APP: {} valve was stopped mid-travel, position unknown", id.label());
            }
        }

        self.with_guard(sink, |guard, io| guard.start(io));
        let leak_at_boot = self.guard.startup_pending();
        if !leak_at_boot {
            if let Err(e) = self.hw.control.play_startup() {
                debug!("APP: startup tone failed: {}", e);
            }
        }

        info!("APP: controller started (state from {:?})", source);
        sink.emit(&AppEvent::Started { source, leak_at_boot });
        source
    }

    /// Stop all valve travel, silence the alarm and write pending state.
    pub fn shutdown(&mut self, fs: &mut impl FilePort, sink: &mut impl EventSink) -> Result<FlushOutcome> {
        self.valves.force_stop();
        self.guard.stop();
        if let Err(e) = self.hw.alarm.off() {
            warn!("APP: alarm could not be silenced: {}", e);
        }
        let flushed = self.store.force_flush(fs);
        match &flushed {
            Ok(outcome) => info!("APP: shutdown flush {:?}", outcome),
            Err(e) => error!("APP: shutdown flush failed: {}", e),
        }
        sink.emit(&AppEvent::Stopped);
        flushed
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// One second of valve travel.
    pub fn tick_valves(&mut self, sink: &mut impl EventSink) {
        for (valve, outcome) in self.valves.tick(&mut self.store) {
            match outcome {
                TickOutcome::Completed(state) => sink.emit(&AppEvent::ValveCompleted { valve, state }),
                TickOutcome::Faulted => {
                    let message = format!("{} valve fault", valve.label());
                    match self.hw.display.try_borrow_mut() {
                        Ok(mut d) => {
                            if let Err(e) = d.show_error(&message) {
                                warn!("APP: error screen failed: {}", e);
                            }
                        }
                        Err(_) => warn!("APP: display busy, '{}' not shown", message),
                    }
                    sink.emit(&AppEvent::ValveFaulted { valve });
                }
                TickOutcome::Idle | TickOutcome::Driving { .. } => {}
            }
        }
    }

    /// One debounced leak sample per zone.
    pub fn sample_leaks(&mut self, sink: &mut impl EventSink) {
        self.with_guard(sink, |guard, io| guard.poll(io));
    }

    /// Re-check a zone that was wet at power-on.
    pub fn verify_startup_leak(&mut self, sink: &mut impl EventSink) {
        self.with_guard(sink, |guard, io| guard.verify_startup(io));
    }

    /// Flush the state store if due.
    pub fn flush_tick(&mut self, fs: &mut impl FilePort, sink: &mut impl EventSink) -> Result<FlushOutcome> {
        let result = self.store.flush_if_due(fs);
        match &result {
            Ok(FlushOutcome::Written { records }) => sink.emit(&AppEvent::StateFlushed { records: *records }),
            Ok(_) => {}
            Err(e) => {
                warn!("APP: state flush failed: {}", e);
                sink.emit(&AppEvent::PersistenceFailed {
                    failures: self.store.write_failures(),
                    degraded: self.store.is_degraded(),
                });
            }
        }
        result
    }

    /// Read every temperature probe once.
    pub fn sample_temperatures(&mut self, sink: &mut impl EventSink) {
        for monitor in &mut self.temps {
            match monitor.poll(&mut self.store) {
                Ok(TempOutcome::Failed) => sink.emit(&AppEvent::TemperatureSensorFailed {
                    device: monitor.device(),
                }),
                Ok(_) => {}
                Err(e) => warn!("APP: {} reading not recorded: {}", monitor.device(), e),
            }
        }
    }

    // ── Command handling ──────────────────────────────────────

    /// Process a manual command.  Rejections are logged and emitted as
    /// [`AppEvent::CommandRejected`] before being returned.
    ///
    /// [`AppCommand::Shutdown`] is a no-op here; the runtime owns teardown.
    pub fn handle_command(&mut self, cmd: AppCommand, sink: &mut impl EventSink) -> Result<()> {
        let result = match cmd {
            AppCommand::OpenValve(valve) => self.remote_drive(valve, Direction::Open, sink),
            AppCommand::CloseValve(valve) => self.remote_drive(valve, Direction::Close, sink),
            AppCommand::StopValve(valve) => {
                if self.valves.get_mut(valve).force_stop() {
                    sink.emit(&AppEvent::ValveStopped { valve });
                }
                Ok(())
            }
            AppCommand::ValveButton { valve, direction } => self.button_drive(valve, direction, sink),
            AppCommand::ToggleHeater => self.toggle_heater(sink),
            AppCommand::ClearAlarm => {
                self.with_guard(sink, |guard, io| guard.clear(io));
                Ok(())
            }
            AppCommand::ReportStatus => {
                sink.emit(&AppEvent::Status(self.status()));
                Ok(())
            }
            AppCommand::Shutdown => Ok(()),
        };
        if let Err(e) = &result {
            warn!("APP: {} rejected: {}", cmd.name(), e);
            sink.emit(&AppEvent::CommandRejected {
                command: cmd.name(),
                reason: e.clone(),
            });
        }
        result
    }

    fn remote_drive(&mut self, valve: ValveId, direction: Direction, sink: &mut impl EventSink) -> Result<()> {
        if direction == Direction::Open && self.guard.is_detected_leaks() {
            return Err(Error::LeakLockout);
        }
        self.drive(valve, direction)?;
        sink.emit(&AppEvent::ValveStarted { valve, direction });
        Ok(())
    }

    /// A press during an alarm acknowledges it and does nothing else.
    fn button_drive(&mut self, valve: ValveId, direction: Direction, sink: &mut impl EventSink) -> Result<()> {
        if self.guard.is_detected_leaks() {
            self.with_guard(sink, |guard, io| guard.clear(io));
            info!("APP: {} button ignored, leak detected", valve.label());
            return Err(Error::LeakLockout);
        }
        if self.valves.get_mut(valve).force_stop() {
            sink.emit(&AppEvent::ValveStopped { valve });
        }
        match self.drive(valve, direction) {
            Ok(()) => {
                self.tone(true);
                info!("APP: manual {} of {}", direction.verb(), valve.device_name());
                sink.emit(&AppEvent::ValveStarted { valve, direction });
                Ok(())
            }
            Err(e) => {
                self.tone(false);
                Err(e)
            }
        }
    }

    fn toggle_heater(&mut self, sink: &mut impl EventSink) -> Result<()> {
        if self.guard.is_detected_leaks() {
            self.with_guard(sink, |guard, io| guard.clear(io));
            if self.guard.is_detected_leaks() {
                return Err(Error::LeakLockout);
            }
        }
        let state = heater::toggle(self.hw.heater.as_mut(), &mut self.store)?;
        self.tone(true);
        sink.emit(&AppEvent::HeaterChanged(state));
        Ok(())
    }

    fn drive(&mut self, valve: ValveId, direction: Direction) -> Result<()> {
        let controller = self.valves.get_mut(valve);
        match direction {
            Direction::Open => controller.open(&mut self.store)?,
            Direction::Close => controller.close(&mut self.store)?,
        }
        Ok(())
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn status(&self) -> StatusSnapshot {
        let record = self.guard.record();
        StatusSnapshot {
            alarm: self.guard.state(),
            affected: record.affected,
            acknowledged: record.acknowledged,
            hot_water_valve: self.store.valve(ValveId::Hot),
            cold_water_valve: self.store.valve(ValveId::Cold),
            valves_moving: self.valves.is_in_progress(),
            zone_1: self.store.leak(Zone::Zone1),
            zone_2: self.store.leak(Zone::Zone2),
            heater: self.store.heater(),
            hot_water_temp: self.store.temperature(devices::HOT_WATER_TEMP),
            heater_temp: self.store.temperature(devices::HEATER_TEMP),
            pending_writes: self.store.dirty_count(),
            write_failures: self.store.write_failures(),
            degraded: self.store.is_degraded(),
        }
    }

    pub fn is_detected_leaks(&self) -> bool {
        self.guard.is_detected_leaks()
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn valves(&self) -> &WaterLineValves {
        &self.valves
    }

    pub fn guard(&self) -> &LeakGuard {
        &self.guard
    }

    pub fn heater_is_on(&self) -> bool {
        self.hw.heater.is_on()
    }

    // ── Internal ──────────────────────────────────────────────

    fn with_guard<R>(
        &mut self,
        sink: &mut impl EventSink,
        f: impl FnOnce(&mut LeakGuard, &mut GuardIo<'_>) -> R,
    ) -> R {
        let Self {
            store,
            valves,
            guard,
            hw,
            ..
        } = self;
        let mut io = GuardIo {
            store,
            valves,
            heater: hw.heater.as_mut(),
            alarm: hw.alarm.as_mut(),
            display: &*hw.display,
            sink,
        };
        f(guard, &mut io)
    }

    fn tone(&mut self, confirm: bool) {
        let played = if confirm {
            self.hw.control.play_confirm()
        } else {
            self.hw.control.play_error()
        };
        if let Err(e) = played {
            debug!("APP: control tone failed: {}", e);
        }
    }
}

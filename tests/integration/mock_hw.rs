//! Mock hardware for integration tests.
//!
//! Records every display, buzzer and event call so tests can assert on the
//! full history without real GPIO.  Pins come from the simulated board, so
//! the tests drive the same `SimPin`s the host binary does.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use leakguard::adapters::mem_fs::MemFs;
use leakguard::app::commands::AppCommand;
use leakguard::app::events::AppEvent;
use leakguard::app::ports::{
    AlarmSoundPort, Clock, ControlSoundPort, DisplayPort, EventSink, PortError, SharedDisplay,
};
use leakguard::app::service::LeakController;
use leakguard::config::SystemConfig;
use leakguard::devices::{Zone, ZoneLabel};
use leakguard::drivers::board::{self, SimHandles};
use leakguard::state::LoadSource;

// ── Call record ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ShowAlarm { title: String, zones: ZoneLabel },
    ResetAlarm,
    Progress { title: String, device_id: String, fraction: f32 },
    ShowError(String),
    AlarmOn,
    AlarmOff,
    Confirm,
    ErrorTone,
    Startup,
}

pub type CallLog = Rc<RefCell<Vec<Call>>>;

// ── Display / buzzers ─────────────────────────────────────────

pub struct MockDisplay(pub CallLog);

impl DisplayPort for MockDisplay {
    fn show_alarm(&mut self, title: &str, zones: ZoneLabel) -> Result<(), PortError> {
        self.0.borrow_mut().push(Call::ShowAlarm {
            title: title.into(),
            zones,
        });
        Ok(())
    }

    fn reset_alarm(&mut self) -> Result<(), PortError> {
        self.0.borrow_mut().push(Call::ResetAlarm);
        Ok(())
    }

    fn show_progress(&mut self, title: &str, device_id: &str, fraction: f32) -> Result<(), PortError> {
        self.0.borrow_mut().push(Call::Progress {
            title: title.into(),
            device_id: device_id.into(),
            fraction,
        });
        Ok(())
    }

    fn show_error(&mut self, message: &str) -> Result<(), PortError> {
        self.0.borrow_mut().push(Call::ShowError(message.into()));
        Ok(())
    }
}

pub struct MockAlarm {
    pub log: CallLog,
    /// When set, `play_alarm` fails after recording the attempt.
    pub broken: bool,
}

impl AlarmSoundPort for MockAlarm {
    fn play_alarm(&mut self) -> Result<(), PortError> {
        self.log.borrow_mut().push(Call::AlarmOn);
        if self.broken {
            return Err(PortError::Unavailable);
        }
        Ok(())
    }

    fn off(&mut self) -> Result<(), PortError> {
        self.log.borrow_mut().push(Call::AlarmOff);
        Ok(())
    }
}

pub struct MockTones(pub CallLog);

impl ControlSoundPort for MockTones {
    fn play_confirm(&mut self) -> Result<(), PortError> {
        self.0.borrow_mut().push(Call::Confirm);
        Ok(())
    }

    fn play_error(&mut self) -> Result<(), PortError> {
        self.0.borrow_mut().push(Call::ErrorTone);
        Ok(())
    }

    fn play_startup(&mut self) -> Result<(), PortError> {
        self.0.borrow_mut().push(Call::Startup);
        Ok(())
    }
}

// ── Event sink ────────────────────────────────────────────────

/// Cloneable so a copy can be handed to `runtime::run` by value.
#[derive(Clone, Default)]
pub struct RecordingSink {
    pub events: Rc<RefCell<Vec<AppEvent>>>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn contains(&self, event: &AppEvent) -> bool {
        self.events.borrow().contains(event)
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.borrow().iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

// ── Clock ─────────────────────────────────────────────────────

/// Test-controlled clock.  Wall time starts at 2024-05-01 12:00:00.
#[derive(Clone, Default)]
pub struct ManualClock {
    ms: Rc<Cell<u64>>,
}

#[allow(dead_code)]
impl ManualClock {
    pub fn advance_secs(&self, secs: u64) {
        self.ms.set(self.ms.get() + secs * 1000);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        let base = NaiveDate::from_ymd_opt(2024, 5, 1)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .unwrap_or_default();
        base + TimeDelta::milliseconds(self.ms.get() as i64)
    }

    fn monotonic_ms(&self) -> u64 {
        self.ms.get()
    }
}

// ── Rig ───────────────────────────────────────────────────────

pub fn test_config() -> SystemConfig {
    SystemConfig {
        valve_travel_secs: 3,
        ..SystemConfig::default()
    }
}

/// A controller on a simulated board with recording collaborators.
pub struct Rig {
    pub ctl: LeakController,
    pub sim: SimHandles,
    pub fs: MemFs,
    pub sink: RecordingSink,
    pub log: CallLog,
    pub clock: ManualClock,
}

#[allow(dead_code)]
impl Rig {
    pub fn new() -> Self {
        Self::build(MemFs::new(), false, &[])
    }

    /// Build with some zones already wet at power-on.
    pub fn wet_at_boot(zones: &[Zone]) -> Self {
        Self::build(MemFs::new(), false, zones)
    }

    pub fn with_broken_alarm() -> Self {
        Self::build(MemFs::new(), true, &[])
    }

    /// A fresh controller over an existing filesystem (simulated reboot).
    pub fn reboot(fs: MemFs) -> Self {
        Self::build(fs, false, &[])
    }

    fn build(fs: MemFs, broken_alarm: bool, wet: &[Zone]) -> Self {
        let (pins, sim) = board::simulated();
        for zone in wet {
            match zone {
                Zone::Zone1 => sim.zone_1.set_level(false),
                Zone::Zone2 => sim.zone_2.set_level(false),
            }
        }
        let log: CallLog = Rc::default();
        let clock = ManualClock::default();
        let display: SharedDisplay = Rc::new(RefCell::new(MockDisplay(log.clone())));
        let ctl = LeakController::from_board(
            &test_config(),
            pins,
            Box::new(clock.clone()),
            display,
            Box::new(MockAlarm {
                log: log.clone(),
                broken: broken_alarm,
            }),
            Box::new(MockTones(log.clone())),
        );
        Self {
            ctl,
            sim,
            fs,
            sink: RecordingSink::default(),
            log,
            clock,
        }
    }

    pub fn start(&mut self) -> LoadSource {
        self.ctl.start(&mut self.fs, &mut self.sink)
    }

    pub fn wet(&self, zone: Zone, wet: bool) {
        match zone {
            Zone::Zone1 => self.sim.zone_1.set_level(!wet),
            Zone::Zone2 => self.sim.zone_2.set_level(!wet),
        }
    }

    pub fn poll(&mut self) {
        self.ctl.sample_leaks(&mut self.sink);
    }

    pub fn tick_valves(&mut self, secs: u32) {
        for _ in 0..secs {
            self.clock.advance_secs(1);
            self.ctl.tick_valves(&mut self.sink);
        }
    }

    pub fn cmd(&mut self, cmd: AppCommand) -> leakguard::Result<()> {
        self.ctl.handle_command(cmd, &mut self.sink)
    }

    pub fn calls(&self, call: &Call) -> usize {
        self.log.borrow().iter().filter(|c| *c == call).count()
    }

    pub fn alarm_screens(&self) -> Vec<ZoneLabel> {
        self.log
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::ShowAlarm { zones, .. } => Some(*zones),
                _ => None,
            })
            .collect()
    }
}

//! The cooperative runtime end to end: queued commands are handled on the
//! control thread and `Shutdown` ends `run` with a final flush.
//!
//! `COMMANDS` is a process-wide static, so everything that touches it lives
//! in this one test.

use leakguard::app::commands::AppCommand;
use leakguard::app::events::AppEvent;
use leakguard::devices::ValveId;
use leakguard::runtime::{self, CancelToken};
use leakguard::state::{LoadSource, ValveState};
use leakguard::valves::Direction;

use crate::mock_hw::{Rig, test_config};

#[test]
fn queued_commands_run_then_shutdown_flushes() {
    let rig = Rig::new();
    let sink = rig.sink.clone();

    assert!(runtime::submit(AppCommand::OpenValve(ValveId::Hot)));
    assert!(runtime::submit(AppCommand::ReportStatus));
    assert!(runtime::submit(AppCommand::Shutdown));

    let Rig { ctl, fs, .. } = rig;
    let cancel = CancelToken::new();
    let outcome = runtime::run(ctl, fs, sink.clone(), &test_config(), cancel.clone());

    assert!(outcome.is_ok(), "final flush failed: {:?}", outcome);
    assert!(cancel.is_cancelled());
    let events = sink.events.borrow();
    assert!(matches!(
        events.first(),
        Some(AppEvent::Started {
            source: LoadSource::Defaults,
            ..
        })
    ));
    assert!(events.contains(&AppEvent::ValveStarted {
        valve: ValveId::Hot,
        direction: Direction::Open
    }));
    let status = events.iter().find_map(|e| match e {
        AppEvent::Status(s) => Some(s.clone()),
        _ => None,
    });
    assert_eq!(status.and_then(|s| s.hot_water_valve), Some(ValveState::Opening));
    assert_eq!(events.last(), Some(&AppEvent::Stopped));
}

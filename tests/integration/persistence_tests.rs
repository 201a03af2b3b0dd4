//! State persistence against a real directory and the fault-injecting
//! in-memory filesystem.

use leakguard::adapters::fs::StdFs;
use leakguard::adapters::mem_fs::MemFs;
use leakguard::app::commands::AppCommand;
use leakguard::app::events::AppEvent;
use leakguard::app::ports::FilePort;
use leakguard::devices::{HOT_WATER_TEMP, ValveId};
use leakguard::state::{FlushOutcome, HeaterState, LoadSource, StateStore, Temperature, ValveState};

use crate::mock_hw::{ManualClock, Rig, test_config};

const PRIMARY: &str = "state/state.json";
const BACKUP: &str = "state/state_backup.json";
const TEMP: &str = "state/state_temp.json";

fn store() -> (StateStore, ManualClock) {
    let clock = ManualClock::default();
    (StateStore::new(&test_config(), Box::new(clock.clone())), clock)
}

// ── StdFs ─────────────────────────────────────────────────────

#[test]
fn state_survives_a_restart_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let mut fs = StdFs::new(dir.path());

    let (mut first, _) = store();
    assert_eq!(first.load(&mut fs), LoadSource::Defaults);
    first.set_valve(ValveId::Cold, ValveState::Opened).unwrap();
    first.set_heater(HeaterState::On).unwrap();
    assert!(matches!(first.force_flush(&mut fs).unwrap(), FlushOutcome::Written { records: 2 }));
    assert!(dir.path().join(PRIMARY).exists());
    assert!(dir.path().join(BACKUP).exists());
    assert!(!dir.path().join(TEMP).exists());

    let (mut second, _) = store();
    assert_eq!(second.load(&mut fs), LoadSource::Primary);
    assert_eq!(second.valve(ValveId::Cold), Some(ValveState::Opened));
    assert_eq!(second.heater(), Some(HeaterState::On));
    assert!(!second.is_dirty());
}

#[test]
fn state_file_is_sectioned_json() {
    let dir = tempfile::tempdir().unwrap();
    let mut fs = StdFs::new(dir.path());
    let (mut s, _) = store();
    s.load(&mut fs);

    let raw = std::fs::read_to_string(dir.path().join(PRIMARY)).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();
    for section in ["valve", "leak", "temperature", "heater"] {
        assert!(doc.get(section).is_some(), "missing section {section}");
    }
    assert!(doc["valve"].get("hot_water_valve").is_some());
}

// ── Crash safety ──────────────────────────────────────────────

#[test]
fn failed_rename_leaves_previous_primary_intact() {
    let mut fs = MemFs::new();
    let (mut s, _) = store();
    s.load(&mut fs);
    s.set_valve(ValveId::Hot, ValveState::Opened).unwrap();
    s.force_flush(&mut fs).unwrap();
    let before = fs.contents(PRIMARY).unwrap();

    s.set_valve(ValveId::Hot, ValveState::Closed).unwrap();
    fs.fail_renames(true);
    assert!(s.force_flush(&mut fs).is_err());
    assert_eq!(fs.contents(PRIMARY).unwrap(), before);
    assert!(!fs.exists(TEMP), "temp file is removed after a failed rename");
    assert!(s.is_dirty(), "the change stays queued for the next flush");

    let (mut restarted, _) = store();
    assert_eq!(restarted.load(&mut fs), LoadSource::Primary);
    assert_eq!(restarted.valve(ValveId::Hot), Some(ValveState::Opened));

    fs.fail_renames(false);
    s.force_flush(&mut fs).unwrap();
    let (mut again, _) = store();
    again.load(&mut fs);
    assert_eq!(again.valve(ValveId::Hot), Some(ValveState::Closed));
}

#[test]
fn corrupt_primary_falls_back_to_backup() {
    let mut fs = MemFs::new();
    let (mut s, _) = store();
    s.load(&mut fs);
    s.set_heater(HeaterState::On).unwrap();
    s.force_flush(&mut fs).unwrap();
    s.set_valve(ValveId::Cold, ValveState::Opened).unwrap();
    s.force_flush(&mut fs).unwrap();

    fs.put(PRIMARY, b"{\"valve\": {\"hot_water_valve\": ");
    let (mut restarted, _) = store();
    assert_eq!(restarted.load(&mut fs), LoadSource::Backup);
    assert_eq!(restarted.heater(), Some(HeaterState::On));
    // The backup predates the last flush.
    assert_ne!(restarted.valve(ValveId::Cold), Some(ValveState::Opened));
}

#[test]
fn both_files_corrupt_yields_defaults() {
    let mut fs = MemFs::new();
    fs.put(PRIMARY, b"not json");
    fs.put(BACKUP, br#"{"valve":{}}"#);
    let (mut s, _) = store();
    assert_eq!(s.load(&mut fs), LoadSource::Defaults);
    assert!(fs.contents(PRIMARY).is_some_and(|b| b != b"not json"));
    assert_eq!(
        fs.contents(BACKUP).unwrap(),
        br#"{"valve":{}}"#,
        "a corrupt primary never overwrites the backup"
    );
}

// ── Write policy ──────────────────────────────────────────────

#[test]
fn temperatures_wait_for_the_write_interval() {
    let mut fs = MemFs::new();
    let (mut s, clock) = store();
    s.load(&mut fs);
    s.set_temperature(HOT_WATER_TEMP, Temperature::reading(48.5)).unwrap();

    assert_eq!(s.flush_if_due(&mut fs).unwrap(), FlushOutcome::NotDue);
    clock.advance_secs(u64::from(test_config().state_write_interval_secs));
    assert_eq!(s.flush_if_due(&mut fs).unwrap(), FlushOutcome::Written { records: 1 });
}

#[test]
fn identical_write_is_not_persisted() {
    let mut fs = MemFs::new();
    let (mut s, _) = store();
    s.load(&mut fs);
    s.set_heater(HeaterState::On).unwrap();
    s.force_flush(&mut fs).unwrap();
    let writes = fs.write_count();

    assert!(!s.set_heater(HeaterState::On).unwrap());
    assert_eq!(s.force_flush(&mut fs).unwrap(), FlushOutcome::Clean);
    assert_eq!(fs.write_count(), writes);
}

#[test]
fn low_free_space_refuses_the_write() {
    let mut fs = MemFs::new();
    let (mut s, _) = store();
    s.load(&mut fs);
    let before = fs.contents(PRIMARY).unwrap();

    fs.set_available_bytes(Some(16));
    s.set_heater(HeaterState::On).unwrap();
    assert!(s.force_flush(&mut fs).is_err());
    assert_eq!(fs.contents(PRIMARY).unwrap(), before);
}

// ── Degradation ───────────────────────────────────────────────

#[test]
fn repeated_failures_degrade_then_recover() {
    let mut rig = Rig::new();
    rig.start();
    let max = test_config().max_write_failures;

    rig.fs.fail_writes(true);
    rig.cmd(AppCommand::ToggleHeater).unwrap();
    for _ in 0..max {
        assert!(rig.ctl.flush_tick(&mut rig.fs, &mut rig.sink).is_err());
    }
    assert!(rig.ctl.store().is_degraded());
    assert!(rig.ctl.store().emergency_snapshot().is_some());
    assert!(rig.sink.contains(&AppEvent::PersistenceFailed {
        failures: max,
        degraded: true
    }));
    assert!(rig.ctl.status().degraded);

    rig.fs.fail_writes(false);
    let outcome = rig.ctl.flush_tick(&mut rig.fs, &mut rig.sink).unwrap();
    assert!(matches!(outcome, FlushOutcome::Written { .. }));
    assert!(!rig.ctl.store().is_degraded());
    assert_eq!(rig.ctl.store().write_failures(), 0);
}

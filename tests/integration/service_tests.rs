//! Command handling, valve travel and restart behaviour of `LeakController`.

use leakguard::app::commands::AppCommand;
use leakguard::app::events::AppEvent;
use leakguard::devices::{HEATER_TEMP, HOT_WATER_TEMP, ValveId, Zone};
use leakguard::error::{Error, ValveError};
use leakguard::leak::AlarmState;
use leakguard::state::{FlushOutcome, HeaterState, LoadSource, StateDocument, Temperature, ValveState};
use leakguard::valves::Direction;

use crate::mock_hw::{Call, Rig};

fn started() -> Rig {
    let mut rig = Rig::new();
    rig.start();
    rig
}

fn press(valve: ValveId, direction: Direction) -> AppCommand {
    AppCommand::ValveButton { valve, direction }
}

// ── Startup ───────────────────────────────────────────────────

#[test]
fn first_boot_writes_defaults_and_plays_startup_tone() {
    let mut rig = Rig::new();
    assert_eq!(rig.start(), LoadSource::Defaults);
    assert!(rig.sink.contains(&AppEvent::Started {
        source: LoadSource::Defaults,
        leak_at_boot: false
    }));
    assert_eq!(rig.calls(&Call::Startup), 1);
    assert!(rig.fs.contents("state/state.json").is_some());
}

// ── Remote valve commands ─────────────────────────────────────

#[test]
fn remote_open_travels_to_opened_with_progress() {
    let mut rig = started();
    rig.cmd(AppCommand::OpenValve(ValveId::Hot)).unwrap();
    assert_eq!(rig.ctl.store().valve(ValveId::Hot), Some(ValveState::Opening));
    assert!(rig.sink.contains(&AppEvent::ValveStarted {
        valve: ValveId::Hot,
        direction: Direction::Open
    }));
    assert!(rig.sim.hot_open.level());

    rig.tick_valves(2);
    assert!(rig.ctl.valves().is_in_progress());
    rig.tick_valves(1);

    assert_eq!(rig.ctl.store().valve(ValveId::Hot), Some(ValveState::Opened));
    assert!(!rig.sim.hot_open.level());
    assert!(rig.sink.contains(&AppEvent::ValveCompleted {
        valve: ValveId::Hot,
        state: ValveState::Opened
    }));
    let fractions: Vec<f32> = rig
        .log
        .borrow()
        .iter()
        .filter_map(|c| match c {
            Call::Progress { fraction, .. } => Some(*fraction),
            _ => None,
        })
        .collect();
    assert_eq!(fractions.len(), 3);
    assert!((fractions[2] - 1.0).abs() < f32::EPSILON);
}

#[test]
fn opposite_direction_is_rejected_while_travelling() {
    let mut rig = started();
    rig.cmd(AppCommand::OpenValve(ValveId::Cold)).unwrap();

    let err = rig.cmd(AppCommand::CloseValve(ValveId::Cold)).unwrap_err();
    assert_eq!(err, Error::Valve(ValveError::OppositeDirectionActive));
    assert!(rig.sink.contains(&AppEvent::CommandRejected {
        command: "close_valve",
        reason: Error::Valve(ValveError::OppositeDirectionActive)
    }));
    assert!(!rig.sim.cold_close.level(), "both outputs must never be energised");
}

#[test]
fn valves_are_independent() {
    let mut rig = started();
    rig.cmd(AppCommand::OpenValve(ValveId::Hot)).unwrap();
    rig.cmd(AppCommand::CloseValve(ValveId::Cold)).unwrap();
    assert!(rig.sim.hot_open.level());
    assert!(rig.sim.cold_close.level());
}

#[test]
fn stop_leaves_travel_state_in_place() {
    let mut rig = started();
    rig.cmd(AppCommand::OpenValve(ValveId::Hot)).unwrap();
    rig.tick_valves(1);
    rig.cmd(AppCommand::StopValve(ValveId::Hot)).unwrap();

    assert!(rig.sink.contains(&AppEvent::ValveStopped { valve: ValveId::Hot }));
    assert!(!rig.sim.hot_open.level());
    assert_eq!(rig.ctl.store().valve(ValveId::Hot), Some(ValveState::Opening));
    assert!(rig.ctl.valves().get(ValveId::Hot).is_travel_interrupted(rig.ctl.store()));
}

#[test]
fn remote_open_is_locked_out_during_leak() {
    let mut rig = started();
    rig.wet(Zone::Zone1, true);
    rig.poll();

    let err = rig.cmd(AppCommand::OpenValve(ValveId::Hot)).unwrap_err();
    assert_eq!(err, Error::LeakLockout);
    assert!(rig.sink.contains(&AppEvent::CommandRejected {
        command: "open_valve",
        reason: Error::LeakLockout
    }));
    assert_eq!(rig.ctl.store().valve(ValveId::Hot), Some(ValveState::Closing));
}

#[test]
fn remote_close_is_allowed_during_leak() {
    let mut rig = started();
    rig.wet(Zone::Zone1, true);
    rig.poll();
    rig.tick_valves(3);

    rig.cmd(AppCommand::CloseValve(ValveId::Hot)).unwrap();
    assert_eq!(rig.ctl.store().valve(ValveId::Hot), Some(ValveState::Closing));
}

// ── Panel buttons ─────────────────────────────────────────────

#[test]
fn button_press_stops_current_travel_and_reverses() {
    let mut rig = started();
    rig.cmd(press(ValveId::Hot, Direction::Open)).unwrap();
    rig.tick_valves(1);
    rig.cmd(press(ValveId::Hot, Direction::Close)).unwrap();

    assert!(rig.sink.contains(&AppEvent::ValveStopped { valve: ValveId::Hot }));
    assert_eq!(rig.ctl.store().valve(ValveId::Hot), Some(ValveState::Closing));
    assert!(!rig.sim.hot_open.level());
    assert!(rig.sim.hot_close.level());
    assert_eq!(rig.calls(&Call::Confirm), 2);
}

#[test]
fn button_press_during_alarm_acknowledges_only() {
    let mut rig = started();
    rig.wet(Zone::Zone2, true);
    rig.poll();

    let err = rig.cmd(press(ValveId::Cold, Direction::Open)).unwrap_err();
    assert_eq!(err, Error::LeakLockout);
    assert_eq!(rig.ctl.guard().state(), AlarmState::Acknowledged);
    assert_eq!(rig.ctl.store().valve(ValveId::Cold), Some(ValveState::Closing));
    assert_eq!(rig.calls(&Call::Confirm), 0);
    assert_eq!(rig.calls(&Call::ErrorTone), 0);
}

// ── Heater ────────────────────────────────────────────────────

#[test]
fn heater_toggle_flips_relay_and_state() {
    let mut rig = started();
    rig.cmd(AppCommand::ToggleHeater).unwrap();
    assert!(rig.sim.heater.level());
    assert_eq!(rig.ctl.store().heater(), Some(HeaterState::On));
    assert!(rig.sink.contains(&AppEvent::HeaterChanged(HeaterState::On)));

    rig.cmd(AppCommand::ToggleHeater).unwrap();
    assert!(!rig.sim.heater.level());
    assert_eq!(rig.ctl.store().heater(), Some(HeaterState::Off));
}

#[test]
fn heater_toggle_refused_while_zone_is_wet() {
    let mut rig = started();
    rig.wet(Zone::Zone1, true);
    rig.poll();

    assert_eq!(rig.cmd(AppCommand::ToggleHeater), Err(Error::LeakLockout));
    assert!(!rig.ctl.heater_is_on());
    assert_eq!(rig.ctl.guard().state(), AlarmState::Acknowledged);
}

#[test]
fn heater_toggle_after_drying_clears_alarm_first() {
    let mut rig = started();
    rig.wet(Zone::Zone1, true);
    rig.poll();
    rig.wet(Zone::Zone1, false);

    rig.cmd(AppCommand::ToggleHeater).unwrap();
    assert_eq!(rig.ctl.guard().state(), AlarmState::Clear);
    assert!(rig.sink.contains(&AppEvent::AlarmCleared));
    assert!(rig.ctl.heater_is_on());
}

// ── Temperatures ──────────────────────────────────────────────

#[test]
fn temperature_samples_are_batched_into_the_state_file() {
    let mut rig = started();
    rig.ctl.flush_tick(&mut rig.fs, &mut rig.sink).unwrap();

    rig.ctl.sample_temperatures(&mut rig.sink);
    assert_eq!(rig.ctl.store().temperature(HOT_WATER_TEMP), Some(Temperature::Celsius(45.0)));
    assert_eq!(rig.ctl.store().temperature(HEATER_TEMP), Some(Temperature::Celsius(55.0)));
    assert_eq!(
        rig.ctl.flush_tick(&mut rig.fs, &mut rig.sink).unwrap(),
        FlushOutcome::NotDue
    );

    rig.clock.advance_secs(30);
    assert!(matches!(
        rig.ctl.flush_tick(&mut rig.fs, &mut rig.sink).unwrap(),
        FlushOutcome::Written { .. }
    ));
    let doc = StateDocument::from_bytes(&rig.fs.contents("state/state.json").unwrap()).unwrap();
    assert_eq!(doc.temperature[HEATER_TEMP].state, serde_json::json!(55.0));
}

#[test]
fn failing_temperature_sensor_is_reported_once_and_stored_as_error() {
    let mut rig = started();
    rig.sim.hot_water_temp.set_broken(true);
    for _ in 0..8 {
        rig.ctl.sample_temperatures(&mut rig.sink);
    }

    assert_eq!(
        rig.sink.count(|e| matches!(e, AppEvent::TemperatureSensorFailed { .. })),
        1
    );
    assert!(rig.sink.contains(&AppEvent::TemperatureSensorFailed { device: HOT_WATER_TEMP }));
    let status = rig.ctl.status();
    assert_eq!(status.hot_water_temp, Some(Temperature::SensorError));
    assert_eq!(status.heater_temp, Some(Temperature::Celsius(55.0)));
}

// ── Faults ────────────────────────────────────────────────────

#[test]
fn driver_fault_line_aborts_travel() {
    let mut rig = started();
    rig.cmd(AppCommand::OpenValve(ValveId::Cold)).unwrap();
    rig.sim.cold_fault.set_level(false);
    rig.tick_valves(1);

    assert!(rig.sink.contains(&AppEvent::ValveFaulted { valve: ValveId::Cold }));
    assert_eq!(rig.ctl.store().valve(ValveId::Cold), Some(ValveState::Error));
    assert!(!rig.sim.cold_open.level());
    assert_eq!(rig.calls(&Call::ShowError("Cold valve fault".into())), 1);
    assert!(!rig.ctl.valves().is_in_progress());
}

// ── Status ────────────────────────────────────────────────────

#[test]
fn status_reports_alarm_and_valves() {
    let mut rig = started();
    rig.wet(Zone::Zone1, true);
    rig.poll();
    rig.cmd(AppCommand::ReportStatus).unwrap();

    let events = rig.sink.events.borrow();
    let Some(AppEvent::Status(status)) = events.last() else {
        panic!("expected a status event, got {:?}", events.last());
    };
    assert_eq!(status.alarm, AlarmState::Active);
    assert_eq!(status.hot_water_valve, Some(ValveState::Closing));
    assert!(status.valves_moving);
    assert!(!status.degraded);
}

// ── Shutdown / restart ────────────────────────────────────────

#[test]
fn shutdown_flushes_and_restart_restores_heater() {
    let mut rig = started();
    rig.cmd(AppCommand::ToggleHeater).unwrap();

    let outcome = rig.ctl.shutdown(&mut rig.fs, &mut rig.sink).unwrap();
    assert!(matches!(outcome, FlushOutcome::Written { .. }));
    assert!(rig.sink.contains(&AppEvent::Stopped));

    let mut rebooted = Rig::reboot(rig.fs);
    assert_eq!(rebooted.start(), LoadSource::Primary);
    assert!(rebooted.ctl.heater_is_on());
    assert!(rebooted.sim.heater.level());
}

#[test]
fn restart_mid_travel_reports_interrupted_valve() {
    let mut rig = started();
    rig.cmd(AppCommand::CloseValve(ValveId::Hot)).unwrap();
    rig.tick_valves(1);
    rig.ctl.shutdown(&mut rig.fs, &mut rig.sink).unwrap();
    assert!(!rig.sim.hot_close.level());

    let mut rebooted = Rig::reboot(rig.fs);
    rebooted.start();
    assert_eq!(rebooted.ctl.store().valve(ValveId::Hot), Some(ValveState::Closing));
    assert!(rebooted.ctl.valves().get(ValveId::Hot).is_travel_interrupted(rebooted.ctl.store()));
    assert!(!rebooted.sim.hot_close.level());
}

//! Leak alarm coordination through the full controller: probes on the
//! simulated board, emergency actions on the valve pair and heater, alarm
//! screens on the mock display.

use leakguard::app::commands::AppCommand;
use leakguard::app::events::AppEvent;
use leakguard::devices::{ValveId, Zone, ZoneLabel};
use leakguard::leak::AlarmState;
use leakguard::state::{HeaterState, LeakState, LoadSource, ValveState};

use crate::mock_hw::{Call, Rig};

fn started() -> Rig {
    let mut rig = Rig::new();
    assert_eq!(rig.start(), LoadSource::Defaults);
    rig
}

// ── Single zone ───────────────────────────────────────────────

#[test]
fn wet_zone_closes_valves_cuts_heater_and_sounds_alarm() {
    let mut rig = started();
    rig.cmd(AppCommand::ToggleHeater).unwrap();
    assert!(rig.ctl.heater_is_on());

    rig.wet(Zone::Zone1, true);
    rig.poll();

    assert_eq!(rig.ctl.guard().state(), AlarmState::Active);
    assert!(rig.sink.contains(&AppEvent::LeakDetected { zones: ZoneLabel::Zone1 }));
    for id in ValveId::ALL {
        assert_eq!(rig.ctl.store().valve(id), Some(ValveState::Closing));
    }
    assert!(!rig.ctl.heater_is_on());
    assert_eq!(rig.ctl.store().heater(), Some(HeaterState::Off));
    assert_eq!(rig.ctl.store().leak(Zone::Zone1), Some(LeakState::Leak));
    assert_eq!(rig.ctl.store().leak(Zone::Zone2), Some(LeakState::NoLeak));
    assert_eq!(rig.calls(&Call::AlarmOn), 1);
    assert_eq!(rig.alarm_screens(), vec![ZoneLabel::Zone1]);
}

#[test]
fn emergency_close_is_silent_and_completes() {
    let mut rig = started();
    rig.wet(Zone::Zone2, true);
    rig.poll();
    rig.tick_valves(3);

    for id in ValveId::ALL {
        assert_eq!(rig.ctl.store().valve(id), Some(ValveState::Closed));
        assert!(rig.sink.contains(&AppEvent::ValveCompleted {
            valve: id,
            state: ValveState::Closed
        }));
    }
    let progress = rig.log.borrow().iter().filter(|c| matches!(c, Call::Progress { .. })).count();
    assert_eq!(progress, 0, "emergency close must not draw progress screens");
}

#[test]
fn sustained_leak_fires_emergency_once() {
    let mut rig = started();
    rig.wet(Zone::Zone1, true);
    for _ in 0..10 {
        rig.poll();
    }
    assert_eq!(rig.ctl.guard().emergency_count(), 1);
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::LeakDetected { .. })), 1);
    assert_eq!(rig.calls(&Call::AlarmOn), 1);
}

// ── Two zones ─────────────────────────────────────────────────

#[test]
fn second_zone_relabels_without_repeating_emergency() {
    let mut rig = started();
    rig.wet(Zone::Zone1, true);
    rig.poll();
    rig.wet(Zone::Zone2, true);
    rig.poll();

    assert_eq!(rig.ctl.guard().emergency_count(), 1);
    assert_eq!(rig.ctl.guard().record().affected, Some(ZoneLabel::Both));
    assert!(rig.sink.contains(&AppEvent::AlarmRelabelled { zones: ZoneLabel::Both }));
    assert_eq!(rig.alarm_screens(), vec![ZoneLabel::Zone1, ZoneLabel::Both]);
}

#[test]
fn alarm_stays_until_every_zone_is_dry() {
    let mut rig = started();
    rig.wet(Zone::Zone1, true);
    rig.wet(Zone::Zone2, true);
    rig.poll();
    assert!(rig.sink.contains(&AppEvent::LeakDetected { zones: ZoneLabel::Both }));

    rig.wet(Zone::Zone1, false);
    rig.poll();
    assert_eq!(rig.ctl.guard().state(), AlarmState::Active);
    assert_eq!(rig.ctl.guard().record().affected, Some(ZoneLabel::Zone2));
    assert!(!rig.sink.contains(&AppEvent::AlarmCleared));

    rig.wet(Zone::Zone2, false);
    rig.poll();
    assert_eq!(rig.ctl.guard().state(), AlarmState::Clear);
    assert!(rig.sink.contains(&AppEvent::AlarmCleared));
    assert!(rig.calls(&Call::AlarmOff) >= 1);
    assert!(rig.calls(&Call::ResetAlarm) >= 1);
    assert_eq!(rig.ctl.store().leak(Zone::Zone1), Some(LeakState::NoLeak));
    assert_eq!(rig.ctl.store().leak(Zone::Zone2), Some(LeakState::NoLeak));
}

#[test]
fn recovery_leaves_valves_closed() {
    let mut rig = started();
    rig.wet(Zone::Zone1, true);
    rig.poll();
    rig.tick_valves(3);
    rig.wet(Zone::Zone1, false);
    rig.poll();

    assert_eq!(rig.ctl.guard().state(), AlarmState::Clear);
    for id in ValveId::ALL {
        assert_eq!(rig.ctl.store().valve(id), Some(ValveState::Closed));
    }
    assert!(!rig.ctl.valves().is_in_progress());
}

// ── Acknowledgement ───────────────────────────────────────────

#[test]
fn acknowledged_leak_dries_out_and_valves_wait_for_open() {
    let mut rig = started();

    // Leak: both valves travel to closed.
    rig.wet(Zone::Zone1, true);
    rig.poll();
    rig.tick_valves(3);
    for id in ValveId::ALL {
        assert_eq!(rig.ctl.store().valve(id), Some(ValveState::Closed));
    }

    // Acknowledged while still wet: silenced, valves stay closed.
    rig.cmd(AppCommand::ClearAlarm).unwrap();
    assert_eq!(rig.ctl.guard().state(), AlarmState::Acknowledged);
    assert!(rig.ctl.guard().record().acknowledged);
    rig.tick_valves(1);
    rig.poll();
    for id in ValveId::ALL {
        assert_eq!(rig.ctl.store().valve(id), Some(ValveState::Closed));
    }
    assert!(!rig.ctl.valves().is_in_progress());

    // Zone dries: alarm record is reset, valves still closed.
    rig.wet(Zone::Zone1, false);
    rig.poll();
    assert_eq!(rig.ctl.guard().state(), AlarmState::Clear);
    assert!(!rig.ctl.guard().record().acknowledged);
    assert_eq!(rig.ctl.guard().record().affected, None);
    for id in ValveId::ALL {
        assert_eq!(rig.ctl.store().valve(id), Some(ValveState::Closed));
    }

    // Only an explicit open moves them again.
    rig.cmd(AppCommand::OpenValve(ValveId::Hot)).unwrap();
    rig.tick_valves(3);
    assert!(rig.ctl.valves().get(ValveId::Hot).is_open(rig.ctl.store()));
    assert!(rig.ctl.valves().get(ValveId::Cold).is_closed(rig.ctl.store()));
}

#[test]
fn clear_while_wet_acknowledges_and_silences() {
    let mut rig = started();
    rig.wet(Zone::Zone1, true);
    rig.poll();

    rig.cmd(AppCommand::ClearAlarm).unwrap();
    assert_eq!(rig.ctl.guard().state(), AlarmState::Acknowledged);
    assert!(rig.ctl.is_detected_leaks());
    assert!(rig.ctl.guard().record().acknowledged);
    assert!(rig.sink.contains(&AppEvent::AlarmAcknowledged { zones: ZoneLabel::Zone1 }));
    assert_eq!(rig.calls(&Call::AlarmOff), 1);

    // The zone stays wet: still acknowledged, no new emergency.
    rig.poll();
    assert_eq!(rig.ctl.guard().state(), AlarmState::Acknowledged);
    assert_eq!(rig.ctl.guard().emergency_count(), 1);
}

#[test]
fn new_zone_after_acknowledge_realarms() {
    let mut rig = started();
    rig.wet(Zone::Zone1, true);
    rig.poll();
    rig.cmd(AppCommand::ClearAlarm).unwrap();

    rig.wet(Zone::Zone2, true);
    rig.poll();
    assert_eq!(rig.ctl.guard().state(), AlarmState::Active);
    assert!(!rig.ctl.guard().record().acknowledged);
    assert_eq!(rig.ctl.guard().emergency_count(), 2);
    assert_eq!(rig.calls(&Call::AlarmOn), 2);
}

#[test]
fn clear_after_drying_returns_to_clear() {
    let mut rig = started();
    rig.wet(Zone::Zone1, true);
    rig.poll();
    rig.wet(Zone::Zone1, false);

    rig.cmd(AppCommand::ClearAlarm).unwrap();
    assert_eq!(rig.ctl.guard().state(), AlarmState::Clear);
    assert!(rig.sink.contains(&AppEvent::AlarmCleared));

    // The channel was resynced, so the next poll sees no edge.
    let before = rig.sink.events.borrow().len();
    rig.poll();
    assert_eq!(rig.sink.events.borrow().len(), before);
}

#[test]
fn clear_without_alarm_changes_nothing() {
    let mut rig = started();
    let before = rig.sink.events.borrow().len();
    rig.cmd(AppCommand::ClearAlarm).unwrap();
    assert_eq!(rig.sink.events.borrow().len(), before);
    assert_eq!(rig.calls(&Call::AlarmOff), 0);
}

// ── Power-on ──────────────────────────────────────────────────

#[test]
fn power_on_wet_reading_waits_for_recheck() {
    let mut rig = Rig::wet_at_boot(&[Zone::Zone1]);
    rig.start();

    assert!(rig.sink.contains(&AppEvent::Started {
        source: LoadSource::Defaults,
        leak_at_boot: true
    }));
    assert_eq!(rig.calls(&Call::Startup), 0);
    assert!(rig.ctl.guard().startup_pending());

    // Sampling is held back until the re-check.
    rig.poll();
    assert_eq!(rig.ctl.guard().state(), AlarmState::Clear);
    assert_eq!(rig.ctl.guard().emergency_count(), 0);
}

#[test]
fn transient_power_on_reading_is_dismissed() {
    let mut rig = Rig::wet_at_boot(&[Zone::Zone2]);
    rig.start();
    rig.wet(Zone::Zone2, false);

    rig.ctl.verify_startup_leak(&mut rig.sink);
    assert!(rig.sink.contains(&AppEvent::BootLeakDismissed));
    assert_eq!(rig.ctl.guard().state(), AlarmState::Clear);
    assert!(!rig.ctl.guard().startup_pending());
    assert_eq!(rig.ctl.store().leak(Zone::Zone2), Some(LeakState::NoLeak));

    // Nothing was driven for the dismissed reading.
    for id in ValveId::ALL {
        assert_eq!(rig.ctl.store().valve(id), None);
    }
    assert_eq!(rig.sim.hot_close.edge_count(), 0);
    assert_eq!(rig.sim.cold_close.edge_count(), 0);
    assert_eq!(rig.sim.heater.edge_count(), 0);
    assert_eq!(rig.calls(&Call::AlarmOn), 0);

    // Sampling is live afterwards.
    rig.wet(Zone::Zone2, true);
    rig.poll();
    assert_eq!(rig.ctl.guard().state(), AlarmState::Active);
}

#[test]
fn confirmed_power_on_leak_alarms() {
    let mut rig = Rig::wet_at_boot(&[Zone::Zone1, Zone::Zone2]);
    rig.start();
    rig.ctl.verify_startup_leak(&mut rig.sink);

    assert!(rig.sink.contains(&AppEvent::LeakDetected { zones: ZoneLabel::Both }));
    assert_eq!(rig.ctl.guard().emergency_count(), 1);

    // A second re-check is a no-op.
    rig.ctl.verify_startup_leak(&mut rig.sink);
    assert_eq!(rig.ctl.guard().emergency_count(), 1);
}

// ── Collaborator failures ─────────────────────────────────────

#[test]
fn broken_alarm_sound_does_not_block_valve_closure() {
    let mut rig = Rig::with_broken_alarm();
    rig.start();
    rig.wet(Zone::Zone1, true);
    rig.poll();

    assert_eq!(rig.calls(&Call::AlarmOn), 1);
    assert_eq!(rig.ctl.guard().state(), AlarmState::Active);
    assert_eq!(rig.alarm_screens(), vec![ZoneLabel::Zone1]);
    for id in ValveId::ALL {
        assert_eq!(rig.ctl.store().valve(id), Some(ValveState::Closing));
    }
}

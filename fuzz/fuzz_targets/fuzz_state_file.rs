//! Fuzz target: state file recovery
//!
//! Feeds arbitrary bytes to `StateStore::load` as the primary state file,
//! with the second half also planted as the backup, and verifies:
//! - No panics under arbitrary byte inputs
//! - A store is always usable after load: a flush succeeds
//! - When both files are rejected, the defaults written in their place load
//!   back as the primary
//!
//! cargo fuzz run fuzz_state_file

#![no_main]

use leakguard::adapters::mem_fs::MemFs;
use leakguard::adapters::time::SystemClock;
use leakguard::config::SystemConfig;
use leakguard::devices::ValveId;
use leakguard::state::{LoadSource, StateStore, ValveState};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let config = SystemConfig::default();
    let mut fs = MemFs::new();
    fs.put(&config.state_primary_path, data);
    fs.put(&config.state_backup_path, &data[data.len() / 2..]);

    let mut store = StateStore::new(&config, Box::new(SystemClock::new()));
    let source = store.load(&mut fs);

    store
        .set_valve(ValveId::Hot, ValveState::Closed)
        .expect("hot valve is a known device");
    assert!(store.force_flush(&mut fs).is_ok(), "flush after load {:?} failed", source);

    if source == LoadSource::Defaults {
        let mut again = StateStore::new(&config, Box::new(SystemClock::new()));
        assert_eq!(again.load(&mut fs), LoadSource::Primary);
    }
});

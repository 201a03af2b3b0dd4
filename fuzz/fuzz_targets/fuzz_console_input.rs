//! Fuzz target: console command parser
//!
//! Any line either parses into an input or yields a static error; the
//! parser never panics on arbitrary UTF-8.
//!
//! cargo fuzz run fuzz_console_input

#![no_main]

use leakguard::adapters::console_input;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(line) = core::str::from_utf8(data) else {
        return;
    };
    if let Err(reason) = console_input::parse(line) {
        assert!(!reason.is_empty());
    }
});

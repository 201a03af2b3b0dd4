//! Leak detection: per-zone debounced sampling and the site-wide alarm.

pub mod channel;
pub mod guard;

pub use channel::{Debounce, LeakChannel};
pub use guard::{AlarmRecord, AlarmState, GuardIo, LeakGuard, ALARM_TITLE};

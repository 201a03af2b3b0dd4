//! System clock adapter.
//!
//! Implements [`Clock`] for `last_changed` stamping and flush gating.
//!
//! - **`target_os = "espidf"`**: monotonic time from
//!   `esp_timer_get_time()` (microsecond precision); wall time from the
//!   RTC set by SNTP.
//! - **`not(target_os = "espidf")`**: `std::time::Instant` and the host
//!   clock, for simulation and tests.

use chrono::NaiveDateTime;

use crate::app::ports::Clock;

pub struct SystemClock {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }

    #[cfg(target_os = "espidf")]
    fn monotonic_ms(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64 / 1000
    }

    #[cfg(not(target_os = "espidf"))]
    fn monotonic_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

//! Debounced wet/dry sampling for one leak zone.
//!
//! Each sample takes `reads` raw reads and calls the zone wet when at least
//! `wet_votes` of them are wet (line LOW).  Samples are edge-reported:
//! [`sample`] returns `Some` only when the debounced value changes.
//!
//! [`sample`]: LeakChannel::sample

use log::{debug, warn};

use crate::config::SystemConfig;
use crate::devices::Zone;
use crate::drivers::gpio::SensePin;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Debounce {
    pub reads: u8,
    pub wet_votes: u8,
}

impl Debounce {
    pub fn from_config(config: &SystemConfig) -> Self {
        Self {
            reads: config.leak_debounce_reads.max(1),
            wet_votes: config.leak_debounce_wet_votes.max(1),
        }
    }
}

impl Default for Debounce {
    fn default() -> Self {
        Self { reads: 3, wet_votes: 2 }
    }
}

pub struct LeakChannel {
    zone: Zone,
    pin: Box<dyn SensePin>,
    debounce: Debounce,
    last_reported: bool,
    running: bool,
}

impl LeakChannel {
    /// The construction-time read seeds `last_reported`, so a zone that is
    /// already wet at boot produces no edge when sampling starts.
    pub fn new(zone: Zone, pin: Box<dyn SensePin>, debounce: Debounce) -> Self {
        let mut channel = Self {
            zone,
            pin,
            debounce,
            last_reported: false,
            running: false,
        };
        channel.last_reported = channel.is_wet();
        channel
    }

    pub fn zone(&self) -> Zone {
        self.zone
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn last_reported(&self) -> bool {
        self.last_reported
    }

    /// One debounced sample.  Returns the new value on a wet/dry edge.
    pub fn sample(&mut self) -> Option<bool> {
        if !self.running {
            return None;
        }
        let mut wet = 0u8;
        let mut valid = 0u8;
        for _ in 0..self.debounce.reads {
            match self.pin.is_high() {
                Ok(high) => {
                    valid += 1;
                    if !high {
                        wet += 1;
                    }
                }
                Err(e) => debug!("LEAK: {} read failed: {}", self.zone, e),
            }
        }
        if valid == 0 {
            warn!("LEAK: {} unreadable, keeping last value", self.zone);
            return None;
        }
        let is_wet = wet >= self.debounce.wet_votes;
        if is_wet == self.last_reported {
            return None;
        }
        self.last_reported = is_wet;
        Some(is_wet)
    }

    /// Direct single read, independent of sampling.  An unreadable line
    /// reports the last debounced value.
    pub fn is_wet(&mut self) -> bool {
        match self.pin.is_high() {
            Ok(high) => !high,
            Err(e) => {
                warn!("LEAK: {} direct read failed: {}", self.zone, e);
                self.last_reported
            }
        }
    }

    /// Re-seed `last_reported` from a direct read without reporting an edge.
    pub fn resync(&mut self) -> bool {
        self.last_reported = self.is_wet();
        self.last_reported
    }
}

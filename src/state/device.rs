//! A single named device's current value, previous value and last-change
//! timestamp, with synchronous change notification.

use chrono::NaiveDateTime;

use crate::devices::Section;

use super::document::{StateRecord, format_timestamp};
use super::value::Value;

/// Subscriber for value changes on one device.
///
/// Observers run synchronously inside the write, in registration order.
/// They must not call back into the store.
pub trait StateObserver {
    fn on_change(&mut self, device: &str, value: &Value);
}

/// How a write should be propagated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notify {
    /// Notify observers and schedule persistence.
    Yes,
    /// Memory-only: update the value, skip observers and persistence.
    No,
}

pub struct DeviceState {
    section: Section,
    name: &'static str,
    current: Option<Value>,
    previous: Option<Value>,
    last_changed: Option<NaiveDateTime>,
    observers: Vec<Box<dyn StateObserver>>,
}

impl DeviceState {
    pub fn new(section: Section, name: &'static str) -> Self {
        Self {
            section,
            name,
            current: None,
            previous: None,
            last_changed: None,
            observers: Vec::new(),
        }
    }

    pub fn section(&self) -> Section {
        self.section
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn current(&self) -> Option<Value> {
        self.current
    }

    pub fn previous(&self) -> Option<Value> {
        self.previous
    }

    pub fn last_changed(&self) -> Option<NaiveDateTime> {
        self.last_changed
    }

    pub fn subscribe(&mut self, observer: Box<dyn StateObserver>) {
        self.observers.push(observer);
    }

    /// Write `value`.  Returns `true` if the value changed.
    ///
    /// An identical write is a no-op: neither `previous` nor the timestamp
    /// moves and no observer runs.
    pub fn set(&mut self, value: Value, now: NaiveDateTime, notify: Notify) -> bool {
        if self.current == Some(value) {
            return false;
        }
        self.previous = self.current;
        self.current = Some(value);
        self.last_changed = Some(now);

        if notify == Notify::Yes {
            for observer in &mut self.observers {
                observer.on_change(self.name, &value);
            }
        }
        true
    }

    /// Rehydrate from the state file.  Never notifies.
    pub(crate) fn restore(
        &mut self,
        current: Option<Value>,
        previous: Option<Value>,
        last_changed: Option<NaiveDateTime>,
    ) {
        self.current = current;
        self.previous = previous;
        self.last_changed = last_changed;
    }

    /// Serializable form for the state file.
    pub fn record(&self) -> StateRecord {
        StateRecord {
            state: self.current.map_or(serde_json::Value::Null, |v| v.to_json()),
            preview_state: self.previous.map_or(serde_json::Value::Null, |v| v.to_json()),
            last_changed: self.last_changed.map(format_timestamp),
        }
    }
}

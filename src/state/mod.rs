//! Persistent device state: values, per-device change tracking, the
//! on-disk document and the batching, crash-safe store.

pub mod device;
pub mod document;
pub mod store;
pub mod value;

pub use device::{DeviceState, Notify, StateObserver};
pub use document::{StateDocument, StateRecord};
pub use store::{FlushOutcome, LoadSource, StateStore, StoreSettings, Trend};
pub use value::{HeaterState, LeakState, Temperature, Value, ValveState};

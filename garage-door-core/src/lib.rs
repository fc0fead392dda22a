//! Hardware-agnostic core of a smart garage-door controller: debounced
//! reed-switch conditioning, bounded relay pulse actuation, a persistence
//! façade over an external KV store, and the door state machine tying them
//! together. Generic over `embedded-hal` 0.2 GPIO traits; no dependency on
//! any specific MCU or board.
#![cfg_attr(not(test), no_std)]

mod config;
mod controller;
mod error;
mod event;
mod kv;
mod persistence;
mod reed;
mod relay;
mod sink;
mod state;

pub use config::{
    GpioConfig, RelayConfig, DEBOUNCE_MS, DEFAULT_TIMEOUT_MS, EVENT_LOG_CAPACITY, MIN_TIMEOUT_MS,
    WATCHDOG_PERIOD_MS,
};
pub use controller::{DoorController, DoorPersistence, RelayControl};
pub use error::{GarageError, Result};
pub use event::{EventLogEntry, EventType};
pub use kv::{KvStore, RamKvStore, MAX_BLOB_LEN, MAX_KEY_LEN};
pub use persistence::Persistence;
pub use reed::ReedSensor;
pub use relay::RelayDriver;
pub use sink::Sink;
pub use state::{DoorPosition, DoorState};

//! C3: narrow typed façade over an external transactional KV store. The
//! store itself (NVS on a real board) is an external collaborator; only
//! this wrapper is ours.

use crate::config::{GpioConfig, RelayConfig, EVENT_LOG_CAPACITY};
use crate::controller::DoorPersistence;
use crate::error::{GarageError, Result};
use crate::event::{EventLogEntry, EventType, EVENT_LOG_WIRE_SIZE};
use crate::kv::KvStore;
use crate::state::DoorState;

const KEY_REED_CLOSED: &str = "reed_closed";
const KEY_REED_OPEN: &str = "reed_open";
const KEY_RELAY: &str = "relay";
const KEY_PULSE_DUR: &str = "pulse_dur";
const KEY_MAX_PULSE: &str = "max_pulse";
const KEY_MIN_INT: &str = "min_int";
const KEY_DOOR_STATE: &str = "door_state";
const KEY_EVT_COUNT: &str = "evt_count";

/// Formats the `evt_<slot>` key into a caller-supplied fixed buffer, since
/// there is no allocator here to build the string on the fly.
fn evt_key(slot: usize, buf: &mut [u8; 12]) -> &str {
    use core::fmt::Write;
    let mut w = heapless::String::<12>::new();
    let _ = write!(w, "evt_{}", slot);
    let len = w.as_bytes().len();
    buf[..len].copy_from_slice(w.as_bytes());
    core::str::from_utf8(&buf[..len]).unwrap_or("evt_0")
}

/// Typed view over a `KvStore` for the `garage_door` namespace.
pub struct Persistence<K> {
    store: K,
}

impl<K: KvStore> Persistence<K> {
    pub fn new(store: K) -> Self {
        Persistence { store }
    }

    pub fn save_gpio_config(&mut self, config: GpioConfig) -> Result<()> {
        self.store.set_u32(KEY_REED_CLOSED, config.reed_closed_pin)?;
        self.store.set_u32(KEY_REED_OPEN, config.reed_open_pin)?;
        self.store.set_u32(KEY_RELAY, config.relay_pin)?;
        self.store.commit()
    }

    pub fn load_gpio_config(&self) -> Result<GpioConfig> {
        Ok(GpioConfig {
            reed_closed_pin: self.store.get_u32(KEY_REED_CLOSED)?,
            reed_open_pin: self.store.get_u32(KEY_REED_OPEN)?,
            relay_pin: self.store.get_u32(KEY_RELAY)?,
        })
    }

    pub fn save_relay_config(&mut self, config: RelayConfig) -> Result<()> {
        self.store.set_u32(KEY_PULSE_DUR, config.pulse_duration_ms)?;
        self.store.set_u32(KEY_MAX_PULSE, config.max_pulse_duration_ms)?;
        self.store.set_u32(KEY_MIN_INT, config.min_interval_ms)?;
        self.store.commit()
    }

    pub fn load_relay_config(&self) -> Result<RelayConfig> {
        Ok(RelayConfig {
            pulse_duration_ms: self.store.get_u32(KEY_PULSE_DUR)?,
            max_pulse_duration_ms: self.store.get_u32(KEY_MAX_PULSE)?,
            min_interval_ms: self.store.get_u32(KEY_MIN_INT)?,
        })
    }

    pub fn save_door_state(&mut self, state: DoorState) -> Result<()> {
        self.store.set_u32(KEY_DOOR_STATE, state.as_u32())?;
        self.store.commit()
    }

    /// Absence resolves to `Unknown` with success: this is the one
    /// `NotFound` case that does not propagate to the caller.
    pub fn load_door_state(&self) -> Result<DoorState> {
        match self.store.get_u32(KEY_DOOR_STATE) {
            Ok(value) => Ok(DoorState::from_u32(value)),
            Err(GarageError::NotFound) => Ok(DoorState::Unknown),
            Err(err) => Err(err),
        }
    }

    fn load_evt_count(&self) -> Result<u32> {
        match self.store.get_u32(KEY_EVT_COUNT) {
            Ok(value) => Ok(value),
            Err(GarageError::NotFound) => Ok(0),
            Err(err) => Err(err),
        }
    }

    /// Appends an event, keeping `evt_count` a strictly increasing
    /// total-writes counter rather than a wrapped next-index: slot is
    /// `count mod 100`, and the counter itself never wraps back to a value
    /// a prior boot already saw.
    pub fn log_event(&mut self, event_type: EventType, value: i32) -> Result<()> {
        let count = self.load_evt_count()?;
        let slot = (count as usize) % EVENT_LOG_CAPACITY;

        let entry = EventLogEntry {
            event_type,
            timestamp_ms_since_boot: 0,
            value,
        };
        let mut key_buf = [0u8; 12];
        let key = evt_key(slot, &mut key_buf);
        self.store.set_blob(key, &entry.to_wire())?;
        self.store.set_u32(KEY_EVT_COUNT, count.wrapping_add(1))?;
        self.store.commit()
    }

    /// As above but stamps the entry with the caller-supplied ms-since-boot
    /// timestamp; the façade itself has no clock of its own.
    pub fn log_event_at(&mut self, event_type: EventType, value: i32, timestamp_ms: u32) -> Result<()> {
        let count = self.load_evt_count()?;
        let slot = (count as usize) % EVENT_LOG_CAPACITY;

        let entry = EventLogEntry {
            event_type,
            timestamp_ms_since_boot: timestamp_ms,
            value,
        };
        let mut key_buf = [0u8; 12];
        let key = evt_key(slot, &mut key_buf);
        self.store.set_blob(key, &entry.to_wire())?;
        self.store.set_u32(KEY_EVT_COUNT, count.wrapping_add(1))?;
        self.store.commit()
    }

    /// Returns up to `max` most recent entries, oldest first, writing them
    /// into `buf` and returning the number written.
    pub fn get_logs(&self, buf: &mut [EventLogEntry], max: usize) -> Result<usize> {
        let count = self.load_evt_count()?;
        let available = core::cmp::min(count as usize, EVENT_LOG_CAPACITY);
        let wanted = core::cmp::min(max, core::cmp::min(available, buf.len()));

        for i in 0..wanted {
            let write_index = count as usize - wanted + i;
            let slot = write_index % EVENT_LOG_CAPACITY;
            let mut key_buf = [0u8; 12];
            let key = evt_key(slot, &mut key_buf);
            let mut wire = [0u8; EVENT_LOG_WIRE_SIZE];
            self.store.get_blob(key, &mut wire)?;
            buf[i] = EventLogEntry::from_wire(&wire).ok_or(GarageError::IoError)?;
        }
        Ok(wanted)
    }

    /// Closes, erases, and reopens the backing namespace.
    pub fn factory_reset(&mut self) -> Result<()> {
        self.store.erase_all()?;
        self.store.commit()
    }

    pub fn into_inner(self) -> K {
        self.store
    }
}

impl<K: KvStore> DoorPersistence for Persistence<K> {
    fn save_door_state(&mut self, state: DoorState) -> Result<()> {
        self.save_door_state(state)
    }

    fn load_door_state(&self) -> Result<DoorState> {
        self.load_door_state()
    }

    fn log_event(&mut self, event_type: EventType, value: i32) -> Result<()> {
        self.log_event(event_type, value)
    }
}

//! Event-log entry type and wire encoding.

use packed_struct::prelude::*;

/// Kind of a logged event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u32)]
pub enum EventType {
    DoorOpen = 0,
    DoorClosed = 1,
    Timeout = 2,
    Obstruction = 3,
    Commission = 4,
    Error = 5,
}

impl EventType {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(EventType::DoorOpen),
            1 => Some(EventType::DoorClosed),
            2 => Some(EventType::Timeout),
            3 => Some(EventType::Obstruction),
            4 => Some(EventType::Commission),
            5 => Some(EventType::Error),
            _ => None,
        }
    }
}

/// One entry of the bounded (at most 100) event-log ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventLogEntry {
    pub event_type: EventType,
    pub timestamp_ms_since_boot: u32,
    pub value: i32,
}

/// On-the-wire `{u32 type, u32 timestamp_ms, i32 value}` layout, encoded
/// with `packed_struct` for a stable, endian-explicit byte representation.
#[derive(PackedStruct, Debug, Clone, Copy, PartialEq)]
#[packed_struct(endian = "lsb")]
pub struct EventLogWire {
    pub event_type: u32,
    pub timestamp_ms: u32,
    pub value: i32,
}

pub const EVENT_LOG_WIRE_SIZE: usize = 12;

impl EventLogEntry {
    pub fn to_wire(self) -> [u8; EVENT_LOG_WIRE_SIZE] {
        let wire = EventLogWire {
            event_type: self.event_type as u32,
            timestamp_ms: self.timestamp_ms_since_boot,
            value: self.value,
        };
        wire.pack().expect("fixed-size packed struct never fails to pack")
    }

    pub fn from_wire(bytes: &[u8; EVENT_LOG_WIRE_SIZE]) -> Option<Self> {
        let wire = EventLogWire::unpack(bytes).ok()?;
        let event_type = EventType::from_u32(wire.event_type)?;
        Some(EventLogEntry {
            event_type,
            timestamp_ms_since_boot: wire.timestamp_ms,
            value: wire.value,
        })
    }
}

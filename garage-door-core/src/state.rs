/// Logical door state. Stable stored value is the integer 0..5 in the order
/// listed; `persistence.rs` relies on this discriminant order for the
/// persisted `door_state` key, so don't reorder the variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum DoorState {
    Closed = 0,
    Opening = 1,
    Open = 2,
    Closing = 3,
    Stopped = 4,
    Unknown = 5,
}

impl DoorState {
    pub fn from_u32(value: u32) -> Self {
        match value {
            0 => DoorState::Closed,
            1 => DoorState::Opening,
            2 => DoorState::Open,
            3 => DoorState::Closing,
            4 => DoorState::Stopped,
            _ => DoorState::Unknown,
        }
    }

    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// `is_moving ⇔ state ∈ {Opening, Closing}`.
    pub fn is_moving(self) -> bool {
        matches!(self, DoorState::Opening | DoorState::Closing)
    }
}

/// Three-valued (plus unknown) door position, derived purely from the
/// current level of the two reed inputs. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DoorPosition {
    Unknown,
    Closed,
    Open,
    Between,
}

impl DoorPosition {
    /// Derive position from the closed-line and open-line levels. A line
    /// reads `true` ("asserted") when it is logic-low, i.e. when the reed
    /// magnet is engaged.
    pub fn from_lines(closed_line_asserted: bool, open_line_asserted: bool) -> Self {
        match (closed_line_asserted, open_line_asserted) {
            (true, false) => DoorPosition::Closed,
            (false, true) => DoorPosition::Open,
            (false, false) => DoorPosition::Between,
            (true, true) => DoorPosition::Unknown,
        }
    }
}

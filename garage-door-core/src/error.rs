use core::fmt;

/// The closed set of error kinds returned at the core API surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GarageError {
    /// Call when not initialised, already initialised, illegal state-machine
    /// transition, relay busy, or relay rate-limited.
    InvalidState,
    /// Null callback, timeout below the 1 s floor, pulse duration zero or
    /// above the configured maximum, or a missing config pointer/value.
    InvalidArgument,
    /// A mutex, timer, or task could not be allocated.
    OutOfMemory,
    /// A requested key was absent from the key-value store.
    NotFound,
    /// The key-value store failed to commit or erase.
    IoError,
}

impl fmt::Display for GarageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            GarageError::InvalidState => "invalid state",
            GarageError::InvalidArgument => "invalid argument",
            GarageError::OutOfMemory => "out of memory",
            GarageError::NotFound => "not found",
            GarageError::IoError => "io error",
        };
        f.write_str(msg)
    }
}

pub type Result<T> = core::result::Result<T, GarageError>;

//! Plain configuration values: small `Copy` structs with the default
//! parameters baked into their `Default` impls; board bring-up constructs
//! these directly, there is no config-file parser in this crate.

/// GPIO pin assignment, persisted so board bring-up can recover which
/// concrete pins to wire up on a cold boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpioConfig {
    pub reed_closed_pin: u32,
    pub reed_open_pin: u32,
    pub relay_pin: u32,
}

impl Default for GpioConfig {
    fn default() -> Self {
        GpioConfig {
            reed_closed_pin: 2,
            reed_open_pin: 3,
            relay_pin: 4,
        }
    }
}

/// Relay timing configuration with its default parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayConfig {
    pub pulse_duration_ms: u32,
    pub max_pulse_duration_ms: u32,
    pub min_interval_ms: u32,
}

impl Default for RelayConfig {
    fn default() -> Self {
        RelayConfig {
            pulse_duration_ms: 500,
            max_pulse_duration_ms: 600,
            min_interval_ms: 1_000,
        }
    }
}

/// Debounce window for reed-switch edge coalescing.
pub const DEBOUNCE_MS: u32 = 50;

/// Watchdog poll period.
pub const WATCHDOG_PERIOD_MS: u32 = 100;

/// Default and minimum operation timeout.
pub const DEFAULT_TIMEOUT_MS: u32 = 30_000;
pub const MIN_TIMEOUT_MS: u32 = 1_000;

/// Event-log ring capacity.
pub const EVENT_LOG_CAPACITY: usize = 100;

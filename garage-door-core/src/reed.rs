//! C1: debounced reading of the two end-position reed switches.

use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use embedded_hal::digital::v2::InputPin;

use crate::config::{GpioConfig, DEBOUNCE_MS};
use crate::error::{GarageError, Result};
use crate::sink::Sink;
use crate::state::DoorPosition;

fn position_to_u8(position: DoorPosition) -> u8 {
    match position {
        DoorPosition::Unknown => 0,
        DoorPosition::Closed => 1,
        DoorPosition::Open => 2,
        DoorPosition::Between => 3,
    }
}

fn u8_to_position(value: u8) -> DoorPosition {
    match value {
        1 => DoorPosition::Closed,
        2 => DoorPosition::Open,
        3 => DoorPosition::Between,
        _ => DoorPosition::Unknown,
    }
}

/// Debounced, interrupt-sourced position detection over two reed inputs.
///
/// `ClosedPin`/`OpenPin` are active-low inputs (pulled up, reed magnet
/// engaged reads logic-low). `Sub` is the single-slot position subscriber.
pub struct ReedSensor<ClosedPin, OpenPin, Sub> {
    closed_pin: ClosedPin,
    open_pin: OpenPin,
    initialized: bool,
    gpio_config: Option<GpioConfig>,
    last_published: AtomicU8,
    /// Set by `on_edge` (interrupt context), cleared once the debounce
    /// window has fully elapsed and the settled position is published.
    pending: AtomicBool,
    debounce_remaining_ms: Option<u32>,
    subscriber: Option<Sub>,
}

impl<ClosedPin, OpenPin, Sub> ReedSensor<ClosedPin, OpenPin, Sub>
where
    ClosedPin: InputPin,
    OpenPin: InputPin,
    Sub: Sink<DoorPosition>,
{
    /// Takes ownership of the two input pins. Construction itself cannot
    /// fail; `init` layers the logical armed/disarmed state (and the
    /// `AlreadyInitialized` contract for repeated calls) on top of that.
    pub fn new(closed_pin: ClosedPin, open_pin: OpenPin) -> Self {
        ReedSensor {
            closed_pin,
            open_pin,
            initialized: false,
            gpio_config: None,
            last_published: AtomicU8::new(position_to_u8(DoorPosition::Unknown)),
            pending: AtomicBool::new(false),
            debounce_remaining_ms: None,
            subscriber: None,
        }
    }

    /// Arms the sensor: both-edge interrupts are expected to already be
    /// wired to `on_edge` by the firmware layer. Returns `InvalidState` if
    /// called twice.
    pub fn init(&mut self) -> Result<()> {
        if self.initialized {
            return Err(GarageError::InvalidState);
        }
        self.initialized = true;
        let position = self.read_position();
        self.last_published.store(position_to_u8(position), Ordering::Relaxed);
        Ok(())
    }

    pub fn deinit(&mut self) {
        self.initialized = false;
        self.subscriber = None;
        self.pending.store(false, Ordering::Relaxed);
        self.debounce_remaining_ms = None;
    }

    /// Permitted only before `init`.
    pub fn set_gpio_config(&mut self, config: GpioConfig) -> Result<()> {
        if self.initialized {
            return Err(GarageError::InvalidState);
        }
        self.gpio_config = Some(config);
        Ok(())
    }

    pub fn register_callback(&mut self, callback: Sub) {
        self.subscriber = Some(callback);
    }

    /// Grants the firmware layer direct access to the closed-line pin, so
    /// it can clear a board-specific interrupt-pending bit from inside the
    /// edge ISR without this crate knowing about `ExtiPin` or any other
    /// MCU-specific trait.
    pub fn closed_pin_mut(&mut self) -> &mut ClosedPin {
        &mut self.closed_pin
    }

    /// As `closed_pin_mut`, for the open-line pin.
    pub fn open_pin_mut(&mut self) -> &mut OpenPin {
        &mut self.open_pin
    }

    fn read_position(&mut self) -> DoorPosition {
        if !self.initialized {
            return DoorPosition::Unknown;
        }
        // embedded-hal 0.2 GPIO pins are effectively infallible on the
        // boards this targets; a failed read degenerates to "not asserted"
        // rather than propagating an error this crate has no kind for.
        let closed_asserted = self.closed_pin.is_low().unwrap_or(false);
        let open_asserted = self.open_pin.is_low().unwrap_or(false);
        DoorPosition::from_lines(closed_asserted, open_asserted)
    }

    /// Synchronous three-valued read of the raw lines.
    pub fn get_position(&mut self) -> DoorPosition {
        self.read_position()
    }

    /// Edge handler. Runs in true interrupt context: no blocking, no
    /// allocation, no locks, only a flag set and the debounce countdown
    /// (re-)armed.
    pub fn on_edge(&mut self) {
        if !self.pending.swap(true, Ordering::AcqRel) {
            self.debounce_remaining_ms = Some(DEBOUNCE_MS);
        }
        // Repeated edges while pending leave debounce_remaining_ms
        // untouched; this coalesces a burst into a single publication. A
        // real one-shot hardware timer would be re-armed here; since timing
        // is driven by a shared millisecond tick instead, the in-flight
        // countdown already serves that purpose.
    }

    /// Advances the debounce countdown. Runs in timer-dispatch context;
    /// only this call publishes to the subscriber.
    pub fn tick(&mut self, dt_ms: u32) {
        let Some(remaining) = self.debounce_remaining_ms else {
            return;
        };
        let next = remaining.saturating_sub(dt_ms);
        if next == 0 {
            self.debounce_remaining_ms = None;
            self.pending.store(false, Ordering::Release);
            self.publish_if_changed();
        } else {
            self.debounce_remaining_ms = Some(next);
        }
    }

    fn publish_if_changed(&mut self) {
        let settled = self.read_position();
        let previous = u8_to_position(self.last_published.load(Ordering::Relaxed));
        if settled != previous {
            self.last_published.store(position_to_u8(settled), Ordering::Relaxed);
            #[cfg(feature = "defmt")]
            defmt::info!("reed: position settled to {}", settled);
            if let Some(subscriber) = self.subscriber.as_mut() {
                subscriber.notify(settled);
            }
        }
    }
}

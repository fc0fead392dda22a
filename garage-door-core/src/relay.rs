//! C2: one-shot bounded pulse actuation of the relay output.

use embedded_hal::digital::v2::OutputPin;

use crate::config::RelayConfig;
use crate::controller::RelayControl;
use crate::error::{GarageError, Result};
use crate::sink::Sink;

/// Bounded-duration output actuation with hardware-safety limits (maximum
/// pulse width, minimum inter-activation interval) and strict non-overlap.
///
/// `Pin` is the relay's push-pull output (idle-low, active-high).
/// `Sub` is the single-slot pulse-completion subscriber.
pub struct RelayDriver<Pin, Sub> {
    pin: Pin,
    initialized: bool,
    config: RelayConfig,
    active: bool,
    /// ms-since-boot accumulator, advanced by `tick`; the only clock this
    /// crate has. There is no battery-backed clock on this target.
    now_ms: u32,
    last_start_ms: Option<u32>,
    pulse_remaining_ms: Option<u32>,
    subscriber: Option<Sub>,
}

impl<Pin, Sub> RelayDriver<Pin, Sub>
where
    Pin: OutputPin,
    Sub: Sink<()>,
{
    pub fn new(pin: Pin) -> Self {
        RelayDriver {
            pin,
            initialized: false,
            config: RelayConfig::default(),
            active: false,
            now_ms: 0,
            last_start_ms: None,
            pulse_remaining_ms: None,
            subscriber: None,
        }
    }

    /// Configures the output low and arms the driver. Returns
    /// `InvalidState` if called twice.
    pub fn init(&mut self) -> Result<()> {
        if self.initialized {
            return Err(GarageError::InvalidState);
        }
        let _ = self.pin.set_low();
        self.initialized = true;
        Ok(())
    }

    pub fn deinit(&mut self) {
        let _ = self.pin.set_low();
        self.active = false;
        self.pulse_remaining_ms = None;
        self.initialized = false;
        self.subscriber = None;
    }

    pub fn set_config(&mut self, config: RelayConfig) {
        self.config = config;
    }

    pub fn get_config(&self) -> RelayConfig {
        self.config
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn register_callback(&mut self, callback: Sub) {
        self.subscriber = Some(callback);
    }

    /// Pulse for `config.pulse_duration_ms`.
    pub fn activate(&mut self) -> Result<()> {
        self.activate_pulse(self.config.pulse_duration_ms)
    }

    /// Pulse for a caller-supplied duration.
    pub fn activate_pulse(&mut self, duration_ms: u32) -> Result<()> {
        if !self.initialized {
            // The closed error-kind set has no dedicated "not initialized"
            // variant, so an uninitialized driver is just another invalid
            // state to call into.
            return Err(GarageError::InvalidState);
        }
        if duration_ms == 0 || duration_ms > self.config.max_pulse_duration_ms {
            #[cfg(feature = "defmt")]
            defmt::warn!("relay: rejecting pulse duration {}ms", duration_ms);
            return Err(GarageError::InvalidArgument);
        }
        if self.active {
            #[cfg(feature = "defmt")]
            defmt::warn!("relay: pulse requested while already active");
            return Err(GarageError::InvalidState);
        }
        if let Some(last_start) = self.last_start_ms {
            if self.now_ms.wrapping_sub(last_start) < self.config.min_interval_ms {
                #[cfg(feature = "defmt")]
                defmt::warn!("relay: pulse requested before min_interval_ms elapsed");
                return Err(GarageError::InvalidState);
            }
        }

        let _ = self.pin.set_high();
        self.active = true;
        self.last_start_ms = Some(self.now_ms);
        self.pulse_remaining_ms = Some(duration_ms);
        #[cfg(feature = "defmt")]
        defmt::info!("relay: pulse started, duration {}ms", duration_ms);
        Ok(())
    }

    /// Advances the ms-since-boot clock and the in-flight pulse countdown;
    /// called once per tick from the shared timer-dispatch context, under
    /// whatever lock guards this driver instance.
    pub fn tick(&mut self, dt_ms: u32) {
        self.now_ms = self.now_ms.wrapping_add(dt_ms);

        let Some(remaining) = self.pulse_remaining_ms else {
            return;
        };
        let next = remaining.saturating_sub(dt_ms);
        if next == 0 {
            self.pulse_remaining_ms = None;
            let _ = self.pin.set_low();
            self.active = false;
            if let Some(subscriber) = self.subscriber.as_mut() {
                subscriber.notify(());
            }
        } else {
            self.pulse_remaining_ms = Some(next);
        }
    }
}

impl<Pin, Sub> RelayControl for RelayDriver<Pin, Sub>
where
    Pin: OutputPin,
    Sub: Sink<()>,
{
    fn activate(&mut self) -> Result<()> {
        self.activate()
    }

    fn tick(&mut self, dt_ms: u32) {
        self.tick(dt_ms)
    }
}

//! C4: the state machine tying C1 (position), C2 (relay) and C3
//! (persistence) together, plus the watchdog and operation timeout.

use crate::config::{DEFAULT_TIMEOUT_MS, MIN_TIMEOUT_MS};
use crate::error::{GarageError, Result};
use crate::event::EventType;
use crate::sink::Sink;
use crate::state::{DoorPosition, DoorState};

/// What `DoorController` needs from C2: "ask for a bounded pulse". The
/// controller never touches pin state directly, only this capability.
pub trait RelayControl {
    fn activate(&mut self) -> Result<()>;
    /// Advances the relay's own pulse countdown by `dt_ms`; `DoorController::tick`
    /// drives this alongside its own timeout countdown.
    fn tick(&mut self, dt_ms: u32);
}

/// What `DoorController` needs from C3: the subset of the façade it drives
/// directly (state save/load, event logging).
pub trait DoorPersistence {
    fn save_door_state(&mut self, state: DoorState) -> Result<()>;
    fn load_door_state(&self) -> Result<DoorState>;
    fn log_event(&mut self, event_type: EventType, value: i32) -> Result<()>;
}

/// The door state machine. Generic over the relay capability, the
/// persistence façade, and a single-slot state subscriber, none of which
/// this type owns pins, a KV handle, or a dispatch mechanism for; it only
/// knows the traits above. Each controller is an explicit owned instance,
/// not a global singleton.
pub struct DoorController<Relay, Persist, Sub> {
    relay: Relay,
    persistence: Persist,
    subscriber: Option<Sub>,
    state: DoorState,
    initialized: bool,
    timeout_ms: u32,
    timeout_remaining_ms: Option<u32>,
}

impl<Relay, Persist, Sub> DoorController<Relay, Persist, Sub>
where
    Relay: RelayControl,
    Persist: DoorPersistence,
    Sub: Sink<DoorState>,
{
    pub fn new(relay: Relay, persistence: Persist) -> Self {
        DoorController {
            relay,
            persistence,
            subscriber: None,
            state: DoorState::Unknown,
            initialized: false,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            timeout_remaining_ms: None,
        }
    }

    /// Recovers `state` from persistence, reconciling against the
    /// boot-time reed `position`: a persisted `Opening`/`Closing` is only
    /// trusted if `position` already shows the matching terminal; otherwise
    /// it is coerced to `Unknown` rather than resuming motion blind. A
    /// persisted `Unknown` (including first boot, where the façade has
    /// nothing stored) is inferred from `position` the same way init
    /// always did.
    ///
    /// Mutex/timer/task allocation here is static (no heap, no dynamic
    /// task creation), so there is no `OutOfMemory` path at this layer.
    pub fn init(&mut self, position: DoorPosition) -> Result<()> {
        if self.initialized {
            return Err(GarageError::InvalidState);
        }

        let persisted = self.persistence.load_door_state()?;
        let resolved = match persisted {
            DoorState::Opening => match position {
                DoorPosition::Open => DoorState::Open,
                _ => DoorState::Unknown,
            },
            DoorState::Closing => match position {
                DoorPosition::Closed => DoorState::Closed,
                _ => DoorState::Unknown,
            },
            DoorState::Unknown => match position {
                DoorPosition::Closed => DoorState::Closed,
                DoorPosition::Open => DoorState::Open,
                _ => DoorState::Unknown,
            },
            other => other,
        };

        self.state = resolved;
        self.initialized = true;
        self.timeout_ms = DEFAULT_TIMEOUT_MS;
        self.timeout_remaining_ms = None;

        if resolved != persisted {
            let _ = self.persistence.save_door_state(resolved);
        }
        Ok(())
    }

    pub fn deinit(&mut self) {
        self.initialized = false;
        self.subscriber = None;
        self.timeout_remaining_ms = None;
    }

    pub fn register_state_callback(&mut self, callback: Sub) {
        self.subscriber = Some(callback);
    }

    pub fn get_state(&self) -> DoorState {
        self.state
    }

    pub fn is_moving(&self) -> bool {
        self.state.is_moving()
    }

    pub fn set_timeout(&mut self, ms: u32) -> Result<()> {
        if ms < MIN_TIMEOUT_MS {
            return Err(GarageError::InvalidArgument);
        }
        self.timeout_ms = ms;
        Ok(())
    }

    pub fn open(&mut self) -> Result<()> {
        match self.state {
            DoorState::Closed | DoorState::Stopped => {
                self.relay.activate()?;
                self.timeout_remaining_ms = Some(self.timeout_ms);
                self.apply_transition(DoorState::Opening, Some(EventType::DoorOpen));
                Ok(())
            }
            _ => Err(GarageError::InvalidState),
        }
    }

    pub fn close(&mut self) -> Result<()> {
        match self.state {
            DoorState::Open | DoorState::Stopped => {
                self.relay.activate()?;
                self.timeout_remaining_ms = Some(self.timeout_ms);
                self.apply_transition(DoorState::Closing, Some(EventType::DoorClosed));
                Ok(())
            }
            _ => Err(GarageError::InvalidState),
        }
    }

    /// `stop()` never fails: from `Opening`/`Closing` it cancels the
    /// timeout and transitions to `Stopped`; from any terminal state it is
    /// a successful no-op.
    pub fn stop(&mut self) -> Result<()> {
        if self.state.is_moving() {
            self.timeout_remaining_ms = None;
            self.apply_transition(DoorState::Stopped, None);
        }
        Ok(())
    }

    /// Primary path: called by the glue code registered as the
    /// `ReedSensor`'s position subscriber. Reaches the matching terminal
    /// when the door has moved in the commanded direction.
    pub fn on_position_change(&mut self, position: DoorPosition) {
        if let Some((to, event)) = self.terminal_reached(position) {
            self.timeout_remaining_ms = None;
            self.apply_transition(to, event);
        }
    }

    /// Backup path: called every 100 ms by the firmware scheduler with the
    /// latest polled position. Applies the same terminal-reached guard as
    /// `on_position_change` (idempotent with it) plus the obstruction
    /// guard that path does not check.
    pub fn watchdog_tick(&mut self, position: DoorPosition) {
        if let Some((to, event)) = self.terminal_reached(position) {
            self.timeout_remaining_ms = None;
            self.apply_transition(to, event);
            return;
        }
        let obstruction = match (self.state, position) {
            (DoorState::Opening, DoorPosition::Closed) => true,
            (DoorState::Closing, DoorPosition::Open) => true,
            _ => false,
        };
        if obstruction {
            self.timeout_remaining_ms = None;
            self.apply_transition(DoorState::Stopped, Some(EventType::Obstruction));
        }
    }

    /// Advances the relay's pulse countdown and this controller's own
    /// operation-timeout countdown; called once per tick from the shared
    /// timer-dispatch context, alongside `ReedSensor::tick`.
    pub fn tick(&mut self, dt_ms: u32) {
        self.relay.tick(dt_ms);

        let Some(remaining) = self.timeout_remaining_ms else {
            return;
        };
        let next = remaining.saturating_sub(dt_ms);
        if next == 0 {
            self.timeout_remaining_ms = None;
            self.apply_transition(DoorState::Stopped, Some(EventType::Timeout));
        } else {
            self.timeout_remaining_ms = Some(next);
        }
    }

    fn terminal_reached(&self, position: DoorPosition) -> Option<(DoorState, Option<EventType>)> {
        match (self.state, position) {
            (DoorState::Opening, DoorPosition::Open) => Some((DoorState::Open, None)),
            (DoorState::Closing, DoorPosition::Closed) => Some((DoorState::Closed, None)),
            _ => None,
        }
    }

    /// Log, persist, notify, in that order, and only for an actual
    /// old-!= new transition. Persistence/log failures are swallowed
    /// rather than rolled back or surfaced: the in-memory transition and
    /// the notification still happen regardless.
    fn apply_transition(&mut self, new_state: DoorState, event: Option<EventType>) {
        if new_state == self.state {
            return;
        }
        #[cfg(feature = "defmt")]
        defmt::info!("door: {} -> {}", self.state, new_state);
        if let Some(event_type) = event {
            if self.persistence.log_event(event_type, new_state.as_u32() as i32).is_err() {
                #[cfg(feature = "defmt")]
                defmt::warn!("door: failed to log event, continuing with in-memory transition");
            }
        }
        if self.persistence.save_door_state(new_state).is_err() {
            #[cfg(feature = "defmt")]
            defmt::warn!("door: failed to persist new state, continuing with in-memory transition");
        }
        self.state = new_state;
        if let Some(subscriber) = self.subscriber.as_mut() {
            subscriber.notify(new_state);
        }
    }
}

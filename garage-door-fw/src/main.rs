#![no_main]
#![no_std]

use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use panic_probe as _;
use rtic::app;
use stm32f1xx_hal::gpio::{
    gpioa::{PA0, PA1, PA2},
    Edge, ExtiPin, Input, Output, PullUp, PushPull,
};
use stm32f1xx_hal::prelude::*;
use stm32f1xx_hal::{pac, timer};

use garage_door_core::{
    DoorController, DoorPosition, DoorState, Persistence, RamKvStore, RelayDriver, ReedSensor,
    Sink,
};

defmt_rtt::timestamp!("{=u32:us}", {
    static COUNT: core::sync::atomic::AtomicU32 = core::sync::atomic::AtomicU32::new(0);
    COUNT.fetch_add(1, Ordering::Relaxed)
});

type ReedClosedPin = PA0<Input<PullUp>>;
type ReedOpenPin = PA1<Input<PullUp>>;
type RelayPin = PA2<Output<PushPull>>;

/// Watchdog period in tick counts: 100 ms at the shared 1 kHz tick every
/// timer in this firmware rides on.
const WATCHDOG_TICKS: u32 = garage_door_core::WATCHDOG_PERIOD_MS;

/// Position handoff out of `ReedSensor`'s subscriber (invoked synchronously
/// from inside the `tick` task's locked call to `ReedSensor::tick`) into
/// that same task's call to the controller's primary path, once the lock
/// on `reed_sensor` has been released. Plain atomics rather than a second
/// resource, since both the write and the read happen on the `tick` task.
static NEW_POSITION: AtomicU8 = AtomicU8::new(0);
static POSITION_CHANGED: AtomicBool = AtomicBool::new(false);

fn encode_position(position: DoorPosition) -> u8 {
    match position {
        DoorPosition::Unknown => 0,
        DoorPosition::Closed => 1,
        DoorPosition::Open => 2,
        DoorPosition::Between => 3,
    }
}

fn decode_position(code: u8) -> DoorPosition {
    match code {
        1 => DoorPosition::Closed,
        2 => DoorPosition::Open,
        3 => DoorPosition::Between,
        _ => DoorPosition::Unknown,
    }
}

/// `ReedSensor`'s registered subscriber: publishes the debounced, settled
/// position for the `tick` task to forward to the controller.
struct PositionRelay;

impl Sink<DoorPosition> for PositionRelay {
    fn notify(&mut self, value: DoorPosition) {
        NEW_POSITION.store(encode_position(value), Ordering::Release);
        POSITION_CHANGED.store(true, Ordering::Release);
    }
}

/// `DoorController`'s registered subscriber. The home-automation bridge is
/// an external collaborator; this stands in for it with the same shape:
/// log, nothing else.
struct StateLogger;

impl Sink<DoorState> for StateLogger {
    fn notify(&mut self, value: DoorState) {
        defmt::info!("door state changed: {}", value);
    }
}

/// `RelayDriver`'s completion subscriber is unused at the firmware layer.
/// The controller only cares about position and timeout, not pulse
/// completion, so this is a deliberate no-op sink.
struct NoopSink;

impl Sink<()> for NoopSink {
    fn notify(&mut self, _value: ()) {}
}

type Relay = RelayDriver<RelayPin, NoopSink>;
type Persist = Persistence<RamKvStore<128>>;
type Controller = DoorController<Relay, Persist, StateLogger>;
type Reed = ReedSensor<ReedClosedPin, ReedOpenPin, PositionRelay>;

#[app(device = stm32f1xx_hal::pac, peripherals = true)]
const APP: () = {
    struct Resources {
        reed_sensor: Reed,
        controller: Controller,
        tick_timer: timer::CountDownTimer<pac::TIM3>,
        watchdog_counter: u32,
    }

    #[init]
    fn init(c: init::Context) -> init::LateResources {
        let mut flash = c.device.FLASH.constrain();
        let mut rcc = c.device.RCC.constrain();

        let clocks = rcc
            .cfgr
            .use_hse(8.mhz())
            .sysclk(72.mhz())
            .pclk1(36.mhz())
            .freeze(&mut flash.acr);

        let mut gpioa = c.device.GPIOA.split(&mut rcc.apb2);
        let mut afio = c.device.AFIO.constrain(&mut rcc.apb2);

        let mut reed_closed = gpioa.pa0.into_pull_up_input(&mut gpioa.crl);
        let mut reed_open = gpioa.pa1.into_pull_up_input(&mut gpioa.crl);
        reed_closed.make_interrupt_source(&mut afio);
        reed_closed.trigger_on_edge(&c.device.EXTI, Edge::RisingFalling);
        reed_closed.enable_interrupt(&c.device.EXTI);
        reed_open.make_interrupt_source(&mut afio);
        reed_open.trigger_on_edge(&c.device.EXTI, Edge::RisingFalling);
        reed_open.enable_interrupt(&c.device.EXTI);

        let relay_pin: RelayPin = gpioa.pa2.into_push_pull_output(&mut gpioa.crl);

        let mut tick_timer =
            timer::Timer::tim3(c.device.TIM3, &clocks, &mut rcc.apb1).start_count_down(1.khz());
        tick_timer.listen(timer::Event::Update);

        let store = RamKvStore::<128>::new();
        let mut persistence = Persistence::new(store);
        // Fall back to defaults when the KV store has nothing yet. A real
        // board backs `Persistence` with flash-resident NVS; this process
        // only has the RAM store until that's wired in.
        let gpio_config = persistence.load_gpio_config().unwrap_or_default();
        let relay_config = persistence.load_relay_config().unwrap_or_default();
        let _ = persistence.save_gpio_config(gpio_config);
        let _ = persistence.save_relay_config(relay_config);

        let mut relay = RelayDriver::new(relay_pin);
        relay.init().expect("relay driver init is infallible on first call");
        relay.set_config(relay_config);
        relay.register_callback(NoopSink);

        let mut reed_sensor = ReedSensor::new(reed_closed, reed_open);
        reed_sensor.init().expect("reed sensor init is infallible on first call");
        reed_sensor.register_callback(PositionRelay);
        let boot_position = reed_sensor.get_position();

        let mut controller = DoorController::new(relay, persistence);
        controller.register_state_callback(StateLogger);
        controller
            .init(boot_position)
            .expect("controller init is infallible on first call");

        defmt::info!(
            "garage-door-fw booted, gpio_config={:?}, state={}",
            gpio_config,
            controller.get_state()
        );

        init::LateResources {
            reed_sensor,
            controller,
            tick_timer,
            watchdog_counter: 0,
        }
    }

    #[task(binds = EXTI0, priority = 2, resources = [reed_sensor])]
    fn reed_closed_edge(mut c: reed_closed_edge::Context) {
        c.resources.reed_sensor.closed_pin_mut().clear_interrupt_pending_bit();
        c.resources.reed_sensor.on_edge();
    }

    #[task(binds = EXTI1, priority = 2, resources = [reed_sensor])]
    fn reed_open_edge(mut c: reed_open_edge::Context) {
        c.resources.reed_sensor.open_pin_mut().clear_interrupt_pending_bit();
        c.resources.reed_sensor.on_edge();
    }

    /// The single 1 kHz tick every piece of timing in the system rides on:
    /// advances the reed sensor's debounce window and the controller
    /// (which advances its own relay), and every 100 ms runs the watchdog
    /// backup path.
    #[task(binds = TIM3, priority = 1, resources = [reed_sensor, controller, tick_timer, watchdog_counter])]
    fn tick(mut c: tick::Context) {
        c.resources.tick_timer.clear_update_interrupt_flag();

        c.resources.reed_sensor.lock(|rs| rs.tick(1));
        if POSITION_CHANGED.swap(false, Ordering::AcqRel) {
            let position = decode_position(NEW_POSITION.load(Ordering::Acquire));
            c.resources.controller.on_position_change(position);
        }

        c.resources.controller.tick(1);

        *c.resources.watchdog_counter += 1;
        if *c.resources.watchdog_counter >= WATCHDOG_TICKS {
            *c.resources.watchdog_counter = 0;
            let position = c.resources.reed_sensor.lock(|rs| rs.get_position());
            c.resources.controller.watchdog_tick(position);
        }
    }
};

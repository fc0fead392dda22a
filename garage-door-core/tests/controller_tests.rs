mod support;

use garage_door_core::{
    DoorController, DoorPosition, DoorState, GarageError, Persistence, RamKvStore, RelayDriver,
};
use proptest::prelude::*;
use support::{MockOutput, RecordingSink};

type TestController = DoorController<
    RelayDriver<MockOutput, RecordingSink<()>>,
    Persistence<RamKvStore<256>>,
    RecordingSink<DoorState>,
>;

fn make_controller() -> (
    TestController,
    std::rc::Rc<std::cell::Cell<bool>>,
    std::rc::Rc<std::cell::RefCell<Vec<DoorState>>>,
) {
    let pin = MockOutput::new();
    let high = pin.high.clone();
    let mut relay = RelayDriver::new(pin);
    relay.init().unwrap();

    let persistence = Persistence::new(RamKvStore::<256>::new());
    let mut controller = DoorController::new(relay, persistence);
    let (sink, events) = RecordingSink::new();
    controller.register_state_callback(sink);
    controller.init(DoorPosition::Closed).unwrap();
    (controller, high, events)
}

#[test]
fn normal_open_cycle() {
    let (mut controller, high, events) = make_controller();
    assert_eq!(controller.get_state(), DoorState::Closed);

    controller.open().unwrap();
    assert_eq!(controller.get_state(), DoorState::Opening);
    assert!(high.get());

    controller.tick(500);
    assert!(!high.get()); // relay driver ticked separately by firmware glue

    controller.on_position_change(DoorPosition::Between);
    assert_eq!(controller.get_state(), DoorState::Opening);

    controller.on_position_change(DoorPosition::Open);
    assert_eq!(controller.get_state(), DoorState::Open);

    assert_eq!(&*events.borrow(), &[DoorState::Opening, DoorState::Open]);
}

#[test]
fn obstruction_seen_at_the_opposite_endpoint_while_closing() {
    let pin = MockOutput::new();
    let mut relay = RelayDriver::new(pin);
    relay.init().unwrap();
    let persistence = Persistence::new(RamKvStore::<256>::new());
    let mut controller = DoorController::new(relay, persistence);
    controller.init(DoorPosition::Open).unwrap();

    controller.close().unwrap();
    assert_eq!(controller.get_state(), DoorState::Closing);

    // The watchdog fires Obstruction on the very first observation of the
    // opposite endpoint, not only after the door has demonstrably reversed
    // course.
    controller.watchdog_tick(DoorPosition::Open);
    assert_eq!(controller.get_state(), DoorState::Stopped);
}

#[test]
fn pure_non_movement_is_caught_by_timeout_not_obstruction() {
    // No watchdog/position signal at all: the door simply never reports
    // leaving `Between`, so only the operation timeout can end the move.
    let pin = MockOutput::new();
    let mut relay = RelayDriver::new(pin);
    relay.init().unwrap();
    let persistence = Persistence::new(RamKvStore::<256>::new());
    let mut controller = DoorController::new(relay, persistence);
    controller.init(DoorPosition::Open).unwrap();

    controller.close().unwrap();
    for _ in 0..299 {
        controller.tick(100);
        assert_eq!(controller.get_state(), DoorState::Closing);
    }
    controller.tick(100); // 30_000 ms elapsed
    assert_eq!(controller.get_state(), DoorState::Stopped);
}

#[test]
fn rate_limit_rejection_then_success_after_interval() {
    let (mut controller, _high, _events) = make_controller();
    controller.open().unwrap();
    controller.tick(400);
    controller.stop().unwrap();
    assert_eq!(controller.get_state(), DoorState::Stopped);

    assert_eq!(controller.open(), Err(GarageError::InvalidState));

    controller.tick(601); // 1001 ms since the first activation's start
    controller.open().unwrap();
    assert_eq!(controller.get_state(), DoorState::Opening);
}

#[test]
fn illegal_transition_leaves_state_and_hardware_unchanged() {
    let (mut controller, high, _events) = make_controller();
    controller.open().unwrap();
    assert!(high.get());

    assert_eq!(controller.open(), Err(GarageError::InvalidState));
    assert_eq!(controller.get_state(), DoorState::Opening);
}

#[test]
fn reboot_mid_motion_without_matching_position_coerces_to_unknown() {
    let store = RamKvStore::<256>::new();
    let mut persistence = Persistence::new(store);
    persistence.save_door_state(DoorState::Opening).unwrap();

    let pin = MockOutput::new();
    let mut relay = RelayDriver::new(pin);
    relay.init().unwrap();
    let mut controller = DoorController::new(relay, persistence);

    controller.init(DoorPosition::Between).unwrap();
    assert_eq!(controller.get_state(), DoorState::Unknown);
}

#[test]
fn reboot_mid_motion_with_matching_position_accepts_terminal() {
    let store = RamKvStore::<256>::new();
    let mut persistence = Persistence::new(store);
    persistence.save_door_state(DoorState::Opening).unwrap();

    let pin = MockOutput::new();
    let mut relay = RelayDriver::new(pin);
    relay.init().unwrap();
    let mut controller = DoorController::new(relay, persistence);

    controller.init(DoorPosition::Open).unwrap();
    assert_eq!(controller.get_state(), DoorState::Open);
}

#[test]
fn stop_from_terminal_states_is_a_no_op() {
    let (mut controller, _high, events) = make_controller();
    assert_eq!(controller.get_state(), DoorState::Closed);
    controller.stop().unwrap();
    assert_eq!(controller.get_state(), DoorState::Closed);
    assert!(events.borrow().is_empty());
}

#[test]
fn set_timeout_rejects_sub_second_values() {
    let (mut controller, _high, _events) = make_controller();
    assert_eq!(controller.set_timeout(999), Err(GarageError::InvalidArgument));
    assert!(controller.set_timeout(1_000).is_ok());
}

proptest! {
    /// Every public API call lands on one of the admitted successor
    /// states, and illegal calls never alter state.
    #[test]
    fn transition_legality(
        commands in prop::collection::vec(0u8..3, 1..20),
        positions in prop::collection::vec(0u8..4, 1..20),
    ) {
        let (mut controller, _high, _events) = make_controller();
        for (command, position_code) in commands.into_iter().zip(positions.into_iter()) {
            let before = controller.get_state();
            let result = match command {
                0 => controller.open(),
                1 => controller.close(),
                _ => controller.stop(),
            };
            let after = controller.get_state();
            match (command, result.is_ok()) {
                (0, true) => prop_assert!(matches!(before, DoorState::Closed | DoorState::Stopped) && after == DoorState::Opening),
                (1, true) => prop_assert!(matches!(before, DoorState::Open | DoorState::Stopped) && after == DoorState::Closing),
                (2, true) => {
                    if before.is_moving() {
                        prop_assert_eq!(after, DoorState::Stopped);
                    } else {
                        prop_assert_eq!(after, before);
                    }
                }
                (_, false) => prop_assert_eq!(before, after),
                _ => unreachable!(),
            }

            let position = match position_code {
                0 => DoorPosition::Unknown,
                1 => DoorPosition::Closed,
                2 => DoorPosition::Open,
                _ => DoorPosition::Between,
            };
            let before_watchdog = controller.get_state();
            controller.watchdog_tick(position);
            let after_watchdog = controller.get_state();
            if before_watchdog != after_watchdog {
                prop_assert!(before_watchdog.is_moving());
                prop_assert!(matches!(after_watchdog, DoorState::Open | DoorState::Closed | DoorState::Stopped));
            }
        }
    }

    /// A saved state survives a simulated reboot (fresh controller instance
    /// over the same persisted store), given a position consistent with it.
    #[test]
    fn reboot_recovery(state_code in 0u32..4) {
        let terminal = match state_code {
            0 => DoorState::Closed,
            1 => DoorState::Open,
            2 => DoorState::Stopped,
            _ => DoorState::Unknown,
        };
        let position = match terminal {
            DoorState::Closed => DoorPosition::Closed,
            DoorState::Open => DoorPosition::Open,
            _ => DoorPosition::Between,
        };

        let mut persistence = Persistence::new(RamKvStore::<256>::new());
        persistence.save_door_state(terminal).unwrap();

        let pin = MockOutput::new();
        let mut relay = RelayDriver::new(pin);
        relay.init().unwrap();
        let mut controller = DoorController::new(relay, persistence);
        controller.init(position).unwrap();

        prop_assert_eq!(controller.get_state(), terminal);
    }
}

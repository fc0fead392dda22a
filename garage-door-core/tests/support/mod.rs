//! Minimal in-memory `embedded-hal` 0.2 GPIO pins for host-side tests. No
//! mock crate in the dependency stack does this job for this HAL version,
//! so these are hand-rolled the way `garage-door-core` itself talks to
//! pins: via the plain `InputPin`/`OutputPin` traits.

use core::convert::Infallible;
use std::cell::Cell;
use std::rc::Rc;

use embedded_hal::digital::v2::{InputPin, OutputPin};

/// A level shared between a test and the pin(s) reading/driving it.
#[derive(Clone)]
pub struct Line(Rc<Cell<bool>>);

impl Line {
    pub fn new(initial_low: bool) -> Self {
        Line(Rc::new(Cell::new(initial_low)))
    }

    pub fn set_low(&self, low: bool) {
        self.0.set(low);
    }
}

pub struct MockInput(pub Line);

impl InputPin for MockInput {
    type Error = Infallible;

    fn is_high(&self) -> Result<bool, Infallible> {
        Ok(!self.0 .0.get())
    }

    fn is_low(&self) -> Result<bool, Infallible> {
        Ok(self.0 .0.get())
    }
}

#[derive(Default)]
pub struct MockOutput {
    pub high: Rc<Cell<bool>>,
}

impl MockOutput {
    pub fn new() -> Self {
        MockOutput { high: Rc::new(Cell::new(false)) }
    }

    pub fn is_high(&self) -> bool {
        self.high.get()
    }
}

impl OutputPin for MockOutput {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Infallible> {
        self.high.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.high.set(true);
        Ok(())
    }
}

/// A `Sink` that appends every notified value to a shared `Vec`, so tests
/// can assert on the exact notification sequence.
pub struct RecordingSink<T> {
    pub events: Rc<std::cell::RefCell<Vec<T>>>,
}

impl<T> RecordingSink<T> {
    pub fn new() -> (Self, Rc<std::cell::RefCell<Vec<T>>>) {
        let events = Rc::new(std::cell::RefCell::new(Vec::new()));
        (RecordingSink { events: events.clone() }, events)
    }
}

impl<T> garage_door_core::Sink<T> for RecordingSink<T> {
    fn notify(&mut self, value: T) {
        self.events.borrow_mut().push(value);
    }
}

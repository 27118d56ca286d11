//! Sources of the current time.
use chrono::{Local, NaiveDateTime, TimeDelta};
use std::cell::Cell;
use std::rc::Rc;

/// Something which can report the current local time
pub trait Clock {
    /// The current local time
    fn now(&self) -> NaiveDateTime;
}

/// The system's wall clock in the local time zone
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock which only moves when told to.
///
/// Clones share the same underlying time, so a test can keep one copy and hand another to the code
/// under test.
#[derive(Debug, Clone)]
pub struct ManualClock(Rc<Cell<NaiveDateTime>>);

impl ManualClock {
    /// Create a clock stopped at `start`
    pub fn new(start: NaiveDateTime) -> Self {
        Self(Rc::new(Cell::new(start)))
    }

    /// Set the current time
    pub fn set(&self, time: NaiveDateTime) {
        self.0.set(time);
    }

    /// Move the clock forward by `delta` and return the new time
    pub fn advance(&self, delta: TimeDelta) -> NaiveDateTime {
        let time = self.0.get() + delta;
        self.0.set(time);
        time
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        self.0.get()
    }
}

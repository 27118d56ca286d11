//! A queue of pending one-shot timers.
use chrono::NaiveDateTime;
use std::collections::BTreeMap;

/// Identifies a timer within the queue which created it
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

/// One-shot timers carrying an event of type `E`.
///
/// Timers fire in order of deadline, with ties broken by the order in which they were scheduled.
/// Nothing fires on its own: the owner polls the queue with [`TimerQueue::pop_due`].
#[derive(Debug)]
pub struct TimerQueue<E> {
    timers: BTreeMap<(NaiveDateTime, TimerId), E>,
    next_id: u64,
}

impl<E> Default for TimerQueue<E> {
    fn default() -> Self {
        Self {
            timers: BTreeMap::new(),
            next_id: 0,
        }
    }
}

impl<E> TimerQueue<E> {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `event` to fire at `due`
    pub fn schedule(&mut self, due: NaiveDateTime, event: E) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.timers.insert((due, id), event);
        id
    }

    /// Cancel a timer, returning its event if it had not yet fired
    pub fn cancel(&mut self, id: TimerId) -> Option<E> {
        let key = *self.timers.keys().find(|(_, timer_id)| *timer_id == id)?;
        self.timers.remove(&key)
    }

    /// Whether the timer is still waiting to fire
    pub fn is_pending(&self, id: TimerId) -> bool {
        self.timers.keys().any(|(_, timer_id)| *timer_id == id)
    }

    /// Remove and return the earliest timer which is due at `now`, if any
    pub fn pop_due(&mut self, now: NaiveDateTime) -> Option<(TimerId, E)> {
        let entry = self.timers.first_entry()?;
        if entry.key().0 > now {
            return None;
        }

        let ((_, id), event) = entry.remove_entry();
        Some((id, event))
    }

    /// The deadline of the next timer to fire
    pub fn next_due(&self) -> Option<NaiveDateTime> {
        self.timers.keys().next().map(|(due, _)| *due)
    }

    /// Cancel every timer
    pub fn clear(&mut self) {
        self.timers.clear();
    }

    /// The number of pending timers
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    /// Whether there are no pending timers
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}

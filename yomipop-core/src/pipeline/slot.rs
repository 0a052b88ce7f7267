//! Single-slot latest-value channel.
//!
//! A send overwrites any unread prior value; a receive blocks until a
//! value is present, then takes it and clears the slot. Bursts collapse
//! into the most recent value, which is the right policy for hover-driven
//! work where older requests are obsolete the moment a newer one exists.

use std::sync::{Condvar, Mutex, PoisonError};

struct SlotState<T> {
    value: Option<T>,
    closed: bool,
}

pub struct LatestSlot<T> {
    state: Mutex<SlotState<T>>,
    available: Condvar,
}

impl<T> LatestSlot<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SlotState {
                value: None,
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Store a value, replacing any unread one. Ignored after `close`.
    pub fn send(&self, value: T) {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if state.closed {
            return;
        }
        state.value = Some(value);
        self.available.notify_one();
    }

    /// Block until a value is available, take it and clear the slot.
    /// Returns `None` once the slot is closed and drained.
    pub fn recv(&self) -> Option<T> {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(value) = state.value.take() {
                return Some(value);
            }
            if state.closed {
                return None;
            }
            state = self
                .available
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Take the current value without blocking.
    pub fn try_recv(&self) -> Option<T> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .value
            .take()
    }

    /// Close the slot: pending receivers wake with `None`, later sends are
    /// dropped. A value already in the slot is still delivered first.
    pub fn close(&self) {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        state.closed = true;
        self.available.notify_all();
    }
}

impl<T> Default for LatestSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

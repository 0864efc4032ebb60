//! Latest-only frame mailbox
//!
//! A single-slot handoff between a capture thread and a consumer. Publishing
//! overwrites whatever is pending, so the consumer always sees the newest
//! frame and the slot never grows past one entry regardless of how slow the
//! consumer is.

use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Outcome of waiting on the slot
#[derive(Debug, PartialEq)]
pub enum SlotRecv<T> {
    /// The most recent value
    Value(T),
    /// Nothing was published within the wait window
    Timeout,
    /// The slot was closed and is empty
    Closed,
}

#[derive(Debug)]
struct SlotState<T> {
    pending: Option<T>,
    published: u64,
    discarded: u64,
    closed: bool,
}

/// Single-entry, overwrite-on-publish mailbox
#[derive(Debug)]
pub struct LatestFrameSlot<T> {
    state: Mutex<SlotState<T>>,
    ready: Condvar,
}

impl<T> LatestFrameSlot<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SlotState {
                pending: None,
                published: 0,
                discarded: 0,
                closed: false,
            }),
            ready: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SlotState<T>> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Publish a value, replacing any pending one
    ///
    /// Returns `false` if the slot is closed.
    pub fn publish(&self, value: T) -> bool {
        let mut state = self.lock();
        if state.closed {
            return false;
        }
        if state.pending.replace(value).is_some() {
            state.discarded += 1;
        }
        state.published += 1;
        drop(state);
        self.ready.notify_one();
        true
    }

    /// Take the pending value, waiting up to `timeout` for one to arrive
    pub fn take_timeout(&self, timeout: Duration) -> SlotRecv<T> {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();

        loop {
            if let Some(value) = state.pending.take() {
                return SlotRecv::Value(value);
            }
            if state.closed {
                return SlotRecv::Closed;
            }

            let now = Instant::now();
            if now >= deadline {
                return SlotRecv::Timeout;
            }

            state = match self.ready.wait_timeout(state, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }

    /// Close the slot, waking any waiter. A pending value is dropped.
    pub fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        state.pending = None;
        drop(state);
        self.ready.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Whether a value is waiting
    pub fn has_pending(&self) -> bool {
        self.lock().pending.is_some()
    }

    /// Total values ever published
    pub fn published(&self) -> u64 {
        self.lock().published
    }

    /// Values overwritten before anyone took them
    pub fn discarded(&self) -> u64 {
        self.lock().discarded
    }
}

impl<T> Default for LatestFrameSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

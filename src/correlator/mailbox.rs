//! Single-slot reply mailbox
//!
//! One string slot and one condition variable. A write overwrites the slot;
//! a take blocks until the slot is non-empty, then empties it. This is not a
//! queue.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Shared between the caller waiting for a reply and the receive thread
#[derive(Debug, Default)]
pub struct Mailbox {
    slot: Mutex<String>,
    ready: Condvar,
}

impl Mailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard anything in the slot
    pub fn clear(&self) {
        self.slot.lock().clear();
    }

    /// Store `chunk`, replacing any unconsumed reply, and wake the waiter
    pub fn deliver(&self, chunk: &str) {
        let mut slot = self.slot.lock();
        slot.clear();
        slot.push_str(chunk);
        self.ready.notify_one();
    }

    /// Block until a reply is present, then take it
    pub fn take(&self) -> String {
        let mut slot = self.slot.lock();
        while slot.is_empty() {
            self.ready.wait(&mut slot);
        }
        std::mem::take(&mut *slot)
    }

    /// Like [`Mailbox::take`], giving up after `timeout`
    ///
    /// A timeout too large to express as a deadline waits without bound.
    pub fn take_timeout(&self, timeout: Duration) -> Option<String> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return Some(self.take());
        };
        let mut slot = self.slot.lock();
        while slot.is_empty() {
            if self.ready.wait_until(&mut slot, deadline).timed_out() {
                break;
            }
        }

        if slot.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut *slot))
        }
    }

    pub fn is_empty(&self) -> bool {
        self.slot.lock().is_empty()
    }
}

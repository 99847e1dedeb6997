//! Single-waiter park/unpark built on `Mutex` + `Condvar`
//!
//! Used by the logger consumer to sleep while its ring is empty. Producers
//! call [`Parker::unpark`] after every enqueue; it only touches the mutex
//! when the consumer has announced that it is about to park, so the common
//! path is one atomic load.
//!
//! Protocol for the waiter:
//!
//! ```text
//! parker.prepare_park();           // announce (SeqCst)
//! if work_available() {            // re-check after announcing
//!     parker.cancel_park();
//! } else {
//!     parker.park_timeout(idle);   // sleeps unless a wake is pending
//! }
//! ```
//!
//! Producers publish their work before calling `unpark`, and both sides put
//! a SeqCst fence between their store and their load, so either the waiter
//! sees the work or the producer sees the announcement. The timeout bounds
//! any remaining latency.

use std::sync::atomic::{fence, AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Duration;

pub struct Parker {
    /// Waiter is parked or about to park
    parked: AtomicBool,
    /// Wake pending
    mutex: Mutex<bool>,
    condvar: Condvar,
}

impl Parker {
    pub fn new() -> Self {
        Self {
            parked: AtomicBool::new(false),
            mutex: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    pub fn prepare_park(&self) {
        self.parked.store(true, Ordering::SeqCst);
        fence(Ordering::SeqCst);
    }

    pub fn cancel_park(&self) {
        self.parked.store(false, Ordering::Relaxed);
    }

    /// Sleep until woken or `timeout` elapses. Returns true if woken.
    pub fn park_timeout(&self, timeout: Duration) -> bool {
        let mut pending = self.mutex.lock().unwrap_or_else(PoisonError::into_inner);
        if !*pending {
            pending = self
                .condvar
                .wait_timeout(pending, timeout)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        let woken = std::mem::replace(&mut *pending, false);
        drop(pending);

        self.parked.store(false, Ordering::Relaxed);
        woken
    }

    /// Wake the waiter if it has announced a park
    pub fn unpark(&self) {
        fence(Ordering::SeqCst);
        if self.parked.load(Ordering::SeqCst) {
            self.wake();
        }
    }

    /// Wake unconditionally (shutdown path)
    pub fn wake(&self) {
        *self.mutex.lock().unwrap_or_else(PoisonError::into_inner) = true;
        self.condvar.notify_one();
    }
}

impl Default for Parker {
    fn default() -> Self {
        Self::new()
    }
}

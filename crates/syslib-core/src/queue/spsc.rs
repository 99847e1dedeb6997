//! Single-producer single-consumer ring buffer
//!
//! Head is owned by the producer, tail by the consumer. Each side reads the
//! other's index with `Acquire` and publishes its own with `Release`, so a
//! slot written before a head store is visible to the consumer that observes
//! that head. No CAS, no locks.
//!
//! One slot is always left empty: `next(head) == tail` means full,
//! `head == tail` means empty.

use super::{TryEnqueueError, ValueCell};
use crossbeam_utils::CachePadded;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Create a ring with `capacity` slots (holds at most `capacity - 1` values).
///
/// # Panics
///
/// Panics if `capacity < 2`.
pub fn ring<T>(capacity: usize) -> (Producer<T>, Consumer<T>) {
    assert!(capacity >= 2, "spsc ring needs at least 2 slots, got {}", capacity);

    let ring = Arc::new(Ring {
        head: CachePadded::new(AtomicUsize::new(0)),
        tail: CachePadded::new(AtomicUsize::new(0)),
        slots: (0..capacity).map(|_| ValueCell::empty()).collect(),
    });

    (
        Producer { ring: Arc::clone(&ring) },
        Consumer { ring },
    )
}

struct Ring<T> {
    /// Next slot to write (producer-owned)
    head: CachePadded<AtomicUsize>,
    /// Next slot to read (consumer-owned)
    tail: CachePadded<AtomicUsize>,
    slots: Box<[ValueCell<T>]>,
}

// Safety: a slot is touched by the producer only while it lies outside
// [tail, head) and by the consumer only while inside; the index handoff
// is release/acquire ordered.
unsafe impl<T: Send> Send for Ring<T> {}
unsafe impl<T: Send> Sync for Ring<T> {}

impl<T> Ring<T> {
    #[inline]
    fn next(&self, idx: usize) -> usize {
        let n = idx + 1;
        if n == self.slots.len() {
            0
        } else {
            n
        }
    }

    #[inline]
    fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        if head >= tail {
            head - tail
        } else {
            self.slots.len() - tail + head
        }
    }
}

impl<T> Drop for Ring<T> {
    fn drop(&mut self) {
        let head = *self.head.get_mut();
        let mut tail = *self.tail.get_mut();
        while tail != head {
            // Safety: [tail, head) holds initialized values and no handle is left
            unsafe { self.slots[tail].drop_in_place() };
            tail = self.next(tail);
        }
    }
}

/// Writing half. Exactly one exists per ring.
pub struct Producer<T> {
    ring: Arc<Ring<T>>,
}

impl<T> Producer<T> {
    /// Append `value`, or hand it back if the ring is full
    pub fn enqueue(&mut self, value: T) -> Result<(), TryEnqueueError<T>> {
        let ring = &*self.ring;
        let head = ring.head.load(Ordering::Relaxed);
        let next = ring.next(head);

        if next == ring.tail.load(Ordering::Acquire) {
            return Err(TryEnqueueError(value));
        }

        // Safety: slot `head` is outside [tail, head), only we write it
        unsafe { ring.slots[head].write(value) };
        ring.head.store(next, Ordering::Release);
        Ok(())
    }

    /// Number of slots (one more than the maximum number of queued values)
    #[inline]
    pub fn capacity(&self) -> usize {
        self.ring.slots.len()
    }

    /// Snapshot of queued values; may be stale by the time it returns
    #[inline]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Reading half. Exactly one exists per ring.
pub struct Consumer<T> {
    ring: Arc<Ring<T>>,
}

impl<T> Consumer<T> {
    /// Remove the oldest value, or `None` if the ring is empty
    pub fn dequeue(&mut self) -> Option<T> {
        let ring = &*self.ring;
        let tail = ring.tail.load(Ordering::Relaxed);

        if tail == ring.head.load(Ordering::Acquire) {
            return None;
        }

        // Safety: tail != head so the slot was published by the producer
        let value = unsafe { ring.slots[tail].take() };
        ring.tail.store(ring.next(tail), Ordering::Release);
        Some(value)
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.ring.slots.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

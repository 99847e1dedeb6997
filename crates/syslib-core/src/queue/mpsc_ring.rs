//! Bounded multi-producer single-consumer ring buffer
//!
//! Producers reserve a slot by CAS on a shared head counter, then write the
//! value. Reservation and write are two steps, so a consumer that trusted
//! the head counter alone could read a reserved slot before its value lands.
//! Each slot therefore carries a `ready` flag:
//!
//! ```text
//! producer:  CAS head h -> h+1  ──>  write slot[h]  ──>  ready[h] = true (Release)
//! consumer:  ready[t] (Acquire)? ──> read slot[t]   ──>  ready[t] = false, tail = t+1 (Release)
//! ```
//!
//! A reserved-but-unwritten slot reads as "empty" to the consumer, which
//! keeps FIFO order by never skipping it.
//!
//! head and tail are monotonically increasing counters; the slot index is
//! `counter % capacity`. Using counters instead of wrapped indices means a
//! producer stalled between loading head and its CAS cannot be fooled by
//! head wrapping back to the same index.

use super::{TryEnqueueError, ValueCell};
use crossbeam_utils::CachePadded;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Create a ring with `capacity` slots (holds at most `capacity - 1` values).
///
/// # Panics
///
/// Panics if `capacity < 2`.
pub fn ring<T>(capacity: usize) -> (Producer<T>, Consumer<T>) {
    assert!(capacity >= 2, "mpsc ring needs at least 2 slots, got {}", capacity);

    let ring = Arc::new(Ring {
        head: CachePadded::new(AtomicUsize::new(0)),
        tail: CachePadded::new(AtomicUsize::new(0)),
        slots: (0..capacity)
            .map(|_| Slot {
                ready: AtomicBool::new(false),
                value: ValueCell::empty(),
            })
            .collect(),
    });

    (
        Producer { ring: Arc::clone(&ring) },
        Consumer { ring },
    )
}

struct Slot<T> {
    ready: AtomicBool,
    value: ValueCell<T>,
}

struct Ring<T> {
    /// Producers CAS, consumer reads for `len`
    head: CachePadded<AtomicUsize>,
    /// Consumer stores, producers read to check fullness
    tail: CachePadded<AtomicUsize>,
    slots: Box<[Slot<T>]>,
}

// Safety: a slot is written only by the producer that won the head CAS for
// it, and read only by the consumer after observing its ready flag.
unsafe impl<T: Send> Send for Ring<T> {}
unsafe impl<T: Send> Sync for Ring<T> {}

impl<T> Ring<T> {
    #[inline]
    fn slot(&self, counter: usize) -> &Slot<T> {
        &self.slots[counter % self.slots.len()]
    }
}

impl<T> Drop for Ring<T> {
    fn drop(&mut self) {
        for slot in self.slots.iter_mut() {
            if *slot.ready.get_mut() {
                // Safety: ready slots hold a value; no handle is left
                unsafe { slot.value.drop_in_place() };
            }
        }
    }
}

/// Writing half. Clone it for each producer thread.
pub struct Producer<T> {
    ring: Arc<Ring<T>>,
}

impl<T> Clone for Producer<T> {
    fn clone(&self) -> Self {
        Producer { ring: Arc::clone(&self.ring) }
    }
}

impl<T> Producer<T> {
    /// Append `value`, or hand it back if the ring is full.
    ///
    /// Lock-free: the CAS retry loop only repeats when another producer
    /// reserved a slot in between.
    pub fn enqueue(&self, value: T) -> Result<(), TryEnqueueError<T>> {
        let ring = &*self.ring;
        let usable = ring.slots.len() - 1;

        let head = loop {
            // tail first: any head value loaded afterwards is >= this tail
            let tail = ring.tail.load(Ordering::Acquire);
            let head = ring.head.load(Ordering::Relaxed);

            if head.wrapping_sub(tail) >= usable {
                return Err(TryEnqueueError(value));
            }

            if ring
                .head
                .compare_exchange_weak(
                    head,
                    head.wrapping_add(1),
                    Ordering::AcqRel,
                    Ordering::Relaxed,
                )
                .is_ok()
            {
                break head;
            }
            std::hint::spin_loop();
        };

        let slot = ring.slot(head);
        // Safety: we own counter `head`; the previous lap's value in this
        // slot was consumed (tail > head - capacity + 1 was observed)
        unsafe { slot.value.write(value) };
        slot.ready.store(true, Ordering::Release);
        Ok(())
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.ring.slots.len()
    }
}

/// Reading half. Exactly one exists per ring.
pub struct Consumer<T> {
    ring: Arc<Ring<T>>,
}

impl<T> Consumer<T> {
    /// Remove the oldest published value.
    ///
    /// Returns `None` when the ring is empty or when the oldest slot is
    /// reserved but its producer has not finished writing it yet.
    pub fn dequeue(&mut self) -> Option<T> {
        let ring = &*self.ring;
        let tail = ring.tail.load(Ordering::Relaxed);
        let slot = ring.slot(tail);

        if !slot.ready.load(Ordering::Acquire) {
            return None;
        }

        // Safety: ready was published after the write
        let value = unsafe { slot.value.take() };
        slot.ready.store(false, Ordering::Relaxed);
        ring.tail.store(tail.wrapping_add(1), Ordering::Release);
        Some(value)
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.ring.slots.len()
    }

    /// Reserved slots, including ones still being written
    #[inline]
    pub fn len(&self) -> usize {
        let tail = self.ring.tail.load(Ordering::Relaxed);
        self.ring.head.load(Ordering::Acquire).wrapping_sub(tail)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

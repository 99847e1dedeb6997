//! Bounded multi-producer multi-consumer queue
//!
//! Per-slot sequence numbers (Vyukov's bounded MPMC design). Slot `i`
//! starts with `seq = i`. For a position `pos` mapping to that slot:
//!
//! - `seq == pos`: free, a producer may claim it by CAS on `head`
//! - `seq == pos + 1`: holds a value, a consumer may claim it by CAS on `tail`
//! - after consuming, the consumer stores `seq = pos + capacity`, freeing the
//!   slot for the producer one lap later
//!
//! The sequence store is the publication point in both directions, so a
//! claimed-but-unwritten slot is never visible to the other side.

use super::{TryEnqueueError, ValueCell};
use crossbeam_utils::CachePadded;
use std::sync::atomic::{AtomicUsize, Ordering};

struct Slot<T> {
    seq: AtomicUsize,
    value: ValueCell<T>,
}

/// Fixed-capacity queue shared by reference between any number of
/// producers and consumers (wrap it in an `Arc`).
pub struct MpmcQueue<T> {
    /// Next enqueue position
    head: CachePadded<AtomicUsize>,
    /// Next dequeue position
    tail: CachePadded<AtomicUsize>,
    slots: Box<[Slot<T>]>,
}

// Safety: slot contents move between threads only through the seq handoff.
unsafe impl<T: Send> Send for MpmcQueue<T> {}
unsafe impl<T: Send> Sync for MpmcQueue<T> {}

impl<T> MpmcQueue<T> {
    /// Create a queue holding up to `capacity` values.
    ///
    /// With one slot a published `seq = pos + 1` would equal the next
    /// producer position, so the sequence scheme needs at least two.
    ///
    /// # Panics
    ///
    /// Panics if `capacity < 2`.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 2, "mpmc queue needs at least 2 slots, got {}", capacity);

        MpmcQueue {
            head: CachePadded::new(AtomicUsize::new(0)),
            tail: CachePadded::new(AtomicUsize::new(0)),
            slots: (0..capacity)
                .map(|i| Slot {
                    seq: AtomicUsize::new(i),
                    value: ValueCell::empty(),
                })
                .collect(),
        }
    }

    #[inline]
    fn slot(&self, pos: usize) -> &Slot<T> {
        &self.slots[pos % self.slots.len()]
    }

    /// Append `value`, or hand it back if every slot is taken
    pub fn enqueue(&self, value: T) -> Result<(), TryEnqueueError<T>> {
        let mut pos = self.head.load(Ordering::Relaxed);
        loop {
            let slot = self.slot(pos);
            let seq = slot.seq.load(Ordering::Acquire);
            let diff = seq.wrapping_sub(pos) as isize;

            if diff == 0 {
                match self.head.compare_exchange_weak(
                    pos,
                    pos.wrapping_add(1),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        // Safety: the CAS made position `pos` ours
                        unsafe { slot.value.write(value) };
                        slot.seq.store(pos.wrapping_add(1), Ordering::Release);
                        return Ok(());
                    }
                    Err(current) => pos = current,
                }
            } else if diff < 0 {
                // Slot still holds last lap's value
                return Err(TryEnqueueError(value));
            } else {
                // Another producer already took `pos`
                pos = self.head.load(Ordering::Relaxed);
            }
        }
    }

    /// Remove the oldest value, or `None` if the queue is empty
    pub fn dequeue(&self) -> Option<T> {
        let mut pos = self.tail.load(Ordering::Relaxed);
        loop {
            let slot = self.slot(pos);
            let seq = slot.seq.load(Ordering::Acquire);
            let diff = seq.wrapping_sub(pos.wrapping_add(1)) as isize;

            if diff == 0 {
                match self.tail.compare_exchange_weak(
                    pos,
                    pos.wrapping_add(1),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        // Safety: seq == pos + 1 means the value was published
                        let value = unsafe { slot.value.take() };
                        slot.seq
                            .store(pos.wrapping_add(self.slots.len()), Ordering::Release);
                        return Some(value);
                    }
                    Err(current) => pos = current,
                }
            } else if diff < 0 {
                return None;
            } else {
                pos = self.tail.load(Ordering::Relaxed);
            }
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Approximate number of queued values
    pub fn len(&self) -> usize {
        let tail = self.tail.load(Ordering::Acquire);
        let head = self.head.load(Ordering::Acquire);
        head.wrapping_sub(tail).min(self.slots.len())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Drop for MpmcQueue<T> {
    fn drop(&mut self) {
        while self.dequeue().is_some() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::AtomicU64;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_fifo_and_full() {
        let q = MpmcQueue::new(4);
        for i in 0..4 {
            q.enqueue(i).unwrap();
        }
        assert_eq!(q.len(), 4);
        assert_eq!(q.enqueue(4).unwrap_err().into_inner(), 4);

        assert_eq!(q.dequeue(), Some(0));
        q.enqueue(4).unwrap();
        for i in 1..5 {
            assert_eq!(q.dequeue(), Some(i));
        }
        assert_eq!(q.dequeue(), None);
        assert!(q.is_empty());
    }

    #[test]
    #[should_panic(expected = "at least 2 slots")]
    fn test_capacity_one_rejected() {
        let _ = MpmcQueue::<char>::new(1);
    }

    #[test]
    fn test_capacity_two_rejects_when_full() {
        let q = MpmcQueue::new(2);
        q.enqueue('x').unwrap();
        q.enqueue('y').unwrap();
        assert_eq!(q.enqueue('z').unwrap_err().into_inner(), 'z');
        assert_eq!(q.dequeue(), Some('x'));
        q.enqueue('z').unwrap();
        assert_eq!(q.enqueue('w').unwrap_err().into_inner(), 'w');
        assert_eq!(q.dequeue(), Some('y'));
        assert_eq!(q.dequeue(), Some('z'));
        assert_eq!(q.dequeue(), None);
    }

    #[test]
    fn test_many_laps() {
        let q = MpmcQueue::new(3);
        for i in 0..1000u32 {
            q.enqueue(i).unwrap();
            assert_eq!(q.dequeue(), Some(i));
        }
    }

    #[test]
    fn test_conservation_multi_producer_multi_consumer() {
        let producers = 4u64;
        let consumers = 4;
        let per_producer = 25_000u64;
        let total = producers * per_producer;

        let q = Arc::new(MpmcQueue::new(64));
        let count = Arc::new(AtomicU64::new(0));

        let mut handles = vec![];
        for p in 0..producers {
            let q = Arc::clone(&q);
            handles.push(thread::spawn(move || {
                for i in 0..per_producer {
                    let mut v = p * per_producer + i;
                    while let Err(e) = q.enqueue(v) {
                        v = e.into_inner();
                        thread::yield_now();
                    }
                }
            }));
        }

        let mut consumer_handles = vec![];
        for _ in 0..consumers {
            let q = Arc::clone(&q);
            let count = Arc::clone(&count);
            consumer_handles.push(thread::spawn(move || {
                let mut got = Vec::new();
                while count.load(Ordering::Relaxed) < total {
                    match q.dequeue() {
                        Some(v) => {
                            got.push(v);
                            count.fetch_add(1, Ordering::Relaxed);
                        }
                        None => thread::yield_now(),
                    }
                }
                got
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        let mut seen = HashSet::with_capacity(total as usize);
        for h in consumer_handles {
            let got = h.join().unwrap();
            // per-producer FIFO as seen by one consumer
            let mut last = vec![None::<u64>; producers as usize];
            for v in got {
                let p = (v / per_producer) as usize;
                if let Some(prev) = last[p] {
                    assert!(v > prev, "producer {} reordered: {} after {}", p, v, prev);
                }
                last[p] = Some(v);
                assert!(seen.insert(v), "duplicate {}", v);
            }
        }

        assert_eq!(seen.len() as u64, total);
        assert!((0..total).all(|v| seen.contains(&v)));
        assert!(q.is_empty());
    }

    #[test]
    fn test_drop_releases_queued_values() {
        let marker = Arc::new(());
        {
            let q = MpmcQueue::new(8);
            for _ in 0..6 {
                q.enqueue(Arc::clone(&marker)).unwrap();
            }
            assert_eq!(Arc::strong_count(&marker), 7);
        }
        assert_eq!(Arc::strong_count(&marker), 1);
    }

    #[test]
    #[should_panic]
    fn test_zero_capacity() {
        let _ = MpmcQueue::<u8>::new(0);
    }
}

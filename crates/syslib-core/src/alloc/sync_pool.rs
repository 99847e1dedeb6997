//! Lock-free block pool (Treiber stack over block indices)
//!
//! The stack head packs `(index, tag)` into one `AtomicU64`:
//!
//! ```text
//!   63            32 31             0
//!  +----------------+----------------+
//!  |      tag       |     index      |
//!  +----------------+----------------+
//! ```
//!
//! Every successful pop bumps the tag. A thread that read `(A, t)` and
//! `next[A] = B`, then stalled while others popped A, popped B and pushed A
//! back, finds `(A, t + 2)` and its CAS fails instead of installing the
//! stale `B`.

use super::{Block, Region, NIL};
use crossbeam_utils::CachePadded;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};

#[inline]
fn pack(index: u32, tag: u32) -> u64 {
    ((tag as u64) << 32) | index as u64
}

#[inline]
fn unpack(word: u64) -> (u32, u32) {
    (word as u32, (word >> 32) as u32)
}

/// Fixed-block pool shareable across threads.
pub struct SyncBlockPool {
    region: Region,
    head: CachePadded<AtomicU64>,
    /// `next[i]` is the free-list successor of block `i` while it is free
    next: Box<[AtomicU32]>,
    available: AtomicUsize,
}

impl SyncBlockPool {
    /// Reserve `num_blocks` blocks of at least `block_size` bytes.
    ///
    /// Aborts the process if the backing memory cannot be reserved.
    ///
    /// # Panics
    ///
    /// Panics if either argument is zero.
    pub fn new(block_size: usize, num_blocks: usize) -> Self {
        let region = Region::new(block_size, num_blocks);
        let next = (0..num_blocks)
            .map(|i| AtomicU32::new(if i + 1 < num_blocks { i as u32 + 1 } else { NIL }))
            .collect();

        SyncBlockPool {
            region,
            head: CachePadded::new(AtomicU64::new(pack(0, 0))),
            next,
            available: AtomicUsize::new(num_blocks),
        }
    }

    /// Pop a block. `None` when every block is in use.
    pub fn allocate(&self) -> Option<Block> {
        let mut current = self.head.load(Ordering::Acquire);
        loop {
            let (index, tag) = unpack(current);
            if index == NIL {
                return None;
            }
            let next = self.next[index as usize].load(Ordering::Relaxed);

            match self.head.compare_exchange_weak(
                current,
                pack(next, tag.wrapping_add(1)),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    self.available.fetch_sub(1, Ordering::Relaxed);
                    return Some(self.region.token(index));
                }
                Err(actual) => current = actual,
            }
        }
    }

    /// Push a block back.
    ///
    /// # Panics
    ///
    /// Panics if `block` came from a different pool.
    pub fn deallocate(&self, block: Block) {
        self.region.check(&block);
        let index = block.index;

        let mut current = self.head.load(Ordering::Relaxed);
        loop {
            let (head_index, tag) = unpack(current);
            self.next[index as usize].store(head_index, Ordering::Relaxed);

            match self.head.compare_exchange_weak(
                current,
                pack(index, tag),
                Ordering::Release,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
        self.available.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes<'a>(&'a self, block: &'a Block) -> &'a [u8] {
        self.region.bytes(block)
    }

    pub fn bytes_mut<'a>(&'a self, block: &'a mut Block) -> &'a mut [u8] {
        self.region.bytes_mut(block)
    }

    pub fn as_ptr(&self, block: &Block) -> NonNull<u8> {
        self.region.check(block);
        self.region.ptr(block.index)
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.region.stride()
    }

    #[inline]
    pub fn num_blocks(&self) -> usize {
        self.region.num_blocks()
    }

    /// Snapshot of free blocks
    #[inline]
    pub fn available(&self) -> usize {
        self.available.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::{Arc, Barrier, Mutex};
    use std::thread;

    #[test]
    fn test_pack_roundtrip() {
        assert_eq!(unpack(pack(7, 3)), (7, 3));
        assert_eq!(unpack(pack(NIL, u32::MAX)), (NIL, u32::MAX));
    }

    #[test]
    fn test_exhaustion_and_lifo() {
        let pool = SyncBlockPool::new(64, 3);
        let a = pool.allocate().unwrap();
        let b = pool.allocate().unwrap();
        let _c = pool.allocate().unwrap();
        assert!(pool.allocate().is_none());

        let b_index = b.index();
        pool.deallocate(a);
        pool.deallocate(b);
        assert_eq!(pool.available(), 2);
        assert_eq!(pool.allocate().unwrap().index(), b_index);
    }

    #[test]
    fn test_tag_advances_on_pop() {
        let pool = SyncBlockPool::new(8, 2);
        let (_, tag0) = unpack(pool.head.load(Ordering::Relaxed));
        let a = pool.allocate().unwrap();
        pool.deallocate(a);
        let (index, tag1) = unpack(pool.head.load(Ordering::Relaxed));
        assert_eq!(index, 0);
        assert_eq!(tag1, tag0.wrapping_add(1));
    }

    #[test]
    fn test_concurrent_blocks_unique() {
        let threads = 8;
        let rounds = 2_000;
        let pool = Arc::new(SyncBlockPool::new(16, 32));
        let barrier = Arc::new(Barrier::new(threads));
        let in_use = Arc::new(Mutex::new(HashSet::new()));

        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let pool = Arc::clone(&pool);
                let barrier = Arc::clone(&barrier);
                let in_use = Arc::clone(&in_use);
                thread::spawn(move || {
                    barrier.wait();
                    for _ in 0..rounds {
                        let Some(mut block) = pool.allocate() else {
                            thread::yield_now();
                            continue;
                        };
                        assert!(
                            in_use.lock().unwrap().insert(block.index()),
                            "block {} handed out twice",
                            block.index()
                        );
                        pool.bytes_mut(&mut block).fill(t as u8);
                        assert!(pool.bytes(&block).iter().all(|&x| x == t as u8));
                        in_use.lock().unwrap().remove(&block.index());
                        pool.deallocate(block);
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(pool.available(), 32);
        assert!(in_use.lock().unwrap().is_empty());
    }

    #[test]
    #[should_panic]
    fn test_foreign_block_rejected() {
        let a = SyncBlockPool::new(8, 2);
        let b = SyncBlockPool::new(8, 2);
        b.deallocate(a.allocate().unwrap());
    }
}

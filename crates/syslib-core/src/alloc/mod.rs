//! Fixed-size block allocators
//!
//! Two pools with the same contract:
//!
//! - [`BlockPool`]: single-threaded, `&mut self` API, free-list link kept
//!   in the first word of each free block
//! - [`SyncBlockPool`]: lock-free Treiber stack, `&self` API, links kept in
//!   a side table so a popping thread never reads a block another thread
//!   owns
//!
//! Both carve one [`Arena`] into `num_blocks` blocks and hand them out as
//! [`Block`] tokens. Reuse is LIFO: the most recently returned block is the
//! next one handed out.

pub mod pool;
pub mod sync_pool;

pub use pool::BlockPool;
pub use sync_pool::SyncBlockPool;

use crate::memory::Arena;
use std::fmt;
use std::mem::{align_of, size_of};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};

/// End-of-list marker for index free lists
pub(crate) const NIL: u32 = u32::MAX;

static NEXT_POOL_ID: AtomicUsize = AtomicUsize::new(1);

/// Ownership token for one allocated block.
///
/// Not `Clone`: handing it back to [`BlockPool::deallocate`] or
/// [`SyncBlockPool::deallocate`] consumes it, so a block cannot be used
/// after release or released twice. Dropping a `Block` without returning it
/// leaks the block for the lifetime of the pool.
pub struct Block {
    index: u32,
    pool: usize,
}

impl Block {
    /// Position of this block within its pool
    #[inline]
    pub fn index(&self) -> u32 {
        self.index
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("index", &self.index)
            .field("pool", &self.pool)
            .finish()
    }
}

/// Arena plus geometry shared by both pool flavours
pub(crate) struct Region {
    arena: Arena,
    stride: usize,
    num_blocks: usize,
    id: usize,
}

impl Region {
    /// # Panics
    ///
    /// Panics if `block_size` or `num_blocks` is zero, or if `num_blocks`
    /// does not fit the 32-bit index space.
    pub(crate) fn new(block_size: usize, num_blocks: usize) -> Self {
        assert!(block_size > 0, "block size must be non-zero");
        assert!(num_blocks > 0, "pool needs at least one block");
        assert!(
            num_blocks < NIL as usize,
            "pool of {} blocks exceeds index space",
            num_blocks
        );

        let stride = round_up(block_size.max(size_of::<u32>()), align_of::<usize>());
        Region {
            arena: Arena::for_blocks(stride, num_blocks),
            stride,
            num_blocks,
            id: NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    #[inline]
    pub(crate) fn stride(&self) -> usize {
        self.stride
    }

    #[inline]
    pub(crate) fn num_blocks(&self) -> usize {
        self.num_blocks
    }

    #[inline]
    pub(crate) fn token(&self, index: u32) -> Block {
        Block { index, pool: self.id }
    }

    /// Reject tokens minted by a different pool
    #[inline]
    pub(crate) fn check(&self, block: &Block) {
        assert_eq!(
            block.pool, self.id,
            "block {} belongs to pool {}, not pool {}",
            block.index, block.pool, self.id
        );
        debug_assert!((block.index as usize) < self.num_blocks);
    }

    #[inline]
    pub(crate) fn ptr(&self, index: u32) -> NonNull<u8> {
        debug_assert!((index as usize) < self.num_blocks);
        // Safety: index < num_blocks, so the offset stays inside the arena
        unsafe { NonNull::new_unchecked(self.arena.as_ptr().add(index as usize * self.stride)) }
    }

    pub(crate) fn bytes<'a>(&'a self, block: &'a Block) -> &'a [u8] {
        self.check(block);
        // Safety: the token is unique, nobody else can hold a mutable view
        unsafe { std::slice::from_raw_parts(self.ptr(block.index).as_ptr(), self.stride) }
    }

    pub(crate) fn bytes_mut<'a>(&'a self, block: &'a mut Block) -> &'a mut [u8] {
        self.check(block);
        // Safety: `&mut Block` proves exclusive access to this block's bytes
        unsafe { std::slice::from_raw_parts_mut(self.ptr(block.index).as_ptr(), self.stride) }
    }
}

#[inline]
const fn round_up(n: usize, align: usize) -> usize {
    (n + align - 1) / align * align
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stride_rounding() {
        let word = align_of::<usize>();
        assert_eq!(Region::new(1, 4).stride(), word);
        assert_eq!(Region::new(word, 4).stride(), word);
        assert_eq!(Region::new(word + 1, 4).stride(), 2 * word);
        assert_eq!(Region::new(100, 4).stride(), round_up(100, word));
    }

    #[test]
    fn test_pool_ids_unique() {
        let a = Region::new(8, 1);
        let b = Region::new(8, 1);
        assert_ne!(a.id, b.id);
    }

    #[test]
    #[should_panic]
    fn test_zero_block_size() {
        let _ = Region::new(0, 4);
    }
}

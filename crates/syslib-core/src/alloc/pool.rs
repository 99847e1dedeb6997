//! Single-threaded block pool

use super::{Block, Region, NIL};
use std::ptr::NonNull;

/// Fixed-block pool for use from one thread at a time.
///
/// Free blocks form a singly linked list: the first 4 bytes of each free
/// block hold the index of the next free block.
pub struct BlockPool {
    region: Region,
    free_head: u32,
    available: usize,
}

impl BlockPool {
    /// Reserve `num_blocks` blocks of at least `block_size` bytes.
    ///
    /// Aborts the process if the backing memory cannot be reserved.
    ///
    /// # Panics
    ///
    /// Panics if either argument is zero.
    pub fn new(block_size: usize, num_blocks: usize) -> Self {
        let region = Region::new(block_size, num_blocks);

        for i in 0..num_blocks as u32 {
            let next = if (i as usize) + 1 < num_blocks { i + 1 } else { NIL };
            // Safety: free block, aligned to the word size
            unsafe { region.ptr(i).cast::<u32>().as_ptr().write(next) };
        }

        BlockPool {
            region,
            free_head: 0,
            available: num_blocks,
        }
    }

    /// Take a block off the free list. `None` when every block is in use.
    pub fn allocate(&mut self) -> Option<Block> {
        if self.free_head == NIL {
            return None;
        }
        let index = self.free_head;
        // Safety: index is on the free list, so its first word is a link
        self.free_head = unsafe { self.region.ptr(index).cast::<u32>().as_ptr().read() };
        self.available -= 1;
        Some(self.region.token(index))
    }

    /// Return a block to the free list.
    ///
    /// # Panics
    ///
    /// Panics if `block` came from a different pool.
    pub fn deallocate(&mut self, block: Block) {
        self.region.check(&block);
        // Safety: we own the block again, its bytes are free to reuse
        unsafe {
            self.region
                .ptr(block.index)
                .cast::<u32>()
                .as_ptr()
                .write(self.free_head)
        };
        self.free_head = block.index;
        self.available += 1;
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

    /// Usable bytes per block (requested size rounded up to a word)
    #[inline]
    pub fn block_size(&self) -> usize {
        self.region.stride()
    }

    #[inline]
    pub fn num_blocks(&self) -> usize {
        self.region.num_blocks()
    }

    #[inline]
    pub fn available(&self) -> usize {
        self.available
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_exhaustion() {
        let mut pool = BlockPool::new(32, 8);
        let blocks: Vec<_> = (0..8).map(|_| pool.allocate().unwrap()).collect();
        assert!(pool.allocate().is_none());
        assert_eq!(pool.available(), 0);

        let distinct: HashSet<_> = blocks.iter().map(|b| b.index()).collect();
        assert_eq!(distinct.len(), 8);

        for b in blocks {
            pool.deallocate(b);
        }
        assert_eq!(pool.available(), 8);
    }

    #[test]
    fn test_lifo_reuse() {
        let mut pool = BlockPool::new(16, 4);
        let a = pool.allocate().unwrap();
        let b = pool.allocate().unwrap();
        let b_index = b.index();
        let a_index = a.index();

        pool.deallocate(b);
        assert_eq!(pool.allocate().unwrap().index(), b_index);

        pool.deallocate(a);
        let again = pool.allocate().unwrap();
        assert_eq!(again.index(), a_index);
    }

    #[test]
    fn test_block_memory_is_independent() {
        let mut pool = BlockPool::new(24, 3);
        let mut a = pool.allocate().unwrap();
        let mut b = pool.allocate().unwrap();
        assert!(pool.block_size() >= 24);

        pool.bytes_mut(&mut a).fill(0x11);
        pool.bytes_mut(&mut b).fill(0x22);
        assert!(pool.bytes(&a).iter().all(|&x| x == 0x11));
        assert!(pool.bytes(&b).iter().all(|&x| x == 0x22));

        let pa = pool.as_ptr(&a).as_ptr() as usize;
        let pb = pool.as_ptr(&b).as_ptr() as usize;
        assert!(pa.abs_diff(pb) >= pool.block_size());
    }

    #[test]
    fn test_free_list_survives_reuse() {
        let mut pool = BlockPool::new(8, 2);
        for _ in 0..100 {
            let mut a = pool.allocate().unwrap();
            let mut b = pool.allocate().unwrap();
            // scribble over the link word
            pool.bytes_mut(&mut a).fill(0xFF);
            pool.bytes_mut(&mut b).fill(0xFF);
            assert!(pool.allocate().is_none());
            pool.deallocate(a);
            pool.deallocate(b);
        }
        assert_eq!(pool.available(), 2);
    }

    #[test]
    #[should_panic]
    fn test_foreign_block_rejected() {
        let mut a = BlockPool::new(8, 2);
        let mut b = BlockPool::new(8, 2);
        let block = a.allocate().unwrap();
        b.deallocate(block);
    }
}

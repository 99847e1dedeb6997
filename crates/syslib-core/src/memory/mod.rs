//! Backing memory for block pools
//!
//! An [`Arena`] is one contiguous, zero-initialized, page-aligned region
//! reserved up front. Pools carve it into fixed-size blocks and never grow
//! it. Platform-specific code only knows how to map and unmap.

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        mod unix;
        use unix as sys;
    } else {
        mod fallback;
        use fallback as sys;
    }
}

use crate::error::ArenaError;
use std::ptr::NonNull;
use tracing::{debug, error};

/// Alignment guaranteed for the arena base
pub const ARENA_ALIGN: usize = 4096;

/// Owned, fixed-size region of read/write memory
pub struct Arena {
    base: NonNull<u8>,
    len: usize,
}

// Safety: the arena is plain memory; synchronization of its contents is
// up to the owner.
unsafe impl Send for Arena {}
unsafe impl Sync for Arena {}

impl Arena {
    /// Reserve `len` bytes.
    pub fn try_new(len: usize) -> Result<Self, ArenaError> {
        if len == 0 {
            return Err(ArenaError::ZeroSize);
        }
        let base = sys::map(len)?;
        debug!(len, base = ?base, "arena mapped");
        Ok(Arena { base, len })
    }

    /// Reserve room for `count` blocks of `stride` bytes each.
    pub fn try_for_blocks(stride: usize, count: usize) -> Result<Self, ArenaError> {
        let len = stride.checked_mul(count).ok_or(ArenaError::SizeOverflow)?;
        Self::try_new(len)
    }

    /// Like [`Arena::try_new`] but failure is fatal: logs and aborts.
    pub fn new(len: usize) -> Self {
        Self::try_new(len).unwrap_or_else(|e| fatal(e))
    }

    /// Fatal variant of [`Arena::try_for_blocks`]
    pub fn for_blocks(stride: usize, count: usize) -> Self {
        Self::try_for_blocks(stride, count).unwrap_or_else(|e| fatal(e))
    }

    #[inline]
    pub fn as_ptr(&self) -> *mut u8 {
        self.base.as_ptr()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false; zero-length arenas are rejected at construction
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        // Safety: base/len came from sys::map and are unmapped exactly once
        unsafe { sys::unmap(self.base, self.len) };
    }
}

#[cold]
fn fatal(err: ArenaError) -> ! {
    error!(error = %err, "cannot reserve block pool memory, aborting");
    std::process::abort()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arena_zeroed_and_aligned() {
        let arena = Arena::new(3 * ARENA_ALIGN + 17);
        assert_eq!(arena.as_ptr() as usize % ARENA_ALIGN, 0);
        assert_eq!(arena.len(), 3 * ARENA_ALIGN + 17);

        let bytes = unsafe { std::slice::from_raw_parts(arena.as_ptr(), arena.len()) };
        assert!(bytes.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_arena_writable() {
        let arena = Arena::for_blocks(64, 10);
        unsafe {
            arena.as_ptr().write_bytes(0xAB, arena.len());
            assert_eq!(*arena.as_ptr().add(639), 0xAB);
        }
    }

    #[test]
    fn test_arena_rejects_bad_sizes() {
        assert_eq!(Arena::try_new(0).err(), Some(ArenaError::ZeroSize));
        assert_eq!(
            Arena::try_for_blocks(usize::MAX, 2).err(),
            Some(ArenaError::SizeOverflow)
        );
    }
}

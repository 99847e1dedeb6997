//! Error types for the core primitives
//!
//! Capacity exhaustion is not a failure of the data structure: queues hand
//! the rejected value back so the caller can decide whether to retry, drop,
//! or back off.

use core::fmt;
use thiserror::Error;

/// Returned by a bounded queue's `enqueue` when there is no free slot.
///
/// Carries the value that was not inserted.
#[derive(Clone, Copy, PartialEq, Eq, Error)]
#[error("queue full")]
pub struct TryEnqueueError<T>(pub T);

impl<T> TryEnqueueError<T> {
    /// Take back the value that could not be enqueued
    #[inline]
    pub fn into_inner(self) -> T {
        self.0
    }
}

// Manual impl so `T` does not need to be `Debug` for the error to be usable
// with `?` and `unwrap()`.
impl<T> fmt::Debug for TryEnqueueError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TryEnqueueError(..)")
    }
}

/// Failures when reserving the backing region of a block pool.
///
/// `Arena::new` treats all of these as fatal; `Arena::try_new` surfaces them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArenaError {
    /// Zero-byte region requested
    #[error("arena size must be non-zero")]
    ZeroSize,

    /// `block_size * num_blocks` does not fit in `usize`
    #[error("arena size overflows usize")]
    SizeOverflow,

    /// The OS (or global allocator) refused the mapping
    #[error("arena allocation of {len} bytes failed: errno {errno}")]
    AllocationFailed { len: usize, errno: i32 },
}

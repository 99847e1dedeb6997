//! Portable arena implementation on the global allocator

use super::ARENA_ALIGN;
use crate::error::ArenaError;
use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::ptr::NonNull;

fn layout(len: usize) -> Result<Layout, ArenaError> {
    Layout::from_size_align(len, ARENA_ALIGN).map_err(|_| ArenaError::SizeOverflow)
}

pub(super) fn map(len: usize) -> Result<NonNull<u8>, ArenaError> {
    let layout = layout(len)?;
    // Safety: len > 0 is checked by Arena::try_new
    let base = unsafe { alloc_zeroed(layout) };
    NonNull::new(base).ok_or(ArenaError::AllocationFailed { len, errno: 0 })
}

/// # Safety
///
/// `base`/`len` must come from [`map`].
pub(super) unsafe fn unmap(base: NonNull<u8>, len: usize) {
    if let Ok(layout) = layout(len) {
        dealloc(base.as_ptr(), layout);
    }
}

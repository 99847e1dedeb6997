//! Unix arena implementation using mmap

use crate::error::ArenaError;
use std::ptr::{self, NonNull};

/// Anonymous private mapping. The kernel hands back zeroed, page-aligned
/// memory, and pages are only backed once touched.
pub(super) fn map(len: usize) -> Result<NonNull<u8>, ArenaError> {
    let base = unsafe {
        libc::mmap(
            ptr::null_mut(),
            len,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
            -1,
            0,
        )
    };

    if base == libc::MAP_FAILED {
        return Err(ArenaError::AllocationFailed {
            len,
            errno: std::io::Error::last_os_error().raw_os_error().unwrap_or(0),
        });
    }

    NonNull::new(base as *mut u8).ok_or(ArenaError::AllocationFailed { len, errno: 0 })
}

/// # Safety
///
/// `base`/`len` must describe a live mapping returned by [`map`].
pub(super) unsafe fn unmap(base: NonNull<u8>, len: usize) {
    let ret = libc::munmap(base.as_ptr() as *mut libc::c_void, len);
    debug_assert_eq!(ret, 0, "munmap failed");
}

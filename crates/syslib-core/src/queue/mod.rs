//! Bounded and unbounded queues
//!
//! | Module       | Producers | Consumers | Capacity           | Sync             |
//! |--------------|-----------|-----------|--------------------|------------------|
//! | `spsc`       | 1         | 1         | `capacity - 1`     | acquire/release  |
//! | `mpsc_ring`  | N         | 1         | `capacity - 1`     | CAS + ready flag |
//! | `mpsc_list`  | N         | 1         | unbounded          | swap + link      |
//! | `mpmc`       | N         | N         | `capacity`         | per-slot seq     |
//!
//! None of the operations block. A full bounded queue hands the value back
//! in [`TryEnqueueError`]; an empty queue returns `None`. Retry policy is the
//! caller's.
//!
//! Single-producer and single-consumer roles are split into `Producer` /
//! `Consumer` handles. A handle that must stay unique is neither `Clone`
//! nor usable through a shared reference, so the role cannot be violated
//! from safe code.

pub mod spsc;
pub mod mpsc_ring;
pub mod mpsc_list;
pub mod mpmc;

pub use crate::error::TryEnqueueError;
pub use mpmc::MpmcQueue;

use core::cell::UnsafeCell;
use core::mem::MaybeUninit;

/// Uninitialized storage for one value.
///
/// Ownership of the contents is tracked by the enclosing queue's indices or
/// flags, never by the cell itself.
pub(crate) struct ValueCell<T>(UnsafeCell<MaybeUninit<T>>);

impl<T> ValueCell<T> {
    #[inline]
    pub(crate) const fn empty() -> Self {
        ValueCell(UnsafeCell::new(MaybeUninit::uninit()))
    }

    /// # Safety
    ///
    /// Caller must have exclusive write access and the cell must be empty.
    #[inline]
    pub(crate) unsafe fn write(&self, value: T) {
        (*self.0.get()).write(value);
    }

    /// # Safety
    ///
    /// Caller must have exclusive access and the cell must be full.
    /// The cell is logically empty afterwards.
    #[inline]
    pub(crate) unsafe fn take(&self) -> T {
        (*self.0.get()).assume_init_read()
    }

    /// # Safety
    ///
    /// The cell must be full. Only used from `Drop`.
    #[inline]
    pub(crate) unsafe fn drop_in_place(&mut self) {
        self.0.get_mut().assume_init_drop();
    }
}

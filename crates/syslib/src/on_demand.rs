//! Lazily constructed values
//!
//! [`OnDemand`] is the single-threaded holder; [`SyncOnDemand`] can be
//! shared across threads and runs its initializer exactly once even under
//! concurrent first access.

use std::cell::OnceCell;
use std::sync::OnceLock;

/// Value built on first access. Not `Sync`.
#[derive(Debug)]
pub struct OnDemand<T> {
    cell: OnceCell<T>,
}

impl<T> OnDemand<T> {
    pub const fn new() -> Self {
        Self { cell: OnceCell::new() }
    }

    /// The value, if it has been built
    #[inline]
    pub fn get(&self) -> Option<&T> {
        self.cell.get()
    }

    pub fn get_or_init<F: FnOnce() -> T>(&self, f: F) -> &T {
        self.cell.get_or_init(f)
    }

    /// Mutable access, building with `f` first if needed
    pub fn get_mut_or_init<F: FnOnce() -> T>(&mut self, f: F) -> &mut T {
        if self.cell.get().is_none() {
            let _ = self.cell.set(f());
        }
        // set above guarantees a value
        match self.cell.get_mut() {
            Some(v) => v,
            None => unreachable!(),
        }
    }

    pub fn into_inner(self) -> Option<T> {
        self.cell.into_inner()
    }
}

impl<T: Default> OnDemand<T> {
    pub fn get_or_default(&self) -> &T {
        self.cell.get_or_init(T::default)
    }
}

impl<T> Default for OnDemand<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe [`OnDemand`]. Usable in a `static`.
#[derive(Debug)]
pub struct SyncOnDemand<T> {
    cell: OnceLock<T>,
}

impl<T> SyncOnDemand<T> {
    pub const fn new() -> Self {
        Self { cell: OnceLock::new() }
    }

    #[inline]
    pub fn get(&self) -> Option<&T> {
        self.cell.get()
    }

    /// Build with `f` on first call. Concurrent callers block until the
    /// winner's `f` returns; `f` never runs twice.
    pub fn get_or_init<F: FnOnce() -> T>(&self, f: F) -> &T {
        self.cell.get_or_init(f)
    }

    pub fn into_inner(self) -> Option<T> {
        self.cell.into_inner()
    }
}

impl<T: Default> SyncOnDemand<T> {
    pub fn get_or_default(&self) -> &T {
        self.cell.get_or_init(T::default)
    }
}

impl<T> Default for SyncOnDemand<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;

    #[test]
    fn test_on_demand_lazy() {
        let holder: OnDemand<Vec<u8>> = OnDemand::new();
        assert!(holder.get().is_none());

        assert!(holder.get_or_default().is_empty());
        assert!(holder.get().is_some());
        // second init is ignored
        assert!(holder.get_or_init(|| vec![1]).is_empty());
    }

    #[test]
    fn test_on_demand_mutable() {
        let mut holder = OnDemand::new();
        *holder.get_mut_or_init(|| 1) += 1;
        *holder.get_mut_or_init(|| 100) += 1;
        assert_eq!(holder.into_inner(), Some(3));
    }

    #[test]
    fn test_sync_on_demand_runs_once() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        let holder = Arc::new(SyncOnDemand::new());
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let holder = Arc::clone(&holder);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    *holder.get_or_init(|| {
                        CALLS.fetch_add(1, Ordering::SeqCst);
                        42
                    })
                })
            })
            .collect();

        for h in handles {
            assert_eq!(h.join().unwrap(), 42);
        }
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_sync_on_demand_static() {
        static NAME: SyncOnDemand<String> = SyncOnDemand::new();
        assert_eq!(NAME.get_or_init(|| "syslib".to_string()), "syslib");
        assert_eq!(NAME.get().map(String::as_str), Some("syslib"));
    }
}

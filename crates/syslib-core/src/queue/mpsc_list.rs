//! Unbounded multi-producer single-consumer linked queue
//!
//! Intrusive list with a permanent stub node. Producers `swap` themselves in
//! as the newest node and then link the previous newest to it; the consumer
//! walks from the oldest node. Enqueue never fails and never spins.
//!
//! Between a producer's swap and its link store the list is momentarily cut.
//! The consumer sees the cut as "empty" and simply returns `None`; the value
//! becomes reachable as soon as the link lands.
//!
//! Only the consumer frees nodes, so there is no reclamation problem.

use crossbeam_utils::CachePadded;
use std::cell::UnsafeCell;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};
use std::sync::Arc;

/// Create an empty list
pub fn list<T>() -> (Producer<T>, Consumer<T>) {
    let stub = Node::alloc(None);
    let inner = Arc::new(Inner {
        newest: CachePadded::new(AtomicPtr::new(stub)),
        oldest: UnsafeCell::new(stub),
    });

    (
        Producer { inner: Arc::clone(&inner) },
        Consumer { inner },
    )
}

struct Node<T> {
    next: AtomicPtr<Node<T>>,
    value: Option<T>,
}

impl<T> Node<T> {
    fn alloc(value: Option<T>) -> *mut Node<T> {
        Box::into_raw(Box::new(Node {
            next: AtomicPtr::new(ptr::null_mut()),
            value,
        }))
    }
}

struct Inner<T> {
    /// Last node in the list; producers swap here
    newest: CachePadded<AtomicPtr<Node<T>>>,
    /// Current stub. Its `value` is always `None`; consumer-only.
    oldest: UnsafeCell<*mut Node<T>>,
}

// Safety: `oldest` is touched only through `Consumer` (unique, `&mut self`)
// or in `Drop`; `newest` is atomic.
unsafe impl<T: Send> Send for Inner<T> {}
unsafe impl<T: Send> Sync for Inner<T> {}

impl<T> Drop for Inner<T> {
    fn drop(&mut self) {
        let mut node = *self.oldest.get_mut();
        while !node.is_null() {
            // Safety: every node from oldest onwards is owned by the list
            let boxed = unsafe { Box::from_raw(node) };
            node = boxed.next.load(Ordering::Relaxed);
        }
    }
}

/// Writing half. Clone it for each producer thread.
pub struct Producer<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Producer<T> {
    fn clone(&self) -> Self {
        Producer { inner: Arc::clone(&self.inner) }
    }
}

impl<T> Producer<T> {
    /// Append `value`. Always succeeds.
    pub fn enqueue(&self, value: T) {
        let node = Node::alloc(Some(value));
        let prev = self.inner.newest.swap(node, Ordering::AcqRel);
        // Safety: `prev` stays alive until the consumer moves past it, which
        // needs the link we are about to store.
        unsafe { (*prev).next.store(node, Ordering::Release) };
    }
}

/// Reading half. Exactly one exists per list.
pub struct Consumer<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Consumer<T> {
    /// Remove the oldest value, or `None` if nothing is linked yet
    pub fn dequeue(&mut self) -> Option<T> {
        // Safety: &mut self makes us the only reader of `oldest`
        unsafe {
            let oldest = self.inner.oldest.get();
            let stub = *oldest;
            let next = (*stub).next.load(Ordering::Acquire);
            if next.is_null() {
                return None;
            }

            // `next` becomes the new stub; move its value out without
            // forming a reference a racing producer could alias.
            let value = (*ptr::addr_of_mut!((*next).value)).take();
            *oldest = next;
            drop(Box::from_raw(stub));
            value
        }
    }

    /// True if no value is linked behind the stub
    pub fn is_empty(&self) -> bool {
        // Safety: only the consumer reads `oldest`
        unsafe {
            let stub = *self.inner.oldest.get();
            (*stub).next.load(Ordering::Acquire).is_null()
        }
    }
}

//! Fixed-size worker pool
//!
//! Spawns N named OS threads at creation. Workers block on a condvar until
//! the shared backlog has a task, run it outside the lock, and repeat.
//! No dynamic scaling.
//!
//! Shutdown is drain-then-stop: the stop flag only makes a worker exit once
//! the backlog is empty, so every task accepted before `shutdown` runs.
//! Every caller of `shutdown` off the pool waits until the last worker has
//! exited, however many callers race.

use crate::config::PoolConfig;
use crate::error::{PoolError, Result, TaskError};

use std::any::Any;
use std::cell::Cell;
use std::collections::VecDeque;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info};

type Job = Box<dyn FnOnce() + Send + 'static>;

struct Backlog {
    jobs: VecDeque<Job>,
    stopped: bool,
    /// Workers spawned and not yet exited
    live: usize,
}

thread_local! {
    /// Address of the `PoolInner` this thread works for, 0 off-pool
    static CURRENT_POOL: Cell<usize> = const { Cell::new(0) };
}

/// Shared state between submitters and workers.
struct PoolInner {
    backlog: Mutex<Backlog>,
    /// Signalled on push and on stop
    available: Condvar,
    /// Signalled when `live` drops to zero
    drained: Condvar,
    /// Workers currently running a task
    active: AtomicUsize,
    /// Tasks finished (including panicked ones)
    completed: AtomicU64,
    total: usize,
}

impl PoolInner {
    fn lock(&self) -> MutexGuard<'_, Backlog> {
        self.backlog.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn id(self: &Arc<Self>) -> usize {
        Arc::as_ptr(self) as usize
    }
}

pub struct WorkerPool {
    inner: Arc<PoolInner>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Validate `config` and spawn its workers.
    pub fn new(config: PoolConfig) -> Result<Self> {
        config.validate()?;

        let inner = Arc::new(PoolInner {
            backlog: Mutex::new(Backlog {
                jobs: VecDeque::new(),
                stopped: false,
                live: 0,
            }),
            available: Condvar::new(),
            drained: Condvar::new(),
            active: AtomicUsize::new(0),
            completed: AtomicU64::new(0),
            total: config.num_workers,
        });

        let pool = WorkerPool {
            inner: Arc::clone(&inner),
            handles: Mutex::new(Vec::with_capacity(config.num_workers)),
        };

        for worker_id in 0..config.num_workers {
            let mut builder =
                thread::Builder::new().name(format!("{}-{}", config.thread_name_prefix, worker_id));
            if let Some(size) = config.stack_size {
                builder = builder.stack_size(size);
            }

            inner.lock().live += 1;
            let worker_inner = Arc::clone(&inner);
            match builder.spawn(move || worker_loop(worker_inner, worker_id)) {
                Ok(handle) => pool.lock_handles().push(handle),
                Err(e) => {
                    // `pool` drops here and joins the workers already spawned
                    inner.lock().live -= 1;
                    return Err(e.into());
                }
            }
        }

        info!(
            workers = config.num_workers,
            prefix = %config.thread_name_prefix,
            "worker pool started"
        );
        Ok(pool)
    }

    /// Pool sized from [`PoolConfig::from_env`]
    pub fn from_env() -> Result<Self> {
        Self::new(PoolConfig::from_env())
    }

    /// Queue `f` for execution on some worker.
    ///
    /// Fails with [`PoolError::Stopped`] once `shutdown` has begun; the
    /// closure is dropped without running in that case.
    pub fn submit<F, R>(&self, f: F) -> Result<TaskHandle<R>>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = mpsc::sync_channel(1);
        let job: Job = Box::new(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(f))
                .map_err(|payload| TaskError::Panicked(panic_message(payload.as_ref())));
            // Receiver may be gone; the outcome is simply discarded then
            let _ = tx.send(outcome);
        });

        {
            let mut backlog = self.inner.lock();
            if backlog.stopped {
                return Err(PoolError::Stopped);
            }
            backlog.jobs.push_back(job);
        }
        self.inner.available.notify_one();

        Ok(TaskHandle::new(rx))
    }

    /// Stop accepting work, let the backlog drain, join every worker.
    ///
    /// Idempotent, and every concurrent caller returns only after the
    /// backlog has drained. Called from one of this pool's workers it only
    /// stops the pool: that worker cannot wait for itself, and the backlog
    /// still drains once its current task returns.
    pub fn shutdown(&self) {
        let mut backlog = self.inner.lock();
        if !backlog.stopped {
            backlog.stopped = true;
            debug!(pending = backlog.jobs.len(), "worker pool stopping");
        }
        self.inner.available.notify_all();

        if CURRENT_POOL.with(Cell::get) == self.inner.id() {
            return;
        }
        while backlog.live > 0 {
            backlog = self
                .inner
                .drained
                .wait(backlog)
                .unwrap_or_else(PoisonError::into_inner);
        }
        drop(backlog);

        let handles = std::mem::take(&mut *self.lock_handles());
        if handles.is_empty() {
            return;
        }
        for handle in handles {
            // Tasks cannot unwind into the worker loop, so join only fails
            // if the loop itself panicked
            if handle.join().is_err() {
                tracing::error!("worker thread panicked outside a task");
            }
        }
        info!(completed = self.completed(), "worker pool stopped");
    }

    #[inline]
    pub fn num_workers(&self) -> usize {
        self.inner.total
    }

    /// Workers currently running a task
    #[inline]
    pub fn active_workers(&self) -> usize {
        self.inner.active.load(Ordering::Relaxed)
    }

    /// Tasks waiting in the backlog
    pub fn pending(&self) -> usize {
        self.inner.lock().jobs.len()
    }

    #[inline]
    pub fn completed(&self) -> u64 {
        self.inner.completed.load(Ordering::Relaxed)
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.lock().stopped
    }

    fn lock_handles(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.handles.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Worker thread main loop.
fn worker_loop(inner: Arc<PoolInner>, worker_id: usize) {
    CURRENT_POOL.with(|pool| pool.set(inner.id()));
    debug!(worker = worker_id, "worker started");

    loop {
        let job = {
            let mut backlog = inner.lock();
            loop {
                if let Some(job) = backlog.jobs.pop_front() {
                    break Some(job);
                }
                if backlog.stopped {
                    break None;
                }
                backlog = inner
                    .available
                    .wait(backlog)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        };

        let Some(job) = job else { break };

        inner.active.fetch_add(1, Ordering::Relaxed);
        job();
        inner.active.fetch_sub(1, Ordering::Relaxed);
        inner.completed.fetch_add(1, Ordering::Relaxed);
    }

    let mut backlog = inner.lock();
    backlog.live -= 1;
    if backlog.live == 0 {
        inner.drained.notify_all();
    }
    drop(backlog);
    debug!(worker = worker_id, "worker exiting");
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Completion handle for a submitted task.
///
/// The outcome can be taken once; after that the handle reports
/// [`TaskError::Abandoned`].
pub struct TaskHandle<R> {
    rx: Receiver<std::result::Result<R, TaskError>>,
    ready: Option<std::result::Result<R, TaskError>>,
}

impl<R> fmt::Debug for TaskHandle<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("ready", &self.ready.is_some())
            .finish_non_exhaustive()
    }
}

impl<R> TaskHandle<R> {
    fn new(rx: Receiver<std::result::Result<R, TaskError>>) -> Self {
        Self { rx, ready: None }
    }

    /// Block until the task has run
    pub fn wait(mut self) -> std::result::Result<R, TaskError> {
        match self.ready.take() {
            Some(outcome) => outcome,
            None => self.rx.recv().unwrap_or(Err(TaskError::Abandoned)),
        }
    }

    /// Block for at most `timeout`. `None` if the task is still pending.
    pub fn wait_timeout(&mut self, timeout: Duration) -> Option<std::result::Result<R, TaskError>> {
        if let Some(outcome) = self.ready.take() {
            return Some(outcome);
        }
        match self.rx.recv_timeout(timeout) {
            Ok(outcome) => Some(outcome),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Err(TaskError::Abandoned)),
        }
    }

    /// Non-blocking poll. A finished outcome is kept for the next `wait`.
    pub fn is_finished(&mut self) -> bool {
        if self.ready.is_some() {
            return true;
        }
        match self.rx.try_recv() {
            Ok(outcome) => {
                self.ready = Some(outcome);
                true
            }
            Err(TryRecvError::Empty) => false,
            Err(TryRecvError::Disconnected) => {
                self.ready = Some(Err(TaskError::Abandoned));
                true
            }
        }
    }
}

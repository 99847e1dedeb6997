//! Explicit runtime context
//!
//! Owns one worker pool and one async logger. Everything that would
//! otherwise be a process-wide singleton is reached through a `Runtime`
//! reference instead.
//!
//! Shutdown order is logger first, then pool: the logger's consumer may be
//! a task on the pool, and the pool only stops once its backlog and running
//! tasks are done.

use crate::error::Result;
use syslib_runtime::{
    LogSink, Logger, PoolError, RuntimeConfig, StdoutSink, TaskHandle, WorkerPool,
};
use tracing::debug;

pub struct Runtime {
    logger: Logger,
    pool: WorkerPool,
}

impl Runtime {
    /// Start a pool and a stdout logger
    pub fn new(config: RuntimeConfig) -> Result<Self> {
        Self::with_sink(config, StdoutSink)
    }

    /// [`Runtime::new`] using [`RuntimeConfig::from_env`]
    pub fn from_env() -> Result<Self> {
        Self::new(RuntimeConfig::from_env())
    }

    /// Start a pool and a logger writing to `sink`.
    ///
    /// With `logger.on_pool` set the logger's consumer occupies one pool
    /// worker. A pool with a single worker would then have nothing left for
    /// submitted tasks, so the consumer gets its own thread instead.
    pub fn with_sink<S: LogSink>(config: RuntimeConfig, sink: S) -> Result<Self> {
        config.validate()?;

        let pool = WorkerPool::new(config.pool)?;
        let logger = if config.logger.on_pool && pool.num_workers() >= 2 {
            Logger::on_pool(&pool, config.logger, sink)?
        } else {
            if config.logger.on_pool {
                debug!("single-worker pool, running logger on a dedicated thread");
            }
            Logger::spawn(config.logger, sink)?
        };

        Ok(Runtime { logger, pool })
    }

    #[inline]
    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    #[inline]
    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Shorthand for `self.pool().submit(f)`
    pub fn submit<F, R>(&self, f: F) -> std::result::Result<TaskHandle<R>, PoolError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        self.pool.submit(f)
    }

    /// Run `f` with the runtime, then shut it down
    pub fn block_on<F, T>(self, f: F) -> T
    where
        F: FnOnce(&Runtime) -> T,
    {
        let result = f(&self);
        self.shutdown();
        result
    }

    /// Drain and stop the logger, then the pool. Idempotent.
    pub fn shutdown(&self) {
        self.logger.shutdown();
        self.pool.shutdown();
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.shutdown();
    }
}

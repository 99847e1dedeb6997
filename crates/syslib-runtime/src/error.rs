//! Error types for the worker pool, task handles and configuration

use std::io;
use thiserror::Error;

/// Rejected configuration value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid config: {0}")]
    InvalidValue(&'static str),
}

/// Failures when constructing or submitting to a [`WorkerPool`](crate::WorkerPool)
#[derive(Debug, Error)]
pub enum PoolError {
    /// `shutdown` has begun; the work was not enqueued
    #[error("worker pool is stopped")]
    Stopped,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] io::Error),
}

/// Outcome of a task that did not produce a value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    /// The task panicked; carries the panic message when it was a string
    #[error("task panicked: {0}")]
    Panicked(String),

    /// The task was dropped without running, or its outcome was already taken
    #[error("task result is unavailable")]
    Abandoned,
}

/// Unknown severity name
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown log severity {0:?}")]
pub struct ParseSeverityError(pub String);


/// Failures when starting the async logger
#[derive(Debug, Error)]
pub enum LoggerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to spawn logger thread: {0}")]
    Spawn(#[from] io::Error),

    /// The pool refused the consumer task
    #[error("cannot run logger on pool: {0}")]
    Pool(#[from] PoolError),
}

pub type Result<T, E = PoolError> = std::result::Result<T, E>;

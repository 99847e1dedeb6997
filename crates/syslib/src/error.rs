//! Facade error type

use std::io;
use syslib_runtime::{ConfigError, LoggerError, PoolError, TaskError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error(transparent)]
    Logger(#[from] LoggerError),

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, RuntimeError>;

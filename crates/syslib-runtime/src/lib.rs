//! # syslib-runtime
//!
//! Thread-owning components of syslib.
//!
//! This crate provides:
//! - Configuration with environment overrides
//! - A fixed-size worker pool with drain-then-stop shutdown
//! - An asynchronous batching logger that runs on the pool or its own thread
//! - A condvar-based parker used by idle consumers

pub mod config;
pub mod error;
pub mod logger;
pub mod parking;
pub mod worker;

// Re-exports
pub use config::{LoggerConfig, PoolConfig, RuntimeConfig};
pub use error::{ConfigError, LoggerError, PoolError, TaskError};
pub use logger::{format_record, LogSink, Logger, MemorySink, Severity, StdoutSink, WriterSink};
pub use parking::Parker;
pub use worker::{TaskHandle, WorkerPool};

//! Runtime configuration
//!
//! Compile-time defaults with runtime environment overrides.
//!
//! # Configuration Priority (highest wins)
//!
//! 1. Builder setters
//! 2. Environment variables
//! 3. Library defaults ([`defaults`])
//!
//! # Example
//!
//! ```rust,ignore
//! use syslib_runtime::config::{PoolConfig, RuntimeConfig};
//!
//! // Defaults with env overrides
//! let config = RuntimeConfig::from_env();
//!
//! // Or customize programmatically
//! let pool = PoolConfig::from_env().num_workers(8).thread_name_prefix("io");
//! ```

pub mod defaults;

use crate::error::ConfigError;
use crate::logger::Severity;
use std::time::Duration;
use syslib_core::env::{env_flag, env_or, env_parse};

/// Worker pool configuration with builder pattern.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of worker threads
    pub num_workers: usize,
    /// Worker threads are named `{prefix}-{index}`
    pub thread_name_prefix: String,
    /// Stack size per worker; `None` uses the platform default
    pub stack_size: Option<usize>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl PoolConfig {
    /// Defaults with environment overrides.
    ///
    /// Environment variables (all optional):
    /// - `SYSLIB_NUM_WORKERS` - Number of worker threads
    /// - `SYSLIB_THREAD_PREFIX` - Worker thread name prefix
    /// - `SYSLIB_STACK_SIZE` - Worker stack size in bytes
    pub fn from_env() -> Self {
        Self {
            num_workers: env_or("SYSLIB_NUM_WORKERS", defaults::num_workers()),
            thread_name_prefix: env_or(
                "SYSLIB_THREAD_PREFIX",
                defaults::THREAD_NAME_PREFIX.to_string(),
            ),
            stack_size: env_parse("SYSLIB_STACK_SIZE"),
        }
    }

    /// Defaults only, no environment lookup
    pub fn new() -> Self {
        Self {
            num_workers: defaults::num_workers(),
            thread_name_prefix: defaults::THREAD_NAME_PREFIX.to_string(),
            stack_size: None,
        }
    }

    pub fn num_workers(mut self, n: usize) -> Self {
        self.num_workers = n;
        self
    }

    pub fn thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    pub fn stack_size(mut self, size: usize) -> Self {
        self.stack_size = Some(size);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_workers == 0 {
            return Err(ConfigError::InvalidValue("num_workers must be > 0"));
        }
        if self.num_workers > defaults::MAX_WORKERS {
            return Err(ConfigError::InvalidValue("num_workers must be <= 256"));
        }
        if self.thread_name_prefix.is_empty() {
            return Err(ConfigError::InvalidValue("thread_name_prefix must not be empty"));
        }
        if matches!(self.stack_size, Some(s) if s < defaults::MIN_STACK_SIZE) {
            return Err(ConfigError::InvalidValue("stack_size must be >= 64KB"));
        }
        Ok(())
    }
}

/// Async logger configuration with builder pattern.
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Slots in the line ring; at most `queue_capacity - 1` lines wait
    pub queue_capacity: usize,
    /// Batch buffer size in bytes
    pub batch_capacity: usize,
    /// Records below this severity are discarded at the call site
    pub min_severity: Severity,
    /// Idle consumer park timeout
    pub idle_park: Duration,
    /// Run the consumer on the worker pool instead of a dedicated thread
    pub on_pool: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl LoggerConfig {
    /// Defaults with environment overrides.
    ///
    /// Environment variables (all optional):
    /// - `SYSLIB_LOG_QUEUE` - Line ring slots
    /// - `SYSLIB_LOG_BATCH` - Batch buffer bytes
    /// - `SYSLIB_LOG_LEVEL` - `info`, `warning` or `error`
    /// - `SYSLIB_LOG_IDLE_US` - Idle park timeout in microseconds
    /// - `SYSLIB_LOG_ON_POOL` - Consumer on the pool (0/1)
    pub fn from_env() -> Self {
        Self {
            queue_capacity: env_or("SYSLIB_LOG_QUEUE", defaults::LOG_QUEUE_CAPACITY),
            batch_capacity: env_or("SYSLIB_LOG_BATCH", defaults::LOG_BATCH_CAPACITY),
            min_severity: env_or("SYSLIB_LOG_LEVEL", defaults::LOG_MIN_SEVERITY),
            idle_park: Duration::from_micros(env_or(
                "SYSLIB_LOG_IDLE_US",
                defaults::LOG_IDLE_PARK_US,
            )),
            on_pool: env_flag("SYSLIB_LOG_ON_POOL", defaults::LOG_ON_POOL),
        }
    }

    /// Defaults only, no environment lookup
    pub fn new() -> Self {
        Self {
            queue_capacity: defaults::LOG_QUEUE_CAPACITY,
            batch_capacity: defaults::LOG_BATCH_CAPACITY,
            min_severity: defaults::LOG_MIN_SEVERITY,
            idle_park: Duration::from_micros(defaults::LOG_IDLE_PARK_US),
            on_pool: defaults::LOG_ON_POOL,
        }
    }

    pub fn queue_capacity(mut self, slots: usize) -> Self {
        self.queue_capacity = slots;
        self
    }

    pub fn batch_capacity(mut self, bytes: usize) -> Self {
        self.batch_capacity = bytes;
        self
    }

    pub fn min_severity(mut self, severity: Severity) -> Self {
        self.min_severity = severity;
        self
    }

    pub fn idle_park(mut self, d: Duration) -> Self {
        self.idle_park = d;
        self
    }

    pub fn on_pool(mut self, enable: bool) -> Self {
        self.on_pool = enable;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity < 2 {
            return Err(ConfigError::InvalidValue("queue_capacity must be >= 2"));
        }
        if self.batch_capacity == 0 {
            return Err(ConfigError::InvalidValue("batch_capacity must be > 0"));
        }
        if self.idle_park.is_zero() {
            return Err(ConfigError::InvalidValue("idle_park must be > 0"));
        }
        Ok(())
    }
}

/// Pool plus logger, as consumed by the `Runtime` context.
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
    pub pool: PoolConfig,
    pub logger: LoggerConfig,
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        Self {
            pool: PoolConfig::from_env(),
            logger: LoggerConfig::from_env(),
        }
    }

    pub fn new() -> Self {
        Self {
            pool: PoolConfig::new(),
            logger: LoggerConfig::new(),
        }
    }

    pub fn pool(mut self, pool: PoolConfig) -> Self {
        self.pool = pool;
        self
    }

    pub fn logger(mut self, logger: LoggerConfig) -> Self {
        self.logger = logger;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pool.validate()?;
        self.logger.validate()
    }
}

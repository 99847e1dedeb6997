//! # syslib
//!
//! Concurrency and memory primitives for building services.
//!
//! ## Features
//!
//! - **Queues**: SPSC ring, bounded MPSC ring, unbounded MPSC list, bounded MPMC ring
//! - **Block pools**: single-threaded and lock-free fixed-block allocators
//! - **Worker pool**: fixed threads, submit-and-wait handles, drain-then-stop shutdown
//! - **Async logger**: batched writes from a single background consumer
//! - **Runtime**: one context object owning the pool and the logger
//!
//! ## Quick Start
//!
//! ```ignore
//! use syslib::{ainfo, Runtime, RuntimeConfig};
//!
//! fn main() -> syslib::Result<()> {
//!     let rt = Runtime::new(RuntimeConfig::from_env())?;
//!
//!     let handle = rt.submit(|| 6 * 7)?;
//!     ainfo!(rt.logger(), "answer = {}", handle.wait()?);
//!
//!     rt.shutdown();
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Runtime                             │
//! │                 submit(), logger(), shutdown()              │
//! └─────────────────────────────────────────────────────────────┘
//!               │                               │
//!               ▼                               ▼
//!    ┌─────────────────────┐         ┌─────────────────────┐
//!    │     WorkerPool      │◄────────│       Logger        │
//!    │ Mutex<VecDeque> + cv│ consumer│ mpsc_ring<String>   │
//!    └─────────────────────┘  task   └─────────────────────┘
//!               │                               │
//!               ▼                               ▼
//!    ┌─────────────────────────────────────────────────────┐
//!    │ syslib-core: queues, block pools, arena, env        │
//!    └─────────────────────────────────────────────────────┘
//! ```

pub mod asyncio;
pub mod error;
pub mod on_demand;
pub mod runtime;

pub use error::{Result, RuntimeError};
pub use on_demand::{OnDemand, SyncOnDemand};
pub use runtime::Runtime;

// Re-export core types
pub use syslib_core::{
    queue,
    alloc,
    memory,
    Arena,
    ArenaError,
    Block,
    BlockPool,
    MpmcQueue,
    SyncBlockPool,
    TryEnqueueError,
};

// Re-export env utilities
pub use syslib_core::env::{env_flag, env_or, env_parse};

// Re-export runtime types
pub use syslib_runtime::{
    config,
    logger,
    ConfigError,
    LogSink,
    Logger,
    LoggerConfig,
    LoggerError,
    MemorySink,
    PoolConfig,
    PoolError,
    RuntimeConfig,
    Severity,
    StdoutSink,
    TaskError,
    TaskHandle,
    WorkerPool,
    WriterSink,
};

// Re-export logging macros
pub use syslib_runtime::{aerror, ainfo, alog, awarn};

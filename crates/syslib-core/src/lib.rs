//! # syslib-core
//!
//! Passive building blocks for syslib. Nothing in this crate spawns a
//! thread or performs I/O; callers drive every operation.
//!
//! ## Modules
//!
//! - `queue` - SPSC ring, bounded MPSC ring, unbounded MPSC list, bounded MPMC ring
//! - `alloc` - fixed-block pools (single-threaded and lock-free)
//! - `memory` - page-aligned backing arena for the pools
//! - `error` - error types
//! - `env` - environment variable utilities

pub mod queue;
pub mod alloc;
pub mod memory;
pub mod error;
pub mod env;

// Re-exports for convenience
pub use queue::MpmcQueue;
pub use alloc::{Block, BlockPool, SyncBlockPool};
pub use memory::Arena;
pub use error::{ArenaError, TryEnqueueError};
pub use env::{env_flag, env_or, env_parse};

//! Compile-time defaults. Every value here can be overridden through the
//! matching `SYSLIB_*` environment variable (see [`super`]).

use crate::logger::Severity;

/// Worker count when the hardware thread count cannot be determined
pub const FALLBACK_NUM_WORKERS: usize = 4;

/// Upper bound on pool size
pub const MAX_WORKERS: usize = 256;

/// Smallest stack accepted for a worker thread
pub const MIN_STACK_SIZE: usize = 64 * 1024;

pub const THREAD_NAME_PREFIX: &str = "syslib-worker";

/// Log ring slots (one stays empty)
pub const LOG_QUEUE_CAPACITY: usize = 4096;

/// Bytes coalesced before one sink write
pub const LOG_BATCH_CAPACITY: usize = 64 * 1024;

pub const LOG_MIN_SEVERITY: Severity = Severity::Info;

/// How long an idle logger consumer sleeps between checks
pub const LOG_IDLE_PARK_US: u64 = 1_000;

/// Run the logger consumer as a pool task rather than on its own thread
pub const LOG_ON_POOL: bool = true;

/// Hardware threads, falling back to [`FALLBACK_NUM_WORKERS`], capped at
/// [`MAX_WORKERS`].
pub fn num_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(FALLBACK_NUM_WORKERS)
        .min(MAX_WORKERS)
}

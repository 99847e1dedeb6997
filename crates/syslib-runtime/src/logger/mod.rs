//! Asynchronous batching logger
//!
//! Callers format their record on their own thread and push the finished
//! line into a bounded MPSC ring. One background consumer drains the ring,
//! packs consecutive lines into a fixed batch buffer, and hands the buffer
//! to a [`LogSink`] in one write.
//!
//! ```text
//!  thread A ──┐                      ┌───────────────┐
//!  thread B ──┼─> mpsc_ring<String> ─>│ consumer      │──> LogSink::write_batch
//!  thread C ──┘   (spin on full)      │ batch buffer  │
//!                                     └───────────────┘
//! ```
//!
//! A batch is written when the next line would not fit or when the ring is
//! momentarily empty. The consumer runs as a long-lived task on a
//! [`WorkerPool`] or on a dedicated thread.
//!
//! Logging is lossless while the logger runs: a producer facing a full ring
//! backs off and retries. Shutdown is drain-then-stop: every `log` call that
//! returned before [`Logger::shutdown`] began reaches the sink.
//!
//! # Example
//!
//! ```rust,ignore
//! use syslib_runtime::logger::{Logger, StdoutSink};
//! use syslib_runtime::{ainfo, LoggerConfig};
//!
//! let logger = Logger::spawn(LoggerConfig::from_env(), StdoutSink)?;
//! ainfo!(logger, "listening on port {}", 8080);
//! logger.shutdown();
//! ```

mod record;
mod sink;

pub use record::{format_record, Severity};
pub use sink::{LogSink, MemorySink, StdoutSink, WriterSink};

use crate::config::LoggerConfig;
use crate::error::LoggerError;
use crate::parking::Parker;
use crate::worker::{TaskHandle, WorkerPool};

use crossbeam_utils::Backoff;
use std::fmt;
use std::sync::atomic::{fence, AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use syslib_core::queue::mpsc_ring::{self, Consumer, Producer};
use tracing::{debug, warn};

/// Log a formatted record at an explicit severity
#[macro_export]
macro_rules! alog {
    ($logger:expr, $severity:expr, $($arg:tt)+) => {
        $logger.log($severity, format_args!($($arg)+))
    };
}

#[macro_export]
macro_rules! ainfo {
    ($logger:expr, $($arg:tt)+) => {
        $crate::alog!($logger, $crate::logger::Severity::Info, $($arg)+)
    };
}

#[macro_export]
macro_rules! awarn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::alog!($logger, $crate::logger::Severity::Warning, $($arg)+)
    };
}

#[macro_export]
macro_rules! aerror {
    ($logger:expr, $($arg:tt)+) => {
        $crate::alog!($logger, $crate::logger::Severity::Error, $($arg)+)
    };
}

#[derive(Default)]
struct Stats {
    lines_written: AtomicU64,
    batches_written: AtomicU64,
    lines_dropped: AtomicU64,
}

/// State shared by producers and the consumer.
struct Shared {
    producer: Producer<String>,
    parker: Parker,
    /// Set by `shutdown`; the consumer drains and exits
    stop: AtomicBool,
    /// Set by the consumer before its final drain
    exited: AtomicBool,
    /// Consumer half, handed back once the final drain is done
    retired: Mutex<Option<Consumer<String>>>,
    min_severity: Severity,
    stats: Stats,
}

impl Shared {
    /// Discard lines enqueued after the consumer's final drain, counting
    /// them as dropped. Blocks while that drain is still running.
    fn reclaim(&self) {
        let mut retired = self.retired.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(rx) = retired.as_mut() {
            while rx.dequeue().is_some() {
                self.stats.lines_dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

enum ConsumerHandle {
    Thread(JoinHandle<()>),
    Pool(TaskHandle<()>),
}

pub struct Logger {
    shared: Arc<Shared>,
    consumer: Mutex<Option<ConsumerHandle>>,
}

impl Logger {
    /// Start the consumer on its own thread (`syslib-logger`)
    pub fn spawn<S: LogSink>(config: LoggerConfig, sink: S) -> Result<Self, LoggerError> {
        let (shared, rx, batcher) = Self::prepare(&config, sink)?;

        let consumer_shared = Arc::clone(&shared);
        let idle = config.idle_park;
        let handle = thread::Builder::new()
            .name("syslib-logger".to_string())
            .spawn(move || consume(consumer_shared, rx, batcher, idle))?;

        Ok(Self::with_consumer(shared, ConsumerHandle::Thread(handle)))
    }

    /// Start the consumer as a long-running task on `pool`.
    ///
    /// The task occupies one worker until [`Logger::shutdown`]. Shut the
    /// logger down before the pool, or the pool's drain will wait on it.
    pub fn on_pool<S: LogSink>(
        pool: &WorkerPool,
        config: LoggerConfig,
        sink: S,
    ) -> Result<Self, LoggerError> {
        let (shared, rx, batcher) = Self::prepare(&config, sink)?;

        let consumer_shared = Arc::clone(&shared);
        let idle = config.idle_park;
        let handle = pool.submit(move || consume(consumer_shared, rx, batcher, idle))?;

        Ok(Self::with_consumer(shared, ConsumerHandle::Pool(handle)))
    }

    #[allow(clippy::type_complexity)]
    fn prepare<S: LogSink>(
        config: &LoggerConfig,
        sink: S,
    ) -> Result<(Arc<Shared>, Consumer<String>, Batcher<S>), LoggerError> {
        config.validate()?;

        let (tx, rx) = mpsc_ring::ring(config.queue_capacity);
        let shared = Arc::new(Shared {
            producer: tx,
            parker: Parker::new(),
            stop: AtomicBool::new(false),
            exited: AtomicBool::new(false),
            retired: Mutex::new(None),
            min_severity: config.min_severity,
            stats: Stats::default(),
        });
        let batcher = Batcher::new(sink, config.batch_capacity, Arc::clone(&shared));

        debug!(
            queue = config.queue_capacity,
            batch = config.batch_capacity,
            min_severity = %config.min_severity,
            "async logger starting"
        );
        Ok((shared, rx, batcher))
    }

    fn with_consumer(shared: Arc<Shared>, consumer: ConsumerHandle) -> Self {
        Logger {
            shared,
            consumer: Mutex::new(Some(consumer)),
        }
    }

    /// Format and enqueue one record.
    ///
    /// Records below the configured minimum severity are discarded before
    /// formatting. Spins with backoff while the ring is full. A record that
    /// races the consumer's exit is either written or counted as dropped.
    pub fn log(&self, severity: Severity, args: fmt::Arguments<'_>) {
        if severity < self.shared.min_severity {
            return;
        }
        let shared = &*self.shared;
        let mut line = format_record(severity, args);

        let backoff = Backoff::new();
        loop {
            if shared.exited.load(Ordering::SeqCst) {
                shared.stats.lines_dropped.fetch_add(1, Ordering::Relaxed);
                return;
            }
            match shared.producer.enqueue(line) {
                Ok(()) => break,
                Err(full) => {
                    line = full.into_inner();
                    shared.parker.unpark();
                    backoff.snooze();
                }
            }
        }

        // Pairs with the fence in `consume`: either the consumer's final
        // drain sees this slot, or we see `exited` and reclaim it
        fence(Ordering::SeqCst);
        if shared.exited.load(Ordering::SeqCst) {
            shared.reclaim();
            return;
        }
        shared.parker.unpark();
    }

    pub fn info(&self, args: fmt::Arguments<'_>) {
        self.log(Severity::Info, args)
    }

    pub fn warning(&self, args: fmt::Arguments<'_>) {
        self.log(Severity::Warning, args)
    }

    pub fn error(&self, args: fmt::Arguments<'_>) {
        self.log(Severity::Error, args)
    }

    #[inline]
    pub fn min_severity(&self) -> Severity {
        self.shared.min_severity
    }

    /// Lines handed to the sink successfully
    pub fn lines_written(&self) -> u64 {
        self.shared.stats.lines_written.load(Ordering::Relaxed)
    }

    pub fn batches_written(&self) -> u64 {
        self.shared.stats.batches_written.load(Ordering::Relaxed)
    }

    /// Lines lost to sink errors or logged after the consumer exited
    pub fn lines_dropped(&self) -> u64 {
        self.shared.stats.lines_dropped.load(Ordering::Relaxed)
    }

    /// Stop the consumer after it drains every queued line, then wait for it.
    ///
    /// Idempotent. Concurrent callers all return after the drain.
    pub fn shutdown(&self) {
        // Held until the consumer is joined so later callers wait behind us
        let mut guard = self.consumer.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(consumer) = guard.take() else { return };

        self.shared.stop.store(true, Ordering::SeqCst);
        self.shared.parker.wake();

        match consumer {
            ConsumerHandle::Thread(handle) => {
                if handle.join().is_err() {
                    warn!("logger thread panicked");
                }
            }
            ConsumerHandle::Pool(handle) => {
                if let Err(e) = handle.wait() {
                    warn!(error = %e, "logger task failed");
                }
            }
        }

        debug!(
            written = self.lines_written(),
            batches = self.batches_written(),
            dropped = self.lines_dropped(),
            "async logger stopped"
        );
        drop(guard);
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Consumer main loop.
fn consume<S: LogSink>(
    shared: Arc<Shared>,
    mut rx: Consumer<String>,
    mut batcher: Batcher<S>,
    idle: Duration,
) {
    loop {
        while let Some(line) = rx.dequeue() {
            batcher.push(line.as_bytes());
        }
        batcher.flush();

        if shared.stop.load(Ordering::SeqCst) {
            break;
        }

        shared.parker.prepare_park();
        if !rx.is_empty() || shared.stop.load(Ordering::SeqCst) {
            shared.parker.cancel_park();
        } else {
            shared.parker.park_timeout(idle);
        }
    }

    // Final drain. Slots reserved before `exited` is visible are finished
    // by producers already past their CAS, so this wait is short; later
    // ones reclaim their own lines once `retired` is released.
    let mut retired = shared.retired.lock().unwrap_or_else(PoisonError::into_inner);
    shared.exited.store(true, Ordering::SeqCst);
    fence(Ordering::SeqCst);

    let backoff = Backoff::new();
    loop {
        while let Some(line) = rx.dequeue() {
            batcher.push(line.as_bytes());
            backoff.reset();
        }
        if rx.is_empty() {
            break;
        }
        backoff.snooze();
    }
    batcher.flush();

    *retired = Some(rx);
}

/// Coalesces lines into one buffer and writes it to the sink.
struct Batcher<S> {
    sink: S,
    buf: Vec<u8>,
    capacity: usize,
    /// Lines currently in `buf`
    lines: u64,
    shared: Arc<Shared>,
}

impl<S: LogSink> Batcher<S> {
    fn new(sink: S, capacity: usize, shared: Arc<Shared>) -> Self {
        Batcher {
            sink,
            buf: Vec::with_capacity(capacity),
            capacity,
            lines: 0,
            shared,
        }
    }

    fn push(&mut self, line: &[u8]) {
        if self.buf.len() + line.len() > self.capacity {
            self.flush();
        }
        if line.len() > self.capacity {
            // Larger than the whole buffer: its own write
            self.write(line, 1);
            return;
        }
        self.buf.extend_from_slice(line);
        self.lines += 1;
    }

    fn flush(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        let buf = std::mem::take(&mut self.buf);
        self.write(&buf, self.lines);
        self.buf = buf;
        self.buf.clear();
        self.lines = 0;
    }

    fn write(&mut self, bytes: &[u8], lines: u64) {
        let stats = &self.shared.stats;
        match self.sink.write_batch(bytes) {
            Ok(()) => {
                stats.lines_written.fetch_add(lines, Ordering::Relaxed);
                stats.batches_written.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                stats.lines_dropped.fetch_add(lines, Ordering::Relaxed);
                warn!(error = %e, lines, "log sink write failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolConfig;
    use std::io;

    fn config() -> LoggerConfig {
        LoggerConfig::new()
            .queue_capacity(64)
            .batch_capacity(4096)
            .idle_park(Duration::from_millis(1))
            .on_pool(false)
    }

    /// Message part of a captured line (after the timestamp)
    fn message(line: &str) -> &str {
        line.split_once(' ').map(|(_, rest)| rest).unwrap_or(line)
    }

    #[test]
    fn test_lines_reach_sink_in_order() {
        let sink = MemorySink::new();
        let logger = Logger::spawn(config(), sink.clone()).unwrap();

        for i in 0..20 {
            ainfo!(logger, "Log number #{}", i);
        }
        awarn!(logger, "careful");
        aerror!(logger, "failed: {}", "disk");
        logger.shutdown();

        let lines = sink.lines();
        assert_eq!(lines.len(), 22);
        for (i, line) in lines.iter().take(20).enumerate() {
            assert_eq!(message(line), format!("[INFO] Log number #{}", i));
        }
        assert_eq!(message(&lines[20]), "[WARNING] careful");
        assert_eq!(message(&lines[21]), "[ERROR] failed: disk");
        assert_eq!(logger.lines_written(), 22);
        assert_eq!(logger.lines_dropped(), 0);
    }

    #[test]
    fn test_lossless_multi_thread_per_thread_order() {
        let sink = MemorySink::new();
        // Small ring forces producers through the full-ring backoff path
        let logger = Arc::new(Logger::spawn(config().queue_capacity(8), sink.clone()).unwrap());

        let threads = 4;
        let per_thread = 500;
        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let logger = Arc::clone(&logger);
                thread::spawn(move || {
                    for i in 0..per_thread {
                        ainfo!(logger, "t{} {}", t, i);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        logger.shutdown();

        let lines = sink.lines();
        assert_eq!(lines.len(), threads * per_thread);

        let mut next = vec![0usize; threads];
        for line in &lines {
            let body = message(line).strip_prefix("[INFO] t").unwrap();
            let (t, i) = body.split_once(' ').unwrap();
            let (t, i): (usize, usize) = (t.parse().unwrap(), i.parse().unwrap());
            assert_eq!(i, next[t], "thread {} out of order", t);
            next[t] += 1;
        }
    }

    #[test]
    fn test_severity_filter() {
        let sink = MemorySink::new();
        let logger =
            Logger::spawn(config().min_severity(Severity::Warning), sink.clone()).unwrap();
        ainfo!(logger, "hidden");
        awarn!(logger, "shown");
        logger.shutdown();

        let lines = sink.lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(message(&lines[0]), "[WARNING] shown");
    }

    #[test]
    fn test_batches_respect_capacity() {
        let sink = MemorySink::new();
        let logger = Logger::spawn(config().batch_capacity(256), sink.clone()).unwrap();
        for i in 0..200 {
            ainfo!(logger, "{:04}", i);
        }
        // Larger than the whole buffer
        ainfo!(logger, "{}", "x".repeat(1000));
        logger.shutdown();

        let sizes = sink.batch_sizes();
        let oversized = sizes.iter().filter(|&&s| s > 256).count();
        assert_eq!(oversized, 1);
        assert!(sizes.iter().any(|&s| s > 1000));
        assert_eq!(logger.lines_written(), 201);
        assert_eq!(logger.batches_written(), sizes.len() as u64);
    }

    #[test]
    fn test_log_after_shutdown_is_dropped() {
        let sink = MemorySink::new();
        let logger = Logger::spawn(config(), sink.clone()).unwrap();
        ainfo!(logger, "before");
        logger.shutdown();
        ainfo!(logger, "after");
        logger.shutdown();

        assert_eq!(sink.lines().len(), 1);
        assert_eq!(logger.lines_dropped(), 1);
    }

    #[test]
    fn test_line_enqueued_after_exit_is_counted() {
        let sink = MemorySink::new();
        let logger = Logger::spawn(config(), sink.clone()).unwrap();
        ainfo!(logger, "before");
        logger.shutdown();

        // A producer that passed the exit check just before the consumer left
        logger.shared.producer.enqueue("late\n".to_string()).unwrap();
        ainfo!(logger, "after");
        logger.shared.reclaim();

        assert_eq!(sink.lines().len(), 1);
        assert_eq!(logger.lines_written(), 1);
        assert_eq!(logger.lines_dropped(), 2);
    }

    #[test]
    fn test_logging_races_shutdown_accounts_every_line() {
        let sink = MemorySink::new();
        let logger = Arc::new(Logger::spawn(config().queue_capacity(16), sink.clone()).unwrap());

        let threads = 4;
        let per_thread = 2000u64;
        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let logger = Arc::clone(&logger);
                thread::spawn(move || {
                    for i in 0..per_thread {
                        ainfo!(logger, "t{} {}", t, i);
                    }
                })
            })
            .collect();
        thread::sleep(Duration::from_millis(2));
        logger.shutdown();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(sink.lines().len() as u64, logger.lines_written());
        assert_eq!(
            logger.lines_written() + logger.lines_dropped(),
            threads as u64 * per_thread
        );
    }

    /// Sink that takes a while per batch
    struct SlowSink(MemorySink);

    impl LogSink for SlowSink {
        fn write_batch(&mut self, batch: &[u8]) -> io::Result<()> {
            thread::sleep(Duration::from_millis(20));
            self.0.write_batch(batch)
        }
    }

    #[test]
    fn test_concurrent_shutdown_waits_for_drain() {
        let sink = MemorySink::new();
        let logger = Arc::new(Logger::spawn(config(), SlowSink(sink.clone())).unwrap());
        for i in 0..5 {
            ainfo!(logger, "slow {}", i);
        }

        let other = {
            let logger = Arc::clone(&logger);
            let sink = sink.clone();
            thread::spawn(move || {
                logger.shutdown();
                sink.lines().len()
            })
        };
        logger.shutdown();
        assert_eq!(sink.lines().len(), 5);
        assert_eq!(other.join().unwrap(), 5);
    }

    #[test]
    fn test_on_pool_consumer() {
        let pool = WorkerPool::new(PoolConfig::new().num_workers(2)).unwrap();
        let sink = MemorySink::new();
        let logger = Logger::on_pool(&pool, config().on_pool(true), sink.clone()).unwrap();

        for i in 0..10 {
            ainfo!(logger, "pooled {}", i);
        }
        logger.shutdown();
        pool.shutdown();

        assert_eq!(sink.lines().len(), 10);
        assert!(pool.completed() >= 1);
    }

    struct FailingSink;

    impl LogSink for FailingSink {
        fn write_batch(&mut self, _batch: &[u8]) -> io::Result<()> {
            Err(io::Error::other("disk full"))
        }
    }

    #[test]
    fn test_sink_errors_counted() {
        let logger = Logger::spawn(config(), FailingSink).unwrap();
        ainfo!(logger, "lost");
        ainfo!(logger, "also lost");
        logger.shutdown();

        assert_eq!(logger.lines_written(), 0);
        assert_eq!(logger.lines_dropped(), 2);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = Logger::spawn(config().queue_capacity(1), MemorySink::new()).err().unwrap();
        assert!(matches!(err, LoggerError::Config(_)));
    }
}

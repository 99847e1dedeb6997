//! Basic syslib example
//!
//! Reads a file and writes a file through the worker pool, then logs 20
//! lines from two pool tasks through the async logger.
//!
//! ```text
//! cargo run -p syslib-basic -- [INPUT] [OUTPUT]
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG=syslib_runtime=debug` - Internal diagnostics on stderr
//! - `SYSLIB_NUM_WORKERS=4` - Pool size
//! - `SYSLIB_LOG_LEVEL=warning` - Async logger threshold
//! - `SYSLIB_LOG_ON_POOL=0` - Run the logger consumer on its own thread

use syslib::{aerror, ainfo, asyncio, Runtime, RuntimeConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() -> syslib::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args_os().skip(1);
    let input = args.next().map(PathBuf::from).unwrap_or_else(|| "example.txt".into());
    let output = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("syslib-output.txt"));

    let rt = Arc::new(Runtime::new(RuntimeConfig::from_env())?);
    let log = rt.logger();

    let read = asyncio::read_to_string(rt.pool(), &input)?;
    let write = asyncio::write(rt.pool(), &output, "Hello, IO world!")?;

    match read.wait()? {
        Ok(content) => ainfo!(log, "Read content: {}", content.trim_end()),
        Err(e) => aerror!(log, "I/O operation failed: {}: {}", input.display(), e),
    }
    match write.wait()? {
        Ok(()) => ainfo!(log, "Write done: {}", output.display()),
        Err(e) => aerror!(log, "I/O operation failed: {}: {}", output.display(), e),
    }

    let tasks = [0..10, 10..20].map(|range| {
        let rt = Arc::clone(&rt);
        move || {
            for i in range {
                ainfo!(rt.logger(), "Log number #{}", i);
            }
        }
    });
    let handles = tasks
        .into_iter()
        .map(|task| rt.submit(task))
        .collect::<Result<Vec<_>, _>>()?;
    for handle in handles {
        handle.wait()?;
    }

    rt.shutdown();
    tracing::debug!(
        lines = rt.logger().lines_written(),
        batches = rt.logger().batches_written(),
        "done"
    );
    Ok(())
}

//! Blocking file I/O offloaded to a worker pool
//!
//! Each call submits one task and returns its handle right away. The I/O
//! error, if any, is the task's value; a refused submission is the outer
//! error.
//!
//! ```rust,ignore
//! let read = asyncio::read_to_string(rt.pool(), "input.txt")?;
//! let write = asyncio::write(rt.pool(), "output.txt", "Hello, IO world!")?;
//! let text = read.wait()??;
//! write.wait()??;
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use syslib_runtime::{PoolError, TaskHandle, WorkerPool};

/// Read a whole file as bytes
pub fn read(
    pool: &WorkerPool,
    path: impl AsRef<Path>,
) -> Result<TaskHandle<io::Result<Vec<u8>>>, PoolError> {
    let path = path.as_ref().to_path_buf();
    pool.submit(move || fs::read(path))
}

/// Read a whole file as UTF-8
pub fn read_to_string(
    pool: &WorkerPool,
    path: impl AsRef<Path>,
) -> Result<TaskHandle<io::Result<String>>, PoolError> {
    let path = path.as_ref().to_path_buf();
    pool.submit(move || fs::read_to_string(path))
}

/// Create or truncate `path` and write `contents` to it
pub fn write(
    pool: &WorkerPool,
    path: impl AsRef<Path>,
    contents: impl Into<Vec<u8>>,
) -> Result<TaskHandle<io::Result<()>>, PoolError> {
    let path: PathBuf = path.as_ref().to_path_buf();
    let contents = contents.into();
    pool.submit(move || fs::write(path, contents))
}

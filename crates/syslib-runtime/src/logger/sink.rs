//! Destinations for batched log output

use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

/// Receives whole batches from the logger's consumer.
///
/// A batch is one or more complete lines, each terminated by `\n`.
pub trait LogSink: Send + 'static {
    fn write_batch(&mut self, batch: &[u8]) -> io::Result<()>;
}

/// Process stdout. Each batch is written under one stdout lock.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl LogSink for StdoutSink {
    fn write_batch(&mut self, batch: &[u8]) -> io::Result<()> {
        let mut out = io::stdout().lock();
        out.write_all(batch)?;
        out.flush()
    }
}

/// Any `Write` implementor, e.g. a `File`
pub struct WriterSink<W>(pub W);

impl<W: Write + Send + 'static> LogSink for WriterSink<W> {
    fn write_batch(&mut self, batch: &[u8]) -> io::Result<()> {
        self.0.write_all(batch)?;
        self.0.flush()
    }
}

/// In-memory capture. Clones share the same buffer.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    inner: Arc<Mutex<Captured>>,
}

#[derive(Debug, Default)]
struct Captured {
    bytes: Vec<u8>,
    batches: Vec<usize>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.lock().bytes).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_owned).collect()
    }

    /// Size of every batch received, in order
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.lock().batches.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Captured> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LogSink for MemorySink {
    fn write_batch(&mut self, batch: &[u8]) -> io::Result<()> {
        let mut captured = self.lock();
        captured.bytes.extend_from_slice(batch);
        captured.batches.push(batch.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_shared() {
        let sink = MemorySink::new();
        let mut writer = sink.clone();
        writer.write_batch(b"a\nb\n").unwrap();
        writer.write_batch(b"c\n").unwrap();

        assert_eq!(sink.lines(), vec!["a", "b", "c"]);
        assert_eq!(sink.batch_sizes(), vec![4, 2]);
    }

    #[test]
    fn test_writer_sink() {
        let mut sink = WriterSink(Vec::new());
        sink.write_batch(b"hello\n").unwrap();
        assert_eq!(sink.0, b"hello\n");
    }
}

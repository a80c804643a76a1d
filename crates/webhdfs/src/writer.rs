//! Buffered JSON-lines writer for remote files.

use serde::Serialize;
use tracing::warn;

use crate::client::Client;
use crate::error::{HdfsError, Result};

const DEFAULT_FLUSH_THRESHOLD: usize = 64 * 1024;

/// Tuning for [`RecordWriter::create`].
#[derive(Clone)]
pub struct WriterOptions {
    overwrite: bool,
    flush_threshold: usize,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            overwrite: false,
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
        }
    }
}

impl WriterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace an existing destination instead of refusing at first flush.
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Buffered bytes that trigger a flush.
    pub fn flush_threshold(mut self, flush_threshold: usize) -> Self {
        self.flush_threshold = flush_threshold.max(1);
        self
    }
}

/// Writes serializable records to a remote file, one JSON document per line.
///
/// Records accumulate in memory and are flushed once the buffer reaches the
/// configured threshold. The first flush creates the file, later flushes
/// append, so the destination is never touched until there is something to
/// write. [`RecordWriter::close`] flushes the remainder; a writer that was
/// never written to still produces an empty file.
pub struct RecordWriter<'a> {
    client: &'a Client,
    path: String,
    overwrite: bool,
    flush_threshold: usize,
    buffer: Vec<u8>,
    created: bool,
    closed: bool,
}

impl<'a> RecordWriter<'a> {
    pub fn create(client: &'a Client, path: &str, options: WriterOptions) -> Result<Self> {
        let path = client.resolve(path)?;
        Ok(Self {
            client,
            path,
            overwrite: options.overwrite,
            flush_threshold: options.flush_threshold,
            buffer: Vec::new(),
            created: false,
            closed: false,
        })
    }

    /// Serialize one record as a JSON line.
    pub fn write<T: Serialize>(&mut self, record: &T) -> Result<()> {
        if self.closed {
            return Err(HdfsError::operation(format!(
                "Record writer for '{}' is closed",
                self.path
            )));
        }
        let line = serde_json::to_vec(record)?;
        self.buffer.extend_from_slice(&line);
        self.buffer.push(b'\n');
        if self.buffer.len() >= self.flush_threshold {
            self.flush_buffer()?;
        }
        Ok(())
    }

    /// Flush remaining records and seal the writer. Idempotent.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        if !self.buffer.is_empty() || !self.created {
            self.flush_buffer()?;
        }
        self.closed = true;
        Ok(())
    }

    fn flush_buffer(&mut self) -> Result<()> {
        if self.created {
            self.client.append(&self.path, &self.buffer)?;
        } else {
            self.client.create(&self.path, &self.buffer, self.overwrite)?;
            self.created = true;
        }
        self.buffer.clear();
        Ok(())
    }
}

impl Drop for RecordWriter<'_> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        warn!(
            "Record writer for '{}' dropped without close, flushing",
            self.path
        );
        if let Err(error) = self.close() {
            warn!("Final flush of '{}' failed: {}", self.path, error);
        }
    }
}

//! Parallel bulk transfers between the local filesystem and the remote
//! store.
//!
//! [`Client::upload`] and [`Client::download`] move single files or whole
//! directory trees. Planning runs up front ([`plan`]), a worker pool copies
//! the files ([`pool`]), and when the destination already existed the data
//! lands under a `.temp-<timestamp>` staging path that a final commit renames
//! into place. A failed transfer removes whatever it staged and leaves the
//! previous destination untouched.

mod plan;
mod pool;
mod progress;

pub use progress::{ProgressFn, ProgressState, TransferEvent};

use std::fs::{self, File};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{info, warn};

use crate::client::Client;
use crate::error::{HdfsError, Result};

use plan::{DownloadTask, UploadTask};

/// Bytes moved per request when splitting files into chunks.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Tuning for [`Client::upload`] and [`Client::download`].
#[derive(Clone)]
pub struct TransferOptions {
    /// Replace an existing destination instead of refusing.
    overwrite: bool,
    /// Worker threads. `1` copies sequentially on the calling thread and `0`
    /// spawns one worker per file.
    concurrency: usize,
    /// Bytes per request.
    chunk_size: usize,
    progress: Option<ProgressFn>,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            overwrite: false,
            concurrency: 1,
            chunk_size: DEFAULT_CHUNK_SIZE,
            progress: None,
        }
    }
}

impl TransferOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Install a callback receiving a [`TransferEvent`] per copied chunk.
    pub fn progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }
}

impl Client {
    /// Upload a local file or directory tree to `remote`.
    ///
    /// Returns the final remote path, which differs from `remote` when the
    /// destination is an existing directory (the source lands inside it under
    /// its own name). Overwriting an existing destination goes through a
    /// staging path and an atomic rename, so a failed transfer never damages
    /// what was there before.
    pub fn upload(
        &self,
        local: impl AsRef<Path>,
        remote: &str,
        options: &TransferOptions,
    ) -> Result<String> {
        let local = local.as_ref();
        let (tasks, plan) = plan::plan_upload(self, local, remote, options.overwrite)?;
        info!(
            "Uploading {} file(s) from '{}' to '{}'",
            tasks.len(),
            local.display(),
            plan.final_path
        );
        let outcome = pool::run_tasks(&tasks, options.concurrency, |task| {
            self.upload_file(task, options)
        });
        if let Err(error) = outcome {
            self.cleanup_remote(&plan.staging_path);
            return Err(error);
        }
        if plan.needs_commit {
            self.commit_remote(&plan.staging_path, &plan.final_path)?;
        }
        info!("Upload of '{}' complete", plan.final_path);
        Ok(plan.final_path)
    }

    /// Download a remote file or directory tree into `local`.
    ///
    /// Returns the final local path. Mirrors [`Client::upload`]: an existing
    /// local directory receives the source under its own name, and overwrites
    /// stage next to the destination before renaming into place.
    pub fn download(
        &self,
        remote: &str,
        local: impl AsRef<Path>,
        options: &TransferOptions,
    ) -> Result<PathBuf> {
        let local = local.as_ref();
        let (tasks, plan) = plan::plan_download(self, remote, local, options.overwrite)?;
        info!(
            "Downloading {} file(s) from '{}' to '{}'",
            tasks.len(),
            remote,
            plan.final_path.display()
        );
        let dir_lock = Mutex::new(());
        let outcome = pool::run_tasks(&tasks, options.concurrency, |task| {
            self.download_file(task, options, &dir_lock)
        });
        if let Err(error) = outcome {
            cleanup_local(&plan.staging_path);
            return Err(error);
        }
        if plan.needs_commit {
            commit_local(&plan.staging_path, &plan.final_path)?;
        }
        info!("Download to '{}' complete", plan.final_path.display());
        Ok(plan.final_path)
    }

    fn upload_file(&self, task: &UploadTask, options: &TransferOptions) -> Result<()> {
        let mut reader = File::open(&task.local)?;
        let mut buffer = vec![0u8; options.chunk_size];
        let mut sent: u64 = 0;
        let mut first = true;
        loop {
            let read = read_chunk(&mut reader, &mut buffer)?;
            if first {
                // Unconditional overwrite: a create retried on another
                // endpoint after failover must not trip over its own
                // half-written first attempt.
                self.create(&task.remote, &buffer[..read], true)?;
                first = false;
            } else if read == 0 {
                break;
            } else {
                self.append(&task.remote, &buffer[..read])?;
            }
            if read > 0 {
                sent += read as u64;
                emit(
                    options,
                    TransferEvent::Progress {
                        path: task.remote.clone(),
                        bytes_so_far: sent,
                    },
                );
            }
            if read < buffer.len() {
                break;
            }
        }
        emit(
            options,
            TransferEvent::Completed {
                path: task.remote.clone(),
            },
        );
        Ok(())
    }

    fn download_file(
        &self,
        task: &DownloadTask,
        options: &TransferOptions,
        dir_lock: &Mutex<()>,
    ) -> Result<()> {
        if let Some(parent) = task.local.parent() {
            // Workers share parent directories; create them one at a time.
            let _guard = dir_lock.lock().unwrap();
            fs::create_dir_all(parent)?;
        }
        let mut reader = self.open(&task.remote, None, None)?;
        let mut writer = File::create(&task.local)?;
        let mut buffer = vec![0u8; options.chunk_size];
        let mut received: u64 = 0;
        loop {
            let read = read_chunk(&mut reader, &mut buffer)?;
            if read == 0 {
                break;
            }
            writer.write_all(&buffer[..read])?;
            received += read as u64;
            emit(
                options,
                TransferEvent::Progress {
                    path: task.remote.clone(),
                    bytes_so_far: received,
                },
            );
        }
        writer.flush()?;
        emit(
            options,
            TransferEvent::Completed {
                path: task.remote.clone(),
            },
        );
        Ok(())
    }

    /// Swap staged data into place: drop the old destination, then rename.
    fn commit_remote(&self, staging: &str, final_path: &str) -> Result<()> {
        self.delete(final_path, true)?;
        if !self.rename(staging, final_path)? {
            return Err(HdfsError::operation(format!(
                "Unable to rename '{}' to '{}'",
                staging, final_path
            )));
        }
        Ok(())
    }

    /// Best effort removal of staged data after a failed transfer. Never
    /// masks the error that got us here.
    fn cleanup_remote(&self, staging: &str) {
        warn!("Transfer failed. Removing staged data at '{}'", staging);
        if let Err(error) = self.delete(staging, true) {
            warn!("Could not remove staged data at '{}': {}", staging, error);
        }
    }
}

fn commit_local(staging: &Path, final_path: &Path) -> Result<()> {
    if final_path.is_dir() {
        fs::remove_dir_all(final_path)?;
    } else if final_path.exists() {
        fs::remove_file(final_path)?;
    }
    fs::rename(staging, final_path)?;
    Ok(())
}

fn cleanup_local(staging: &Path) {
    warn!(
        "Transfer failed. Removing staged data at '{}'",
        staging.display()
    );
    let outcome = if staging.is_dir() {
        fs::remove_dir_all(staging)
    } else if staging.exists() {
        fs::remove_file(staging)
    } else {
        Ok(())
    };
    if let Err(error) = outcome {
        warn!(
            "Could not remove staged data at '{}': {}",
            staging.display(),
            error
        );
    }
}

/// Fill `buffer` from `reader`; a short count only means end of stream.
fn read_chunk(reader: &mut dyn Read, buffer: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        match reader.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(error) if error.kind() == ErrorKind::Interrupted => continue,
            Err(error) => return Err(error),
        }
    }
    Ok(filled)
}

fn emit(options: &TransferOptions, event: TransferEvent) {
    if let Some(progress) = &options.progress {
        progress(event);
    }
}

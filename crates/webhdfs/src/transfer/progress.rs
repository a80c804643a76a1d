//! Progress reporting for bulk transfers.

use std::collections::HashMap;
use std::sync::Arc;

/// Event delivered to a transfer's progress callback.
///
/// Workers emit a `Progress` event after every chunk and exactly one
/// `Completed` event per file. The path is the remote side of the copy in
/// both directions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEvent {
    /// Cumulative bytes moved for one file.
    Progress { path: String, bytes_so_far: u64 },
    /// The file finished.
    Completed { path: String },
}

/// Shared callback invoked by transfer workers.
pub type ProgressFn = Arc<dyn Fn(TransferEvent) + Send + Sync>;

/// Counters describing one bulk transfer, fed from [`TransferEvent`]s.
///
/// Wrap in a mutex to share between the event callback and a renderer.
#[derive(Debug, Default)]
pub struct ProgressState {
    pub total_files: usize,
    pub total_bytes: u64,
    pub complete: usize,
    pub bytes_moved: u64,
    in_flight: HashMap<String, u64>,
}

impl ProgressState {
    pub fn new(total_files: usize, total_bytes: u64) -> Self {
        Self {
            total_files,
            total_bytes,
            ..Default::default()
        }
    }

    /// Files that have moved at least one chunk but are not finished.
    pub fn active(&self) -> usize {
        self.in_flight.len()
    }

    /// Files not yet started.
    pub fn pending(&self) -> usize {
        self.total_files
            .saturating_sub(self.complete + self.in_flight.len())
    }

    pub fn apply(&mut self, event: &TransferEvent) {
        match event {
            TransferEvent::Progress { path, bytes_so_far } => {
                let seen = self.in_flight.entry(path.clone()).or_insert(0);
                self.bytes_moved += bytes_so_far.saturating_sub(*seen);
                *seen = *bytes_so_far;
            }
            TransferEvent::Completed { path } => {
                self.in_flight.remove(path);
                self.complete += 1;
            }
        }
    }
}

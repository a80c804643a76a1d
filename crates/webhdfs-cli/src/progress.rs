//! Progress bar rendering for bulk transfers.

use std::sync::{Arc, Mutex};

use indicatif::{ProgressBar, ProgressStyle};
use webhdfs::{ProgressState, TransferEvent, TransferOptions};

/// Renders transfer events as a single byte-level progress bar on stderr.
///
/// indicatif hides the bar when stderr is not a terminal, so piped runs stay
/// clean without extra checks.
pub struct Reporter {
    inner: Option<Arc<Inner>>,
}

struct Inner {
    bar: ProgressBar,
    state: Mutex<ProgressState>,
}

impl Reporter {
    /// A reporter for a transfer of known size.
    pub fn new(total_files: usize, total_bytes: u64) -> Self {
        let bar = ProgressBar::new(total_bytes);
        bar.set_style(
            ProgressStyle::with_template(
                "{bar:30.cyan/blue} {bytes}/{total_bytes} ({bytes_per_sec}) {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar.set_message(format!("0/{} files, 0 active", total_files));
        Self {
            inner: Some(Arc::new(Inner {
                bar,
                state: Mutex::new(ProgressState::new(total_files, total_bytes)),
            })),
        }
    }

    /// A reporter that renders nothing (`--silent`).
    pub fn disabled() -> Self {
        Self { inner: None }
    }

    /// Wire this reporter's callback into the transfer options.
    pub fn attach(&self, options: TransferOptions) -> TransferOptions {
        let inner = match &self.inner {
            Some(inner) => Arc::clone(inner),
            None => return options,
        };
        options.progress(Arc::new(move |event: TransferEvent| {
            let mut state = inner.state.lock().unwrap();
            state.apply(&event);
            inner.bar.set_position(state.bytes_moved);
            inner.bar.set_message(format!(
                "{}/{} files, {} active",
                state.complete,
                state.total_files,
                state.active()
            ));
        }))
    }

    /// Remove the bar from the terminal.
    pub fn finish(&self) {
        if let Some(inner) = &self.inner {
            inner.bar.finish_and_clear();
        }
    }
}

//! Bounded worker pool for per-file transfer tasks.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Mutex;

use crossbeam_channel::bounded;
use tracing::error;

use crate::error::{HdfsError, Result};

/// Run `work` over every task with bounded parallelism.
///
/// `concurrency == 0` spawns one worker per task; `1` runs inline on the
/// caller's thread in task order; larger values are clamped to the task
/// count. The first failure becomes the error of record: queued tasks are
/// drained unprocessed, in-flight ones finish, and any further failures are
/// logged but superseded. A panicking task is reported as a worker error
/// rather than tearing down the pool.
pub(crate) fn run_tasks<T, F>(tasks: &[T], concurrency: usize, work: F) -> Result<()>
where
    T: Sync,
    F: Fn(&T) -> Result<()> + Sync,
{
    if tasks.is_empty() {
        return Ok(());
    }
    if concurrency == 1 {
        for task in tasks {
            work(task)?;
        }
        return Ok(());
    }

    let workers = if concurrency == 0 {
        tasks.len()
    } else {
        std::cmp::min(concurrency, tasks.len())
    };

    let (tx, rx) = bounded::<usize>(tasks.len());
    for index in 0..tasks.len() {
        let _ = tx.send(index);
    }
    drop(tx);

    let first_error: Mutex<Option<HdfsError>> = Mutex::new(None);

    std::thread::scope(|scope| {
        for _ in 0..workers {
            let rx = rx.clone();
            let first_error = &first_error;
            let work = &work;
            scope.spawn(move || {
                while let Ok(index) = rx.recv() {
                    if first_error.lock().unwrap().is_some() {
                        // Batch already failed; drain the queue unprocessed.
                        continue;
                    }
                    let result = match catch_unwind(AssertUnwindSafe(|| work(&tasks[index]))) {
                        Ok(result) => result,
                        Err(panic) => Err(HdfsError::worker(
                            format!("task {}", index + 1),
                            panic_message(panic.as_ref()),
                        )),
                    };
                    if let Err(current) = result {
                        let mut slot = first_error.lock().unwrap();
                        if slot.is_none() {
                            *slot = Some(current);
                        } else {
                            error!("Task {} also failed: {}", index + 1, current);
                        }
                    }
                }
            });
        }
    });

    match first_error.into_inner().unwrap() {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "panicked".to_string()
    }
}

//! Background task that reports its outcome over a channel

use crossbeam_channel::Receiver;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

use super::error::{HarnessError, HarnessResult};

/// Render a panic payload as text
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// A task closure running on its own named thread.
///
/// The task's result (or its panic) is sent over a bounded channel and handed
/// back by [`Worker::join`], so a failure on the background thread is never lost.
pub struct Worker<T> {
    name: String,
    handle: JoinHandle<()>,
    done: Receiver<HarnessResult<T>>,
}

impl<T: Send + 'static> Worker<T> {
    pub fn spawn<F>(name: impl Into<String>, task: F) -> HarnessResult<Self>
    where
        F: FnOnce() -> HarnessResult<T> + Send + 'static,
    {
        let name = name.into();
        let (sender, done) = crossbeam_channel::bounded(1);
        let task_name = name.clone();

        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                let result = match panic::catch_unwind(AssertUnwindSafe(task)) {
                    Ok(result) => result,
                    Err(payload) => Err(HarnessError::WorkerFailed {
                        name: task_name,
                        message: panic_message(payload.as_ref()),
                    }),
                };
                // The receiver only disappears if the worker was dropped unjoined
                let _ = sender.send(result);
            })
            .map_err(|e| HarnessError::WorkerFailed {
                name: name.clone(),
                message: format!("failed to spawn thread: {}", e),
            })?;

        Ok(Self { name, handle, done })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Has the task returned (or panicked)?
    pub fn is_finished(&self) -> bool {
        !self.done.is_empty() || self.handle.is_finished()
    }

    /// Join the thread and return the task's result
    pub fn join(self) -> HarnessResult<T> {
        let Worker { name, handle, done } = self;

        if let Err(payload) = handle.join() {
            return Err(HarnessError::WorkerFailed {
                name,
                message: panic_message(payload.as_ref()),
            });
        }

        done.try_recv().unwrap_or_else(|_| {
            Err(HarnessError::WorkerFailed {
                name,
                message: "worker exited without reporting a result".to_string(),
            })
        })
    }
}

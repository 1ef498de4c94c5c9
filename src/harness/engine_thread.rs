//! Engine-thread affinity scope
//!
//! The host may only be driven from the thread that bound this scope. The
//! harness creates one scope per instance, the controller binds it on the host
//! thread before initializing the host, and teardown resets it to unbound.

use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("engine thread is already bound to {bound:?}, cannot bind {requested:?}")]
pub struct EngineThreadBound {
    pub bound: ThreadId,
    pub requested: ThreadId,
}

#[derive(Debug, Clone, Default)]
pub struct EngineThread {
    bound: Arc<Mutex<Option<ThreadId>>>,
}

impl EngineThread {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the scope to the calling thread
    pub fn bind_current(&self) -> Result<ThreadId, EngineThreadBound> {
        let current = thread::current().id();
        let mut bound = self.bound.lock();
        match *bound {
            Some(existing) if existing != current => Err(EngineThreadBound {
                bound: existing,
                requested: current,
            }),
            _ => {
                *bound = Some(current);
                Ok(current)
            }
        }
    }

    pub fn is_current(&self) -> bool {
        *self.bound.lock() == Some(thread::current().id())
    }

    pub fn bound(&self) -> Option<ThreadId> {
        *self.bound.lock()
    }

    /// Back to uninitialized
    pub fn reset(&self) {
        self.bound.lock().take();
    }
}

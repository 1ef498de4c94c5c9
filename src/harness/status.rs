//! Replay lifecycle status shared between the host and verifier threads

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};

/// Lifecycle stage of the current replay session
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum ReplayStatus {
    #[default]
    None = 0,
    Preparing = 1,
    Replaying = 2,
    Finished = 3,
}

impl ReplayStatus {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ReplayStatus::Preparing,
            2 => ReplayStatus::Replaying,
            3 => ReplayStatus::Finished,
            _ => ReplayStatus::None,
        }
    }

    /// The only status a session may move to from this one
    pub fn next(self) -> Option<Self> {
        match self {
            ReplayStatus::None => Some(ReplayStatus::Preparing),
            ReplayStatus::Preparing => Some(ReplayStatus::Replaying),
            ReplayStatus::Replaying => Some(ReplayStatus::Finished),
            ReplayStatus::Finished => None,
        }
    }
}

impl fmt::Display for ReplayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplayStatus::None => write!(f, "none"),
            ReplayStatus::Preparing => write!(f, "preparing"),
            ReplayStatus::Replaying => write!(f, "replaying"),
            ReplayStatus::Finished => write!(f, "finished"),
        }
    }
}

/// A recorded status change, stamped relative to the session start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusTransition {
    pub status: ReplayStatus,
    pub at: Duration,
}

struct TransitionLog {
    epoch: Instant,
    entries: Vec<StatusTransition>,
}

/// Thread-safe holder of the current [`ReplayStatus`].
///
/// Written only by the host thread, read by the verifier. `get` is a single
/// atomic load with acquire ordering, so a status written with `set` is visible
/// to any thread without extra synchronization.
pub struct StatusChannel {
    current: AtomicU8,
    log: Mutex<TransitionLog>,
}

impl StatusChannel {
    pub fn new() -> Self {
        Self {
            current: AtomicU8::new(ReplayStatus::None as u8),
            log: Mutex::new(TransitionLog {
                epoch: Instant::now(),
                entries: Vec::new(),
            }),
        }
    }

    /// Current status (non-blocking)
    pub fn get(&self) -> ReplayStatus {
        ReplayStatus::from_u8(self.current.load(Ordering::Acquire))
    }

    /// Advance to `status`.
    ///
    /// # Panics
    /// If `status` is not the direct successor of the current status.
    pub fn set(&self, status: ReplayStatus) {
        let mut log = self.log.lock();
        let current = self.get();
        assert_eq!(
            current.next(),
            Some(status),
            "illegal replay status transition {} -> {}",
            current,
            status
        );

        let at = log.epoch.elapsed();
        log.entries.push(StatusTransition { status, at });
        self.current.store(status as u8, Ordering::Release);
    }

    /// Back to `None` with an empty transition log
    pub fn reset(&self) {
        let mut log = self.log.lock();
        log.epoch = Instant::now();
        log.entries.clear();
        self.current.store(ReplayStatus::None as u8, Ordering::Release);
    }

    /// Transitions since the last reset, oldest first
    pub fn history(&self) -> Vec<StatusTransition> {
        self.log.lock().entries.clone()
    }

    /// Time since the last reset
    pub fn elapsed(&self) -> Duration {
        self.log.lock().epoch.elapsed()
    }
}

impl Default for StatusChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StatusChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusChannel")
            .field("current", &self.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_full_session_is_ordered() {
        let channel = StatusChannel::new();
        assert_eq!(channel.get(), ReplayStatus::None);

        channel.set(ReplayStatus::Preparing);
        channel.set(ReplayStatus::Replaying);
        channel.set(ReplayStatus::Finished);

        let statuses: Vec<_> = channel.history().iter().map(|t| t.status).collect();
        assert_eq!(
            statuses,
            vec![
                ReplayStatus::Preparing,
                ReplayStatus::Replaying,
                ReplayStatus::Finished
            ]
        );
        assert_eq!(channel.get(), ReplayStatus::Finished);
    }

    #[test]
    #[should_panic(expected = "illegal replay status transition")]
    fn test_skipping_a_status_panics() {
        let channel = StatusChannel::new();
        channel.set(ReplayStatus::Replaying);
    }

    #[test]
    #[should_panic(expected = "illegal replay status transition")]
    fn test_regressing_panics() {
        let channel = StatusChannel::new();
        channel.set(ReplayStatus::Preparing);
        channel.set(ReplayStatus::Replaying);
        channel.set(ReplayStatus::Preparing);
    }

    #[test]
    fn test_reset_clears_status_and_history() {
        let channel = StatusChannel::new();
        channel.set(ReplayStatus::Preparing);
        channel.reset();

        assert_eq!(channel.get(), ReplayStatus::None);
        assert!(channel.history().is_empty());

        // A fresh session may start again
        channel.set(ReplayStatus::Preparing);
        assert_eq!(channel.get(), ReplayStatus::Preparing);
    }

    #[test]
    fn test_writes_are_visible_across_threads() {
        let channel = Arc::new(StatusChannel::new());
        let writer = Arc::clone(&channel);

        thread::spawn(move || {
            writer.set(ReplayStatus::Preparing);
            writer.set(ReplayStatus::Replaying);
        })
        .join()
        .unwrap();

        assert_eq!(channel.get(), ReplayStatus::Replaying);
    }

    #[test]
    fn test_transition_timestamps_are_monotonic() {
        let channel = StatusChannel::new();
        channel.set(ReplayStatus::Preparing);
        channel.set(ReplayStatus::Replaying);

        let history = channel.history();
        assert!(history[0].at <= history[1].at);
    }
}

//! Bounded, cancelable polling used by the verifier thread

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::error::{HarnessError, HarnessResult};
use super::status::StatusChannel;

const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Cancellation shared by every wait of one session.
///
/// Cancelling drops the sender, which disconnects the channel: every parked
/// `recv_timeout` wakes at once, and every later one returns immediately.
pub struct CancelToken {
    sender: Mutex<Option<Sender<()>>>,
    receiver: Receiver<()>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (sender, receiver) = crossbeam_channel::bounded(0);
        Self {
            sender: Mutex::new(Some(sender)),
            receiver,
        }
    }

    pub fn cancel(&self) {
        self.sender.lock().take();
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.receiver.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Sleep for `duration` unless cancelled first. Returns false when cancelled.
    pub fn sleep(&self, duration: Duration) -> bool {
        match self.receiver.recv_timeout(duration) {
            Err(RecvTimeoutError::Disconnected) => false,
            Err(RecvTimeoutError::Timeout) | Ok(()) => true,
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// What a successful wait cost
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitStats {
    /// Predicate evaluations, including the first one
    pub checks: u32,
    pub elapsed: Duration,
}

/// Blocks the calling thread until a predicate holds, the timeout expires, or
/// the session is cancelled.
#[derive(Clone)]
pub struct PollingWaiter {
    interval: Duration,
    timeout: Duration,
    status: Arc<StatusChannel>,
    cancel: Arc<CancelToken>,
}

impl PollingWaiter {
    pub fn new(
        interval: Duration,
        timeout: Duration,
        status: Arc<StatusChannel>,
        cancel: Arc<CancelToken>,
    ) -> Self {
        Self {
            interval: interval.max(MIN_INTERVAL),
            timeout,
            status,
            cancel,
        }
    }

    /// Same waiter with a different timeout
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Self {
            timeout,
            ..self.clone()
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Upper bound on re-checks after the first evaluation: ceil(timeout / interval)
    pub fn max_rechecks(&self) -> u32 {
        let interval = self.interval.as_nanos();
        let rechecks = self.timeout.as_nanos().div_ceil(interval);
        u32::try_from(rechecks).unwrap_or(u32::MAX)
    }

    /// Wait until `predicate` returns true.
    ///
    /// `condition` names what is being waited for and is carried by the
    /// timeout and cancellation errors.
    pub fn wait_until<F>(&self, condition: &str, mut predicate: F) -> HarnessResult<WaitStats>
    where
        F: FnMut() -> bool,
    {
        let started = Instant::now();
        let deadline = started + self.timeout;
        let max_rechecks = self.max_rechecks();
        let mut rechecks = 0u32;

        loop {
            if predicate() {
                return Ok(WaitStats {
                    checks: rechecks + 1,
                    elapsed: started.elapsed(),
                });
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if rechecks >= max_rechecks || remaining.is_zero() {
                return Err(HarnessError::PredicateTimeout {
                    condition: condition.to_string(),
                    elapsed: started.elapsed(),
                    checks: rechecks + 1,
                    last_status: self.status.get(),
                });
            }

            if !self.cancel.sleep(self.interval.min(remaining)) {
                return Err(HarnessError::Cancelled {
                    condition: condition.to_string(),
                    elapsed: started.elapsed(),
                    last_status: self.status.get(),
                });
            }
            rechecks += 1;
        }
    }
}

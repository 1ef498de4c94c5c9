//! Harness error taxonomy and checkpoint assertions

use std::fmt;
use std::time::Duration;
use thiserror::Error;

use super::status::ReplayStatus;

/// Result alias used throughout the harness
pub type HarnessResult<T> = Result<T, HarnessError>;

/// Step of the host lifecycle a failure happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleStage {
    Spawn,
    Build,
    Initialize,
    MainMenu,
    ResolveSession,
    LoadSession,
    TickLoop,
    Cleanup,
}

impl fmt::Display for LifecycleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleStage::Spawn => "spawn",
            LifecycleStage::Build => "build",
            LifecycleStage::Initialize => "initialize",
            LifecycleStage::MainMenu => "main menu",
            LifecycleStage::ResolveSession => "session lookup",
            LifecycleStage::LoadSession => "session load",
            LifecycleStage::TickLoop => "tick loop",
            LifecycleStage::Cleanup => "cleanup",
        };
        write!(f, "{}", name)
    }
}

/// Error when a checkpoint assertion fails
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionError {
    pub message: String,
    pub expected: String,
    pub actual: String,
}

impl AssertionError {
    pub fn new(message: impl Into<String>, expected: impl fmt::Debug, actual: impl fmt::Debug) -> Self {
        Self {
            message: message.into(),
            expected: format!("{:?}", expected),
            actual: format!("{:?}", actual),
        }
    }
}

impl fmt::Display for AssertionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\n    Expected: {}\n    Actual: {}",
            self.message, self.expected, self.actual
        )
    }
}

impl std::error::Error for AssertionError {}

/// Check that `actual` equals `expected`
pub fn check_eq<T: PartialEq + fmt::Debug>(
    message: &str,
    expected: T,
    actual: T,
) -> Result<(), AssertionError> {
    if expected == actual {
        Ok(())
    } else {
        Err(AssertionError::new(message, expected, actual))
    }
}

/// Check that `actual` differs from `unexpected`
pub fn check_ne<T: PartialEq + fmt::Debug>(
    message: &str,
    unexpected: T,
    actual: T,
) -> Result<(), AssertionError> {
    if unexpected != actual {
        Ok(())
    } else {
        Err(AssertionError {
            message: message.to_string(),
            expected: format!("anything but {:?}", unexpected),
            actual: format!("{:?}", actual),
        })
    }
}

/// Failures surfaced by a replay test
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("no recording found with title '{title}'")]
    SessionNotFound { title: String },

    #[error(
        "timed out waiting for {condition} after {elapsed:?} ({checks} checks, last status: {last_status})"
    )]
    PredicateTimeout {
        condition: String,
        elapsed: Duration,
        checks: u32,
        last_status: ReplayStatus,
    },

    #[error("wait for {condition} cancelled after {elapsed:?} (last status: {last_status})")]
    Cancelled {
        condition: String,
        elapsed: Duration,
        last_status: ReplayStatus,
    },

    #[error("host failed during {stage} after {elapsed:?} (last status: {last_status}): {message}")]
    HostLifecycleFailure {
        stage: LifecycleStage,
        message: String,
        elapsed: Duration,
        last_status: ReplayStatus,
    },

    #[error("worker thread '{name}' failed: {message}")]
    WorkerFailed { name: String, message: String },

    #[error("a replay session is already running on this harness")]
    AlreadyRunning,

    #[error("checkpoint failed: {0}")]
    Assertion(#[from] AssertionError),

    #[error("{hook} failed after {elapsed:?} (last status: {last_status}): {source}")]
    Checkpoint {
        hook: &'static str,
        elapsed: Duration,
        last_status: ReplayStatus,
        source: Box<HarnessError>,
    },

    #[error("{primary}; teardown also failed: {secondary}")]
    Teardown {
        primary: Box<HarnessError>,
        secondary: Box<HarnessError>,
    },
}

impl HarnessError {
    /// Merge a run outcome with the outcome of the teardown that followed it.
    ///
    /// A teardown failure never hides the run failure; when both fail, both are kept.
    pub fn combine<T, U>(run: HarnessResult<T>, teardown: HarnessResult<U>) -> HarnessResult<(T, U)> {
        match (run, teardown) {
            (Ok(value), Ok(report)) => Ok((value, report)),
            (Err(primary), Ok(_)) => Err(primary),
            (Ok(_), Err(secondary)) => Err(secondary),
            (Err(primary), Err(secondary)) => Err(HarnessError::Teardown {
                primary: Box::new(primary),
                secondary: Box::new(secondary),
            }),
        }
    }

    /// Attach the hook name, elapsed time and last status to a hook failure.
    ///
    /// Failures that already carry elapsed time and status are returned as is.
    pub fn at_checkpoint(self, hook: &'static str, elapsed: Duration, last_status: ReplayStatus) -> Self {
        match self {
            HarnessError::PredicateTimeout { .. }
            | HarnessError::Cancelled { .. }
            | HarnessError::HostLifecycleFailure { .. }
            | HarnessError::Checkpoint { .. } => self,
            other => HarnessError::Checkpoint {
                hook,
                elapsed,
                last_status,
                source: Box::new(other),
            },
        }
    }

    /// The failed assertion behind this error, if any
    pub fn assertion(&self) -> Option<&AssertionError> {
        match self {
            HarnessError::Assertion(assertion) => Some(assertion),
            HarnessError::Checkpoint { source, .. } => source.assertion(),
            HarnessError::Teardown { primary, .. } => primary.assertion(),
            _ => None,
        }
    }

    /// Did the verifier give up waiting (as opposed to a host or assertion failure)?
    pub fn is_timeout(&self) -> bool {
        matches!(self, HarnessError::PredicateTimeout { .. })
    }
}

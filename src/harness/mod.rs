//! Deterministic replay-test harness
//!
//! A host runs a recorded session on a background controller thread while the
//! calling thread waits on the shared [`ReplayStatus`] and asserts on the
//! host's view at fixed checkpoints.

pub mod acceptance;
pub mod config;
pub mod controller;
pub mod engine_thread;
pub mod error;
pub mod replay;
pub mod report;
pub mod status;
pub mod waiter;
pub mod worker;

#[cfg(test)]
pub(crate) mod fake;

pub use acceptance::{AcceptanceHarness, AcceptanceTest};
pub use config::{ConfigError, HarnessConfig, REPLAY_SETTINGS_FILE, REPLAY_SETTINGS_TEMPLATE};
pub use controller::{HostLifecycleController, SessionRequest, StopSignal};
pub use engine_thread::{EngineThread, EngineThreadBound};
pub use error::{
    AssertionError, HarnessError, HarnessResult, LifecycleStage, check_eq, check_ne,
};
pub use replay::{Checkpoint, HarnessHandle, HarnessPhase, ReplayHarness, ReplayScenario};
pub use report::SessionReport;
pub use status::{ReplayStatus, StatusChannel, StatusTransition};
pub use waiter::{CancelToken, PollingWaiter, WaitStats};
pub use worker::Worker;

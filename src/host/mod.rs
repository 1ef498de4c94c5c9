//! Lifecycle interface of the simulation host
//!
//! The replay controller only ever talks to an engine through these traits:
//! a [`HostBuilder`] creates the host on the controller's thread, and the
//! [`Host`] is then driven through initialize, main menu, session load, the
//! tick loop and cleanup.

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::constants::{DEFAULT_PLAYBACK_SPEED, DEFAULT_TICK_RATE};
use crate::harness::EngineThread;
use crate::recording::{RecordingError, SessionDescriptor};

/// Which subsystem set the host is built with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    #[default]
    Headless,
    Headed,
}

impl Backend {
    pub fn from_headless(headless: bool) -> Self {
        if headless {
            Backend::Headless
        } else {
            Backend::Headed
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Headless => write!(f, "headless"),
            Backend::Headed => write!(f, "headed"),
        }
    }
}

/// Everything a builder needs to create one host
#[derive(Debug, Clone)]
pub struct HostConfig {
    pub backend: Backend,
    /// Ticks per second of real time. Zero or less runs unpaced.
    pub tick_rate: f32,
    /// Recorded milliseconds advanced per real millisecond
    pub playback_speed: f32,
    /// Affinity scope the host must be initialized on
    pub engine_thread: EngineThread,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Headless,
            tick_rate: DEFAULT_TICK_RATE,
            playback_speed: DEFAULT_PLAYBACK_SPEED,
            engine_thread: EngineThread::new(),
        }
    }
}

/// Requested host state
#[derive(Debug, Clone)]
pub enum HostState {
    MainMenu,
    LoadSession(SessionDescriptor),
}

/// Externally visible status of a host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostStatus {
    Built,
    Initialized,
    MainMenu,
    /// Session accepted, world still streaming in
    Loading,
    InGame,
    /// Recording exhausted
    Finished,
    CleanedUp,
    ShutDown,
}

impl HostStatus {
    /// Has `initialize` completed (and the host not yet been torn down)?
    pub fn is_initialized(self) -> bool {
        !matches!(
            self,
            HostStatus::Built | HostStatus::CleanedUp | HostStatus::ShutDown
        )
    }
}

/// Failures reported by a host or its builder
#[derive(Debug, Error)]
pub enum HostError {
    #[error("host has not been initialized")]
    NotInitialized,

    #[error("cannot enter {requested} while {current:?}")]
    InvalidTransition {
        current: HostStatus,
        requested: &'static str,
    },

    #[error("host has been shut down")]
    ShutDown,

    #[error("host must be driven from its engine thread")]
    WrongThread,

    #[error("recording failed to load: {0}")]
    Recording(#[from] RecordingError),

    #[error("host setup failed: {0}")]
    Setup(String),
}

/// A simulation host driven by the replay controller.
///
/// A host is created and used on a single thread, so it need not be `Send`.
/// The only state shared with other threads is its [`Host::View`].
pub trait Host: 'static {
    /// Read-only observation surface handed to checkpoints
    type View: Send + Sync + 'static;

    fn initialize(&mut self) -> Result<(), HostError>;

    /// Ask the host to enter `state`. Returns once the host has accepted it.
    fn change_state(&mut self, state: HostState) -> Result<(), HostError>;

    /// Advance one step. Returns `false` once the session has run to completion.
    fn tick(&mut self) -> Result<bool, HostError>;

    fn status(&self) -> HostStatus;

    /// Release session resources. Safe to call more than once.
    fn cleanup(&mut self);

    /// Release everything. Safe to call more than once, and after a failed initialize.
    fn shutdown(&mut self);

    fn view(&self) -> Arc<Self::View>;
}

/// Creates hosts on the controller thread
pub trait HostBuilder: Send + Sync + 'static {
    type Host: Host;

    fn build(&self, config: &HostConfig) -> Result<Self::Host, HostError>;
}

/// The view type exposed by a builder's hosts
pub type ViewOf<B> = <<B as HostBuilder>::Host as Host>::View;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_from_flag() {
        assert_eq!(Backend::from_headless(true), Backend::Headless);
        assert_eq!(Backend::from_headless(false), Backend::Headed);
        assert_eq!(Backend::Headed.to_string(), "headed");
    }

    #[test]
    fn test_initialized_statuses() {
        assert!(!HostStatus::Built.is_initialized());
        assert!(HostStatus::Initialized.is_initialized());
        assert!(HostStatus::InGame.is_initialized());
        assert!(HostStatus::Finished.is_initialized());
        assert!(!HostStatus::CleanedUp.is_initialized());
        assert!(!HostStatus::ShutDown.is_initialized());
    }
}

//! Blockreplay - deterministic replay tests for a Bevy voxel host
//!
//! A recorded session is replayed on a background controller thread while the
//! test thread waits on the session status and asserts on the host's world
//! view at checkpoints.

// Core modules
pub mod constants;
pub mod harness;
pub mod host;
pub mod recording;

// Reference host and built-in scenarios
pub mod scenarios;
pub mod simulation;

// Re-export commonly used types for convenience
pub use constants::*;
pub use harness::{
    AcceptanceHarness, AcceptanceTest, Checkpoint, HarnessConfig, HarnessError, HarnessHandle,
    HarnessResult, ReplayHarness, ReplayScenario, ReplayStatus, SessionReport, StatusChannel,
};
pub use host::{Backend, Host, HostBuilder, HostConfig, HostError, HostState, HostStatus};
pub use recording::{
    Block, DirectoryLibrary, MemoryLibrary, RecordedAction, RecordedEvent, Recording,
    RecordingError, SessionDescriptor, SessionLibrary,
};
pub use scenarios::{ScenarioContext, ScenarioDef, ScenarioResult};
pub use simulation::{ReplayHost, ReplayHostBuilder, WorldView};

//! Reference replay host - a headless voxel world driven by recorded sessions
//!
//! The host streams the chunks around the session's spawn point, spawns the
//! local player and then applies recorded events on a fixed playback clock.
//! Checkpoints observe it through the shared [`WorldView`].

pub mod app_builder;
pub mod host;
pub mod playback;
pub mod player;
pub mod world;

pub use app_builder::HostAppBuilder;
pub use host::{ReplayHost, ReplayHostBuilder};
pub use playback::{ActiveSession, HostMode, PlaybackState, SharedWorld};
pub use player::{Health, LocalPlayer, Location};
pub use world::{PlayerSnapshot, Terrain, WorldView, cell_at, chunk_of, chunks_around};

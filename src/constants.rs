//! Tunable constants for blockreplay
//!
//! Harness timing defaults and world/playback values are defined here for easy tweaking.

// =============================================================================
// HARNESS TIMING
// =============================================================================

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10;
pub const DEFAULT_START_TIMEOUT_MS: u64 = 30_000; // Build + initialize + load
pub const DEFAULT_CHECKPOINT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_FINISH_TIMEOUT_MS: u64 = 120_000;

/// Name given to the background thread that owns the host
pub const HOST_THREAD_NAME: &str = "replay-host";

// =============================================================================
// HOST PACING
// =============================================================================

pub const DEFAULT_TICK_RATE: f32 = 60.0; // Ticks per second
pub const DEFAULT_PLAYBACK_SPEED: f32 = 1.0;

// =============================================================================
// RECORDING STORE
// =============================================================================

pub const DEFAULT_RECORDINGS_DIR: &str = "recordings";
pub const MANIFEST_FILE: &str = "manifest.toml";
pub const EVENTS_FILE: &str = "events.evlog";

// =============================================================================
// WORLD
// =============================================================================

pub const CHUNK_SIZE: i32 = 16;
pub const CHUNK_LOAD_RADIUS: i32 = 1; // Chunks around the spawn chunk, per axis
pub const CHUNKS_PER_TICK: usize = 9;
pub const DEFAULT_SURFACE_HEIGHT: i32 = -1;
pub const DIRT_DEPTH: i32 = 3; // Dirt layers under the grass surface
pub const COAL_ORE_CHANCE: u32 = 24; // 1 in N stone cells

// =============================================================================
// PLAYER
// =============================================================================

pub const PLAYER_MAX_HEALTH: i32 = 20;

//! Recorded sessions and the title lookup used by the replay controller
//!
//! A recording is a folder holding a `manifest.toml` (title, seed, spawn point
//! and world settings) and an `events.evlog` with the time-ordered events.

pub mod data;
pub mod format;
pub mod library;

pub use data::{Block, RecordedAction, RecordedEvent, Recording};
pub use format::{parse_line, parse_recording, serialize_event, serialize_recording};
pub use library::{DirectoryLibrary, MemoryLibrary};

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::constants::DEFAULT_SURFACE_HEIGHT;

/// Failures while reading or decoding a recording
#[derive(Debug, Error)]
pub enum RecordingError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid manifest {path}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("event {index} at {time_ms}ms is earlier than the previous event at {previous_ms}ms")]
    OutOfOrder {
        index: usize,
        previous_ms: u32,
        time_ms: u32,
    },
}

fn default_surface() -> i32 {
    DEFAULT_SURFACE_HEIGHT
}

/// A block placed over generated terrain before the session starts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureDef {
    pub cell: [i32; 3],
    pub block: Block,
}

/// World generation settings of a recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSettings {
    /// Y of the grass layer
    #[serde(default = "default_surface")]
    pub surface: i32,
    #[serde(default)]
    pub features: Vec<FeatureDef>,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            surface: DEFAULT_SURFACE_HEIGHT,
            features: Vec::new(),
        }
    }
}

/// Contents of `manifest.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub title: String,
    pub seed: u64,
    pub spawn: [f32; 3],
    #[serde(default)]
    pub world: WorldSettings,
}

impl Manifest {
    pub fn from_file(path: &Path) -> Result<Self, RecordingError> {
        let content = fs::read_to_string(path).map_err(|source| RecordingError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| RecordingError::Manifest {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Where the events of a session come from
#[derive(Debug, Clone)]
pub enum RecordingSource {
    /// An `events.evlog` on disk, read when the session loads
    File(PathBuf),
    /// Events already in memory
    Inline(Arc<Recording>),
}

/// A recorded session resolved by title.
///
/// Produced by a [`SessionLibrary`] once per replay and consumed by the
/// host's load step.
#[derive(Debug, Clone)]
pub struct SessionDescriptor {
    pub title: String,
    pub seed: u64,
    pub manifest: Manifest,
    pub source: RecordingSource,
}

impl SessionDescriptor {
    pub fn from_manifest(manifest: Manifest, source: RecordingSource) -> Self {
        Self {
            title: manifest.title.clone(),
            seed: manifest.seed,
            manifest,
            source,
        }
    }

    /// Read and decode the session's events
    pub fn load(&self) -> Result<Arc<Recording>, RecordingError> {
        match &self.source {
            RecordingSource::Inline(recording) => Ok(Arc::clone(recording)),
            RecordingSource::File(path) => {
                let content = fs::read_to_string(path).map_err(|source| RecordingError::Io {
                    path: path.clone(),
                    source,
                })?;
                parse_recording(&content).map(Arc::new)
            }
        }
    }
}

/// Lookup of recorded sessions by title
pub trait SessionLibrary: Send + Sync {
    /// Find the session with exactly this title
    fn resolve(&self, title: &str) -> Option<SessionDescriptor>;

    /// All titles the library can resolve, sorted
    fn titles(&self) -> Vec<String>;
}

impl<L: SessionLibrary + ?Sized> SessionLibrary for Arc<L> {
    fn resolve(&self, title: &str) -> Option<SessionDescriptor> {
        (**self).resolve(title)
    }

    fn titles(&self) -> Vec<String> {
        (**self).titles()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_defaults() {
        let manifest: Manifest = toml::from_str(
            r#"
title = "Example"
seed = 42
spawn = [0.0, 0.40999973, 0.0]
"#,
        )
        .unwrap();
        assert_eq!(manifest.world.surface, DEFAULT_SURFACE_HEIGHT);
        assert!(manifest.world.features.is_empty());
    }

    #[test]
    fn test_manifest_with_features() {
        let manifest: Manifest = toml::from_str(
            r#"
title = "Woodcut"
seed = 7
spawn = [31.5, 85.0, -121.5]

[world]
surface = 84

[[world.features]]
cell = [33, 85, -122]
block = "Oak Log"
"#,
        )
        .unwrap();
        assert_eq!(manifest.world.surface, 84);
        assert_eq!(manifest.world.features[0].block, Block::OakLog);
        assert_eq!(manifest.world.features[0].cell, [33, 85, -122]);
    }

    #[test]
    fn test_missing_event_log_is_io_error() {
        let manifest: Manifest = toml::from_str("title = \"X\"\nseed = 1\nspawn = [0.0, 0.0, 0.0]").unwrap();
        let descriptor = SessionDescriptor::from_manifest(
            manifest,
            RecordingSource::File(PathBuf::from("/nonexistent/events.evlog")),
        );
        assert!(matches!(descriptor.load(), Err(RecordingError::Io { .. })));
    }
}

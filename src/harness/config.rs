//! Harness configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use super::engine_thread::EngineThread;
use crate::constants::*;
use crate::host::{Backend, HostConfig};

/// Template replay settings (checked into git)
pub const REPLAY_SETTINGS_TEMPLATE: &str = "config/replay_settings.template.json";
/// Local replay settings (gitignored, user's custom settings)
pub const REPLAY_SETTINGS_FILE: &str = "config/replay_settings.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid setting {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Timing, storage and host settings for replay tests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Re-check interval of every bounded wait
    pub poll_interval_ms: u64,
    /// Bound on reaching REPLAYING with an initialized host
    pub start_timeout_ms: u64,
    /// Default bound for waits issued by checkpoints
    pub checkpoint_timeout_ms: u64,
    /// Bound on reaching FINISHED
    pub finish_timeout_ms: u64,
    /// Root of the recording store
    pub recordings_dir: PathBuf,
    /// Backend used when a test does not choose one
    pub headless: bool,
    /// Host ticks per second (0 = unpaced)
    pub tick_rate: f32,
    /// Recorded time advanced per real time
    pub playback_speed: f32,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            start_timeout_ms: DEFAULT_START_TIMEOUT_MS,
            checkpoint_timeout_ms: DEFAULT_CHECKPOINT_TIMEOUT_MS,
            finish_timeout_ms: DEFAULT_FINISH_TIMEOUT_MS,
            recordings_dir: PathBuf::from(DEFAULT_RECORDINGS_DIR),
            headless: true,
            tick_rate: DEFAULT_TICK_RATE,
            playback_speed: DEFAULT_PLAYBACK_SPEED,
        }
    }
}

impl HarnessConfig {
    /// Load configuration from a JSON settings file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        let config: Self = serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default config files
    /// Priority: local settings > template settings > built-in defaults
    pub fn from_config_files() -> Self {
        if let Ok(config) = Self::from_file(REPLAY_SETTINGS_FILE) {
            return config;
        }
        if let Ok(config) = Self::from_file(REPLAY_SETTINGS_TEMPLATE) {
            return config;
        }
        Self::default()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "poll_interval_ms",
                reason: "must be at least 1".to_string(),
            });
        }
        if !(self.playback_speed.is_finite() && self.playback_speed > 0.0) {
            return Err(ConfigError::Invalid {
                field: "playback_speed",
                reason: format!("must be positive, got {}", self.playback_speed),
            });
        }
        if !self.tick_rate.is_finite() || self.tick_rate < 0.0 {
            return Err(ConfigError::Invalid {
                field: "tick_rate",
                reason: format!("must be zero or positive, got {}", self.tick_rate),
            });
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn start_timeout(&self) -> Duration {
        Duration::from_millis(self.start_timeout_ms)
    }

    pub fn checkpoint_timeout(&self) -> Duration {
        Duration::from_millis(self.checkpoint_timeout_ms)
    }

    pub fn finish_timeout(&self) -> Duration {
        Duration::from_millis(self.finish_timeout_ms)
    }

    /// Apply the runner's `--headed` flag. Without it the file's `headless` stands.
    pub fn with_headed_flag(mut self, headed: bool) -> Self {
        if headed {
            self.headless = false;
        }
        self
    }

    /// Host settings for one session
    pub fn host_config(&self, headless: bool, engine_thread: EngineThread) -> HostConfig {
        HostConfig {
            backend: Backend::from_headless(headless),
            tick_rate: self.tick_rate,
            playback_speed: self.playback_speed,
            engine_thread,
        }
    }
}

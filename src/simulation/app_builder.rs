//! Host App Builder
//!
//! Composes the Bevy app behind a replay host. Both backends start from
//! `MinimalPlugins`; the headed backend adds the frame-time diagnostics set.

use bevy::app::ScheduleRunnerPlugin;
use bevy::diagnostic::{
    DiagnosticsPlugin, DiagnosticsStore, FrameCount, FrameTimeDiagnosticsPlugin,
};
use bevy::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::constants::DEFAULT_TICK_RATE;
use crate::host::Backend;

use super::playback::{
    HostMode, SharedWorld, advance_playback, in_game, publish_view, session_loading, stream_chunks,
};
use super::world::WorldView;

/// Frames between frame-time log lines on the headed backend
const FRAME_TIME_LOG_INTERVAL: u32 = 120;

/// Builder for the app a replay host drives
pub struct HostAppBuilder {
    backend: Backend,
    tick_rate: f32,
    minimal_threads: bool,
    view: Option<Arc<WorldView>>,
}

impl HostAppBuilder {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            tick_rate: DEFAULT_TICK_RATE,
            minimal_threads: false,
            view: None,
        }
    }

    /// Set the target tick rate (default: 60)
    pub fn with_tick_rate(mut self, tick_rate: f32) -> Self {
        self.tick_rate = tick_rate;
        self
    }

    /// Enable minimal thread mode (task pools = 1)
    ///
    /// Use this when running many hosts in parallel to avoid hitting OS thread limits.
    pub fn with_minimal_threads(mut self) -> Self {
        self.minimal_threads = true;
        self
    }

    /// Publish into an existing view instead of a fresh one
    pub fn with_view(mut self, view: Arc<WorldView>) -> Self {
        self.view = Some(view);
        self
    }

    /// Build the app.
    ///
    /// The returned app has:
    /// - MinimalPlugins (the schedule runner is configured but the host calls `update` itself)
    /// - `SharedWorld` and `HostMode::Boot`
    /// - chunk streaming, playback and view publishing systems, chained in that order
    /// - frame-time diagnostics on the headed backend
    pub fn build(self) -> App {
        let mut app = App::new();

        let frame = if self.tick_rate > 0.0 {
            Duration::from_secs_f32(1.0 / self.tick_rate)
        } else {
            Duration::ZERO
        };

        if self.minimal_threads {
            app.add_plugins(
                MinimalPlugins
                    .set(ScheduleRunnerPlugin::run_loop(frame))
                    .set(TaskPoolPlugin {
                        task_pool_options: TaskPoolOptions::with_num_threads(1),
                    }),
            );
        } else {
            app.add_plugins(MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(frame)));
        }

        let view = self.view.unwrap_or_default();
        app.insert_resource(SharedWorld(view));
        app.init_resource::<HostMode>();

        app.add_systems(
            Update,
            (
                stream_chunks.run_if(session_loading),
                advance_playback.run_if(in_game),
                publish_view,
            )
                .chain(),
        );

        if self.backend == Backend::Headed {
            app.add_plugins((DiagnosticsPlugin, FrameTimeDiagnosticsPlugin::default()));
            app.add_systems(Last, log_frame_time);
        }

        app
    }
}

/// Periodic frame-time line for headed runs
fn log_frame_time(diagnostics: Res<DiagnosticsStore>, frames: Res<FrameCount>) {
    if frames.0 == 0 || frames.0 % FRAME_TIME_LOG_INTERVAL != 0 {
        return;
    }
    if let Some(fps) = diagnostics
        .get(&FrameTimeDiagnosticsPlugin::FPS)
        .and_then(|d| d.smoothed())
    {
        debug!("frame {}: {:.1} fps", frames.0, fps);
    }
}

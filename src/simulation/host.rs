//! Bevy replay host
//!
//! Implements the [`Host`] lifecycle over a manually updated Bevy `App`. The
//! app is created in `initialize` on the engine thread and dropped in
//! `shutdown`; the [`WorldView`] stays alive for the verifier.

use bevy::prelude::*;
use std::collections::VecDeque;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::constants::CHUNK_LOAD_RADIUS;
use crate::host::{Host, HostBuilder, HostConfig, HostError, HostState, HostStatus};
use crate::recording::SessionDescriptor;

use super::app_builder::HostAppBuilder;
use super::playback::{ActiveSession, HostMode, PlaybackState};
use super::player::LocalPlayer;
use super::world::{Terrain, WorldView, chunks_around};

/// Builds [`ReplayHost`]s
#[derive(Debug, Clone, Default)]
pub struct ReplayHostBuilder {
    minimal_threads: bool,
}

impl ReplayHostBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// One task-pool thread per host, for running many hosts side by side
    pub fn with_minimal_threads(mut self) -> Self {
        self.minimal_threads = true;
        self
    }
}

impl HostBuilder for ReplayHostBuilder {
    type Host = ReplayHost;

    fn build(&self, config: &HostConfig) -> Result<ReplayHost, HostError> {
        if !(config.playback_speed.is_finite() && config.playback_speed > 0.0) {
            return Err(HostError::Setup(format!(
                "playback speed must be positive, got {}",
                config.playback_speed
            )));
        }
        Ok(ReplayHost::new(config.clone(), self.minimal_threads))
    }
}

pub struct ReplayHost {
    config: HostConfig,
    minimal_threads: bool,
    app: Option<App>,
    view: Arc<WorldView>,
    status: HostStatus,
    frame: Option<Duration>,
    next_tick: Option<Instant>,
}

impl ReplayHost {
    fn new(config: HostConfig, minimal_threads: bool) -> Self {
        let frame = (config.tick_rate > 0.0).then(|| Duration::from_secs_f32(1.0 / config.tick_rate));
        Self {
            config,
            minimal_threads,
            app: None,
            view: Arc::new(WorldView::new()),
            status: HostStatus::Built,
            frame,
            next_tick: None,
        }
    }

    fn app_mut(&mut self) -> Result<&mut App, HostError> {
        match self.status {
            HostStatus::ShutDown => Err(HostError::ShutDown),
            _ => self.app.as_mut().ok_or(HostError::NotInitialized),
        }
    }

    /// Hold the tick rate in real time
    fn pace(&mut self) {
        let Some(frame) = self.frame else {
            return;
        };
        let now = Instant::now();
        let deadline = self.next_tick.unwrap_or(now);
        if deadline > now {
            thread::sleep(deadline - now);
        }
        self.next_tick = Some(deadline.max(now) + frame);
    }

    fn load_session(&mut self, session: SessionDescriptor) -> Result<(), HostError> {
        let recording = session.load()?;
        let spawn = Vec3::from_array(session.manifest.spawn);
        let chunks: VecDeque<IVec3> = chunks_around(spawn, CHUNK_LOAD_RADIUS).into();

        self.view.begin_session(Terrain::from_manifest(&session.manifest));
        info!(
            "Loading '{}': {} events, {} chunks around {}",
            session.title,
            recording.len(),
            chunks.len(),
            spawn
        );

        let playback = PlaybackState::new(self.config.tick_rate, self.config.playback_speed);
        let app = self.app_mut()?;
        app.insert_resource(ActiveSession {
            title: session.title,
            recording,
            spawn,
            pending_chunks: chunks,
        });
        app.insert_resource(playback);
        app.insert_resource(HostMode::Loading);
        self.status = HostStatus::Loading;
        Ok(())
    }
}

impl Host for ReplayHost {
    type View = WorldView;

    fn initialize(&mut self) -> Result<(), HostError> {
        if !self.config.engine_thread.is_current() {
            return Err(HostError::WrongThread);
        }
        if self.status != HostStatus::Built {
            return Err(HostError::InvalidTransition {
                current: self.status,
                requested: "initialized",
            });
        }

        let mut builder = HostAppBuilder::new(self.config.backend)
            .with_tick_rate(self.config.tick_rate)
            .with_view(Arc::clone(&self.view));
        if self.minimal_threads {
            builder = builder.with_minimal_threads();
        }
        let mut app = builder.build();
        app.finish();
        app.cleanup();

        self.app = Some(app);
        self.status = HostStatus::Initialized;
        debug!("Replay host initialized ({})", self.config.backend);
        Ok(())
    }

    fn change_state(&mut self, state: HostState) -> Result<(), HostError> {
        match state {
            HostState::MainMenu => {
                self.app_mut()?.insert_resource(HostMode::MainMenu);
                self.status = HostStatus::MainMenu;
                Ok(())
            }
            HostState::LoadSession(session) => {
                if self.status != HostStatus::MainMenu {
                    return Err(HostError::InvalidTransition {
                        current: self.status,
                        requested: "session load",
                    });
                }
                self.load_session(session)
            }
        }
    }

    fn tick(&mut self) -> Result<bool, HostError> {
        self.app_mut()?;
        self.pace();

        let app = self.app_mut()?;
        app.update();
        let mode = *app.world().resource::<HostMode>();

        self.status = match (self.status, mode) {
            (_, HostMode::Loading) => HostStatus::Loading,
            (_, HostMode::InGame) => HostStatus::InGame,
            (_, HostMode::Finished) => HostStatus::Finished,
            (status, _) => status,
        };
        Ok(mode != HostMode::Finished)
    }

    fn status(&self) -> HostStatus {
        self.status
    }

    fn cleanup(&mut self) {
        if matches!(self.status, HostStatus::CleanedUp | HostStatus::ShutDown) {
            return;
        }
        if let Some(app) = self.app.as_mut() {
            let world = app.world_mut();
            let players: Vec<Entity> = world
                .query_filtered::<Entity, With<LocalPlayer>>()
                .iter(world)
                .collect();
            for player in players {
                world.despawn(player);
            }
            world.remove_resource::<ActiveSession>();
            world.remove_resource::<PlaybackState>();
            world.insert_resource(HostMode::MainMenu);
        }
        self.status = HostStatus::CleanedUp;
    }

    fn shutdown(&mut self) {
        self.app = None;
        self.next_tick = None;
        self.status = HostStatus::ShutDown;
    }

    fn view(&self) -> Arc<WorldView> {
        Arc::clone(&self.view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::EngineThread;
    use crate::recording::{
        Block, Manifest, MemoryLibrary, RecordedAction, RecordedEvent, Recording, SessionLibrary,
        WorldSettings,
    };

    fn config() -> HostConfig {
        let engine_thread = EngineThread::new();
        engine_thread.bind_current().unwrap();
        HostConfig {
            tick_rate: 0.0,
            engine_thread,
            ..HostConfig::default()
        }
    }

    fn session() -> SessionDescriptor {
        let recording = Recording::new(vec![
            RecordedEvent {
                time_ms: 0,
                action: RecordedAction::Move {
                    position: Vec3::new(0.5, 0.41, 0.5),
                },
            },
            RecordedEvent {
                time_ms: 40,
                action: RecordedAction::BreakBlock {
                    cell: IVec3::new(0, -2, 0),
                },
            },
        ])
        .unwrap();
        let manifest = Manifest {
            title: "Unit".to_string(),
            seed: 5,
            spawn: [0.5, 0.41, 0.5],
            world: WorldSettings::default(),
        };
        MemoryLibrary::new()
            .with_session(manifest, recording)
            .resolve("Unit")
            .unwrap()
    }

    #[test]
    fn test_full_lifecycle() {
        let mut host = ReplayHostBuilder::new().build(&config()).unwrap();
        let view = host.view();
        assert_eq!(host.status(), HostStatus::Built);

        host.initialize().unwrap();
        host.change_state(HostState::MainMenu).unwrap();
        assert!(host.tick().unwrap());
        assert_eq!(host.status(), HostStatus::MainMenu);

        host.change_state(HostState::LoadSession(session())).unwrap();
        assert_eq!(host.status(), HostStatus::Loading);

        let mut ticks = 0;
        while host.tick().unwrap() {
            ticks += 1;
            assert!(ticks < 100, "session never finished");
        }
        assert_eq!(host.status(), HostStatus::Finished);
        assert_eq!(view.block_at(IVec3::new(0, -2, 0)), Block::Air);
        assert_eq!(view.block_at(IVec3::new(0, -3, 0)), Block::Dirt);
        assert_eq!(view.last_recorded_event_index(), Some(1));

        host.cleanup();
        host.cleanup();
        assert_eq!(host.status(), HostStatus::CleanedUp);
        host.shutdown();
        host.shutdown();
        assert_eq!(host.status(), HostStatus::ShutDown);
        assert!(matches!(host.tick(), Err(HostError::ShutDown)));

        // The view outlives the host
        assert_eq!(view.local_player().unwrap().position, Vec3::new(0.5, 0.41, 0.5));
    }

    #[test]
    fn test_initialize_off_engine_thread_fails() {
        let config = config();
        let err = thread::spawn(move || {
            let mut host = ReplayHostBuilder::new().build(&config).unwrap();
            let result = host.initialize();
            host.shutdown();
            result
        })
        .join()
        .unwrap();
        assert!(matches!(err, Err(HostError::WrongThread)));
    }

    #[test]
    fn test_load_requires_main_menu() {
        let mut host = ReplayHostBuilder::new().build(&config()).unwrap();
        assert!(matches!(
            host.change_state(HostState::MainMenu),
            Err(HostError::NotInitialized)
        ));
        host.initialize().unwrap();
        assert!(matches!(
            host.change_state(HostState::LoadSession(session())),
            Err(HostError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_shutdown_without_initialize_is_safe() {
        let mut host = ReplayHostBuilder::new().build(&config()).unwrap();
        host.cleanup();
        host.shutdown();
        assert_eq!(host.status(), HostStatus::ShutDown);
    }

    #[test]
    fn test_rejects_bad_playback_speed() {
        let config = HostConfig {
            playback_speed: 0.0,
            ..config()
        };
        assert!(ReplayHostBuilder::new().build(&config).is_err());
    }
}

//! Session resources and the systems that replay recorded events

use bevy::diagnostic::FrameCount;
use bevy::prelude::*;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info};

use crate::constants::*;
use crate::recording::{Block, RecordedAction, Recording};

use super::player::{Health, LocalPlayer, Location};
use super::world::{PlayerSnapshot, WorldView};

/// World view shared with the verifier
#[derive(Resource, Clone)]
pub struct SharedWorld(pub Arc<WorldView>);

/// Where the host is in its own lifecycle
#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HostMode {
    #[default]
    Boot,
    MainMenu,
    /// Streaming the chunks around the spawn point
    Loading,
    InGame,
    /// Every recorded event has been applied
    Finished,
}

/// The loaded session
#[derive(Resource)]
pub struct ActiveSession {
    pub title: String,
    pub recording: Arc<Recording>,
    pub spawn: Vec3,
    /// Chunks still to stream in, nearest first
    pub pending_chunks: VecDeque<IVec3>,
}

/// Playback clock
#[derive(Resource, Debug, Clone)]
pub struct PlaybackState {
    /// Recorded time reached, in milliseconds
    pub clock_ms: f64,
    /// Index of the next event to apply
    pub next_event: usize,
    /// Recorded milliseconds per frame at 1x
    pub frame_ms: f64,
    pub speed: f64,
}

impl PlaybackState {
    pub fn new(tick_rate: f32, speed: f32) -> Self {
        let rate = if tick_rate > 0.0 {
            tick_rate
        } else {
            DEFAULT_TICK_RATE
        };
        Self {
            clock_ms: 0.0,
            next_event: 0,
            frame_ms: 1000.0 / rate as f64,
            speed: speed as f64,
        }
    }
}

/// Run condition: session accepted, world still streaming
pub fn session_loading(mode: Res<HostMode>) -> bool {
    *mode == HostMode::Loading
}

/// Run condition: playback running
pub fn in_game(mode: Res<HostMode>) -> bool {
    *mode == HostMode::InGame
}

/// Stream a batch of chunks; spawn the player once all are in
pub fn stream_chunks(
    mut commands: Commands,
    session: Option<ResMut<ActiveSession>>,
    shared: Res<SharedWorld>,
    mut mode: ResMut<HostMode>,
) {
    let Some(mut session) = session else {
        return;
    };

    let take = CHUNKS_PER_TICK.min(session.pending_chunks.len());
    let batch: Vec<IVec3> = session.pending_chunks.drain(..take).collect();
    if !batch.is_empty() {
        shared.0.mark_loaded(&batch);
        debug!("Streamed {} chunks, {} pending", batch.len(), session.pending_chunks.len());
    }

    if session.pending_chunks.is_empty() {
        commands.spawn((LocalPlayer, Location(session.spawn), Health::default()));
        *mode = HostMode::InGame;
        info!("World loaded for '{}', player spawned at {}", session.title, session.spawn);
    }
}

fn apply_action(
    action: &RecordedAction,
    world: &WorldView,
    location: &mut Location,
    health: &mut Health,
) {
    match action {
        RecordedAction::Input { .. } => world.count_input(),
        RecordedAction::Move { position } => location.0 = *position,
        RecordedAction::BreakBlock { cell } => world.set_block(*cell, Block::Air),
        RecordedAction::PlaceBlock { cell, block } => world.set_block(*cell, *block),
        RecordedAction::Damage { amount } => health.damage(*amount),
    }
}

/// Advance the playback clock one frame and apply every event it passed
pub fn advance_playback(
    session: Option<Res<ActiveSession>>,
    playback: Option<ResMut<PlaybackState>>,
    shared: Res<SharedWorld>,
    mut player: Query<(&mut Location, &mut Health), With<LocalPlayer>>,
    mut mode: ResMut<HostMode>,
) {
    let (Some(session), Some(mut playback)) = (session, playback) else {
        return;
    };
    // Playback starts with the player in the world
    let Ok((mut location, mut health)) = player.single_mut() else {
        return;
    };

    let step = playback.frame_ms * playback.speed;
    playback.clock_ms += step;

    let events = &session.recording.events;
    while let Some(event) = events.get(playback.next_event) {
        if f64::from(event.time_ms) > playback.clock_ms {
            break;
        }
        apply_action(&event.action, &shared.0, &mut location, &mut health);
        shared.0.record_event(playback.next_event);
        playback.next_event += 1;
    }

    if playback.next_event >= events.len() {
        *mode = HostMode::Finished;
        info!(
            "Playback of '{}' finished: {} events over {}ms",
            session.title,
            events.len(),
            session.recording.duration_ms
        );
    }
}

/// Copy the player and frame counter into the shared view
pub fn publish_view(
    shared: Res<SharedWorld>,
    frames: Option<Res<FrameCount>>,
    player: Query<(&Location, &Health), With<LocalPlayer>>,
) {
    let snapshot = player.single().ok().map(|(location, health)| PlayerSnapshot {
        position: location.0,
        health: health.0,
    });
    let frame = frames.map(|f| u64::from(f.0)).unwrap_or(0);
    shared.0.publish(frame, snapshot);
}

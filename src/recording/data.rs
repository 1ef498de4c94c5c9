//! Recorded session data shared by the loader and the replay host.

use bevy::math::{IVec3, Vec3};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::RecordingError;

/// Block kinds a cell can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Block {
    /// Cell in a chunk that has not been streamed in yet.
    Unloaded,
    Air,
    Grass,
    Dirt,
    Stone,
    #[serde(rename = "Coal Ore")]
    CoalOre,
    #[serde(rename = "Oak Log")]
    OakLog,
    #[serde(rename = "Tall Grass")]
    TallGrass,
}

impl Block {
    /// Human-readable block name, as used in recordings and checkpoints.
    pub fn display_name(self) -> &'static str {
        match self {
            Block::Unloaded => "Unloaded",
            Block::Air => "Air",
            Block::Grass => "Grass",
            Block::Dirt => "Dirt",
            Block::Stone => "Stone",
            Block::CoalOre => "Coal Ore",
            Block::OakLog => "Oak Log",
            Block::TallGrass => "Tall Grass",
        }
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Block {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Air" => Ok(Block::Air),
            "Grass" => Ok(Block::Grass),
            "Dirt" => Ok(Block::Dirt),
            "Stone" => Ok(Block::Stone),
            "Coal Ore" => Ok(Block::CoalOre),
            "Oak Log" => Ok(Block::OakLog),
            "Tall Grass" => Ok(Block::TallGrass),
            other => Err(format!("unknown block '{}'", other)),
        }
    }
}

/// What happened at one recorded instant.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedAction {
    /// Raw key transition. Only counted; movement is carried by `Move`.
    Input { key: String, pressed: bool },
    /// Local player moved to an absolute location.
    Move { position: Vec3 },
    /// Block destroyed, leaving air.
    BreakBlock { cell: IVec3 },
    /// Block placed.
    PlaceBlock { cell: IVec3, block: Block },
    /// Damage dealt to the local player.
    Damage { amount: i32 },
}

impl RecordedAction {
    /// 2-char code used in the event log.
    pub fn type_code(&self) -> &'static str {
        match self {
            RecordedAction::Input { .. } => "IN",
            RecordedAction::Move { .. } => "MV",
            RecordedAction::BreakBlock { .. } => "BB",
            RecordedAction::PlaceBlock { .. } => "BP",
            RecordedAction::Damage { .. } => "DM",
        }
    }
}

/// A timed recorded action.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    /// Time in milliseconds from the start of the recording.
    pub time_ms: u32,
    pub action: RecordedAction,
}

/// Complete event stream of one recording.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recording {
    pub events: Vec<RecordedEvent>,
    /// Time of the last event in milliseconds.
    pub duration_ms: u32,
}

impl Recording {
    /// Build from events, which must already be in time order.
    pub fn new(events: Vec<RecordedEvent>) -> Result<Self, RecordingError> {
        if let Some(index) = events
            .windows(2)
            .position(|pair| pair[1].time_ms < pair[0].time_ms)
        {
            return Err(RecordingError::OutOfOrder {
                index: index + 1,
                previous_ms: events[index].time_ms,
                time_ms: events[index + 1].time_ms,
            });
        }
        let duration_ms = events.last().map(|e| e.time_ms).unwrap_or(0);
        Ok(Self {
            events,
            duration_ms,
        })
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

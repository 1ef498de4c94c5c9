//! Voxel world state and the view published to checkpoints
//!
//! Terrain is a flat, seeded generator evaluated lazily per cell; edits made
//! by recorded events are kept on top of it. Cells of chunks that have not
//! been streamed in yet read as [`Block::Unloaded`].

use bevy::math::{IVec3, Vec3};
use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::constants::*;
use crate::recording::{Block, Manifest};

/// Chunk coordinate holding `cell`
pub fn chunk_of(cell: IVec3) -> IVec3 {
    IVec3::new(
        cell.x.div_euclid(CHUNK_SIZE),
        cell.y.div_euclid(CHUNK_SIZE),
        cell.z.div_euclid(CHUNK_SIZE),
    )
}

/// Cell containing a world position
pub fn cell_at(position: Vec3) -> IVec3 {
    position.floor().as_ivec3()
}

/// Chunks within `radius` of the chunk containing `position`, nearest first
pub fn chunks_around(position: Vec3, radius: i32) -> Vec<IVec3> {
    let center = chunk_of(cell_at(position));
    let mut chunks = Vec::new();
    for x in -radius..=radius {
        for y in -radius..=radius {
            for z in -radius..=radius {
                chunks.push(center + IVec3::new(x, y, z));
            }
        }
    }
    chunks.sort_by_key(|c| (*c - center).abs().element_sum());
    chunks
}

/// Flat seeded terrain plus manifest features
#[derive(Debug, Clone)]
pub struct Terrain {
    seed: u64,
    surface: i32,
    features: HashMap<IVec3, Block>,
}

impl Terrain {
    pub fn new(seed: u64, surface: i32) -> Self {
        Self {
            seed,
            surface,
            features: HashMap::new(),
        }
    }

    pub fn from_manifest(manifest: &Manifest) -> Self {
        let mut terrain = Self::new(manifest.seed, manifest.world.surface);
        for feature in &manifest.world.features {
            terrain
                .features
                .insert(IVec3::from_array(feature.cell), feature.block);
        }
        terrain
    }

    pub fn surface(&self) -> i32 {
        self.surface
    }

    /// Generated block at `cell`, before any edits
    pub fn generate(&self, cell: IVec3) -> Block {
        if let Some(block) = self.features.get(&cell) {
            return *block;
        }
        let depth = self.surface - cell.y;
        if depth < 0 {
            Block::Air
        } else if depth == 0 {
            Block::Grass
        } else if depth <= DIRT_DEPTH {
            Block::Dirt
        } else if self.ore_roll(cell) {
            Block::CoalOre
        } else {
            Block::Stone
        }
    }

    fn ore_roll(&self, cell: IVec3) -> bool {
        let mix = (cell.x as i64 as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
            ^ (cell.y as i64 as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F)
            ^ (cell.z as i64 as u64).wrapping_mul(0x1656_67B1_9E37_79F9);
        let mut rng = StdRng::seed_from_u64(self.seed ^ mix);
        rng.gen_range(0..COAL_ORE_CHANCE) == 0
    }
}

/// Local player as last published by the host
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerSnapshot {
    pub position: Vec3,
    pub health: i32,
}

#[derive(Debug, Default)]
struct WorldState {
    terrain: Option<Terrain>,
    loaded: HashSet<IVec3>,
    edits: HashMap<IVec3, Block>,
    player: Option<PlayerSnapshot>,
    last_event: Option<usize>,
    inputs: u64,
}

/// Read-only surface of the world for checkpoints.
///
/// Written by host systems on the engine thread, read by the verifier. It
/// outlives host cleanup so end-of-session checkpoints see the final state.
#[derive(Debug, Default)]
pub struct WorldView {
    state: RwLock<WorldState>,
    frame: AtomicU64,
}

impl WorldView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Local player, `None` before it has been spawned
    pub fn local_player(&self) -> Option<PlayerSnapshot> {
        self.state.read().player
    }

    pub fn block_at(&self, cell: IVec3) -> Block {
        let state = self.state.read();
        if !state.loaded.contains(&chunk_of(cell)) {
            return Block::Unloaded;
        }
        if let Some(block) = state.edits.get(&cell) {
            return *block;
        }
        match &state.terrain {
            Some(terrain) => terrain.generate(cell),
            None => Block::Unloaded,
        }
    }

    /// Display name of the block at `cell`
    pub fn block_name_at(&self, cell: IVec3) -> &'static str {
        self.block_at(cell).display_name()
    }

    /// Index of the last recorded event applied, `None` before the first
    pub fn last_recorded_event_index(&self) -> Option<usize> {
        self.state.read().last_event
    }

    /// Input events seen so far
    pub fn input_count(&self) -> u64 {
        self.state.read().inputs
    }

    pub fn loaded_chunks(&self) -> usize {
        self.state.read().loaded.len()
    }

    /// Host frames run so far
    pub fn frame(&self) -> u64 {
        self.frame.load(Ordering::Acquire)
    }

    pub(crate) fn begin_session(&self, terrain: Terrain) {
        let mut state = self.state.write();
        *state = WorldState {
            terrain: Some(terrain),
            ..WorldState::default()
        };
    }

    pub(crate) fn mark_loaded(&self, chunks: &[IVec3]) {
        self.state.write().loaded.extend(chunks.iter().copied());
    }

    pub(crate) fn set_block(&self, cell: IVec3, block: Block) {
        self.state.write().edits.insert(cell, block);
    }

    pub(crate) fn record_event(&self, index: usize) {
        self.state.write().last_event = Some(index);
    }

    pub(crate) fn count_input(&self) {
        self.state.write().inputs += 1;
    }

    pub(crate) fn publish(&self, frame: u64, player: Option<PlayerSnapshot>) {
        if player.is_some() {
            self.state.write().player = player;
        }
        self.frame.store(frame, Ordering::Release);
    }
}

//! Scenarios that check blocks before and after the replay

use bevy::math::IVec3;

use super::{ScenarioDef, await_loaded};
use crate::harness::{Checkpoint, HarnessResult, ReplayScenario, check_eq};
use crate::simulation::WorldView;

pub const DIRT_BREAK: ScenarioDef = ScenarioDef {
    path: "blocks/dirt_break",
    title: "DirtBreak",
    run: |ctx| ctx.replay("DirtBreak", &mut BlockChanges::dirt_break()),
};

pub const WOODCUT: ScenarioDef = ScenarioDef {
    path: "blocks/woodcut",
    title: "Woodcut",
    run: |ctx| ctx.replay("Woodcut", &mut BlockChanges::woodcut()),
};

pub const EXPLODE_TOOL: ScenarioDef = ScenarioDef {
    path: "blocks/explode_tool",
    title: "ExplodeTool",
    run: |ctx| ctx.replay("ExplodeTool", &mut BlockChanges::explode_tool()),
};

/// Cells that hold one block once loaded and another once the replay finished
#[derive(Debug, Clone)]
pub struct BlockChanges {
    changes: Vec<(IVec3, &'static str, &'static str)>,
}

impl BlockChanges {
    pub fn new(changes: Vec<(IVec3, &'static str, &'static str)>) -> Self {
        Self { changes }
    }

    /// Two dirt blocks dug out under the spawn point
    pub fn dirt_break() -> Self {
        Self::new(vec![
            (IVec3::new(0, -2, 0), "Dirt", "Air"),
            (IVec3::new(0, -3, 0), "Dirt", "Air"),
        ])
    }

    /// Two oak logs chopped from a tree trunk
    pub fn woodcut() -> Self {
        Self::new(vec![
            (IVec3::new(33, 85, -122), "Oak Log", "Air"),
            (IVec3::new(33, 86, -122), "Oak Log", "Air"),
        ])
    }

    /// A crater blown into the surface
    pub fn explode_tool() -> Self {
        Self::new(vec![
            (IVec3::new(-5, 36, -2), "Grass", "Air"),
            (IVec3::new(-5, 35, -2), "Dirt", "Air"),
            (IVec3::new(-5, 35, -3), "Dirt", "Air"),
            (IVec3::new(-4, 36, -2), "Grass", "Air"),
            (IVec3::new(-5, 34, -3), "Dirt", "Air"),
        ])
    }
}

impl ReplayScenario<WorldView> for BlockChanges {
    fn on_replay_start(&mut self, checkpoint: &Checkpoint<WorldView>) -> HarnessResult<()> {
        for (cell, before, _) in &self.changes {
            await_loaded(checkpoint, *cell)?;
            let message = format!("block at {} before", cell);
            check_eq(&message, *before, checkpoint.view().block_name_at(*cell))?;
        }
        Ok(())
    }

    fn on_replay_end(&mut self, checkpoint: &Checkpoint<WorldView>) -> HarnessResult<()> {
        for (cell, _, after) in &self.changes {
            let message = format!("block at {} after", cell);
            check_eq(&message, *after, checkpoint.view().block_name_at(*cell))?;
        }
        Ok(())
    }
}

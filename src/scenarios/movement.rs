//! Scenarios that follow the local player's position

use bevy::math::{IVec3, Vec3};

use super::{ScenarioDef, await_event_index, await_loaded, await_player, player};
use crate::harness::{AcceptanceTest, Checkpoint, HarnessResult, ReplayScenario, check_eq, check_ne};
use crate::recording::Block;
use crate::simulation::WorldView;

pub const EXAMPLE: ScenarioDef = ScenarioDef {
    path: "movement/example",
    title: "Example",
    run: |ctx| ctx.replay("Example", &mut Example::default()),
};

pub const EXAMPLE_ACCEPTANCE: ScenarioDef = ScenarioDef {
    path: "movement/example_acceptance",
    title: "Example",
    run: |ctx| ctx.accept(&mut ExampleAcceptance::default()),
};

pub const TOWER: ScenarioDef = ScenarioDef {
    path: "movement/tower",
    title: "Tower",
    run: |ctx| ctx.replay("Tower", &mut Tower::default()),
};

pub const WALK_DISTANCE: ScenarioDef = ScenarioDef {
    path: "movement/walk_distance",
    title: "WalkDistanceTest",
    run: |ctx| ctx.replay("WalkDistanceTest", &mut WalkDistance),
};

pub const CUTTING_GRASS: ScenarioDef = ScenarioDef {
    path: "movement/cutting_grass",
    title: "CuttingGrass",
    run: |ctx| ctx.accept(&mut CuttingGrass::default()),
};

/// Start position, moved by a recorded event index, exact final position
#[derive(Debug, Clone, Copy)]
struct PlayerPath {
    start: Vec3,
    moved_by_event: usize,
    end: Vec3,
}

impl PlayerPath {
    fn check_start(&self, checkpoint: &Checkpoint<WorldView>) -> HarnessResult<()> {
        let spawned = await_player(checkpoint)?;
        check_eq("initial position", self.start, spawned.position)?;
        Ok(())
    }

    fn check_moved(&self, checkpoint: &Checkpoint<WorldView>) -> HarnessResult<()> {
        await_event_index(checkpoint, self.moved_by_event)?;
        let message = format!("position after event {}", self.moved_by_event);
        check_ne(&message, self.start, player(checkpoint)?.position)?;
        Ok(())
    }

    fn check_end(&self, checkpoint: &Checkpoint<WorldView>) -> HarnessResult<()> {
        check_eq("final position", self.end, player(checkpoint)?.position)?;
        Ok(())
    }
}

/// A short walk on flat ground
pub struct Example {
    path: PlayerPath,
}

impl Default for Example {
    fn default() -> Self {
        Self {
            path: PlayerPath {
                start: Vec3::new(0.0, 0.40999973, 0.0),
                moved_by_event: 874,
                end: Vec3::new(-0.17837839, 0.40654626, 10.740363),
            },
        }
    }
}

impl ReplayScenario<WorldView> for Example {
    fn on_replay_start(&mut self, checkpoint: &Checkpoint<WorldView>) -> HarnessResult<()> {
        self.path.check_start(checkpoint)
    }

    fn during_replay(&mut self, checkpoint: &Checkpoint<WorldView>) -> HarnessResult<()> {
        self.path.check_moved(checkpoint)
    }

    fn on_replay_end(&mut self, checkpoint: &Checkpoint<WorldView>) -> HarnessResult<()> {
        self.path.check_end(checkpoint)
    }
}

/// [`Example`] packaged as an acceptance test
#[derive(Default)]
pub struct ExampleAcceptance {
    inner: Example,
}

impl ReplayScenario<WorldView> for ExampleAcceptance {
    fn on_replay_start(&mut self, checkpoint: &Checkpoint<WorldView>) -> HarnessResult<()> {
        self.inner.on_replay_start(checkpoint)
    }

    fn during_replay(&mut self, checkpoint: &Checkpoint<WorldView>) -> HarnessResult<()> {
        self.inner.during_replay(checkpoint)
    }

    fn on_replay_end(&mut self, checkpoint: &Checkpoint<WorldView>) -> HarnessResult<()> {
        self.inner.on_replay_end(checkpoint)
    }
}

impl AcceptanceTest<WorldView> for ExampleAcceptance {
    fn title(&self) -> &str {
        "Example"
    }
}

/// Pillar up one block and step off
pub struct Tower {
    path: PlayerPath,
    pillar: IVec3,
}

impl Default for Tower {
    fn default() -> Self {
        Self {
            path: PlayerPath {
                start: Vec3::new(0.0, 37.409996, 0.0),
                moved_by_event: 500,
                end: Vec3::new(-0.020252455, 38.400967, 2.5305471),
            },
            pillar: IVec3::new(0, 37, 0),
        }
    }
}

impl ReplayScenario<WorldView> for Tower {
    fn on_replay_start(&mut self, checkpoint: &Checkpoint<WorldView>) -> HarnessResult<()> {
        self.path.check_start(checkpoint)?;
        check_eq("pillar cell before", Block::Air, checkpoint.view().block_at(self.pillar))?;
        Ok(())
    }

    fn during_replay(&mut self, checkpoint: &Checkpoint<WorldView>) -> HarnessResult<()> {
        self.path.check_moved(checkpoint)
    }

    fn on_replay_end(&mut self, checkpoint: &Checkpoint<WorldView>) -> HarnessResult<()> {
        self.path.check_end(checkpoint)?;
        check_eq("pillar cell after", Block::Dirt, checkpoint.view().block_at(self.pillar))?;
        Ok(())
    }
}

/// Long walk, several chunks away from the spawn point
pub struct WalkDistance;

impl WalkDistance {
    const START: Vec3 = Vec3::new(0.0, 1.3, 0.0);
    const END: Vec3 = Vec3::new(-321.04462, 3.4099183, 1.0447832);
}

impl ReplayScenario<WorldView> for WalkDistance {
    fn on_replay_start(&mut self, checkpoint: &Checkpoint<WorldView>) -> HarnessResult<()> {
        let spawned = await_player(checkpoint)?;
        check_eq("initial position", Self::START, spawned.position)?;
        Ok(())
    }

    fn on_replay_end(&mut self, checkpoint: &Checkpoint<WorldView>) -> HarnessResult<()> {
        check_eq("final position", Self::END, player(checkpoint)?.position)?;
        Ok(())
    }
}

/// Walk into tall grass, cut it and return to the start column
pub struct CuttingGrass {
    path: PlayerPath,
    grass: IVec3,
}

impl Default for CuttingGrass {
    fn default() -> Self {
        Self {
            path: PlayerPath {
                start: Vec3::new(0.0, 1.3, 0.0),
                moved_by_event: 100,
                end: Vec3::new(0.0, 0.4099998, 0.0),
            },
            grass: IVec3::new(1, 0, 0),
        }
    }
}

impl ReplayScenario<WorldView> for CuttingGrass {
    fn on_replay_start(&mut self, checkpoint: &Checkpoint<WorldView>) -> HarnessResult<()> {
        self.path.check_start(checkpoint)?;
        await_loaded(checkpoint, self.grass)?;
        check_eq("grass before", "Tall Grass", checkpoint.view().block_name_at(self.grass))?;
        Ok(())
    }

    fn during_replay(&mut self, checkpoint: &Checkpoint<WorldView>) -> HarnessResult<()> {
        self.path.check_moved(checkpoint)
    }

    fn on_replay_end(&mut self, checkpoint: &Checkpoint<WorldView>) -> HarnessResult<()> {
        self.path.check_end(checkpoint)?;
        check_eq("grass after", "Air", checkpoint.view().block_name_at(self.grass))?;
        Ok(())
    }
}

impl AcceptanceTest<WorldView> for CuttingGrass {
    fn title(&self) -> &str {
        "CuttingGrass"
    }
}

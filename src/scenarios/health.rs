//! Scenarios that track the local player's health

use super::{ScenarioDef, await_player, player};
use crate::constants::PLAYER_MAX_HEALTH;
use crate::harness::{Checkpoint, HarnessResult, ReplayScenario, check_eq, check_ne};
use crate::simulation::WorldView;

pub const FALL_DAMAGE: ScenarioDef = ScenarioDef {
    path: "health/fall_damage",
    title: "FallDamage",
    run: |ctx| ctx.replay("FallDamage", &mut FallDamage::default()),
};

pub const FALL_TO_DEATH: ScenarioDef = ScenarioDef {
    path: "health/fall_to_death",
    title: "DirtsTest",
    run: |ctx| ctx.replay("DirtsTest", &mut FallToDeath),
};

/// A short fall that costs some health
#[derive(Debug, Default)]
pub struct FallDamage {
    initial_health: Option<i32>,
}

impl ReplayScenario<WorldView> for FallDamage {
    fn on_replay_start(&mut self, checkpoint: &Checkpoint<WorldView>) -> HarnessResult<()> {
        self.initial_health = Some(await_player(checkpoint)?.health);
        Ok(())
    }

    fn on_replay_end(&mut self, checkpoint: &Checkpoint<WorldView>) -> HarnessResult<()> {
        let health = player(checkpoint)?.health;
        check_ne("health after fall", self.initial_health, Some(health))?;
        Ok(())
    }
}

/// Full health at spawn, dead after the fall
pub struct FallToDeath;

impl ReplayScenario<WorldView> for FallToDeath {
    fn on_replay_start(&mut self, checkpoint: &Checkpoint<WorldView>) -> HarnessResult<()> {
        check_eq("health at spawn", PLAYER_MAX_HEALTH, await_player(checkpoint)?.health)?;
        Ok(())
    }

    fn on_replay_end(&mut self, checkpoint: &Checkpoint<WorldView>) -> HarnessResult<()> {
        check_eq("health after fall", 0, player(checkpoint)?.health)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    #[test]
    fn test_fall_damage_replay() {
        assert_pass((FALL_DAMAGE.run)(&context()));
    }

    #[test]
    fn test_fall_to_death_replay() {
        let report = assert_pass((FALL_TO_DEATH.run)(&context()));
        assert_eq!(report.title, "DirtsTest");
    }

    #[test]
    fn test_fall_damage_records_initial_health() {
        let mut scenario = FallDamage::default();
        context().replay("FallDamage", &mut scenario).unwrap();
        assert_eq!(scenario.initial_health, Some(PLAYER_MAX_HEALTH));
    }
}

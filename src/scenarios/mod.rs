//! Built-in replay scenarios
//!
//! Each scenario replays one shipped recording and checks the world at its
//! checkpoints. Scenarios are grouped by category the way the runner prints
//! them (`movement/example`, `blocks/dirt_break`, ...).

pub mod blocks;
pub mod health;
pub mod movement;

use bevy::math::IVec3;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use crate::harness::{
    AcceptanceHarness, AcceptanceTest, AssertionError, Checkpoint, HarnessConfig, HarnessError, HarnessResult,
    ReplayHarness, ReplayScenario, SessionReport,
};
use crate::recording::{Block, SessionLibrary};
use crate::simulation::{PlayerSnapshot, ReplayHostBuilder, WorldView};

/// Everything a scenario needs to build its harness
#[derive(Clone)]
pub struct ScenarioContext {
    pub builder: Arc<ReplayHostBuilder>,
    pub library: Arc<dyn SessionLibrary>,
    pub config: HarnessConfig,
    pub headless: bool,
}

impl ScenarioContext {
    pub fn new(library: Arc<dyn SessionLibrary>, config: HarnessConfig) -> Self {
        let headless = config.headless;
        Self {
            builder: Arc::new(ReplayHostBuilder::new()),
            library,
            config,
            headless,
        }
    }

    pub fn with_builder(mut self, builder: ReplayHostBuilder) -> Self {
        self.builder = Arc::new(builder);
        self
    }

    fn harness(&self) -> ReplayHarness<ReplayHostBuilder> {
        ReplayHarness::with_shared(
            Arc::clone(&self.builder),
            Arc::clone(&self.library),
            self.config.clone(),
        )
    }

    /// `run_test` + `teardown` on a fresh harness
    pub fn replay<S>(&self, title: &str, scenario: &mut S) -> HarnessResult<SessionReport>
    where
        S: ReplayScenario<WorldView>,
    {
        let mut harness = self.harness();
        let run = harness.run_test(title, self.headless, scenario);
        let teardown = harness.teardown();
        let ((), report) = HarnessError::combine(run, teardown)?;
        report.ok_or_else(|| HarnessError::WorkerFailed {
            name: title.to_string(),
            message: "session ended without a report".to_string(),
        })
    }

    /// Run an acceptance test through [`AcceptanceHarness`]
    pub fn accept<T>(&self, test: &mut T) -> HarnessResult<SessionReport>
    where
        T: AcceptanceTest<WorldView>,
    {
        AcceptanceHarness::from_harness(self.harness()).run(test)
    }
}

/// A registered scenario
#[derive(Clone, Copy)]
pub struct ScenarioDef {
    /// `category/name`, matched by the runner's filter
    pub path: &'static str,
    /// Recording title the scenario replays
    pub title: &'static str,
    pub run: fn(&ScenarioContext) -> HarnessResult<SessionReport>,
}

impl ScenarioDef {
    pub fn category(&self) -> &'static str {
        self.path.split_once('/').map(|(c, _)| c).unwrap_or("")
    }

    pub fn name(&self) -> &'static str {
        self.path.rsplit_once('/').map(|(_, n)| n).unwrap_or(self.path)
    }
}

/// Outcome of one scenario
#[derive(Debug)]
pub enum ScenarioResult {
    Pass { report: SessionReport },
    /// A checkpoint assertion failed or a checkpoint wait timed out
    Fail { error: HarnessError },
    /// The harness or host failed
    Error { error: HarnessError },
}

impl ScenarioResult {
    pub fn is_pass(&self) -> bool {
        matches!(self, ScenarioResult::Pass { .. })
    }
}

impl From<HarnessResult<SessionReport>> for ScenarioResult {
    fn from(result: HarnessResult<SessionReport>) -> Self {
        match result {
            Ok(report) => ScenarioResult::Pass { report },
            Err(error) if error.assertion().is_some() || error.is_timeout() => ScenarioResult::Fail { error },
            Err(error) => ScenarioResult::Error { error },
        }
    }
}

/// Every built-in scenario, sorted by path
pub fn all() -> Vec<ScenarioDef> {
    let mut scenarios = vec![
        movement::EXAMPLE,
        movement::EXAMPLE_ACCEPTANCE,
        movement::TOWER,
        movement::WALK_DISTANCE,
        movement::CUTTING_GRASS,
        blocks::DIRT_BREAK,
        blocks::WOODCUT,
        blocks::EXPLODE_TOOL,
        health::FALL_DAMAGE,
        health::FALL_TO_DEATH,
    ];
    scenarios.sort_by_key(|s| s.path);
    scenarios
}

/// Scenarios whose path contains `filter`
pub fn matching(filter: Option<&str>) -> Vec<ScenarioDef> {
    all()
        .into_iter()
        .filter(|s| filter.is_none_or(|f| s.path.contains(f)))
        .collect()
}

/// Run one scenario and classify the outcome
pub fn run_scenario(def: &ScenarioDef, ctx: &ScenarioContext) -> ScenarioResult {
    let started = Instant::now();
    let result = ScenarioResult::from((def.run)(ctx));
    debug!(
        "{} finished in {:.2}s (pass: {})",
        def.path,
        started.elapsed().as_secs_f32(),
        result.is_pass()
    );
    result
}

// =============================================================================
// Checkpoint helpers shared by the scenarios
// =============================================================================

/// Wait for the local player to be spawned and return it
pub(crate) fn await_player(checkpoint: &Checkpoint<WorldView>) -> HarnessResult<PlayerSnapshot> {
    checkpoint.wait_until("local player spawned", |view| view.local_player().is_some())?;
    player(checkpoint)
}

/// Wait until the last applied recorded event index reaches `index`
pub(crate) fn await_event_index(checkpoint: &Checkpoint<WorldView>, index: usize) -> HarnessResult<()> {
    let condition = format!("recorded event index >= {}", index);
    checkpoint.wait_until(&condition, |view| {
        view.last_recorded_event_index().is_some_and(|i| i >= index)
    })?;
    Ok(())
}

/// Wait until `cell` is streamed in
pub(crate) fn await_loaded(checkpoint: &Checkpoint<WorldView>, cell: IVec3) -> HarnessResult<()> {
    let condition = format!("block at {} loaded", cell);
    checkpoint.wait_until(&condition, |view| view.block_at(cell) != Block::Unloaded)?;
    Ok(())
}

/// Current local player, failing the checkpoint if it is gone
pub(crate) fn player(checkpoint: &Checkpoint<WorldView>) -> HarnessResult<PlayerSnapshot> {
    checkpoint.view().local_player().ok_or_else(|| {
        AssertionError::new("local player", "a spawned player", Option::<PlayerSnapshot>::None)
            .into()
    })
}

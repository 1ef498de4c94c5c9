//! Scriptable host used by the harness tests

use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use crate::host::{Host, HostBuilder, HostConfig, HostError, HostState, HostStatus};
use crate::recording::{Manifest, MemoryLibrary, Recording, WorldSettings};

/// Library holding a single empty session titled "Fake" (seed 99)
pub fn fake_library() -> MemoryLibrary {
    MemoryLibrary::new().with_session(
        Manifest {
            title: "Fake".to_string(),
            seed: 99,
            spawn: [0.0; 3],
            world: WorldSettings::default(),
        },
        Recording::default(),
    )
}

/// What the fake host exposes to checkpoints
#[derive(Debug, Default)]
pub struct FakeView {
    pub ticks: AtomicU64,
}

impl FakeView {
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }
}

/// Lifecycle calls observed across all hosts of one builder
#[derive(Debug, Default)]
pub struct FakeCounters {
    cleanups: AtomicU64,
    shutdowns: AtomicU64,
    built_on: Mutex<Option<String>>,
}

impl FakeCounters {
    pub fn cleanups(&self) -> u64 {
        self.cleanups.load(Ordering::Acquire)
    }

    pub fn shutdowns(&self) -> u64 {
        self.shutdowns.load(Ordering::Acquire)
    }

    pub fn built_on(&self) -> Option<String> {
        self.built_on.lock().clone()
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeBuilder {
    ticks: u64,
    fail_initialize: bool,
    panic_on_tick: Option<u64>,
    status_lag_ticks: u64,
    tick_delay: Duration,
    counters: Arc<FakeCounters>,
}

impl FakeBuilder {
    pub fn new() -> Self {
        Self {
            ticks: 3,
            ..Self::default()
        }
    }

    /// Session ticks before the host reports completion
    pub fn with_ticks(mut self, ticks: u64) -> Self {
        self.ticks = ticks;
        self
    }

    pub fn with_tick_delay_ms(mut self, ms: u64) -> Self {
        self.tick_delay = Duration::from_millis(ms);
        self
    }

    pub fn failing_initialize(mut self) -> Self {
        self.fail_initialize = true;
        self
    }

    pub fn panicking_on_tick(mut self, tick: u64) -> Self {
        self.panic_on_tick = Some(tick);
        self
    }

    /// Report `Built` from `status()` until this many session ticks have run
    pub fn with_status_lag_ticks(mut self, ticks: u64) -> Self {
        self.status_lag_ticks = ticks;
        self
    }

    pub fn counters(&self) -> Arc<FakeCounters> {
        Arc::clone(&self.counters)
    }
}

pub struct FakeHost {
    script: FakeBuilder,
    status: HostStatus,
    view: Arc<FakeView>,
}

impl HostBuilder for FakeBuilder {
    type Host = FakeHost;

    fn build(&self, _config: &HostConfig) -> Result<FakeHost, HostError> {
        *self.counters.built_on.lock() = thread::current().name().map(str::to_string);
        Ok(FakeHost {
            script: self.clone(),
            status: HostStatus::Built,
            view: Arc::new(FakeView::default()),
        })
    }
}

impl Host for FakeHost {
    type View = FakeView;

    fn initialize(&mut self) -> Result<(), HostError> {
        if self.script.fail_initialize {
            return Err(HostError::Setup("scripted initialize failure".to_string()));
        }
        self.status = HostStatus::Initialized;
        Ok(())
    }

    fn change_state(&mut self, state: HostState) -> Result<(), HostError> {
        self.status = match state {
            HostState::MainMenu => HostStatus::MainMenu,
            HostState::LoadSession(_) => HostStatus::InGame,
        };
        Ok(())
    }

    fn tick(&mut self) -> Result<bool, HostError> {
        if self.status != HostStatus::InGame {
            return Ok(true);
        }
        let tick = self.view.ticks.fetch_add(1, Ordering::AcqRel) + 1;
        if self.script.panic_on_tick == Some(tick) {
            panic!("fake host panicked on tick {}", tick);
        }
        if !self.script.tick_delay.is_zero() {
            thread::sleep(self.script.tick_delay);
        }
        if tick >= self.script.ticks {
            self.status = HostStatus::Finished;
            return Ok(false);
        }
        Ok(true)
    }

    fn status(&self) -> HostStatus {
        let lagging = matches!(
            self.status,
            HostStatus::Initialized | HostStatus::MainMenu | HostStatus::InGame
        ) && self.view.ticks() < self.script.status_lag_ticks;
        if lagging { HostStatus::Built } else { self.status }
    }

    fn cleanup(&mut self) {
        self.script.counters.cleanups.fetch_add(1, Ordering::AcqRel);
        if self.status != HostStatus::ShutDown {
            self.status = HostStatus::CleanedUp;
        }
    }

    fn shutdown(&mut self) {
        self.script.counters.shutdowns.fetch_add(1, Ordering::AcqRel);
        self.status = HostStatus::ShutDown;
    }

    fn view(&self) -> Arc<FakeView> {
        Arc::clone(&self.view)
    }
}

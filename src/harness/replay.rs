//! Replay harness: one controller, one status channel, checkpoint hooks
//!
//! `run_test` starts a host session on the controller thread and sequences the
//! scenario's checkpoints on the calling (verifier) thread:
//!
//! 1. wait until the host is initialized and the status is REPLAYING
//! 2. `on_replay_start`
//! 3. `during_replay`
//! 4. wait until the status is FINISHED
//! 5. `on_replay_end`
//!
//! `teardown` must follow every `run_test`; `Drop` runs it if the caller did not.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use uuid::Uuid;

use super::config::HarnessConfig;
use super::controller::{ControllerShared, HostLifecycleController, SessionRequest, StopSignal};
use super::engine_thread::EngineThread;
use super::error::{HarnessError, HarnessResult, LifecycleStage};
use super::report::SessionReport;
use super::status::{ReplayStatus, StatusChannel, StatusTransition};
use super::waiter::{CancelToken, PollingWaiter, WaitStats};
use crate::host::{HostBuilder, HostStatus, ViewOf};
use crate::recording::SessionLibrary;

/// Checkpoint hooks of one replay test
pub trait ReplayScenario<V> {
    /// Runs once the host is initialized and the replay has started
    fn on_replay_start(&mut self, checkpoint: &Checkpoint<V>) -> HarnessResult<()>;

    /// Runs after `on_replay_start`, while the replay is in progress
    fn during_replay(&mut self, _checkpoint: &Checkpoint<V>) -> HarnessResult<()> {
        Ok(())
    }

    /// Runs once the replay has finished
    fn on_replay_end(&mut self, checkpoint: &Checkpoint<V>) -> HarnessResult<()>;
}

/// What a hook sees: the host's view plus bounded waits tied to the session
pub struct Checkpoint<V> {
    session_id: Uuid,
    waiter: PollingWaiter,
    view: Arc<V>,
    status: Arc<StatusChannel>,
    started: Instant,
}

impl<V> Checkpoint<V> {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn status(&self) -> ReplayStatus {
        self.status.get()
    }

    /// Time since `run_test` started the session
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Block until `predicate` holds on the view, bounded by the checkpoint timeout
    pub fn wait_until<F>(&self, condition: &str, mut predicate: F) -> HarnessResult<WaitStats>
    where
        F: FnMut(&V) -> bool,
    {
        self.waiter.wait_until(condition, || predicate(&self.view))
    }

    /// Same as [`Checkpoint::wait_until`] with an explicit timeout
    pub fn wait_until_within<F>(
        &self,
        condition: &str,
        timeout: Duration,
        mut predicate: F,
    ) -> HarnessResult<WaitStats>
    where
        F: FnMut(&V) -> bool,
    {
        self.waiter
            .with_timeout(timeout)
            .wait_until(condition, || predicate(&self.view))
    }
}

struct ActiveControls {
    session_id: Uuid,
    stop: StopSignal,
    cancel: Arc<CancelToken>,
}

/// Cancels the active session of a harness from any thread
#[derive(Clone)]
pub struct HarnessHandle {
    active: Arc<Mutex<Option<ActiveControls>>>,
}

impl HarnessHandle {
    /// Stop the tick loop and wake pending waits. Returns false when idle.
    pub fn cancel(&self) -> bool {
        match self.active.lock().as_ref() {
            Some(active) => {
                warn!(session = %active.session_id, "Session cancelled");
                active.stop.request();
                active.cancel.cancel();
                true
            }
            None => false,
        }
    }

    pub fn active_session(&self) -> Option<Uuid> {
        self.active.lock().as_ref().map(|a| a.session_id)
    }
}

/// Instance lifecycle of a harness
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarnessPhase {
    Idle,
    Running,
}

/// Composition root of a replay test
pub struct ReplayHarness<B: HostBuilder> {
    builder: Arc<B>,
    library: Arc<dyn SessionLibrary>,
    config: HarnessConfig,
    status: Arc<StatusChannel>,
    engine_thread: EngineThread,
    controller: Option<HostLifecycleController<B>>,
    active: Arc<Mutex<Option<ActiveControls>>>,
    last_view: Option<Arc<ViewOf<B>>>,
    last_history: Vec<StatusTransition>,
}

impl<B: HostBuilder> ReplayHarness<B> {
    pub fn new(builder: B, library: impl SessionLibrary + 'static, config: HarnessConfig) -> Self {
        Self::with_shared(Arc::new(builder), Arc::new(library), config)
    }

    /// Harness over a builder and library shared with other harnesses
    pub fn with_shared(
        builder: Arc<B>,
        library: Arc<dyn SessionLibrary>,
        config: HarnessConfig,
    ) -> Self {
        Self {
            builder,
            library,
            config,
            status: Arc::new(StatusChannel::new()),
            engine_thread: EngineThread::new(),
            controller: None,
            active: Arc::new(Mutex::new(None)),
            last_view: None,
            last_history: Vec::new(),
        }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Running from `run_test` until the next `teardown`, even if the session failed
    pub fn phase(&self) -> HarnessPhase {
        if self.controller.is_some() || self.active.lock().is_some() {
            HarnessPhase::Running
        } else {
            HarnessPhase::Idle
        }
    }

    pub fn status(&self) -> ReplayStatus {
        self.status.get()
    }

    /// Transitions of the running session, or of the last one after teardown
    pub fn status_history(&self) -> Vec<StatusTransition> {
        if self.controller.is_some() {
            self.status.history()
        } else {
            self.last_history.clone()
        }
    }

    pub fn engine_thread(&self) -> &EngineThread {
        &self.engine_thread
    }

    pub fn handle(&self) -> HarnessHandle {
        HarnessHandle {
            active: Arc::clone(&self.active),
        }
    }

    /// View of the most recent session; survives teardown
    pub fn view(&self) -> Option<Arc<ViewOf<B>>> {
        self.last_view.clone()
    }

    /// Replay the session titled `title` and run the scenario's checkpoints
    pub fn run_test<S>(&mut self, title: &str, headless: bool, scenario: &mut S) -> HarnessResult<()>
    where
        S: ReplayScenario<ViewOf<B>> + ?Sized,
    {
        if self.phase() == HarnessPhase::Running {
            return Err(HarnessError::AlreadyRunning);
        }

        let started = Instant::now();
        let session_id = Uuid::new_v4();
        let stop = StopSignal::new();
        let cancel = Arc::new(CancelToken::new());
        self.status.reset();
        self.last_view = None;

        let request = SessionRequest {
            session_id,
            title: title.to_string(),
            config: self.config.host_config(headless, self.engine_thread.clone()),
        };
        info!(session = %session_id, "Replaying '{}' ({})", title, request.config.backend);

        let controller = HostLifecycleController::start(
            Arc::clone(&self.builder),
            Arc::clone(&self.library),
            request,
            Arc::clone(&self.status),
            stop.clone(),
        )?;
        let shared = Arc::clone(controller.shared());
        self.controller = Some(controller);
        *self.active.lock() = Some(ActiveControls {
            session_id,
            stop,
            cancel: Arc::clone(&cancel),
        });

        let waiter = PollingWaiter::new(
            self.config.poll_interval(),
            self.config.start_timeout(),
            Arc::clone(&self.status),
            Arc::clone(&cancel),
        );

        // 1. Host initialized and replay started
        let status = Arc::clone(&self.status);
        self.await_stage(&waiter, &shared, "replay started", || {
            shared.is_ready()
                && match status.get() {
                    ReplayStatus::Finished => true,
                    ReplayStatus::Replaying => shared.host_status().is_some_and(HostStatus::is_initialized),
                    _ => false,
                }
        })?;

        let view = shared.view().ok_or_else(|| HarnessError::HostLifecycleFailure {
            stage: LifecycleStage::Build,
            message: "host published no view".to_string(),
            elapsed: started.elapsed(),
            last_status: self.status.get(),
        })?;
        self.last_view = Some(Arc::clone(&view));

        let checkpoint = Checkpoint {
            session_id,
            waiter: waiter.with_timeout(self.config.checkpoint_timeout()),
            view,
            status: Arc::clone(&self.status),
            started,
        };

        // 2-3. Start and in-progress checkpoints
        run_hook("on_replay_start", &checkpoint, |c| scenario.on_replay_start(c))?;
        run_hook("during_replay", &checkpoint, |c| scenario.during_replay(c))?;

        // 4. Replay finished
        let finish = waiter.with_timeout(self.config.finish_timeout());
        self.await_stage(&finish, &shared, "replay finished", || {
            status.get() == ReplayStatus::Finished
        })?;
        if cancel.is_cancelled() {
            return Err(HarnessError::Cancelled {
                condition: "replay finished".to_string(),
                elapsed: started.elapsed(),
                last_status: self.status.get(),
            });
        }

        // 5. End checkpoint
        run_hook("on_replay_end", &checkpoint, |c| scenario.on_replay_end(c))?;
        info!(session = %session_id, "Checkpoints passed for '{}' in {:.2}s", title, started.elapsed().as_secs_f32());
        Ok(())
    }

    /// Wait for a lifecycle stage, ending early if the controller dies first
    fn await_stage<F>(
        &mut self,
        waiter: &PollingWaiter,
        shared: &ControllerShared<ViewOf<B>>,
        condition: &str,
        mut reached: F,
    ) -> HarnessResult<()>
    where
        F: FnMut() -> bool,
    {
        waiter.wait_until(condition, || reached() || shared.has_exited())?;
        if reached() {
            return Ok(());
        }

        // The controller exited without getting there: its outcome is the failure
        let Some(controller) = self.controller.take() else {
            return Err(HarnessError::AlreadyRunning);
        };
        self.last_history = self.status.history();
        match controller.join() {
            Err(e) => Err(e),
            Ok(report) => Err(HarnessError::Cancelled {
                condition: condition.to_string(),
                elapsed: report.elapsed,
                last_status: self.status.get(),
            }),
        }
    }

    /// Stop the session and join the controller thread.
    ///
    /// In order: request host shutdown and cancel pending waits, reset the
    /// engine-thread scope, join the controller, reset the status. The scope
    /// is reset again after the join in case the controller bound it late. Safe to call
    /// any number of times; returns the controller's outcome on the first call
    /// after a session that was still joined to the harness.
    pub fn teardown(&mut self) -> HarnessResult<Option<SessionReport>> {
        if let Some(active) = self.active.lock().take() {
            active.stop.request();
            active.cancel.cancel();
        }
        self.engine_thread.reset();

        let outcome = match self.controller.take() {
            Some(controller) => {
                let session_id = controller.session_id();
                let outcome = controller.join().map(Some);
                if let Err(e) = &outcome {
                    warn!(session = %session_id, "Controller failed: {}", e);
                }
                self.last_history = self.status.history();
                outcome
            }
            None => Ok(None),
        };

        self.engine_thread.reset();
        self.status.reset();
        outcome
    }
}

/// Run one hook, stamping its failure with elapsed time and last status
fn run_hook<V, F>(hook: &'static str, checkpoint: &Checkpoint<V>, run: F) -> HarnessResult<()>
where
    F: FnOnce(&Checkpoint<V>) -> HarnessResult<()>,
{
    run(checkpoint).map_err(|e| e.at_checkpoint(hook, checkpoint.elapsed(), checkpoint.status()))
}

impl<B: HostBuilder> Drop for ReplayHarness<B> {
    fn drop(&mut self) {
        if self.phase() == HarnessPhase::Running {
            if let Err(e) = self.teardown() {
                warn!("Teardown on drop failed: {}", e);
            }
        }
    }
}

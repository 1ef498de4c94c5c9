//! Host lifecycle controller
//!
//! Owns the background thread that builds the host, walks it through
//! initialize → main menu → session load → tick loop → cleanup, and publishes
//! [`ReplayStatus`] changes as it goes. Every failure on that thread (an error
//! or a panic) is captured and returned from [`HostLifecycleController::join`].

use chrono::Utc;
use parking_lot::Mutex;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::error::{HarnessError, HarnessResult, LifecycleStage};
use super::report::SessionReport;
use super::status::{ReplayStatus, StatusChannel};
use super::worker::{Worker, panic_message};
use crate::constants::HOST_THREAD_NAME;
use crate::host::{Host, HostBuilder, HostConfig, HostState, HostStatus, ViewOf};
use crate::recording::SessionLibrary;

/// Request to end the tick loop early
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// One session to replay
#[derive(Debug, Clone)]
pub struct SessionRequest {
    pub session_id: Uuid,
    pub title: String,
    pub config: HostConfig,
}

/// State the controller thread publishes for the verifier
pub struct ControllerShared<V> {
    ready: AtomicBool,
    exited: AtomicBool,
    host_status: Mutex<Option<HostStatus>>,
    view: Mutex<Option<Arc<V>>>,
}

impl<V> ControllerShared<V> {
    fn new() -> Self {
        Self {
            ready: AtomicBool::new(false),
            exited: AtomicBool::new(false),
            host_status: Mutex::new(None),
            view: Mutex::new(None),
        }
    }

    /// Host initialized successfully
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Controller task has returned (successfully or not)
    pub fn has_exited(&self) -> bool {
        self.exited.load(Ordering::Acquire)
    }

    /// Last status the host reported, `None` before it was built
    pub fn host_status(&self) -> Option<HostStatus> {
        *self.host_status.lock()
    }

    pub fn view(&self) -> Option<Arc<V>> {
        self.view.lock().clone()
    }

    fn mirror(&self, status: HostStatus) {
        *self.host_status.lock() = Some(status);
    }
}

/// Outcome of the lifecycle steps before cleanup
struct LoopOutcome {
    seed: u64,
    ticks: u64,
    stopped_early: bool,
}

/// Drives one host on one background thread
pub struct HostLifecycleController<B: HostBuilder> {
    session_id: Uuid,
    worker: Worker<SessionReport>,
    shared: Arc<ControllerShared<ViewOf<B>>>,
    stop: StopSignal,
}

impl<B: HostBuilder> HostLifecycleController<B> {
    /// Spawn the controller thread and start the lifecycle
    pub fn start(
        builder: Arc<B>,
        library: Arc<dyn SessionLibrary>,
        request: SessionRequest,
        status: Arc<StatusChannel>,
        stop: StopSignal,
    ) -> HarnessResult<Self> {
        let session_id = request.session_id;
        let shared = Arc::new(ControllerShared::new());
        let task_shared = Arc::clone(&shared);
        let task_stop = stop.clone();
        let task_status = Arc::clone(&status);

        let worker = Worker::spawn(HOST_THREAD_NAME, move || {
            run_session(
                builder.as_ref(),
                library.as_ref(),
                &request,
                &task_status,
                &task_shared,
                &task_stop,
            )
        })
        .map_err(|e| HarnessError::HostLifecycleFailure {
            stage: LifecycleStage::Spawn,
            message: e.to_string(),
            elapsed: status.elapsed(),
            last_status: status.get(),
        })?;

        Ok(Self {
            session_id,
            worker,
            shared,
            stop,
        })
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn shared(&self) -> &Arc<ControllerShared<ViewOf<B>>> {
        &self.shared
    }

    /// Ask the tick loop to stop at the next tick boundary
    pub fn request_stop(&self) {
        self.stop.request();
    }

    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Wait for the controller thread and return its outcome
    pub fn join(self) -> HarnessResult<SessionReport> {
        self.worker.join()
    }
}

/// Body of the controller thread
fn run_session<B: HostBuilder>(
    builder: &B,
    library: &dyn SessionLibrary,
    request: &SessionRequest,
    status: &StatusChannel,
    shared: &ControllerShared<ViewOf<B>>,
    stop: &StopSignal,
) -> HarnessResult<SessionReport> {
    let started = Instant::now();
    let started_at = Utc::now();
    let stage = Cell::new(LifecycleStage::Build);
    let mut slot: Option<B::Host> = None;

    let fail = |stage: LifecycleStage, message: String| HarnessError::HostLifecycleFailure {
        stage,
        message,
        elapsed: started.elapsed(),
        last_status: status.get(),
    };

    let mut outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        drive_host(builder, library, request, status, shared, stop, &stage, &mut slot, &fail)
    }))
    .unwrap_or_else(|payload| {
        Err(fail(
            stage.get(),
            format!("panicked: {}", panic_message(payload.as_ref())),
        ))
    });

    if let Err(e) = &outcome {
        error!(session = %request.session_id, "Replay of '{}' failed: {}", request.title, e);
    }

    // Always leave the host shut down, even after a failure
    if let Some(host) = slot.take() {
        let released = panic::catch_unwind(AssertUnwindSafe(move || {
            let mut host = host;
            host.cleanup();
            host.shutdown();
            shared.mirror(host.status());
        }));
        if let Err(payload) = released {
            let teardown = fail(
                LifecycleStage::Cleanup,
                format!("panicked: {}", panic_message(payload.as_ref())),
            );
            outcome = HarnessError::combine(outcome, Err::<(), _>(teardown)).map(|(run, ())| run);
        }
    }

    shared.exited.store(true, Ordering::Release);

    let outcome = outcome?;
    let report = SessionReport {
        session_id: request.session_id,
        title: request.title.clone(),
        seed: outcome.seed,
        ticks: outcome.ticks,
        stopped_early: outcome.stopped_early,
        started_at,
        elapsed: started.elapsed(),
    };
    info!(session = %request.session_id, "Replay complete: {}", report);
    Ok(report)
}

#[allow(clippy::too_many_arguments)]
fn drive_host<B: HostBuilder>(
    builder: &B,
    library: &dyn SessionLibrary,
    request: &SessionRequest,
    status: &StatusChannel,
    shared: &ControllerShared<ViewOf<B>>,
    stop: &StopSignal,
    stage: &Cell<LifecycleStage>,
    slot: &mut Option<B::Host>,
    fail: &dyn Fn(LifecycleStage, String) -> HarnessError,
) -> HarnessResult<LoopOutcome> {
    let id = request.session_id;
    let host_err = |e: crate::host::HostError| fail(stage.get(), e.to_string());

    // 1. Build on this thread, bound as the engine thread
    stage.set(LifecycleStage::Build);
    request
        .config
        .engine_thread
        .bind_current()
        .map_err(|e| fail(LifecycleStage::Build, e.to_string()))?;
    let host = slot.insert(builder.build(&request.config).map_err(host_err)?);
    *shared.view.lock() = Some(host.view());
    shared.mirror(host.status());
    debug!(session = %id, "Host built ({})", request.config.backend);

    // 2. Initialize, then mark ready
    stage.set(LifecycleStage::Initialize);
    host.initialize().map_err(host_err)?;
    shared.mirror(host.status());
    shared.ready.store(true, Ordering::Release);
    info!(session = %id, "Host initialized ({})", request.config.backend);

    // 3. Quiescent main menu
    stage.set(LifecycleStage::MainMenu);
    host.change_state(HostState::MainMenu).map_err(host_err)?;
    host.tick().map_err(host_err)?;
    shared.mirror(host.status());

    // 4. Resolve before touching the status
    stage.set(LifecycleStage::ResolveSession);
    let session = library
        .resolve(&request.title)
        .ok_or_else(|| HarnessError::SessionNotFound {
            title: request.title.clone(),
        })?;
    let seed = session.seed;
    info!(session = %id, "Resolved '{}' (seed {})", session.title, seed);

    // 5-6. Load
    stage.set(LifecycleStage::LoadSession);
    status.set(ReplayStatus::Preparing);
    host.change_state(HostState::LoadSession(session))
        .map_err(host_err)?;
    shared.mirror(host.status());
    status.set(ReplayStatus::Replaying);

    // 7. Tick until the recording runs out or a stop is requested
    stage.set(LifecycleStage::TickLoop);
    let mut ticks = 0u64;
    let mut stopped_early = false;
    loop {
        if stop.is_requested() {
            stopped_early = true;
            warn!(session = %id, "Stop requested after {} ticks", ticks);
            break;
        }
        let running = host.tick().map_err(host_err)?;
        ticks += 1;
        shared.mirror(host.status());
        if !running {
            break;
        }
    }

    // 8. Finish and clean up
    status.set(ReplayStatus::Finished);
    stage.set(LifecycleStage::Cleanup);
    host.cleanup();
    shared.mirror(host.status());
    debug!(session = %id, "Host cleaned up after {} ticks", ticks);

    Ok(LoopOutcome {
        seed,
        ticks,
        stopped_early,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::fake::{FakeBuilder, fake_library};

    fn start(builder: FakeBuilder, title: &str) -> (HostLifecycleController<FakeBuilder>, Arc<StatusChannel>) {
        let status = Arc::new(StatusChannel::new());
        let controller = HostLifecycleController::start(
            Arc::new(builder),
            Arc::new(fake_library()),
            SessionRequest {
                session_id: Uuid::new_v4(),
                title: title.to_string(),
                config: HostConfig::default(),
            },
            Arc::clone(&status),
            StopSignal::new(),
        )
        .unwrap();
        (controller, status)
    }

    fn statuses(status: &StatusChannel) -> Vec<ReplayStatus> {
        status.history().iter().map(|t| t.status).collect()
    }

    #[test]
    fn test_full_lifecycle() {
        let builder = FakeBuilder::new().with_ticks(5);
        let counters = builder.counters();
        let (controller, status) = start(builder, "Fake");
        let shared = Arc::clone(controller.shared());

        let report = controller.join().unwrap();
        assert_eq!(report.title, "Fake");
        assert_eq!(report.seed, 99);
        assert_eq!(report.ticks, 5);
        assert!(!report.stopped_early);

        assert_eq!(
            statuses(&status),
            vec![
                ReplayStatus::Preparing,
                ReplayStatus::Replaying,
                ReplayStatus::Finished
            ]
        );
        assert!(shared.is_ready());
        assert!(shared.has_exited());
        assert_eq!(shared.host_status(), Some(HostStatus::ShutDown));
        assert_eq!(counters.shutdowns(), 1);
        assert!(counters.cleanups() >= 1);
    }

    #[test]
    fn test_unknown_title_fails_before_preparing() {
        let builder = FakeBuilder::new();
        let counters = builder.counters();
        let (controller, status) = start(builder, "NoSuchRecording");

        match controller.join() {
            Err(HarnessError::SessionNotFound { title }) => assert_eq!(title, "NoSuchRecording"),
            other => panic!("expected SessionNotFound, got {:?}", other),
        }
        assert!(status.history().is_empty());
        assert_eq!(status.get(), ReplayStatus::None);
        // The half-started host was still shut down
        assert_eq!(counters.shutdowns(), 1);
    }

    #[test]
    fn test_initialize_failure_is_captured() {
        let builder = FakeBuilder::new().failing_initialize();
        let counters = builder.counters();
        let (controller, status) = start(builder, "Fake");
        let shared = Arc::clone(controller.shared());

        match controller.join() {
            Err(HarnessError::HostLifecycleFailure { stage, .. }) => {
                assert_eq!(stage, LifecycleStage::Initialize)
            }
            other => panic!("expected lifecycle failure, got {:?}", other),
        }
        assert!(!shared.is_ready());
        assert_eq!(status.get(), ReplayStatus::None);
        assert_eq!(counters.shutdowns(), 1);
    }

    #[test]
    fn test_panic_in_tick_loop_keeps_status() {
        let builder = FakeBuilder::new().with_ticks(100).panicking_on_tick(3);
        let counters = builder.counters();
        let (controller, status) = start(builder, "Fake");

        match controller.join() {
            Err(HarnessError::HostLifecycleFailure {
                stage,
                message,
                last_status,
                ..
            }) => {
                assert_eq!(stage, LifecycleStage::TickLoop);
                assert!(message.contains("fake host panicked"));
                assert_eq!(last_status, ReplayStatus::Replaying);
            }
            other => panic!("expected lifecycle failure, got {:?}", other),
        }
        // Never advanced past the failure
        assert_eq!(status.get(), ReplayStatus::Replaying);
        assert_eq!(counters.shutdowns(), 1);
    }

    #[test]
    fn test_stop_request_ends_loop() {
        let builder = FakeBuilder::new().with_ticks(u64::MAX).with_tick_delay_ms(1);
        let (controller, status) = start(builder, "Fake");

        while status.get() != ReplayStatus::Replaying && !controller.is_finished() {
            std::thread::sleep(std::time::Duration::from_millis(1));
        }
        controller.request_stop();

        let report = controller.join().unwrap();
        assert!(report.stopped_early);
        assert_eq!(status.get(), ReplayStatus::Finished);
    }

    #[test]
    fn test_host_runs_on_named_thread() {
        let builder = FakeBuilder::new();
        let counters = builder.counters();
        let (controller, _) = start(builder, "Fake");
        controller.join().unwrap();
        assert_eq!(counters.built_on().as_deref(), Some(HOST_THREAD_NAME));
    }
}

//! One-call acceptance tests over a [`ReplayHarness`]

use super::config::HarnessConfig;
use super::error::{HarnessError, HarnessResult};
use super::replay::{ReplayHarness, ReplayScenario};
use super::report::SessionReport;
use crate::constants::HOST_THREAD_NAME;
use crate::host::{HostBuilder, ViewOf};
use crate::recording::SessionLibrary;

/// A scenario that also knows which recording it replays
pub trait AcceptanceTest<V>: ReplayScenario<V> {
    fn title(&self) -> &str;

    fn headless(&self) -> bool {
        true
    }
}

/// Runs an [`AcceptanceTest`] end to end: `run_test` followed by `teardown`
pub struct AcceptanceHarness<B: HostBuilder> {
    harness: ReplayHarness<B>,
}

impl<B: HostBuilder> AcceptanceHarness<B> {
    pub fn new(builder: B, library: impl SessionLibrary + 'static, config: HarnessConfig) -> Self {
        Self {
            harness: ReplayHarness::new(builder, library, config),
        }
    }

    pub fn from_harness(harness: ReplayHarness<B>) -> Self {
        Self { harness }
    }

    pub fn harness(&self) -> &ReplayHarness<B> {
        &self.harness
    }

    /// Replay the test's recording and run its checkpoints.
    ///
    /// Teardown always runs. If both the test and the teardown fail, the
    /// error carries both.
    pub fn run<T>(&mut self, test: &mut T) -> HarnessResult<SessionReport>
    where
        T: AcceptanceTest<ViewOf<B>> + ?Sized,
    {
        let title = test.title().to_string();
        let headless = test.headless();

        let run = self.harness.run_test(&title, headless, test);
        let teardown = self.harness.teardown();
        let ((), report) = HarnessError::combine(run, teardown)?;

        report.ok_or_else(|| HarnessError::WorkerFailed {
            name: HOST_THREAD_NAME.to_string(),
            message: format!("session '{}' ended without a report", title),
        })
    }
}

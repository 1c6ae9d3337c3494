//! In-memory adapters.
//!
//! Used by the test suite and by `forge-dispatch dispatch --dry-run`, where
//! nothing should leave the process.

mod recording;
mod repositories;

use std::sync::Arc;

pub use recording::{FakeTestExecutor, RecordingJobQueue, RecordingStatusReporter};
pub use repositories::{InMemoryBuildRepository, InMemoryTestRunRepository, InMemoryTriggerRepository};

use crate::services::context::ServiceContext;
use crate::services::metrics::Metrics;

/// Concrete in-memory ports, kept typed so their recordings stay reachable.
#[derive(Debug, Clone, Default)]
pub struct InMemoryServices {
    /// Trigger rows.
    pub triggers: Arc<InMemoryTriggerRepository>,
    /// Build rows.
    pub builds: Arc<InMemoryBuildRepository>,
    /// Test run rows.
    pub test_runs: Arc<InMemoryTestRunRepository>,
    /// Records submitted jobs.
    pub queue: Arc<RecordingJobQueue>,
    /// Records status reports.
    pub reporter: Arc<RecordingStatusReporter>,
    /// Records test submissions.
    pub executor: Arc<FakeTestExecutor>,
    /// Counters shared with the context.
    pub metrics: Arc<Metrics>,
}

impl InMemoryServices {
    /// Empty ports.
    pub fn new() -> Self {
        Self::default()
    }

    /// A service context sharing these ports and metrics.
    pub fn services(&self) -> ServiceContext {
        ServiceContext::new(
            self.triggers.clone(),
            self.builds.clone(),
            self.test_runs.clone(),
            self.queue.clone(),
            self.reporter.clone(),
            self.executor.clone(),
        )
        .with_metrics(self.metrics.clone())
    }

    /// [`InMemoryServices::services`] behind an `Arc`.
    pub fn context(&self) -> Arc<ServiceContext> {
        Arc::new(self.services())
    }
}

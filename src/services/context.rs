//! Collaborators shared by every handler.

use std::sync::Arc;

use crate::domain::models::config::ServiceConfig;
use crate::domain::ports::{
    BuildRepository, JobQueue, StatusReporter, TestExecutor, TestRunRepository, TriggerRepository,
};
use crate::services::metrics::Metrics;
use crate::services::urls::DashboardUrls;

/// Ports and settings a dispatch pass works with.
#[derive(Clone)]
pub struct ServiceContext {
    /// Project and trigger rows builds and runs hang off.
    pub triggers: Arc<dyn TriggerRepository>,
    /// Stored build artifacts.
    pub builds: Arc<dyn BuildRepository>,
    /// Stored Testing Farm runs.
    pub test_runs: Arc<dyn TestRunRepository>,
    /// Where build and test jobs are submitted.
    pub queue: Arc<dyn JobQueue>,
    /// Commit status sink.
    pub reporter: Arc<dyn StatusReporter>,
    /// Test submission backend.
    pub executor: Arc<dyn TestExecutor>,
    /// Counters shared with the rest of the process.
    pub metrics: Arc<Metrics>,
    /// Service-wide settings such as the dashboard URL.
    pub settings: ServiceConfig,
}

impl ServiceContext {
    /// Builds a context with fresh metrics and default settings.
    pub fn new(
        triggers: Arc<dyn TriggerRepository>,
        builds: Arc<dyn BuildRepository>,
        test_runs: Arc<dyn TestRunRepository>,
        queue: Arc<dyn JobQueue>,
        reporter: Arc<dyn StatusReporter>,
        executor: Arc<dyn TestExecutor>,
    ) -> Self {
        Self {
            triggers,
            builds,
            test_runs,
            queue,
            reporter,
            executor,
            metrics: Arc::new(Metrics::new()),
            settings: ServiceConfig::default(),
        }
    }

    /// Replaces the service settings.
    pub fn with_settings(mut self, settings: ServiceConfig) -> Self {
        self.settings = settings;
        self
    }

    /// Shares an existing metrics registry.
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Dashboard links for the configured base URL.
    pub fn urls(&self) -> DashboardUrls {
        DashboardUrls::new(&self.settings.dashboard_url)
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

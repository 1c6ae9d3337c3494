//! Ingestion of Testing Farm completion callbacks.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::domain::models::job::HandlerResult;
use crate::domain::models::status::{test_check_name, CommitState, StatusReport};
use crate::domain::models::test_run::{TestResultCallback, TestRun, TestingFarmResult};
use crate::services::context::ServiceContext;

/// Label of the external log link on reports.
pub const TESTING_FARM_LINK: &str = "Testing Farm";

/// Maps a callback result to the reported state and default description.
pub fn result_state(result: TestingFarmResult) -> (CommitState, &'static str) {
    match result {
        TestingFarmResult::Running => (CommitState::Running, "Tests are running ..."),
        TestingFarmResult::Passed => (CommitState::Success, "Tests passed ..."),
        TestingFarmResult::Error => (CommitState::Error, "Error ..."),
        TestingFarmResult::Failed | TestingFarmResult::Unknown => {
            (CommitState::Failure, "Tests failed ...")
        }
    }
}

/// Applies callbacks to stored test runs and reports the outcome.
#[derive(Debug, Clone)]
pub struct ResultIngestor {
    services: Arc<ServiceContext>,
}

impl ResultIngestor {
    /// Creates an ingestor over the shared services.
    pub fn new(services: Arc<ServiceContext>) -> Self {
        Self { services }
    }

    /// Ingest one callback. Always succeeds; an unknown pipeline only
    /// degrades the report.
    #[instrument(skip(self, callback), fields(pipeline_id = %callback.pipeline_id, result = ?callback.result))]
    pub async fn ingest(&self, callback: &TestResultCallback) -> HandlerResult {
        let run = match self
            .services
            .test_runs
            .get_by_pipeline_id(&callback.pipeline_id)
            .await
        {
            Ok(run) => run,
            Err(e) => {
                warn!(error = %e, "Test run lookup failed");
                None
            }
        };
        if run.is_none() {
            warn!("Unknown pipeline ID, reporting from callback only");
        }

        let (state, default_description) = result_state(callback.result);
        let description = callback
            .summary
            .clone()
            .unwrap_or_else(|| default_description.to_string());

        if let Some(run) = &run {
            self.update_run(run, callback).await;
        }

        if callback.result == TestingFarmResult::Running {
            self.services.metrics.test_run_started();
        } else {
            let duration = run
                .as_ref()
                .and_then(|run| (Utc::now() - run.submitted_at).to_std().ok());
            self.services.metrics.test_run_finished(duration);
        }

        let url = match &run {
            Some(run) => self.services.urls().testing_farm(run.id),
            None => callback.log_url.clone().unwrap_or_default(),
        };
        let chroot = callback
            .copr_chroot
            .clone()
            .or_else(|| run.as_ref().map(|run| run.target.clone()));

        let mut report = StatusReport::new(state, description)
            .with_url(url)
            .with_check_names(chroot.as_deref().map(test_check_name).into_iter().collect())
            .with_commit_sha(run.as_ref().and_then(|run| run.commit_sha.clone()))
            .with_trigger(run.as_ref().and_then(|run| run.trigger));
        if let Some(log_url) = &callback.log_url {
            report = report.with_external_link(TESTING_FARM_LINK, log_url.clone());
        }

        if let Err(e) = self.services.reporter.report(&report).await {
            warn!(error = %e, "Failed to report test result");
        }
        info!(state = state.as_str(), "Test result ingested");

        HandlerResult::success()
    }

    async fn update_run(&self, run: &TestRun, callback: &TestResultCallback) {
        let status = callback.result.to_test_status();
        if let Err(e) = self
            .services
            .test_runs
            .set_status(&run.pipeline_id, status)
            .await
        {
            warn!(error = %e, "Failed to update test run status");
        }
        if let Some(log_url) = &callback.log_url {
            if let Err(e) = self
                .services
                .test_runs
                .set_log_url(&run.pipeline_id, log_url)
                .await
            {
                warn!(error = %e, "Failed to store test run log URL");
            }
        }
    }
}

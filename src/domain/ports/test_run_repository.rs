//! Repository port for test runs.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::test_run::{TestRun, TestStatus};

/// Persistence of Testing Farm runs keyed by pipeline ID.
#[async_trait]
pub trait TestRunRepository: Send + Sync {
    /// Record a new run. Fails if the pipeline ID is already known.
    async fn create(&self, run: &TestRun) -> DomainResult<()>;

    /// Look up a run by its Testing Farm pipeline ID.
    async fn get_by_pipeline_id(&self, pipeline_id: &str) -> DomainResult<Option<TestRun>>;

    async fn set_status(&self, pipeline_id: &str, status: TestStatus) -> DomainResult<()>;

    async fn set_log_url(&self, pipeline_id: &str, log_url: &str) -> DomainResult<()>;

    /// All runs, newest first.
    async fn list(&self) -> DomainResult<Vec<TestRun>>;
}

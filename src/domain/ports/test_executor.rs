//! Port for the external test execution service.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::trigger::TriggerReference;

/// Everything needed to start one test run on one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestRunRequest {
    /// Chroot to test on.
    pub target: String,
    /// Commit under test.
    pub commit_sha: String,
    /// Build whose artifacts are installed.
    pub build_id: Uuid,
    /// Forge project, when known.
    pub project_url: Option<String>,
    /// Trigger the run is attached to.
    pub trigger: Option<TriggerReference>,
}

/// Accepted submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSubmission {
    /// Identifier quoted by the completion callback.
    pub pipeline_id: String,
}

/// Starts test runs on the external service.
#[async_trait]
pub trait TestExecutor: Send + Sync {
    /// Submit a test run; the returned pipeline ID identifies its callback.
    async fn submit(&self, request: &TestRunRequest) -> DomainResult<TestSubmission>;
}

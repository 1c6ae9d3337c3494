//! Recording queue, reporter and test executor.
//!
//! Each keeps what it was asked to do so callers can inspect it afterwards.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use super::repositories::lock;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::status::StatusReport;
use crate::domain::ports::{
    JobQueue, StatusReporter, TaskName, TestExecutor, TestRunRequest, TestSubmission,
};

/// Job queue that keeps every submission.
#[derive(Debug, Default)]
pub struct RecordingJobQueue {
    submitted: Mutex<Vec<(TaskName, Value)>>,
    unavailable: Mutex<bool>,
}

impl RecordingJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every accepted submission, oldest first.
    pub fn submitted(&self) -> Vec<(TaskName, Value)> {
        lock(&self.submitted).clone()
    }

    /// Make subsequent submissions fail.
    pub fn set_unavailable(&self, unavailable: bool) {
        *lock(&self.unavailable) = unavailable;
    }
}

#[async_trait]
impl JobQueue for RecordingJobQueue {
    async fn submit(&self, task: TaskName, kwargs: Value) -> DomainResult<()> {
        if *lock(&self.unavailable) {
            return Err(DomainError::SubmissionFailed {
                task: task.to_string(),
                reason: "queue unavailable".to_string(),
            });
        }
        lock(&self.submitted).push((task, kwargs));
        Ok(())
    }
}

/// Status reporter that keeps every report in order.
#[derive(Debug, Default)]
pub struct RecordingStatusReporter {
    reports: Mutex<Vec<StatusReport>>,
}

impl RecordingStatusReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every report, oldest first.
    pub fn reports(&self) -> Vec<StatusReport> {
        lock(&self.reports).clone()
    }
}

#[async_trait]
impl StatusReporter for RecordingStatusReporter {
    async fn report(&self, report: &StatusReport) -> DomainResult<()> {
        lock(&self.reports).push(report.clone());
        Ok(())
    }
}

/// Test executor that hands out fresh pipeline IDs.
///
/// Targets registered with [`FakeTestExecutor::fail_target`] are refused.
#[derive(Debug, Default)]
pub struct FakeTestExecutor {
    requests: Mutex<Vec<TestRunRequest>>,
    failing: Mutex<HashSet<String>>,
}

impl FakeTestExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every accepted request, oldest first.
    pub fn requests(&self) -> Vec<TestRunRequest> {
        lock(&self.requests).clone()
    }

    /// Refuse future submissions for `target`.
    pub fn fail_target(&self, target: &str) {
        lock(&self.failing).insert(target.to_string());
    }
}

#[async_trait]
impl TestExecutor for FakeTestExecutor {
    async fn submit(&self, request: &TestRunRequest) -> DomainResult<TestSubmission> {
        lock(&self.requests).push(request.clone());
        if lock(&self.failing).contains(&request.target) {
            return Err(DomainError::ExecutionFailed(format!(
                "{} is not available",
                request.target
            )));
        }
        Ok(TestSubmission {
            pipeline_id: Uuid::new_v4().to_string(),
        })
    }
}

//! Test run model and the Testing Farm completion callback.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::models::trigger::TriggerReference;

/// Local status of a submitted test run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    Queued,
    Running,
    Passed,
    Failed,
    Error,
}

impl TestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Error => "error",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(Self::Queued),
            "running" => Some(Self::Running),
            "passed" => Some(Self::Passed),
            "failed" => Some(Self::Failed),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Passed | Self::Failed | Self::Error)
    }
}

/// Result value declared by a Testing Farm callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestingFarmResult {
    Running,
    Passed,
    Failed,
    Error,
    /// Missing or unrecognized result value.
    #[serde(other)]
    Unknown,
}

impl Default for TestingFarmResult {
    fn default() -> Self {
        Self::Unknown
    }
}

impl TestingFarmResult {
    /// Status stored on the run record. The callback is authoritative.
    pub fn to_test_status(self) -> TestStatus {
        match self {
            Self::Running => TestStatus::Running,
            Self::Passed => TestStatus::Passed,
            Self::Error => TestStatus::Error,
            Self::Failed | Self::Unknown => TestStatus::Failed,
        }
    }
}

/// Completion callback received from Testing Farm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResultCallback {
    pub pipeline_id: String,
    #[serde(default)]
    pub result: TestingFarmResult,
    #[serde(default)]
    pub log_url: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub copr_chroot: Option<String>,
}

/// A test execution submitted to Testing Farm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestRun {
    pub id: Uuid,
    pub pipeline_id: String,
    pub target: String,
    pub commit_sha: Option<String>,
    pub status: TestStatus,
    pub submitted_at: DateTime<Utc>,
    pub log_url: Option<String>,
    pub build_id: Option<Uuid>,
    pub trigger: Option<TriggerReference>,
}

impl TestRun {
    pub fn new(pipeline_id: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            pipeline_id: pipeline_id.into(),
            target: target.into(),
            commit_sha: None,
            status: TestStatus::Queued,
            submitted_at: Utc::now(),
            log_url: None,
            build_id: None,
            trigger: None,
        }
    }

    pub fn with_commit_sha(mut self, sha: Option<String>) -> Self {
        self.commit_sha = sha;
        self
    }

    pub fn with_build(mut self, build_id: Uuid) -> Self {
        self.build_id = Some(build_id);
        self
    }

    pub fn with_trigger(mut self, trigger: Option<TriggerReference>) -> Self {
        self.trigger = trigger;
        self
    }

    pub fn with_submitted_at(mut self, submitted_at: DateTime<Utc>) -> Self {
        self.submitted_at = submitted_at;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_deserialization_minimal() {
        let callback: TestResultCallback =
            serde_json::from_str(r#"{"pipeline_id": "abc", "result": "passed"}"#).unwrap();
        assert_eq!(callback.pipeline_id, "abc");
        assert_eq!(callback.result, TestingFarmResult::Passed);
        assert!(callback.log_url.is_none());
        assert!(callback.copr_chroot.is_none());
    }

    #[test]
    fn test_callback_unknown_result() {
        let callback: TestResultCallback =
            serde_json::from_str(r#"{"pipeline_id": "abc", "result": "skipped"}"#).unwrap();
        assert_eq!(callback.result, TestingFarmResult::Unknown);

        let callback: TestResultCallback = serde_json::from_str(r#"{"pipeline_id": "abc"}"#).unwrap();
        assert_eq!(callback.result, TestingFarmResult::Unknown);
        assert_eq!(callback.result.to_test_status(), TestStatus::Failed);
    }

    #[test]
    fn test_result_to_status() {
        assert_eq!(TestingFarmResult::Running.to_test_status(), TestStatus::Running);
        assert_eq!(TestingFarmResult::Passed.to_test_status(), TestStatus::Passed);
        assert_eq!(TestingFarmResult::Failed.to_test_status(), TestStatus::Failed);
        assert_eq!(TestingFarmResult::Error.to_test_status(), TestStatus::Error);
    }
}

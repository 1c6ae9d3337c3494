//! Build artifact model.
//!
//! Builds are produced by the external build service; dispatch only reads
//! them to decide whether tests can run.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a build in the build service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStatus {
    Queued,
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl BuildStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "queued" => Some(Self::Queued),
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "succeeded" | "success" => Some(Self::Succeeded),
            "failed" | "failure" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// Reference to a build of one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildArtifactRef {
    pub build_id: Uuid,
    pub target: String,
    pub commit_sha: String,
    pub status: BuildStatus,
}

impl BuildArtifactRef {
    pub fn new(target: impl Into<String>, commit_sha: impl Into<String>, status: BuildStatus) -> Self {
        Self {
            build_id: Uuid::new_v4(),
            target: target.into(),
            commit_sha: commit_sha.into(),
            status,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.status == BuildStatus::Succeeded
    }
}

//! Outbound task queue port.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::errors::DomainResult;

/// Named task understood by the workers behind the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskName {
    #[serde(rename = "task.run_copr_build")]
    RunCoprBuild,
    #[serde(rename = "task.run_koji_build")]
    RunKojiBuild,
    #[serde(rename = "task.run_testing_farm")]
    RunTestingFarm,
}

impl TaskName {
    /// Task name as the worker knows it.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RunCoprBuild => "task.run_copr_build",
            Self::RunKojiBuild => "task.run_koji_build",
            Self::RunTestingFarm => "task.run_testing_farm",
        }
    }
}

impl std::fmt::Display for TaskName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fire-and-forget job submission.
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn submit(&self, task: TaskName, kwargs: Value) -> DomainResult<()>;
}

//! JSON-lines job spool.
//!
//! Submitted jobs are appended to a file, one [`SpoolRecord`] per line, for
//! an external worker to pick up.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::{JobQueue, TaskName, TestExecutor, TestRunRequest, TestSubmission};

/// One spooled job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpoolRecord {
    /// Worker task to run.
    pub task: TaskName,
    /// Task arguments.
    pub kwargs: Value,
    /// When the job was spooled.
    pub submitted_at: DateTime<Utc>,
}

/// Job queue that appends to a JSON-lines file.
#[derive(Debug, Clone)]
pub struct SpoolJobQueue {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl SpoolJobQueue {
    /// Spool appending to `path`, created on first submit.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// The spool file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every record spooled so far, oldest first. A missing file is empty.
    pub async fn read_all(&self) -> DomainResult<Vec<SpoolRecord>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(DomainError::from))
            .collect()
    }

    async fn append(&self, record: &SpoolRecord) -> std::io::Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await
    }
}

#[async_trait]
impl JobQueue for SpoolJobQueue {
    async fn submit(&self, task: TaskName, kwargs: Value) -> DomainResult<()> {
        let record = SpoolRecord {
            task,
            kwargs,
            submitted_at: Utc::now(),
        };
        self.append(&record)
            .await
            .map_err(|e| DomainError::SubmissionFailed {
                task: task.to_string(),
                reason: e.to_string(),
            })?;
        info!(task = %task, path = %self.path.display(), "Job spooled");
        Ok(())
    }
}

/// Test executor that hands submissions to the job queue.
///
/// The pipeline ID is allocated up front and travels with the job, so the
/// worker's completion callback can quote it.
#[derive(Clone)]
pub struct QueuedTestExecutor {
    queue: Arc<dyn JobQueue>,
}

impl QueuedTestExecutor {
    /// Executor submitting through `queue`.
    pub fn new(queue: Arc<dyn JobQueue>) -> Self {
        Self { queue }
    }
}

#[async_trait]
impl TestExecutor for QueuedTestExecutor {
    async fn submit(&self, request: &TestRunRequest) -> DomainResult<TestSubmission> {
        let pipeline_id = Uuid::new_v4().to_string();
        let kwargs = json!({
            "pipeline_id": pipeline_id,
            "request": request,
        });
        self.queue.submit(TaskName::RunTestingFarm, kwargs).await?;
        Ok(TestSubmission { pipeline_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_submissions_are_appended_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let queue = SpoolJobQueue::new(dir.path().join("spool").join("jobs.jsonl"));

        assert!(queue.read_all().await.unwrap().is_empty());
        queue.submit(TaskName::RunCoprBuild, json!({"n": 1})).await.unwrap();
        queue.submit(TaskName::RunKojiBuild, json!({"n": 2})).await.unwrap();

        let records = queue.read_all().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].task, TaskName::RunCoprBuild);
        assert_eq!(records[1].kwargs["n"], 2);

        let raw = std::fs::read_to_string(queue.path()).unwrap();
        assert!(raw.lines().next().unwrap().contains("\"task.run_copr_build\""));
    }

    #[tokio::test]
    async fn test_unreadable_spool_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let queue = SpoolJobQueue::new(dir.path());

        let err = queue.read_all().await.unwrap_err();
        assert!(matches!(err, DomainError::IoError(_)), "unexpected error: {err:?}");
    }

    #[tokio::test]
    async fn test_queued_executor_spools_testing_farm_job() {
        let dir = tempfile::tempdir().unwrap();
        let queue = Arc::new(SpoolJobQueue::new(dir.path().join("jobs.jsonl")));
        let executor = QueuedTestExecutor::new(queue.clone());

        let request = TestRunRequest {
            target: "fedora-35-x86_64".to_string(),
            commit_sha: "abc".to_string(),
            build_id: Uuid::new_v4(),
            project_url: None,
            trigger: None,
        };
        let submission = executor.submit(&request).await.unwrap();

        let records = queue.read_all().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].task, TaskName::RunTestingFarm);
        assert_eq!(records[0].kwargs["pipeline_id"], submission.pipeline_id.as_str());
        assert_eq!(records[0].kwargs["request"]["target"], "fedora-35-x86_64");
    }
}

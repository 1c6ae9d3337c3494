//! Common test utilities for integration tests
//!
//! Webhook payload builders and service fixtures shared by the test files.

#![allow(dead_code)]

use std::sync::Arc;

use serde_json::{json, Value};
use uuid::Uuid;

use forge_dispatch::adapters::memory::{
    FakeTestExecutor, RecordingJobQueue, RecordingStatusReporter,
};
use forge_dispatch::adapters::sqlite::{
    create_migrated_test_pool, SqliteBuildRepository, SqliteTestRunRepository,
    SqliteTriggerRepository,
};
use forge_dispatch::domain::models::job::RepositoryConfig;
use forge_dispatch::services::{HandlerRegistry, JobDispatcher, ServiceContext};

pub const PROJECT_URL: &str = "https://github.com/packit-service/hello-world";
pub const HEAD_SHA: &str = "0f7a6c2c5c1b1f3f2f6e9d4b3a2c1d0e9f8a7b6c";

/// Initialize tracing for test output; repeated calls are harmless.
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub fn pr_comment(pr_id: u64, body: &str) -> Value {
    json!({
        "action": "created",
        "issue": {"number": pr_id, "pull_request": {"url": format!("{PROJECT_URL}/pull/{pr_id}")}},
        "pull_request": {"number": pr_id, "head": {"sha": HEAD_SHA}},
        "comment": {"body": body, "user": {"login": "contributor"}},
        "repository": {"html_url": PROJECT_URL},
        "sender": {"login": "contributor"}
    })
}

pub fn pull_request_opened(pr_id: u64) -> Value {
    json!({
        "action": "opened",
        "number": pr_id,
        "pull_request": {"number": pr_id, "head": {"sha": HEAD_SHA, "ref": "feature"}},
        "repository": {"html_url": PROJECT_URL},
        "sender": {"login": "contributor"}
    })
}

pub fn push(branch: &str) -> Value {
    json!({
        "ref": format!("refs/heads/{branch}"),
        "after": HEAD_SHA,
        "commits": [{"id": HEAD_SHA}],
        "pusher": {"name": "maintainer"},
        "repository": {"html_url": PROJECT_URL}
    })
}

pub fn build_end(build_id: Uuid, chroot: &str, status: &str) -> Value {
    json!({
        "build_id": build_id.to_string(),
        "chroot": chroot,
        "status": status,
        "commit_sha": HEAD_SHA,
        "project_url": PROJECT_URL
    })
}

pub fn tf_callback(pipeline_id: &str, result: &str) -> Value {
    json!({
        "pipeline_id": pipeline_id,
        "result": result,
        "log_url": format!("https://artifacts.example.org/{pipeline_id}")
    })
}

pub fn repo_config(yaml: &str) -> Arc<RepositoryConfig> {
    Arc::new(RepositoryConfig::from_yaml(yaml).expect("valid job configuration"))
}

/// SQLite storage with recording queue, reporter and executor.
pub struct SqliteServices {
    pub queue: Arc<RecordingJobQueue>,
    pub reporter: Arc<RecordingStatusReporter>,
    pub executor: Arc<FakeTestExecutor>,
    pub builds: Arc<SqliteBuildRepository>,
    pub test_runs: Arc<SqliteTestRunRepository>,
    pub triggers: Arc<SqliteTriggerRepository>,
    pub context: Arc<ServiceContext>,
}

impl SqliteServices {
    pub async fn new() -> Self {
        let pool = create_migrated_test_pool().await.expect("migrated test pool");
        let queue = Arc::new(RecordingJobQueue::new());
        let reporter = Arc::new(RecordingStatusReporter::new());
        let executor = Arc::new(FakeTestExecutor::new());
        let triggers = Arc::new(SqliteTriggerRepository::new(pool.clone()));
        let builds = Arc::new(SqliteBuildRepository::new(pool.clone()));
        let test_runs = Arc::new(SqliteTestRunRepository::new(pool));
        let context = Arc::new(ServiceContext::new(
            triggers.clone(),
            builds.clone(),
            test_runs.clone(),
            queue.clone(),
            reporter.clone(),
            executor.clone(),
        ));
        Self {
            queue,
            reporter,
            executor,
            builds,
            test_runs,
            triggers,
            context,
        }
    }

    pub fn dispatcher(&self) -> JobDispatcher {
        JobDispatcher::new(Arc::new(HandlerRegistry::builtin()), self.context.clone())
    }
}

//! SQLite implementation of the TestRunRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::adapters::sqlite::{
    parse_datetime, parse_optional_uuid, parse_trigger_reference, parse_uuid,
};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::test_run::{TestRun, TestStatus};
use crate::domain::ports::TestRunRepository;

const COLUMNS: &str = "id, pipeline_id, target, commit_sha, status, submitted_at, log_url, \
                       build_id, trigger_kind, trigger_id";

#[derive(Clone)]
pub struct SqliteTestRunRepository {
    pool: SqlitePool,
}

impl SqliteTestRunRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn update(&self, sql: &str, value: &str, pipeline_id: &str) -> DomainResult<()> {
        let result = sqlx::query(sql)
            .bind(value)
            .bind(pipeline_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::TestRunNotFound(pipeline_id.to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TestRunRow {
    id: String,
    pipeline_id: String,
    target: String,
    commit_sha: Option<String>,
    status: String,
    submitted_at: String,
    log_url: Option<String>,
    build_id: Option<String>,
    trigger_kind: Option<String>,
    trigger_id: Option<String>,
}

fn row_to_run(row: TestRunRow) -> DomainResult<TestRun> {
    let status = TestStatus::from_str(&row.status).ok_or_else(|| {
        DomainError::SerializationError(format!("Unknown test status: {}", row.status))
    })?;

    Ok(TestRun {
        id: parse_uuid(&row.id)?,
        pipeline_id: row.pipeline_id,
        target: row.target,
        commit_sha: row.commit_sha,
        status,
        submitted_at: parse_datetime(&row.submitted_at)?,
        log_url: row.log_url,
        build_id: parse_optional_uuid(row.build_id)?,
        trigger: parse_trigger_reference(row.trigger_kind, row.trigger_id)?,
    })
}

#[async_trait]
impl TestRunRepository for SqliteTestRunRepository {
    async fn create(&self, run: &TestRun) -> DomainResult<()> {
        sqlx::query(&format!(
            "INSERT INTO test_runs ({COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(run.id.to_string())
        .bind(&run.pipeline_id)
        .bind(&run.target)
        .bind(&run.commit_sha)
        .bind(run.status.as_str())
        .bind(run.submitted_at.to_rfc3339())
        .bind(&run.log_url)
        .bind(run.build_id.map(|id| id.to_string()))
        .bind(run.trigger.map(|t| t.kind.as_str()))
        .bind(run.trigger.map(|t| t.id.to_string()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_by_pipeline_id(&self, pipeline_id: &str) -> DomainResult<Option<TestRun>> {
        let row: Option<TestRunRow> =
            sqlx::query_as(&format!("SELECT {COLUMNS} FROM test_runs WHERE pipeline_id = ?"))
                .bind(pipeline_id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(row_to_run).transpose()
    }

    async fn set_status(&self, pipeline_id: &str, status: TestStatus) -> DomainResult<()> {
        self.update(
            "UPDATE test_runs SET status = ? WHERE pipeline_id = ?",
            status.as_str(),
            pipeline_id,
        )
        .await
    }

    async fn set_log_url(&self, pipeline_id: &str, log_url: &str) -> DomainResult<()> {
        self.update(
            "UPDATE test_runs SET log_url = ? WHERE pipeline_id = ?",
            log_url,
            pipeline_id,
        )
        .await
    }

    async fn list(&self) -> DomainResult<Vec<TestRun>> {
        let rows: Vec<TestRunRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM test_runs ORDER BY submitted_at DESC, rowid DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_run).collect()
    }
}

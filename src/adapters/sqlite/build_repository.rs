//! SQLite implementation of the BuildRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::adapters::sqlite::{parse_trigger_reference, parse_uuid};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::build::{BuildArtifactRef, BuildStatus};
use crate::domain::models::trigger::TriggerReference;
use crate::domain::ports::BuildRepository;

#[derive(Clone)]
pub struct SqliteBuildRepository {
    pool: SqlitePool,
}

impl SqliteBuildRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct BuildRow {
    build_id: String,
    target: String,
    commit_sha: String,
    status: String,
}

fn row_to_build(row: BuildRow) -> DomainResult<BuildArtifactRef> {
    let status = BuildStatus::from_str(&row.status).ok_or_else(|| {
        DomainError::SerializationError(format!("Unknown build status: {}", row.status))
    })?;
    Ok(BuildArtifactRef {
        build_id: parse_uuid(&row.build_id)?,
        target: row.target,
        commit_sha: row.commit_sha,
        status,
    })
}

#[async_trait]
impl BuildRepository for SqliteBuildRepository {
    async fn find_latest_build(
        &self,
        target: &str,
        commit_sha: &str,
    ) -> DomainResult<Option<BuildArtifactRef>> {
        let row: Option<BuildRow> = sqlx::query_as(
            "SELECT build_id, target, commit_sha, status FROM builds
             WHERE target = ? AND commit_sha = ?
             ORDER BY seq DESC LIMIT 1",
        )
        .bind(target)
        .bind(commit_sha)
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_build).transpose()
    }

    async fn get_build(&self, build_id: Uuid) -> DomainResult<Option<BuildArtifactRef>> {
        let row: Option<BuildRow> = sqlx::query_as(
            "SELECT build_id, target, commit_sha, status FROM builds WHERE build_id = ?",
        )
        .bind(build_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_build).transpose()
    }

    async fn create_build(
        &self,
        build: &BuildArtifactRef,
        trigger: Option<TriggerReference>,
    ) -> DomainResult<()> {
        sqlx::query(
            r#"INSERT INTO builds
               (build_id, target, commit_sha, status, trigger_kind, trigger_id, created_at, seq)
               VALUES (?, ?, ?, ?, ?, ?, ?, (SELECT COALESCE(MAX(seq), 0) + 1 FROM builds))"#,
        )
        .bind(build.build_id.to_string())
        .bind(&build.target)
        .bind(&build.commit_sha)
        .bind(build.status.as_str())
        .bind(trigger.map(|t| t.kind.as_str()))
        .bind(trigger.map(|t| t.id.to_string()))
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_status(&self, build_id: Uuid, status: BuildStatus) -> DomainResult<()> {
        let result = sqlx::query("UPDATE builds SET status = ? WHERE build_id = ?")
            .bind(status.as_str())
            .bind(build_id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::BuildNotFound(build_id));
        }
        Ok(())
    }

    async fn trigger_of_build(&self, build_id: Uuid) -> DomainResult<Option<TriggerReference>> {
        let row: Option<(Option<String>, Option<String>)> =
            sqlx::query_as("SELECT trigger_kind, trigger_id FROM builds WHERE build_id = ?")
                .bind(build_id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some((kind, id)) => parse_trigger_reference(kind, id),
            None => Ok(None),
        }
    }
}

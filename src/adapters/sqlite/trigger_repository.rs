//! SQLite implementation of the TriggerRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::adapters::sqlite::parse_uuid;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::trigger::{
    ProjectCoordinates, StoredTrigger, TriggerKey, TriggerKind, TriggerReference,
};
use crate::domain::ports::TriggerRepository;

#[derive(Clone)]
pub struct SqliteTriggerRepository {
    pool: SqlitePool,
}

impl SqliteTriggerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TriggerRow {
    id: String,
    kind: String,
    namespace: String,
    repo: String,
    project_url: String,
    natural_key: String,
    commit_sha: Option<String>,
}

fn parse_kind(kind: &str) -> DomainResult<TriggerKind> {
    TriggerKind::from_str(kind)
        .ok_or_else(|| DomainError::SerializationError(format!("Unknown trigger kind: {kind}")))
}

fn parse_number(value: &str) -> DomainResult<u64> {
    value
        .parse()
        .map_err(|_| DomainError::SerializationError(format!("Invalid numeric key: {value}")))
}

fn row_to_trigger(row: TriggerRow) -> DomainResult<StoredTrigger> {
    let kind = parse_kind(&row.kind)?;
    let key = match kind {
        TriggerKind::PullRequest => TriggerKey::PullRequest {
            pr_id: parse_number(&row.natural_key)?,
        },
        TriggerKind::Branch => TriggerKey::Branch {
            name: row.natural_key,
        },
        TriggerKind::Release => TriggerKey::Release {
            tag_name: row.natural_key,
            commit_sha: row.commit_sha,
        },
        TriggerKind::Issue => TriggerKey::Issue {
            issue_id: parse_number(&row.natural_key)?,
        },
    };

    Ok(StoredTrigger {
        reference: TriggerReference::new(kind, parse_uuid(&row.id)?),
        project: ProjectCoordinates {
            namespace: row.namespace,
            repo: row.repo,
            project_url: row.project_url,
        },
        key,
    })
}

#[async_trait]
impl TriggerRepository for SqliteTriggerRepository {
    async fn get_or_create(
        &self,
        project: &ProjectCoordinates,
        key: &TriggerKey,
    ) -> DomainResult<TriggerReference> {
        let kind = key.kind();
        let natural_key = key.natural_key();
        let commit_sha = match key {
            TriggerKey::Release { commit_sha, .. } => commit_sha.clone(),
            _ => None,
        };

        let inserted = sqlx::query(
            r#"INSERT INTO triggers
               (id, kind, namespace, repo, project_url, natural_key, commit_sha, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT (project_url, kind, natural_key) DO NOTHING"#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(kind.as_str())
        .bind(&project.namespace)
        .bind(&project.repo)
        .bind(&project.project_url)
        .bind(&natural_key)
        .bind(&commit_sha)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?
        .rows_affected();

        let (id,): (String,) = sqlx::query_as(
            "SELECT id FROM triggers WHERE project_url = ? AND kind = ? AND natural_key = ?",
        )
        .bind(&project.project_url)
        .bind(kind.as_str())
        .bind(&natural_key)
        .fetch_one(&self.pool)
        .await?;

        debug!(kind = kind.as_str(), natural_key = %natural_key, created = inserted > 0, "Resolved trigger");
        Ok(TriggerReference::new(kind, parse_uuid(&id)?))
    }

    async fn get(&self, reference: TriggerReference) -> DomainResult<Option<StoredTrigger>> {
        let row: Option<TriggerRow> = sqlx::query_as(
            "SELECT id, kind, namespace, repo, project_url, natural_key, commit_sha
             FROM triggers WHERE id = ? AND kind = ?",
        )
        .bind(reference.id.to_string())
        .bind(reference.kind.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_trigger).transpose()
    }
}

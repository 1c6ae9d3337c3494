//! Trigger domain model.
//!
//! A trigger is the stored record (pull request, branch, release or issue)
//! that an event pertains to. Events only ever hold a weak
//! [`TriggerReference`] to it; the record itself belongs to storage.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};

/// Kind of stored record an event resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    PullRequest,
    Branch,
    Release,
    Issue,
}

impl TriggerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PullRequest => "pull_request",
            Self::Branch => "branch",
            Self::Release => "release",
            Self::Issue => "issue",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pull_request" => Some(Self::PullRequest),
            "branch" => Some(Self::Branch),
            "release" => Some(Self::Release),
            "issue" => Some(Self::Issue),
            _ => None,
        }
    }
}

/// Resolved identity of a stored trigger record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TriggerReference {
    pub kind: TriggerKind,
    pub id: Uuid,
}

impl TriggerReference {
    pub fn new(kind: TriggerKind, id: Uuid) -> Self {
        Self { kind, id }
    }
}

/// Kind-specific part of a trigger's natural key.
///
/// Each variant maps to exactly one upsert in the trigger repository, so a
/// kind outside this set cannot reach storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TriggerKey {
    PullRequest { pr_id: u64 },
    Branch { name: String },
    Release { tag_name: String, commit_sha: Option<String> },
    Issue { issue_id: u64 },
}

impl TriggerKey {
    pub fn kind(&self) -> TriggerKind {
        match self {
            Self::PullRequest { .. } => TriggerKind::PullRequest,
            Self::Branch { .. } => TriggerKind::Branch,
            Self::Release { .. } => TriggerKind::Release,
            Self::Issue { .. } => TriggerKind::Issue,
        }
    }

    /// Value stored in the natural-key column for this trigger.
    pub fn natural_key(&self) -> String {
        match self {
            Self::PullRequest { pr_id } => pr_id.to_string(),
            Self::Branch { name } => name.clone(),
            Self::Release { tag_name, .. } => tag_name.clone(),
            Self::Issue { issue_id } => issue_id.to_string(),
        }
    }
}

/// Namespace, repository and URL of a forge project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectCoordinates {
    pub namespace: String,
    pub repo: String,
    pub project_url: String,
}

impl ProjectCoordinates {
    /// Parse `https://<host>/<namespace...>/<repo>` into coordinates.
    ///
    /// Nested namespaces (GitLab groups) keep every path segment except the
    /// last one. A trailing `.git` or `/` is ignored.
    pub fn from_url(project_url: &str) -> DomainResult<Self> {
        let without_scheme = project_url
            .split_once("://")
            .map_or(project_url, |(_, rest)| rest);

        let path = without_scheme
            .split_once('/')
            .map(|(_, path)| path)
            .unwrap_or_default()
            .trim_end_matches('/');
        let path = path.strip_suffix(".git").unwrap_or(path);

        let (namespace, repo) = path
            .rsplit_once('/')
            .filter(|(ns, repo)| !ns.is_empty() && !repo.is_empty())
            .ok_or_else(|| DomainError::InvalidProjectUrl(project_url.to_string()))?;

        Ok(Self {
            namespace: namespace.to_string(),
            repo: repo.to_string(),
            project_url: project_url.to_string(),
        })
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.namespace, self.repo)
    }
}

/// A trigger record as kept by storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTrigger {
    pub reference: TriggerReference,
    pub project: ProjectCoordinates,
    pub key: TriggerKey,
}

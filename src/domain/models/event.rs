//! Event envelope domain model.
//!
//! Every inbound forge delivery or service callback is normalized into an
//! [`EventEnvelope`] before any handler sees it. The envelope carries an
//! immutable [`EventData`] value plus a memoized trigger reference.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::trigger::{ProjectCoordinates, TriggerKey, TriggerKind, TriggerReference};
use crate::domain::ports::TriggerRepository;

/// Classified shape of an inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Pull request opened, synchronized or reopened.
    PullRequest,
    /// Comment on a pull request.
    PullRequestComment,
    /// Comment on a plain issue.
    IssueComment,
    /// Commits pushed to a branch.
    Push,
    /// Release published.
    Release,
    /// Check rerun requested for a pull request check.
    CheckRerunPullRequest,
    /// Check rerun requested for a branch commit check.
    CheckRerunCommit,
    /// Check rerun requested for a release check.
    CheckRerunRelease,
    /// A build finished in the build service.
    BuildEnd,
    /// Test result callback from Testing Farm.
    TestingFarmResults,
    /// Payload shape not recognized.
    Unknown,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PullRequest => "pull_request",
            Self::PullRequestComment => "pull_request_comment",
            Self::IssueComment => "issue_comment",
            Self::Push => "push",
            Self::Release => "release",
            Self::CheckRerunPullRequest => "check_rerun_pull_request",
            Self::CheckRerunCommit => "check_rerun_commit",
            Self::CheckRerunRelease => "check_rerun_release",
            Self::BuildEnd => "build_end",
            Self::TestingFarmResults => "testing_farm_results",
            Self::Unknown => "unknown",
        }
    }

    /// Fixed table from event kind to the stored record it resolves to.
    pub fn trigger_kind(&self) -> Option<TriggerKind> {
        match self {
            Self::PullRequest | Self::PullRequestComment | Self::CheckRerunPullRequest => {
                Some(TriggerKind::PullRequest)
            }
            Self::Push | Self::CheckRerunCommit => Some(TriggerKind::Branch),
            Self::Release | Self::CheckRerunRelease => Some(TriggerKind::Release),
            Self::IssueComment => Some(TriggerKind::Issue),
            Self::BuildEnd | Self::TestingFarmResults | Self::Unknown => None,
        }
    }

    /// Whether dispatch must resolve a trigger before running handlers.
    pub fn requires_trigger(&self) -> bool {
        self.trigger_kind().is_some()
    }

    pub fn is_comment(&self) -> bool {
        matches!(self, Self::PullRequestComment | Self::IssueComment)
    }

    pub fn is_check_rerun(&self) -> bool {
        matches!(
            self,
            Self::CheckRerunPullRequest | Self::CheckRerunCommit | Self::CheckRerunRelease
        )
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable, serializable event fields shared by every handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventData {
    pub kind: EventKind,
    pub actor: String,
    pub project_url: Option<String>,
    pub commit_sha: Option<String>,
    pub git_ref: Option<String>,
    pub pull_request_id: Option<u64>,
    pub issue_id: Option<u64>,
    pub tag_name: Option<String>,
    /// Check name or other source-specific identifier.
    pub identifier: Option<String>,
    /// Build that produced this event (build-end notifications).
    pub build_id: Option<Uuid>,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    /// Replaces the configured targets for this dispatch only.
    pub override_targets: Option<BTreeSet<String>>,
    #[serde(default)]
    pub raw: serde_json::Value,
}

impl EventData {
    pub fn new(kind: EventKind, actor: impl Into<String>) -> Self {
        Self {
            kind,
            actor: actor.into(),
            project_url: None,
            commit_sha: None,
            git_ref: None,
            pull_request_id: None,
            issue_id: None,
            tag_name: None,
            identifier: None,
            build_id: None,
            comment: None,
            created_at: Utc::now(),
            accepted_at: None,
            override_targets: None,
            raw: serde_json::Value::Null,
        }
    }

    pub fn with_project_url(mut self, url: impl Into<String>) -> Self {
        self.project_url = Some(url.into());
        self
    }

    pub fn with_commit_sha(mut self, sha: impl Into<String>) -> Self {
        self.commit_sha = Some(sha.into());
        self
    }

    pub fn with_git_ref(mut self, git_ref: impl Into<String>) -> Self {
        self.git_ref = Some(git_ref.into());
        self
    }

    pub fn with_pull_request(mut self, pr_id: u64) -> Self {
        self.pull_request_id = Some(pr_id);
        self
    }

    pub fn with_issue(mut self, issue_id: u64) -> Self {
        self.issue_id = Some(issue_id);
        self
    }

    pub fn with_tag_name(mut self, tag: impl Into<String>) -> Self {
        self.tag_name = Some(tag.into());
        self
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn with_build_id(mut self, build_id: Uuid) -> Self {
        self.build_id = Some(build_id);
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn with_accepted_at(mut self, accepted_at: DateTime<Utc>) -> Self {
        self.accepted_at = Some(accepted_at);
        self
    }

    pub fn with_raw(mut self, raw: serde_json::Value) -> Self {
        self.raw = raw;
        self
    }

    /// Copy of this data whose override targets are exactly `targets`.
    pub fn with_override_targets<I, S>(&self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut data = self.clone();
        data.override_targets = Some(targets.into_iter().map(Into::into).collect());
        data
    }
}

/// Canonical representation of an inbound event.
///
/// The data is immutable once the envelope exists. The trigger reference is
/// resolved against storage on first access and cached for the envelope's
/// lifetime.
#[derive(Debug)]
pub struct EventEnvelope {
    data: EventData,
    trigger: OnceCell<Option<TriggerReference>>,
}

impl EventEnvelope {
    pub fn new(data: EventData) -> Self {
        Self {
            data,
            trigger: OnceCell::new(),
        }
    }

    /// Envelope whose trigger is already known (e.g. taken from a build record).
    pub fn with_resolved_trigger(data: EventData, trigger: Option<TriggerReference>) -> Self {
        Self {
            data,
            trigger: OnceCell::new_with(Some(trigger)),
        }
    }

    pub fn data(&self) -> &EventData {
        &self.data
    }

    pub fn into_data(self) -> EventData {
        self.data
    }

    pub fn kind(&self) -> EventKind {
        self.data.kind
    }

    pub fn commit_sha(&self) -> Option<&str> {
        self.data.commit_sha.as_deref()
    }

    pub fn override_targets(&self) -> Option<&BTreeSet<String>> {
        self.data.override_targets.as_ref()
    }

    /// Natural key of the trigger this event pertains to, selected by kind.
    pub fn trigger_key(&self) -> Option<TriggerKey> {
        match self.data.kind.trigger_kind()? {
            TriggerKind::PullRequest => self
                .data
                .pull_request_id
                .map(|pr_id| TriggerKey::PullRequest { pr_id }),
            TriggerKind::Branch => self
                .data
                .git_ref
                .clone()
                .map(|name| TriggerKey::Branch { name }),
            TriggerKind::Release => self.data.tag_name.clone().map(|tag_name| TriggerKey::Release {
                tag_name,
                commit_sha: self.data.commit_sha.clone(),
            }),
            TriggerKind::Issue => self.data.issue_id.map(|issue_id| TriggerKey::Issue { issue_id }),
        }
    }

    /// Project coordinates parsed from the project URL, if any.
    pub fn project(&self) -> Option<ProjectCoordinates> {
        let url = self.data.project_url.as_deref()?;
        match ProjectCoordinates::from_url(url) {
            Ok(project) => Some(project),
            Err(e) => {
                tracing::warn!(project_url = url, error = %e, "Cannot parse project URL");
                None
            }
        }
    }

    /// Resolve (once) the stored trigger record for this event.
    ///
    /// Returns `None` when the event has no trigger kind, no project URL, no
    /// natural key, or the repository fails. The first outcome is cached.
    pub async fn trigger_reference(
        &self,
        repository: &dyn TriggerRepository,
    ) -> Option<TriggerReference> {
        *self
            .trigger
            .get_or_init(|| async {
                let key = self.trigger_key()?;
                let project = self.project()?;
                match repository.get_or_create(&project, &key).await {
                    Ok(reference) => Some(reference),
                    Err(e) => {
                        tracing::warn!(
                            project = %project.full_name(),
                            key = %key.natural_key(),
                            error = %e,
                            "Failed to resolve trigger"
                        );
                        None
                    }
                }
            })
            .await
    }

    /// Cached trigger reference, without resolving.
    pub fn resolved_trigger(&self) -> Option<TriggerReference> {
        self.trigger.get().copied().flatten()
    }

    /// Kind of the trigger record: the resolved one if known, else the
    /// kind table's entry for this event.
    pub fn trigger_kind(&self) -> Option<TriggerKind> {
        self.resolved_trigger()
            .map(|reference| reference.kind)
            .or_else(|| self.data.kind.trigger_kind())
    }

    /// Pure serialization of the event data.
    pub fn to_json(&self) -> DomainResult<serde_json::Value> {
        Ok(serde_json::to_value(&self.data)?)
    }

    pub fn from_json(value: serde_json::Value) -> DomainResult<Self> {
        Ok(Self::new(serde_json::from_value(value)?))
    }
}

impl From<EventData> for EventEnvelope {
    fn from(data: EventData) -> Self {
        Self::new(data)
    }
}

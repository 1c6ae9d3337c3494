//! Job configuration and handler result models.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::models::trigger::TriggerKind;

/// What kind of work a configured job performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    /// Scratch RPM build in Copr.
    #[serde(alias = "copr_build")]
    Build,
    /// Test run in Testing Farm on top of a Copr build.
    #[serde(alias = "test")]
    Tests,
    /// Production build in Koji.
    ProductionBuild,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Build => "build",
            Self::Tests => "tests",
            Self::ProductionBuild => "production_build",
        }
    }
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which kind of forge activity a job is configured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobTriggerType {
    PullRequest,
    Push,
    Release,
    Commit,
}

impl JobTriggerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PullRequest => "pull_request",
            Self::Push => "push",
            Self::Release => "release",
            Self::Commit => "commit",
        }
    }

    /// Whether a job configured for this trigger type applies to a record kind.
    pub fn accepts(&self, kind: TriggerKind) -> bool {
        match self {
            Self::PullRequest => kind == TriggerKind::PullRequest,
            Self::Push | Self::Commit => kind == TriggerKind::Branch,
            Self::Release => kind == TriggerKind::Release,
        }
    }
}

impl std::fmt::Display for JobTriggerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One configured job of a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    #[serde(rename = "job")]
    pub job_type: JobType,
    pub trigger: JobTriggerType,
    #[serde(default)]
    pub targets: BTreeSet<String>,
    /// Optional comment keyword restricting which `/packit` command runs this job.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_keyword: Option<String>,
}

impl JobSpec {
    pub fn new<I, S>(job_type: JobType, trigger: JobTriggerType, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            job_type,
            trigger,
            targets: targets.into_iter().map(Into::into).collect(),
            command_keyword: None,
        }
    }

    pub fn with_command_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.command_keyword = Some(keyword.into());
        self
    }
}

/// Job configuration of a single repository (the `jobs:` list).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    #[serde(default)]
    pub jobs: Vec<JobSpec>,
}

impl RepositoryConfig {
    pub fn new(jobs: Vec<JobSpec>) -> Self {
        Self { jobs }
    }

    /// Parse the repository job configuration from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// First configured job of the given type that accepts the trigger kind.
    pub fn job_for(&self, job_type: JobType, kind: TriggerKind) -> Option<&JobSpec> {
        self.jobs
            .iter()
            .find(|job| job.job_type == job_type && job.trigger.accepts(kind))
    }
}

/// Result returned by a job handler.
///
/// `details` is always JSON; by convention it has a human `msg` entry and,
/// on partial failure, one entry per failed target.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HandlerResult {
    pub success: bool,
    #[serde(default)]
    pub details: Map<String, Value>,
}

impl HandlerResult {
    pub fn success() -> Self {
        Self {
            success: true,
            details: Map::new(),
        }
    }

    pub fn failure(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            details: Map::new(),
        }
        .with_msg(msg)
    }

    pub fn with_msg(mut self, msg: impl Into<String>) -> Self {
        self.details.insert("msg".to_string(), Value::String(msg.into()));
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: Value) -> Self {
        self.details.insert(key.into(), value);
        self
    }

    pub fn msg(&self) -> Option<&str> {
        self.details.get("msg").and_then(Value::as_str)
    }
}

/// Outcome of running one matched handler during dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobOutcome {
    pub handler: String,
    pub job_type: Option<JobType>,
    pub trigger: Option<JobTriggerType>,
    pub result: HandlerResult,
}

impl JobOutcome {
    pub fn success(&self) -> bool {
        self.result.success
    }
}

//! Commit status reports sent back to the forge.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::models::trigger::TriggerReference;

/// Check name prefix for Copr builds.
pub const BUILD_CHECK_PREFIX: &str = "rpm-build";
/// Check name prefix for Testing Farm runs.
pub const TEST_CHECK_PREFIX: &str = "testing-farm";
/// Check name prefix for Koji production builds.
pub const PRODUCTION_BUILD_CHECK_PREFIX: &str = "production-build";

/// State of a commit status / check run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitState {
    Pending,
    Running,
    Success,
    Failure,
    Error,
}

impl CommitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Error => "error",
        }
    }
}

/// One status report for one or more checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub state: CommitState,
    pub description: String,
    pub url: String,
    #[serde(default)]
    pub external_links: BTreeMap<String, String>,
    pub check_names: Vec<String>,
    pub commit_sha: Option<String>,
    pub trigger: Option<TriggerReference>,
}

impl StatusReport {
    pub fn new(state: CommitState, description: impl Into<String>) -> Self {
        Self {
            state,
            description: description.into(),
            url: String::new(),
            external_links: BTreeMap::new(),
            check_names: Vec::new(),
            commit_sha: None,
            trigger: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_external_link(mut self, label: impl Into<String>, url: impl Into<String>) -> Self {
        self.external_links.insert(label.into(), url.into());
        self
    }

    pub fn with_check_names(mut self, names: Vec<String>) -> Self {
        self.check_names = names;
        self
    }

    pub fn with_commit_sha(mut self, sha: Option<String>) -> Self {
        self.commit_sha = sha;
        self
    }

    pub fn with_trigger(mut self, trigger: Option<TriggerReference>) -> Self {
        self.trigger = trigger;
        self
    }
}

/// `rpm-build:<target>`
pub fn build_check_name(target: &str) -> String {
    format!("{BUILD_CHECK_PREFIX}:{target}")
}

/// `testing-farm:<target>`
pub fn test_check_name(target: &str) -> String {
    format!("{TEST_CHECK_PREFIX}:{target}")
}

/// `production-build:<target>`
pub fn production_build_check_name(target: &str) -> String {
    format!("{PRODUCTION_BUILD_CHECK_PREFIX}:{target}")
}

/// Split a check name into `(prefix, target)`.
///
/// Names without a `:` have no target and yield `None`.
pub fn parse_check_name(name: &str) -> Option<(&str, &str)> {
    let (prefix, target) = name.split_once(':')?;
    let (prefix, target) = (prefix.trim(), target.trim());
    if prefix.is_empty() || target.is_empty() {
        return None;
    }
    Some((prefix, target))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_names() {
        assert_eq!(test_check_name("fedora-35-x86_64"), "testing-farm:fedora-35-x86_64");
        assert_eq!(build_check_name("epel-8-x86_64"), "rpm-build:epel-8-x86_64");
        assert_eq!(production_build_check_name("rawhide"), "production-build:rawhide");
    }

    #[test]
    fn test_parse_check_name() {
        assert_eq!(
            parse_check_name("testing-farm:fedora-35-x86_64"),
            Some(("testing-farm", "fedora-35-x86_64"))
        );
        assert_eq!(parse_check_name("testing-farm"), None);
        assert_eq!(parse_check_name("testing-farm:"), None);
    }

    #[test]
    fn test_status_report_serializes_state_lowercase() {
        let report = StatusReport::new(CommitState::Failure, "Tests failed ...")
            .with_external_link("Testing Farm", "https://tf/log");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["state"], "failure");
        assert_eq!(json["external_links"]["Testing Farm"], "https://tf/log");
    }
}

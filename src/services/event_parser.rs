//! Classification of raw deliveries into event envelopes.
//!
//! Forge webhooks, build-finished notifications and Testing Farm callbacks
//! all arrive as JSON. [`EventParser::classify`] recognizes the shape of the
//! payload by which sections are present and builds an [`EventEnvelope`].
//! Nothing here fails: an unrecognized payload is a [`Classification::Dropped`].

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::domain::models::event::{EventData, EventEnvelope, EventKind};
use crate::domain::models::status::parse_check_name;
use crate::services::comment_parser::DEFAULT_COMMAND_PREFIX;

/// Outcome of classifying a raw payload.
#[derive(Debug)]
pub enum Classification {
    Accepted(EventEnvelope),
    Dropped { reason: String },
}

impl Classification {
    fn dropped(reason: impl Into<String>) -> Self {
        Self::Dropped {
            reason: reason.into(),
        }
    }

    /// The envelope if the payload was accepted.
    pub fn accepted(self) -> Option<EventEnvelope> {
        match self {
            Self::Accepted(envelope) => Some(envelope),
            Self::Dropped { .. } => None,
        }
    }
}

// Webhook payload sections. Every field is optional; presence drives
// classification.

#[derive(Debug, Default, Deserialize)]
struct Payload {
    action: Option<String>,
    sender: Option<Account>,
    repository: Option<Repository>,

    // Forge webhooks
    comment: Option<Comment>,
    issue: Option<Issue>,
    pull_request: Option<PullRequest>,
    check_run: Option<CheckRun>,
    commits: Option<Vec<Value>>,
    #[serde(rename = "ref")]
    git_ref: Option<String>,
    after: Option<String>,
    pusher: Option<Pusher>,
    release: Option<Release>,
    number: Option<u64>,

    // Build-finished notification
    build_id: Option<String>,
    chroot: Option<String>,
    status: Option<Value>,
    commit_sha: Option<String>,
    project_url: Option<String>,

    // Testing Farm callback
    pipeline_id: Option<String>,
    result: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Account {
    login: String,
}

#[derive(Debug, Deserialize)]
struct Pusher {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Repository {
    html_url: String,
}

#[derive(Debug, Deserialize)]
struct Comment {
    #[serde(default)]
    body: String,
    user: Option<Account>,
}

#[derive(Debug, Deserialize)]
struct Issue {
    number: u64,
    pull_request: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct PullRequest {
    number: Option<u64>,
    head: Option<Head>,
}

#[derive(Debug, Deserialize)]
struct Head {
    sha: Option<String>,
    #[serde(rename = "ref")]
    git_ref: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CheckRun {
    name: String,
    head_sha: Option<String>,
    check_suite: Option<CheckSuite>,
}

#[derive(Debug, Deserialize)]
struct CheckSuite {
    head_branch: Option<String>,
    #[serde(default)]
    pull_requests: Vec<PullRequestRef>,
}

#[derive(Debug, Deserialize)]
struct PullRequestRef {
    number: u64,
}

#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
    target_commitish: Option<String>,
}

const PULL_REQUEST_ACTIONS: [&str; 3] = ["opened", "synchronize", "reopened"];

/// Turns raw payloads into envelopes.
#[derive(Debug, Clone)]
pub struct EventParser {
    command_prefix: String,
}

impl Default for EventParser {
    fn default() -> Self {
        Self::new(DEFAULT_COMMAND_PREFIX)
    }
}

impl EventParser {
    /// A parser recognizing commands that start with `command_prefix`.
    pub fn new(command_prefix: impl Into<String>) -> Self {
        Self {
            command_prefix: command_prefix.into(),
        }
    }

    /// The configured command prefix.
    pub fn command_prefix(&self) -> &str {
        &self.command_prefix
    }

    /// Classify a raw payload. The first matching rule wins.
    #[instrument(skip(self, raw))]
    pub fn classify(&self, raw: &Value) -> Classification {
        if !raw.is_object() {
            return Classification::dropped("payload is not a JSON object");
        }
        let payload: Payload = match serde_json::from_value(raw.clone()) {
            Ok(payload) => payload,
            Err(e) => return Classification::dropped(format!("unrecognized payload: {e}")),
        };

        let classification = Self::classify_payload(payload, raw);
        match &classification {
            Classification::Accepted(envelope) => {
                debug!(kind = %envelope.kind(), "Payload classified");
            }
            Classification::Dropped { reason } => {
                debug!(reason = %reason, "Payload dropped");
            }
        }
        classification
    }

    fn classify_payload(payload: Payload, raw: &Value) -> Classification {
        if payload.pipeline_id.is_some() && payload.result.is_some() {
            return Self::testing_farm_results(payload, raw);
        }
        if payload.build_id.is_some() && payload.chroot.is_some() && payload.status.is_some() {
            return Self::build_end(payload, raw);
        }
        if payload.comment.is_some() && (payload.issue.is_some() || payload.pull_request.is_some()) {
            return Self::comment(payload, raw);
        }
        if payload.check_run.is_some() {
            return Self::check_rerun(payload, raw);
        }
        if payload.commits.is_some() && payload.git_ref.is_some() {
            return Self::push(payload, raw);
        }
        if payload.release.is_some() {
            return Self::release(payload, raw);
        }
        if payload.pull_request.is_some() {
            return Self::pull_request(payload, raw);
        }
        Classification::dropped("no known event shape")
    }

    fn testing_farm_results(payload: Payload, raw: &Value) -> Classification {
        let pipeline_id = payload.pipeline_id.unwrap_or_default();
        let mut data = EventData::new(EventKind::TestingFarmResults, "testing-farm")
            .with_identifier(pipeline_id)
            .with_raw(raw.clone());
        if let Some(chroot) = raw.get("copr_chroot").and_then(Value::as_str) {
            data = data.with_override_targets([chroot]);
        }
        Classification::Accepted(EventEnvelope::new(data))
    }

    fn build_end(payload: Payload, raw: &Value) -> Classification {
        let build_id = payload.build_id.unwrap_or_default();
        let Ok(build_id) = Uuid::parse_str(&build_id) else {
            return Classification::dropped(format!("build_id {build_id} is not a valid ID"));
        };
        let status = match payload.status {
            Some(Value::String(s)) => s,
            Some(other) => other.to_string(),
            None => String::new(),
        };
        let chroot = payload.chroot.unwrap_or_default();

        let mut data = EventData::new(EventKind::BuildEnd, "build-service")
            .with_build_id(build_id)
            .with_identifier(status)
            .with_raw(raw.clone())
            .with_override_targets([chroot]);
        if let Some(sha) = payload.commit_sha {
            data = data.with_commit_sha(sha);
        }
        if let Some(url) = payload.project_url {
            data = data.with_project_url(url);
        }
        Classification::Accepted(EventEnvelope::new(data))
    }

    fn comment(payload: Payload, raw: &Value) -> Classification {
        if let Some(action) = payload.action.as_deref() {
            if action != "created" {
                return Classification::dropped(format!("comment action {action} is ignored"));
            }
        }
        let Some(comment) = payload.comment else {
            return Classification::dropped("comment section missing");
        };

        let is_pull_request = payload.pull_request.is_some()
            || payload
                .issue
                .as_ref()
                .is_some_and(|issue| issue.pull_request.is_some());

        let actor = comment
            .user
            .map(|user| user.login)
            .or_else(|| payload.sender.map(|sender| sender.login))
            .unwrap_or_default();

        let mut data = if is_pull_request {
            let pr_id = payload
                .issue
                .as_ref()
                .map(|issue| issue.number)
                .or_else(|| payload.pull_request.as_ref().and_then(|pr| pr.number))
                .or(payload.number);
            let mut data = EventData::new(EventKind::PullRequestComment, actor);
            if let Some(pr_id) = pr_id {
                data = data.with_pull_request(pr_id);
            }
            if let Some(sha) = payload
                .pull_request
                .and_then(|pr| pr.head)
                .and_then(|head| head.sha)
            {
                data = data.with_commit_sha(sha);
            }
            data
        } else {
            let mut data = EventData::new(EventKind::IssueComment, actor);
            if let Some(issue) = payload.issue {
                data = data.with_issue(issue.number);
            }
            data
        };

        if let Some(repository) = payload.repository {
            data = data.with_project_url(repository.html_url);
        }

        data = data.with_comment(comment.body).with_raw(raw.clone());
        Classification::Accepted(EventEnvelope::new(data))
    }

    fn check_rerun(payload: Payload, raw: &Value) -> Classification {
        if payload.action.as_deref() != Some("rerequested") {
            return Classification::dropped("check run action is not rerequested");
        }
        let Some(check_run) = payload.check_run else {
            return Classification::dropped("check_run section missing");
        };
        let suite = check_run.check_suite;
        let head_branch = suite.as_ref().and_then(|s| s.head_branch.clone());
        let pr_id = suite
            .as_ref()
            .and_then(|s| s.pull_requests.first())
            .map(|pr| pr.number);

        let actor = payload.sender.map(|s| s.login).unwrap_or_default();
        let mut data = if let Some(pr_id) = pr_id {
            EventData::new(EventKind::CheckRerunPullRequest, actor).with_pull_request(pr_id)
        } else if let Some(tag) = head_branch.as_deref().and_then(|b| b.strip_prefix("refs/tags/")) {
            EventData::new(EventKind::CheckRerunRelease, actor).with_tag_name(tag)
        } else {
            let mut data = EventData::new(EventKind::CheckRerunCommit, actor);
            if let Some(branch) = head_branch {
                data = data.with_git_ref(strip_heads(&branch));
            }
            data
        };

        if let Some(sha) = check_run.head_sha {
            data = data.with_commit_sha(sha);
        }
        if let Some(repository) = payload.repository {
            data = data.with_project_url(repository.html_url);
        }
        if let Some((_, target)) = parse_check_name(&check_run.name) {
            data = data.with_override_targets([target]);
        }
        data = data.with_identifier(check_run.name).with_raw(raw.clone());
        Classification::Accepted(EventEnvelope::new(data))
    }

    fn push(payload: Payload, raw: &Value) -> Classification {
        let git_ref = payload.git_ref.unwrap_or_default();
        if git_ref.starts_with("refs/tags/") {
            return Classification::dropped("tag pushes are handled as releases");
        }
        let actor = payload
            .pusher
            .map(|p| p.name)
            .or_else(|| payload.sender.map(|s| s.login))
            .unwrap_or_default();

        let mut data = EventData::new(EventKind::Push, actor)
            .with_git_ref(strip_heads(&git_ref))
            .with_raw(raw.clone());
        if let Some(sha) = payload.after {
            data = data.with_commit_sha(sha);
        }
        if let Some(repository) = payload.repository {
            data = data.with_project_url(repository.html_url);
        }
        Classification::Accepted(EventEnvelope::new(data))
    }

    fn release(payload: Payload, raw: &Value) -> Classification {
        if let Some(action) = payload.action.as_deref() {
            if action != "published" {
                return Classification::dropped(format!("release action {action} is ignored"));
            }
        }
        let Some(release) = payload.release else {
            return Classification::dropped("release section missing");
        };
        let actor = payload.sender.map(|s| s.login).unwrap_or_default();
        let mut data = EventData::new(EventKind::Release, actor)
            .with_tag_name(release.tag_name)
            .with_raw(raw.clone());
        if let Some(sha) = release
            .target_commitish
            .filter(|c| c.len() == 40 && c.chars().all(|ch| ch.is_ascii_hexdigit()))
        {
            data = data.with_commit_sha(sha);
        }
        if let Some(repository) = payload.repository {
            data = data.with_project_url(repository.html_url);
        }
        Classification::Accepted(EventEnvelope::new(data))
    }

    fn pull_request(payload: Payload, raw: &Value) -> Classification {
        let action = payload.action.as_deref().unwrap_or_default();
        if !PULL_REQUEST_ACTIONS.contains(&action) {
            return Classification::dropped(format!("pull request action {action:?} is ignored"));
        }
        let Some(pull_request) = payload.pull_request else {
            return Classification::dropped("pull_request section missing");
        };
        let actor = payload.sender.map(|s| s.login).unwrap_or_default();
        let mut data = EventData::new(EventKind::PullRequest, actor).with_raw(raw.clone());
        if let Some(pr_id) = pull_request.number.or(payload.number) {
            data = data.with_pull_request(pr_id);
        }
        if let Some(head) = pull_request.head {
            if let Some(sha) = head.sha {
                data = data.with_commit_sha(sha);
            }
            if let Some(git_ref) = head.git_ref {
                data = data.with_git_ref(git_ref);
            }
        }
        if let Some(repository) = payload.repository {
            data = data.with_project_url(repository.html_url);
        }
        Classification::Accepted(EventEnvelope::new(data))
    }
}

fn strip_heads(git_ref: &str) -> &str {
    git_ref.strip_prefix("refs/heads/").unwrap_or(git_ref)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeSet;

    const PROJECT: &str = "https://github.com/packit-service/hello-world";

    fn accept(raw: Value) -> EventEnvelope {
        match EventParser::default().classify(&raw) {
            Classification::Accepted(envelope) => envelope,
            Classification::Dropped { reason } => panic!("unexpectedly dropped: {reason}"),
        }
    }

    fn targets(envelope: &EventEnvelope) -> Option<Vec<&str>> {
        envelope
            .override_targets()
            .map(|t| t.iter().map(String::as_str).collect())
    }

    #[test]
    fn test_pull_request_comment_with_test_target() {
        let envelope = accept(json!({
            "action": "created",
            "comment": {"body": "/packit test fedora-35-x86_64", "user": {"login": "phracek"}},
            "issue": {"number": 9, "pull_request": {"url": "https://api.github.com/..."}},
            "repository": {"html_url": PROJECT}
        }));
        assert_eq!(envelope.kind(), EventKind::PullRequestComment);
        assert_eq!(envelope.data().pull_request_id, Some(9));
        assert_eq!(envelope.data().actor, "phracek");
        assert_eq!(envelope.data().project_url.as_deref(), Some(PROJECT));
        assert_eq!(envelope.data().comment.as_deref(), Some("/packit test fedora-35-x86_64"));
        // The test argument is read by the test handler, not applied event-wide.
        assert!(envelope.override_targets().is_none());
    }

    #[test]
    fn test_comment_with_pull_request_section_has_head_sha() {
        let envelope = accept(json!({
            "comment": {"body": "/packit build"},
            "pull_request": {"number": 3, "head": {"sha": "abcdef"}},
            "sender": {"login": "lbarcziova"},
            "repository": {"html_url": PROJECT}
        }));
        assert_eq!(envelope.kind(), EventKind::PullRequestComment);
        assert_eq!(envelope.commit_sha(), Some("abcdef"));
        assert_eq!(envelope.data().actor, "lbarcziova");
        assert!(envelope.override_targets().is_none());
    }

    #[test]
    fn test_issue_comment() {
        let envelope = accept(json!({
            "action": "created",
            "comment": {"body": "/packit propose-downstream"},
            "issue": {"number": 12},
            "repository": {"html_url": PROJECT}
        }));
        assert_eq!(envelope.kind(), EventKind::IssueComment);
        assert_eq!(envelope.data().issue_id, Some(12));
        assert_eq!(envelope.data().pull_request_id, None);
    }

    #[test]
    fn test_deleted_comment_is_dropped() {
        let raw = json!({
            "action": "deleted",
            "comment": {"body": "/packit build"},
            "issue": {"number": 12}
        });
        assert!(EventParser::default().classify(&raw).accepted().is_none());
    }

    #[test]
    fn test_check_rerun_variants() {
        let pr = accept(json!({
            "action": "rerequested",
            "check_run": {
                "name": "testing-farm:fedora-rawhide-x86_64",
                "head_sha": "123456",
                "check_suite": {"head_branch": "feature", "pull_requests": [{"number": 5}]}
            },
            "repository": {"html_url": PROJECT}
        }));
        assert_eq!(pr.kind(), EventKind::CheckRerunPullRequest);
        assert_eq!(pr.data().pull_request_id, Some(5));
        assert_eq!(targets(&pr), Some(vec!["fedora-rawhide-x86_64"]));
        assert_eq!(pr.data().identifier.as_deref(), Some("testing-farm:fedora-rawhide-x86_64"));

        let release = accept(json!({
            "action": "rerequested",
            "check_run": {
                "name": "rpm-build:epel-8-x86_64",
                "check_suite": {"head_branch": "refs/tags/v1.0", "pull_requests": []}
            },
            "repository": {"html_url": PROJECT}
        }));
        assert_eq!(release.kind(), EventKind::CheckRerunRelease);
        assert_eq!(release.data().tag_name.as_deref(), Some("v1.0"));

        let commit = accept(json!({
            "action": "rerequested",
            "check_run": {"name": "rpm-build:epel-8-x86_64", "check_suite": {"head_branch": "main"}},
            "repository": {"html_url": PROJECT}
        }));
        assert_eq!(commit.kind(), EventKind::CheckRerunCommit);
        assert_eq!(commit.data().git_ref.as_deref(), Some("main"));
    }

    #[test]
    fn test_check_run_completed_is_dropped() {
        let raw = json!({"action": "completed", "check_run": {"name": "rpm-build:x"}});
        assert!(matches!(
            EventParser::default().classify(&raw),
            Classification::Dropped { .. }
        ));
    }

    #[test]
    fn test_push_strips_heads_prefix() {
        let envelope = accept(json!({
            "ref": "refs/heads/main",
            "after": "0123456789abcdef",
            "commits": [{"id": "0123456789abcdef"}],
            "pusher": {"name": "jpopelka"},
            "repository": {"html_url": PROJECT}
        }));
        assert_eq!(envelope.kind(), EventKind::Push);
        assert_eq!(envelope.data().git_ref.as_deref(), Some("main"));
        assert_eq!(envelope.commit_sha(), Some("0123456789abcdef"));
        assert_eq!(envelope.data().actor, "jpopelka");
    }

    #[test]
    fn test_release() {
        let envelope = accept(json!({
            "action": "published",
            "release": {"tag_name": "0.3.0"},
            "repository": {"html_url": PROJECT}
        }));
        assert_eq!(envelope.kind(), EventKind::Release);
        assert_eq!(envelope.data().tag_name.as_deref(), Some("0.3.0"));
    }

    #[test]
    fn test_pull_request_actions() {
        let raw = |action: &str| {
            json!({
                "action": action,
                "number": 342,
                "pull_request": {"head": {"sha": "528b803be6f93e19ca4130bf4976f2800a3004c4", "ref": "fix"}},
                "repository": {"html_url": PROJECT}
            })
        };
        let envelope = accept(raw("synchronize"));
        assert_eq!(envelope.kind(), EventKind::PullRequest);
        assert_eq!(envelope.data().pull_request_id, Some(342));
        assert_eq!(
            envelope.commit_sha(),
            Some("528b803be6f93e19ca4130bf4976f2800a3004c4")
        );
        assert!(EventParser::default().classify(&raw("closed")).accepted().is_none());
    }

    #[test]
    fn test_testing_farm_callback() {
        let envelope = accept(json!({
            "pipeline_id": "5e8079d8-f181-41cf-af96-28e99774eb68",
            "result": "passed",
            "copr_chroot": "fedora-rawhide-x86_64"
        }));
        assert_eq!(envelope.kind(), EventKind::TestingFarmResults);
        assert_eq!(
            envelope.data().identifier.as_deref(),
            Some("5e8079d8-f181-41cf-af96-28e99774eb68")
        );
        assert_eq!(envelope.kind().trigger_kind(), None);
    }

    #[test]
    fn test_build_end() {
        let build_id = Uuid::new_v4();
        let envelope = accept(json!({
            "build_id": build_id.to_string(),
            "chroot": "fedora-35-x86_64",
            "status": "succeeded"
        }));
        assert_eq!(envelope.kind(), EventKind::BuildEnd);
        assert_eq!(envelope.data().build_id, Some(build_id));
        assert_eq!(
            envelope.override_targets(),
            Some(&BTreeSet::from(["fedora-35-x86_64".to_string()]))
        );

        let bad = json!({"build_id": "17", "chroot": "x", "status": 1});
        assert!(EventParser::default().classify(&bad).accepted().is_none());
    }

    #[test]
    fn test_unknown_payloads_are_dropped() {
        for raw in [json!({}), json!({"zen": "Design for failure."}), json!([1, 2]), json!("x")] {
            assert!(matches!(
                EventParser::default().classify(&raw),
                Classification::Dropped { .. }
            ));
        }
    }
}

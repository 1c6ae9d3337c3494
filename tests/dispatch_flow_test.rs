//! End-to-end dispatch flows over the in-memory adapters.

mod common;

use std::sync::Arc;

use forge_dispatch::adapters::memory::InMemoryServices;
use forge_dispatch::domain::models::build::{BuildArtifactRef, BuildStatus};
use forge_dispatch::domain::models::event::EventKind;
use forge_dispatch::domain::models::status::CommitState;
use forge_dispatch::domain::models::test_run::TestStatus;
use forge_dispatch::domain::models::trigger::{ProjectCoordinates, TriggerKey};
use forge_dispatch::domain::ports::{BuildRepository, TaskName, TestRunRepository, TriggerRepository};
use forge_dispatch::services::handlers::testing_farm::BUILD_NOT_FINISHED_MESSAGE;
use forge_dispatch::services::target_reconciler::MISSING_BUILD_DESCRIPTION;
use forge_dispatch::services::{EventParser, HandlerRegistry, JobDispatcher};

use common::*;

const TESTS_ON_PR: &str = r"
jobs:
  - job: tests
    trigger: pull_request
    targets: [epel-8-x86_64, fedora-35-x86_64]
";

fn dispatcher(mem: &InMemoryServices) -> JobDispatcher {
    JobDispatcher::new(Arc::new(HandlerRegistry::builtin()), mem.context())
}

#[tokio::test]
async fn test_packit_test_comment_runs_tests_after_build() {
    setup_test_logging();
    let mem = InMemoryServices::new();
    let parser = EventParser::default();
    let config = repo_config(TESTS_ON_PR);

    // 1. `/packit test` with no builds yet: one build job for both targets.
    let envelope = parser.classify(&pr_comment(9, "/packit test")).accepted().unwrap();
    let outcomes = dispatcher(&mem).dispatch(envelope, config.clone()).await;

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].handler, "testing_farm");
    assert!(outcomes[0].success());
    assert_eq!(
        outcomes[0].result.msg(),
        Some("Build triggered for targets [epel-8-x86_64, fedora-35-x86_64] missing a build. ")
    );

    let submitted = mem.queue.submitted();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].0, TaskName::RunCoprBuild);
    assert_eq!(
        submitted[0].1["event"]["override_targets"],
        serde_json::json!(["epel-8-x86_64", "fedora-35-x86_64"])
    );
    let pending: Vec<_> = mem.reporter.reports();
    assert_eq!(pending.len(), 2);
    assert!(pending
        .iter()
        .all(|r| r.state == CommitState::Pending && r.description == MISSING_BUILD_DESCRIPTION));

    // 2. The build worker records one build per target for the same PR.
    let project = ProjectCoordinates::from_url(PROJECT_URL).unwrap();
    let trigger = mem
        .triggers
        .get_or_create(&project, &TriggerKey::PullRequest { pr_id: 9 })
        .await
        .unwrap();
    let mut builds = Vec::new();
    for target in ["epel-8-x86_64", "fedora-35-x86_64"] {
        let build = BuildArtifactRef::new(target, HEAD_SHA, BuildStatus::Running);
        mem.builds.create_build(&build, Some(trigger)).await.unwrap();
        builds.push(build);
    }

    // 3. One build finishes: its status is stored and tests start for its target only.
    let envelope = parser
        .classify(&build_end(builds[1].build_id, "fedora-35-x86_64", "success"))
        .accepted()
        .unwrap();
    assert_eq!(envelope.kind(), EventKind::BuildEnd);
    let outcomes = dispatcher(&mem).dispatch(envelope, config.clone()).await;

    let handlers: Vec<_> = outcomes.iter().map(|o| o.handler.as_str()).collect();
    assert_eq!(handlers, vec!["build_end", "testing_farm"]);
    assert!(outcomes.iter().all(|o| o.success()));
    assert_eq!(
        mem.builds.get_build(builds[1].build_id).await.unwrap().unwrap().status,
        BuildStatus::Succeeded
    );

    let requests = mem.executor.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].target, "fedora-35-x86_64");
    assert_eq!(requests[0].build_id, builds[1].build_id);
    assert_eq!(requests[0].trigger, Some(trigger));

    let runs = mem.test_runs.runs();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, TestStatus::Queued);
    let pipeline_id = runs[0].pipeline_id.clone();

    // 4. Testing Farm reports back.
    let envelope = parser.classify(&tf_callback(&pipeline_id, "passed")).accepted().unwrap();
    let outcomes = dispatcher(&mem)
        .dispatch(envelope, Arc::new(Default::default()))
        .await;

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].handler, "testing_farm_results");
    assert!(outcomes[0].success());

    let run = mem.test_runs.get_by_pipeline_id(&pipeline_id).await.unwrap().unwrap();
    assert_eq!(run.status, TestStatus::Passed);
    assert!(run.log_url.is_some());

    let last = mem.reporter.reports().pop().unwrap();
    assert_eq!(last.state, CommitState::Success);
    assert_eq!(last.check_names, vec!["testing-farm:fedora-35-x86_64"]);
    assert_eq!(last.trigger, Some(trigger));

    let metrics = mem.metrics.snapshot();
    assert_eq!(metrics.copr_builds_queued, 2);
    assert_eq!(metrics.test_runs_queued, 1);
    assert_eq!(metrics.test_runs_finished, 1);
}

#[tokio::test]
async fn test_comment_target_argument_narrows_targets() {
    let mem = InMemoryServices::new();
    let envelope = EventParser::default()
        .classify(&pr_comment(9, "/packit test epel-8-x86_64"))
        .accepted()
        .unwrap();

    dispatcher(&mem).dispatch(envelope, repo_config(TESTS_ON_PR)).await;

    let submitted = mem.queue.submitted();
    assert_eq!(submitted.len(), 1);
    assert_eq!(
        submitted[0].1["event"]["override_targets"],
        serde_json::json!(["epel-8-x86_64"])
    );
}

#[tokio::test]
async fn test_packit_test_builds_only_targets_without_a_build() {
    let mem = InMemoryServices::new();
    let built = BuildArtifactRef::new("epel-8-x86_64", HEAD_SHA, BuildStatus::Succeeded);
    mem.builds.create_build(&built, None).await.unwrap();
    let envelope = EventParser::default()
        .classify(&pr_comment(9, "/packit test"))
        .accepted()
        .unwrap();

    let outcomes = dispatcher(&mem).dispatch(envelope, repo_config(TESTS_ON_PR)).await;

    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].success());
    assert_eq!(
        outcomes[0].result.msg(),
        Some("Build triggered for targets [fedora-35-x86_64] missing a build. ")
    );

    let submitted = mem.queue.submitted();
    assert_eq!(submitted.len(), 1);
    assert_eq!(
        submitted[0].1["event"]["override_targets"],
        serde_json::json!(["fedora-35-x86_64"])
    );

    let requests = mem.executor.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].target, "epel-8-x86_64");

    let pending: Vec<_> = mem
        .reporter
        .reports()
        .into_iter()
        .filter(|r| r.state == CommitState::Pending)
        .collect();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].check_names, vec!["testing-farm:fedora-35-x86_64"]);
}

#[tokio::test]
async fn test_test_argument_leaves_build_command_targets_alone() {
    let mem = InMemoryServices::new();
    let config = repo_config(
        r"
jobs:
  - job: copr_build
    trigger: pull_request
    targets: [epel-8-x86_64, fedora-35-x86_64]
  - job: tests
    trigger: pull_request
    targets: [epel-8-x86_64, fedora-35-x86_64]
",
    );
    let envelope = EventParser::default()
        .classify(&pr_comment(9, "/packit build\n/packit test epel-8-x86_64"))
        .accepted()
        .unwrap();
    assert!(envelope.override_targets().is_none());

    let outcomes = dispatcher(&mem).dispatch(envelope, config).await;

    let handlers: Vec<_> = outcomes.iter().map(|o| o.handler.as_str()).collect();
    assert_eq!(handlers, vec!["copr_build", "testing_farm"]);
    assert_eq!(
        outcomes[0].result.msg(),
        Some("Build submitted for targets [epel-8-x86_64, fedora-35-x86_64].")
    );

    let submitted = mem.queue.submitted();
    assert_eq!(submitted.len(), 2);
    assert_eq!(
        submitted[0].1["event"]["override_targets"],
        serde_json::json!(["epel-8-x86_64", "fedora-35-x86_64"])
    );
    assert_eq!(
        submitted[1].1["event"]["override_targets"],
        serde_json::json!(["epel-8-x86_64"])
    );
}

#[tokio::test]
async fn test_build_end_for_unfinished_build_runs_no_tests() {
    let mem = InMemoryServices::new();
    let project = ProjectCoordinates::from_url(PROJECT_URL).unwrap();
    let trigger = mem
        .triggers
        .get_or_create(&project, &TriggerKey::PullRequest { pr_id: 9 })
        .await
        .unwrap();
    let build = BuildArtifactRef::new("fedora-35-x86_64", HEAD_SHA, BuildStatus::Pending);
    mem.builds.create_build(&build, Some(trigger)).await.unwrap();

    let envelope = EventParser::default()
        .classify(&build_end(build.build_id, "fedora-35-x86_64", "running"))
        .accepted()
        .unwrap();
    let outcomes = dispatcher(&mem).dispatch(envelope, repo_config(TESTS_ON_PR)).await;

    let handlers: Vec<_> = outcomes.iter().map(|o| o.handler.as_str()).collect();
    assert_eq!(handlers, vec!["build_end", "testing_farm"]);
    assert!(outcomes.iter().all(|o| o.success()));
    assert_eq!(outcomes[1].result.msg(), Some(BUILD_NOT_FINISHED_MESSAGE));

    assert!(mem.executor.requests().is_empty());
    assert!(mem.test_runs.runs().is_empty());
    assert!(mem
        .reporter
        .reports()
        .iter()
        .all(|r| r.check_names.iter().all(|c| !c.starts_with("testing-farm:"))));
}

#[tokio::test]
async fn test_pull_request_with_build_job_defers_tests() {
    let mem = InMemoryServices::new();
    let config = repo_config(
        r"
jobs:
  - job: copr_build
    trigger: pull_request
    targets: [fedora-35-x86_64]
  - job: tests
    trigger: pull_request
    targets: [fedora-35-x86_64]
",
    );
    let envelope = EventParser::default()
        .classify(&pull_request_opened(9))
        .accepted()
        .unwrap();

    let outcomes = dispatcher(&mem).dispatch(envelope, config).await;

    let handlers: Vec<_> = outcomes.iter().map(|o| o.handler.as_str()).collect();
    assert_eq!(handlers, vec!["copr_build", "testing_farm"]);
    assert_eq!(
        outcomes[1].result.msg(),
        Some("Tests will run after the build finishes.")
    );
    assert_eq!(mem.queue.submitted().len(), 1);
    assert!(mem.executor.requests().is_empty());
}

#[tokio::test]
async fn test_push_runs_production_builds_per_target() {
    let mem = InMemoryServices::new();
    let config = repo_config(
        r"
jobs:
  - job: production_build
    trigger: commit
    targets: [f36, f37]
",
    );
    let envelope = EventParser::default().classify(&push("main")).accepted().unwrap();

    let outcomes = dispatcher(&mem).dispatch(envelope, config).await;

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].handler, "koji_build");
    let submitted = mem.queue.submitted();
    assert_eq!(submitted.len(), 2);
    assert!(submitted.iter().all(|(task, _)| *task == TaskName::RunKojiBuild));
    assert_eq!(mem.triggers.len(), 1);
}

#[tokio::test]
async fn test_callback_for_unknown_pipeline_still_reports() {
    let mem = InMemoryServices::new();
    let envelope = EventParser::default()
        .classify(&tf_callback("never-submitted", "error"))
        .accepted()
        .unwrap();

    let outcomes = dispatcher(&mem)
        .dispatch(envelope, Arc::new(Default::default()))
        .await;

    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].success());
    let reports = mem.reporter.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].state, CommitState::Error);
    assert_eq!(reports[0].url, "https://artifacts.example.org/never-submitted");
}

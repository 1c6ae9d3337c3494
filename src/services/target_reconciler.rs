//! Build/test target reconciliation.
//!
//! For a test request, targets are split into those that already have a
//! build for the commit and those that do not. Missing builds are requested
//! with a single build job, and tests are submitted for every target whose
//! build succeeded.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::domain::models::build::BuildArtifactRef;
use crate::domain::models::event::EventEnvelope;
use crate::domain::models::job::{HandlerResult, JobSpec};
use crate::domain::models::status::{test_check_name, CommitState, StatusReport};
use crate::domain::models::test_run::TestRun;
use crate::domain::ports::{TaskName, TestRunRequest};
use crate::services::context::ServiceContext;
use crate::services::handlers::format_targets;

/// Pending status for a target whose build was just requested.
pub const MISSING_BUILD_DESCRIPTION: &str = "Missing build for this target, running a new build.";
/// Failure status for a target whose latest build did not succeed.
pub const FAILED_BUILD_DESCRIPTION: &str =
    "The latest build was not successful, not running tests for it.";
/// Running status once tests are submitted for a target.
pub const TESTS_SUBMITTED_DESCRIPTION: &str = "Tests have been submitted ...";
/// Error status when the build job for missing targets cannot be queued.
pub const BUILD_SUBMIT_FAILED_DESCRIPTION: &str = "Failed to trigger a build for this target.";
/// Error status when tests were submitted but their run could not be stored.
pub const UNTRACKED_RUN_DESCRIPTION: &str = "Tests were submitted but cannot be tracked.";

/// Input of one reconcile pass.
#[derive(Debug, Clone)]
pub struct ReconcileRequest {
    /// Event the tests are requested for.
    pub envelope: Arc<EventEnvelope>,
    /// Matched `tests` job, forwarded to the build job.
    pub job: Option<JobSpec>,
    /// Targets to test.
    pub targets: BTreeSet<String>,
    /// Commit builds are looked up for.
    pub commit_sha: String,
    /// Build every target is tested against; skips per-target lookup.
    pub existing_build_id: Option<Uuid>,
}

/// Targets partitioned by whether a build exists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    /// Targets with their latest build, whatever its status.
    pub with_build: BTreeMap<String, BuildArtifactRef>,
    /// Targets with no known build, in request order.
    pub without_build: Vec<String>,
}

/// Splits targets and submits the resulting build and test jobs.
#[derive(Debug, Clone)]
pub struct TargetReconciler {
    services: Arc<ServiceContext>,
}

impl TargetReconciler {
    /// Reconciler working against the given ports.
    pub fn new(services: Arc<ServiceContext>) -> Self {
        Self { services }
    }

    /// Partition targets by build availability. Lookup errors count as no build.
    pub async fn plan(&self, request: &ReconcileRequest) -> ReconcilePlan {
        let mut plan = ReconcilePlan::default();

        if let Some(build_id) = request.existing_build_id {
            let build = match self.services.builds.get_build(build_id).await {
                Ok(build) => build,
                Err(e) => {
                    warn!(build_id = %build_id, error = %e, "Build lookup failed");
                    None
                }
            };
            match build {
                Some(build) => {
                    for target in &request.targets {
                        plan.with_build.insert(target.clone(), build.clone());
                    }
                }
                None => plan.without_build.extend(request.targets.iter().cloned()),
            }
            return plan;
        }

        for target in &request.targets {
            let build = self
                .services
                .builds
                .find_latest_build(target, &request.commit_sha)
                .await;
            match build {
                Ok(Some(build)) => {
                    plan.with_build.insert(target.clone(), build);
                }
                Ok(None) => plan.without_build.push(target.clone()),
                Err(e) => {
                    warn!(target = %target, error = %e, "Build lookup failed");
                    plan.without_build.push(target.clone());
                }
            }
        }
        plan
    }

    /// Run a full reconcile pass.
    #[instrument(skip(self, request), fields(commit = %request.commit_sha, targets = request.targets.len()))]
    pub async fn reconcile(&self, request: ReconcileRequest) -> HandlerResult {
        if request.targets.is_empty() {
            return HandlerResult::success();
        }

        let plan = self.plan(&request).await;
        let mut details = Map::new();
        let mut failed_builds: BTreeMap<String, String> = BTreeMap::new();

        if !plan.without_build.is_empty() {
            let msg = match self.request_missing_builds(&request, &plan.without_build).await {
                Ok(()) => format!(
                    "Build triggered for targets {} missing a build. ",
                    format_targets(&plan.without_build)
                ),
                Err(reason) => {
                    for target in &plan.without_build {
                        failed_builds.insert(target.clone(), reason.clone());
                    }
                    format!(
                        "Failed to trigger build for targets {} missing a build. ",
                        format_targets(&plan.without_build)
                    )
                }
            };
            details.insert("msg".to_string(), Value::String(msg));
        }

        let mut failed: BTreeMap<String, String> = BTreeMap::new();
        for (target, build) in &plan.with_build {
            if !build.succeeded() {
                info!(target = %target, build_id = %build.build_id, "Build not successful, skipping tests");
                self.report(
                    &request,
                    target,
                    CommitState::Failure,
                    FAILED_BUILD_DESCRIPTION,
                    self.services.urls().copr_build(build.build_id),
                )
                .await;
                continue;
            }

            if let Err(reason) = self.submit_tests(&request, target, build).await {
                failed.insert(target.clone(), reason);
            }
        }

        if failed.is_empty() && failed_builds.is_empty() {
            return HandlerResult {
                success: true,
                details,
            };
        }

        if !failed.is_empty() {
            let failed_targets: Vec<String> = failed.keys().cloned().collect();
            let msg = details
                .get("msg")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            details.insert(
                "msg".to_string(),
                Value::String(format!(
                    "{msg}Failed testing farm targets: '{}'.",
                    format_targets(&failed_targets)
                )),
            );
        }
        for (target, reason) in failed_builds.into_iter().chain(failed) {
            details.insert(target, Value::String(reason));
        }
        HandlerResult {
            success: false,
            details,
        }
    }

    /// Queue one build job for every target without a build.
    async fn request_missing_builds(
        &self,
        request: &ReconcileRequest,
        without_build: &[String],
    ) -> Result<(), String> {
        let event = request
            .envelope
            .data()
            .with_override_targets(without_build.iter().cloned());
        let kwargs = serde_json::json!({
            "event": event,
            "job_config": request.job,
        });

        if let Err(e) = self.services.queue.submit(TaskName::RunCoprBuild, kwargs).await {
            warn!(error = %e, "Failed to queue build for missing targets");
            for target in without_build {
                self.report(
                    request,
                    target,
                    CommitState::Error,
                    BUILD_SUBMIT_FAILED_DESCRIPTION,
                    String::new(),
                )
                .await;
            }
            return Err(e.to_string());
        }

        self.services
            .metrics
            .copr_builds_queued_by(without_build.len() as u64);
        for target in without_build {
            self.report(
                request,
                target,
                CommitState::Pending,
                MISSING_BUILD_DESCRIPTION,
                String::new(),
            )
            .await;
        }
        Ok(())
    }

    async fn submit_tests(
        &self,
        request: &ReconcileRequest,
        target: &str,
        build: &BuildArtifactRef,
    ) -> Result<(), String> {
        let trigger = request.envelope.resolved_trigger();
        let test_request = TestRunRequest {
            target: target.to_string(),
            commit_sha: request.commit_sha.clone(),
            build_id: build.build_id,
            project_url: request.envelope.data().project_url.clone(),
            trigger,
        };

        let submission = match self.services.executor.submit(&test_request).await {
            Ok(submission) => submission,
            Err(e) => {
                warn!(target = %target, error = %e, "Test submission failed");
                self.report(
                    request,
                    target,
                    CommitState::Error,
                    &format!("Failed to submit tests: {e}"),
                    String::new(),
                )
                .await;
                return Err(e.to_string());
            }
        };

        let run = TestRun::new(submission.pipeline_id, target)
            .with_commit_sha(Some(request.commit_sha.clone()))
            .with_build(build.build_id)
            .with_trigger(trigger);
        self.services.metrics.test_run_queued();
        if let Err(e) = self.services.test_runs.create(&run).await {
            warn!(pipeline_id = %run.pipeline_id, error = %e, "Failed to record test run");
            self.report(
                request,
                target,
                CommitState::Error,
                UNTRACKED_RUN_DESCRIPTION,
                String::new(),
            )
            .await;
            return Err(format!(
                "Tests submitted as pipeline {} but the run was not recorded: {e}",
                run.pipeline_id
            ));
        }
        info!(target = %target, pipeline_id = %run.pipeline_id, "Tests submitted");

        self.report(
            request,
            target,
            CommitState::Running,
            TESTS_SUBMITTED_DESCRIPTION,
            self.services.urls().testing_farm(run.id),
        )
        .await;
        Ok(())
    }

    async fn report(
        &self,
        request: &ReconcileRequest,
        target: &str,
        state: CommitState,
        description: &str,
        url: String,
    ) {
        let report = StatusReport::new(state, description)
            .with_url(url)
            .with_check_names(vec![test_check_name(target)])
            .with_commit_sha(Some(request.commit_sha.clone()))
            .with_trigger(request.envelope.resolved_trigger());
        if let Err(e) = self.services.reporter.report(&report).await {
            warn!(target = %target, error = %e, "Failed to report status");
        }
    }
}

//! Runs tests in Testing Farm on top of Copr builds.

use std::collections::BTreeSet;

use async_trait::async_trait;
use tracing::{debug, instrument};

use super::{HandlerContext, JobHandler};
use crate::domain::errors::DomainResult;
use crate::domain::models::build::BuildStatus;
use crate::domain::models::event::EventKind;
use crate::domain::models::job::{HandlerResult, JobType};
use crate::services::comment_parser::CommandKeyword;
use crate::services::target_reconciler::{ReconcileRequest, TargetReconciler};

/// Result message when a build-end event reports an unfinished build.
pub const BUILD_NOT_FINISHED_MESSAGE: &str = "Build has not finished yet, tests will run when it does.";

/// Runs Testing Farm tests, building first where needed.
pub struct TestingFarmHandler {
    context: HandlerContext,
}

impl TestingFarmHandler {
    /// Creates the handler for one matched job.
    pub fn new(context: HandlerContext) -> Self {
        Self { context }
    }

    /// Constructor used by the registry.
    pub fn boxed(context: HandlerContext) -> Box<dyn JobHandler> {
        Box::new(Self::new(context))
    }

    /// `/packit test <target>` narrows this handler to that target.
    fn targets(&self) -> BTreeSet<String> {
        let requested = self
            .context
            .commands
            .iter()
            .find(|command| command.keyword == CommandKeyword::Test)
            .and_then(|command| command.first_arg());
        match requested {
            Some(target) => BTreeSet::from([target.to_string()]),
            None => self.context.effective_targets(),
        }
    }

    /// Automatic events wait for the build job's build-end when one is configured.
    fn waits_for_build(&self) -> bool {
        let envelope = &self.context.envelope;
        if !matches!(
            envelope.kind(),
            EventKind::PullRequest | EventKind::Push | EventKind::Release
        ) {
            return false;
        }
        envelope.trigger_kind().is_some_and(|kind| {
            self.context
                .repo_config
                .job_for(JobType::Build, kind)
                .is_some()
        })
    }
}

#[async_trait]
impl JobHandler for TestingFarmHandler {
    #[instrument(skip(self), name = "testing_farm")]
    async fn run(&self) -> DomainResult<HandlerResult> {
        if self.waits_for_build() {
            debug!("Build job configured, tests run when the build finishes");
            return Ok(HandlerResult::success().with_msg("Tests will run after the build finishes."));
        }

        let envelope = &self.context.envelope;
        let data = envelope.data();
        let services = &self.context.services;

        let mut existing_build_id = None;
        let mut commit_sha = data.commit_sha.clone();
        if data.kind == EventKind::BuildEnd {
            let Some(build_id) = data.build_id else {
                return Ok(HandlerResult::failure("Build-end event has no build ID."));
            };
            let stored = services.builds.get_build(build_id).await?;
            let status = data
                .identifier
                .as_deref()
                .and_then(BuildStatus::from_str)
                .or_else(|| stored.as_ref().map(|build| build.status));
            if status.is_some_and(|status| !status.is_terminal()) {
                debug!(build_id = %build_id, ?status, "Build still in progress, no tests yet");
                return Ok(HandlerResult::success().with_msg(BUILD_NOT_FINISHED_MESSAGE));
            }
            existing_build_id = Some(build_id);
            if commit_sha.is_none() {
                commit_sha = stored.map(|build| build.commit_sha);
            }
        }
        let Some(commit_sha) = commit_sha else {
            return Ok(HandlerResult::failure("Cannot determine the commit to test."));
        };

        let request = ReconcileRequest {
            envelope: envelope.clone(),
            job: self.context.job.clone(),
            targets: self.targets(),
            commit_sha,
            existing_build_id,
        };
        Ok(TargetReconciler::new(services.clone())
            .reconcile(request)
            .await)
    }
}

//! Records the outcome of a finished build.

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use super::{HandlerContext, JobHandler};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::build::BuildStatus;
use crate::domain::models::job::HandlerResult;
use crate::domain::models::status::{build_check_name, CommitState, StatusReport};

/// Stores a finished build's status and reports it.
pub struct BuildEndHandler {
    context: HandlerContext,
}

impl BuildEndHandler {
    /// Creates the handler for one matched job.
    pub fn new(context: HandlerContext) -> Self {
        Self { context }
    }

    /// Constructor used by the registry.
    pub fn boxed(context: HandlerContext) -> Box<dyn JobHandler> {
        Box::new(Self::new(context))
    }
}

#[async_trait]
impl JobHandler for BuildEndHandler {
    #[instrument(skip(self), name = "build_end")]
    async fn run(&self) -> DomainResult<HandlerResult> {
        let data = self.context.envelope.data();
        let Some(build_id) = data.build_id else {
            return Ok(HandlerResult::failure("Build-end event has no build ID."));
        };
        let Some(status) = data.identifier.as_deref().and_then(BuildStatus::from_str) else {
            return Ok(HandlerResult::failure(format!(
                "Unknown build status {:?}.",
                data.identifier
            )));
        };

        let services = &self.context.services;
        let build = services
            .builds
            .get_build(build_id)
            .await?
            .ok_or(DomainError::BuildNotFound(build_id))?;
        services.builds.set_status(build_id, status).await?;
        info!(build_id = %build_id, target = %build.target, status = status.as_str(), "Build finished");

        let (state, description) = match status {
            BuildStatus::Succeeded => (CommitState::Success, "RPMs were built successfully."),
            BuildStatus::Failed => (CommitState::Failure, "RPMs failed to be built."),
            BuildStatus::Queued | BuildStatus::Pending | BuildStatus::Running => {
                (CommitState::Running, "RPM build is in progress...")
            }
        };
        let report = StatusReport::new(state, description)
            .with_url(services.urls().copr_build(build_id))
            .with_check_names(vec![build_check_name(&build.target)])
            .with_commit_sha(Some(build.commit_sha.clone()))
            .with_trigger(self.context.envelope.resolved_trigger());
        if let Err(e) = services.reporter.report(&report).await {
            warn!(error = %e, "Failed to report build status");
        }

        Ok(HandlerResult::success())
    }
}

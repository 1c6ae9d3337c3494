//! Requests Copr builds for a job's targets.

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use super::{format_targets, HandlerContext, JobHandler};
use crate::domain::errors::DomainResult;
use crate::domain::models::job::HandlerResult;
use crate::domain::models::status::{build_check_name, CommitState, StatusReport};
use crate::domain::ports::TaskName;

/// Queues a Copr build for the effective targets.
pub struct CoprBuildHandler {
    context: HandlerContext,
}

impl CoprBuildHandler {
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
impl JobHandler for CoprBuildHandler {
    #[instrument(skip(self), name = "copr_build")]
    async fn run(&self) -> DomainResult<HandlerResult> {
        let targets = self.context.effective_targets();
        if targets.is_empty() {
            return Ok(HandlerResult::success().with_msg("No targets to build."));
        }

        let services = &self.context.services;
        let event = self
            .context
            .envelope
            .data()
            .with_override_targets(targets.iter().cloned());
        let kwargs = self.context.task_kwargs(serde_json::to_value(&event)?);
        services.queue.submit(TaskName::RunCoprBuild, kwargs).await?;
        services.metrics.copr_builds_queued_by(targets.len() as u64);
        info!(targets = targets.len(), "Copr build queued");

        for target in &targets {
            let report = StatusReport::new(CommitState::Pending, "Job is in progress...")
                .with_check_names(vec![build_check_name(target)])
                .with_commit_sha(event.commit_sha.clone())
                .with_trigger(self.context.envelope.resolved_trigger());
            if let Err(e) = services.reporter.report(&report).await {
                warn!(target = %target, error = %e, "Failed to report build status");
            }
        }

        Ok(HandlerResult::success().with_msg(format!(
            "Build submitted for targets {}.",
            format_targets(&targets)
        )))
    }
}

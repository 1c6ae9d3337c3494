//! Requests Koji production builds, one job per target.

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{info, instrument, warn};

use super::{HandlerContext, JobHandler};
use crate::domain::errors::DomainResult;
use crate::domain::models::job::HandlerResult;
use crate::domain::models::status::{production_build_check_name, CommitState, StatusReport};
use crate::domain::ports::TaskName;

/// Result message when some chroots failed to submit.
pub const PARTIAL_SUBMIT_MESSAGE: &str = "Koji build submit was not successful for all chroots.";

/// Queues a Koji production build.
pub struct KojiBuildHandler {
    context: HandlerContext,
}

impl KojiBuildHandler {
    /// Creates the handler for one matched job.
    pub fn new(context: HandlerContext) -> Self {
        Self { context }
    }

    /// Constructor used by the registry.
    pub fn boxed(context: HandlerContext) -> Box<dyn JobHandler> {
        Box::new(Self::new(context))
    }

    fn is_supported(&self, target: &str) -> bool {
        let supported = &self.context.services.settings.supported_production_targets;
        supported.is_empty() || supported.iter().any(|t| t == target)
    }

    async fn report(&self, target: &str, state: CommitState, description: &str) {
        let report = StatusReport::new(state, description)
            .with_check_names(vec![production_build_check_name(target)])
            .with_commit_sha(self.context.envelope.data().commit_sha.clone())
            .with_trigger(self.context.envelope.resolved_trigger());
        if let Err(e) = self.context.services.reporter.report(&report).await {
            warn!(target = %target, error = %e, "Failed to report production build status");
        }
    }
}

#[async_trait]
impl JobHandler for KojiBuildHandler {
    #[instrument(skip(self), name = "koji_build")]
    async fn run(&self) -> DomainResult<HandlerResult> {
        let services = &self.context.services;
        let mut errors = Map::new();

        for target in self.context.effective_targets() {
            if !self.is_supported(&target) {
                let msg = format!("Target not supported: {target}");
                self.report(&target, CommitState::Error, &msg).await;
                errors.insert(target, Value::String(msg));
                continue;
            }

            let event = self
                .context
                .envelope
                .data()
                .with_override_targets([target.clone()]);
            let kwargs = self.context.task_kwargs(serde_json::to_value(&event)?);
            match services.queue.submit(TaskName::RunKojiBuild, kwargs).await {
                Ok(()) => {
                    services.metrics.koji_build_queued();
                    info!(target = %target, "Koji build queued");
                    self.report(&target, CommitState::Pending, "Building RPM ...").await;
                }
                Err(e) => {
                    self.report(&target, CommitState::Error, &format!("Submit failed: {e}"))
                        .await;
                    errors.insert(target, Value::String(e.to_string()));
                }
            }
        }

        if errors.is_empty() {
            return Ok(HandlerResult::success());
        }
        Ok(HandlerResult::failure(PARTIAL_SUBMIT_MESSAGE).with_detail("errors", Value::Object(errors)))
    }
}

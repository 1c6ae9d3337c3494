//! Dispatch of classified events to matching job handlers.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{error, info, instrument, warn};

use crate::domain::errors::DomainError;
use crate::domain::models::event::{EventEnvelope, EventKind};
use crate::domain::models::job::{HandlerResult, JobOutcome, RepositoryConfig};
use crate::services::comment_parser::parse_commands;
use crate::services::context::ServiceContext;
use crate::services::handler_registry::{HandlerMatch, HandlerRegistry};
use crate::services::handlers::HandlerContext;

/// Runs every handler that applies to an event.
#[derive(Debug, Clone)]
pub struct JobDispatcher {
    registry: Arc<HandlerRegistry>,
    services: Arc<ServiceContext>,
}

impl JobDispatcher {
    /// Creates a dispatcher over `registry` sharing `services` with every handler.
    pub fn new(registry: Arc<HandlerRegistry>, services: Arc<ServiceContext>) -> Self {
        Self { registry, services }
    }

    /// The registry consulted for each event.
    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Collaborators handed to handlers.
    pub fn services(&self) -> &Arc<ServiceContext> {
        &self.services
    }

    /// Dispatch one event.
    ///
    /// Returns one outcome per matched handler, in registration order. An
    /// event whose trigger cannot be resolved yields no outcomes. A handler
    /// that errors or panics yields a failed outcome; the others still run.
    #[instrument(skip(self, envelope, repo_config), fields(kind = %envelope.kind()))]
    pub async fn dispatch(
        &self,
        envelope: EventEnvelope,
        repo_config: Arc<RepositoryConfig>,
    ) -> Vec<JobOutcome> {
        let envelope = self.resolve_build_trigger(envelope).await;

        if envelope.kind().requires_trigger()
            && envelope
                .trigger_reference(self.services.triggers.as_ref())
                .await
                .is_none()
        {
            warn!(
                project_url = ?envelope.data().project_url,
                "Cannot resolve trigger for event, nothing dispatched"
            );
            return Vec::new();
        }

        let commands = envelope
            .data()
            .comment
            .as_deref()
            .filter(|_| envelope.kind().is_comment())
            .map(|comment| parse_commands(comment, &self.services.settings.comment_command_prefix))
            .unwrap_or_default();

        let envelope = Arc::new(envelope);
        let matches = self.registry.matching(&envelope, &repo_config, &commands);
        if matches.is_empty() {
            info!("No handler matched the event");
            return Vec::new();
        }

        let mut outcomes = Vec::with_capacity(matches.len());
        for matched in matches {
            let context = HandlerContext {
                envelope: envelope.clone(),
                job: matched.job.clone(),
                repo_config: repo_config.clone(),
                commands: commands.clone(),
                services: self.services.clone(),
            };
            outcomes.push(Self::run_handler(matched, context).await);
        }
        outcomes
    }

    /// Build-end events take their trigger from the build record.
    async fn resolve_build_trigger(&self, envelope: EventEnvelope) -> EventEnvelope {
        if envelope.kind() != EventKind::BuildEnd || envelope.resolved_trigger().is_some() {
            return envelope;
        }
        let Some(build_id) = envelope.data().build_id else {
            return envelope;
        };
        match self.services.builds.trigger_of_build(build_id).await {
            Ok(trigger) => EventEnvelope::with_resolved_trigger(envelope.into_data(), trigger),
            Err(e) => {
                warn!(build_id = %build_id, error = %e, "Cannot load trigger of build");
                envelope
            }
        }
    }

    async fn run_handler(matched: HandlerMatch<'_>, context: HandlerContext) -> JobOutcome {
        let registration = matched.registration;
        let name = registration.name;

        let handler = match std::panic::catch_unwind(AssertUnwindSafe(|| {
            (registration.constructor)(context)
        })) {
            Ok(handler) => handler,
            Err(payload) => {
                let err = DomainError::HandlerPanicked {
                    handler: name.to_string(),
                    message: panic_message(payload.as_ref()),
                };
                error!(handler = name, error = %err, "Handler construction panicked");
                return outcome(&matched, HandlerResult::failure(err.to_string()));
            }
        };

        let result = match AssertUnwindSafe(handler.run()).catch_unwind().await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                error!(handler = name, error = %e, "Handler failed");
                HandlerResult::failure(e.to_string())
            }
            Err(payload) => {
                let err = DomainError::HandlerPanicked {
                    handler: name.to_string(),
                    message: panic_message(payload.as_ref()),
                };
                error!(handler = name, error = %err, "Handler panicked");
                HandlerResult::failure(err.to_string())
            }
        };

        info!(handler = name, success = result.success, "Handler finished");
        outcome(&matched, result)
    }
}

fn outcome(matched: &HandlerMatch<'_>, result: HandlerResult) -> JobOutcome {
    JobOutcome {
        handler: matched.registration.name.to_string(),
        job_type: matched.job.as_ref().map(|job| job.job_type),
        trigger: matched.job.as_ref().map(|job| job.trigger),
        result,
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryServices;
    use crate::domain::errors::DomainResult;
    use crate::domain::models::event::EventData;
    use crate::domain::models::job::{JobSpec, JobTriggerType, JobType};
    use crate::services::comment_parser::CommandKeyword;
    use crate::services::handler_registry::{HandlerPredicate, HandlerRegistration};
    use crate::services::handlers::JobHandler;
    use async_trait::async_trait;

    struct Panicking;

    #[async_trait]
    impl JobHandler for Panicking {
        async fn run(&self) -> DomainResult<HandlerResult> {
            panic!("handler exploded");
        }
    }

    struct Failing;

    #[async_trait]
    impl JobHandler for Failing {
        async fn run(&self) -> DomainResult<HandlerResult> {
            Err(DomainError::ExecutionFailed("no capacity".to_string()))
        }
    }

    struct Succeeding;

    #[async_trait]
    impl JobHandler for Succeeding {
        async fn run(&self) -> DomainResult<HandlerResult> {
            Ok(HandlerResult::success())
        }
    }

    fn registration(
        name: &'static str,
        constructor: crate::services::handlers::HandlerConstructor,
    ) -> HandlerRegistration {
        HandlerRegistration {
            name,
            predicate: HandlerPredicate {
                event_kinds: &[EventKind::PullRequestComment],
                job_types: &[JobType::Tests],
                command: Some(CommandKeyword::Test),
                check_prefix: None,
            },
            constructor,
        }
    }

    fn comment_event(project_url: Option<&str>) -> EventEnvelope {
        let mut data = EventData::new(EventKind::PullRequestComment, "user")
            .with_pull_request(9)
            .with_comment("/packit test");
        if let Some(url) = project_url {
            data = data.with_project_url(url);
        }
        EventEnvelope::new(data)
    }

    fn tests_config() -> Arc<RepositoryConfig> {
        Arc::new(RepositoryConfig::new(vec![JobSpec::new(
            JobType::Tests,
            JobTriggerType::PullRequest,
            ["fedora-35-x86_64"],
        )]))
    }

    #[tokio::test]
    async fn test_handler_faults_are_isolated() {
        let mem = InMemoryServices::new();
        let registry = HandlerRegistry::new(vec![
            registration("panicking", |_| Box::new(Panicking)),
            registration("failing", |_| Box::new(Failing)),
            registration("succeeding", |_| Box::new(Succeeding)),
        ]);
        let dispatcher = JobDispatcher::new(Arc::new(registry), mem.context());

        let outcomes = dispatcher
            .dispatch(
                comment_event(Some("https://github.com/packit-service/hello-world")),
                tests_config(),
            )
            .await;

        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].handler, "panicking");
        assert!(!outcomes[0].success());
        assert!(outcomes[0].result.msg().unwrap().contains("handler exploded"));
        assert!(!outcomes[1].success());
        assert_eq!(outcomes[1].result.msg(), Some("Test execution failed: no capacity"));
        assert!(outcomes[2].success());
        assert_eq!(outcomes[2].job_type, Some(JobType::Tests));
        assert_eq!(outcomes[2].trigger, Some(JobTriggerType::PullRequest));
    }

    #[tokio::test]
    async fn test_unresolvable_trigger_dispatches_nothing() {
        let mem = InMemoryServices::new();
        let dispatcher = JobDispatcher::new(Arc::new(HandlerRegistry::builtin()), mem.context());

        let outcomes = dispatcher.dispatch(comment_event(None), tests_config()).await;
        assert!(outcomes.is_empty());
        assert!(mem.reporter.reports().is_empty());
        assert!(mem.queue.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_no_matching_handler() {
        let mem = InMemoryServices::new();
        let dispatcher = JobDispatcher::new(Arc::new(HandlerRegistry::builtin()), mem.context());

        let outcomes = dispatcher
            .dispatch(
                comment_event(Some("https://github.com/packit-service/hello-world")),
                Arc::new(RepositoryConfig::default()),
            )
            .await;
        assert!(outcomes.is_empty());
    }
}

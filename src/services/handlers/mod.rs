//! Job handlers run by the dispatcher.
//!
//! A handler is constructed per matched `(registration, job)` pair with a
//! [`HandlerContext`] and run once.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::event::EventEnvelope;
use crate::domain::models::job::{HandlerResult, JobSpec, RepositoryConfig};
use crate::services::comment_parser::ParsedCommand;
use crate::services::context::ServiceContext;

pub mod build_end;
pub mod copr_build;
pub mod koji_build;
pub mod testing_farm;
pub mod testing_farm_results;

pub use build_end::BuildEndHandler;
pub use copr_build::CoprBuildHandler;
pub use koji_build::KojiBuildHandler;
pub use testing_farm::TestingFarmHandler;
pub use testing_farm_results::TestingFarmResultsHandler;

/// Everything a handler sees of the dispatch it runs in.
#[derive(Debug, Clone)]
pub struct HandlerContext {
    /// The event being handled.
    pub envelope: Arc<EventEnvelope>,
    /// Matched job configuration; `None` for handlers that need none.
    pub job: Option<JobSpec>,
    /// The repository's full job config.
    pub repo_config: Arc<RepositoryConfig>,
    /// Commands parsed from the triggering comment.
    pub commands: Vec<ParsedCommand>,
    /// Shared collaborators.
    pub services: Arc<ServiceContext>,
}

impl HandlerContext {
    /// Override targets when the event carries them, else the job's targets.
    pub fn effective_targets(&self) -> BTreeSet<String> {
        if let Some(targets) = self.envelope.override_targets() {
            return targets.clone();
        }
        self.job
            .as_ref()
            .map(|job| job.targets.clone())
            .unwrap_or_default()
    }

    /// Serialized event plus job config, the payload every queued task gets.
    pub(crate) fn task_kwargs(&self, event: serde_json::Value) -> serde_json::Value {
        serde_json::json!({
            "event": event,
            "job_config": self.job,
        })
    }
}

/// A unit of work run for one matched job.
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// Performs the work. An `Err` is recorded as a failed outcome.
    async fn run(&self) -> DomainResult<HandlerResult>;
}

/// Builds a handler for a matched registration.
pub type HandlerConstructor = fn(HandlerContext) -> Box<dyn JobHandler>;

/// Renders targets as `[a, b]` for user-facing messages.
pub(crate) fn format_targets<'a, I>(targets: I) -> String
where
    I: IntoIterator<Item = &'a String>,
{
    let joined = targets
        .into_iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{joined}]")
}

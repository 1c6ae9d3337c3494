use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::status::StatusReport;

/// Publishes commit statuses / check runs on the forge.
#[async_trait]
pub trait StatusReporter: Send + Sync {
    async fn report(&self, report: &StatusReport) -> DomainResult<()>;
}

//! Status reporting adapters.

use async_trait::async_trait;
use tracing::info;

use crate::domain::errors::DomainResult;
use crate::domain::models::status::StatusReport;
use crate::domain::ports::StatusReporter;

/// Emits every status report as a structured tracing event.
///
/// Stands in for a forge API client; the log carries everything a forge
/// status would.
#[derive(Debug, Clone, Default)]
pub struct TracingStatusReporter;

impl TracingStatusReporter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StatusReporter for TracingStatusReporter {
    async fn report(&self, report: &StatusReport) -> DomainResult<()> {
        for check_name in &report.check_names {
            info!(
                target: "forge_dispatch::status",
                check = %check_name,
                state = report.state.as_str(),
                description = %report.description,
                url = %report.url,
                commit_sha = ?report.commit_sha,
                links = ?report.external_links,
                "Commit status"
            );
        }
        Ok(())
    }
}

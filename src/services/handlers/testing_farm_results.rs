use async_trait::async_trait;
use tracing::instrument;

use super::{HandlerContext, JobHandler};
use crate::domain::errors::DomainResult;
use crate::domain::models::job::HandlerResult;
use crate::domain::models::test_run::TestResultCallback;
use crate::services::result_ingestor::ResultIngestor;

/// Feeds a Testing Farm callback event to the [`ResultIngestor`].
pub struct TestingFarmResultsHandler {
    context: HandlerContext,
}

impl TestingFarmResultsHandler {
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
impl JobHandler for TestingFarmResultsHandler {
    #[instrument(skip(self), name = "testing_farm_results")]
    async fn run(&self) -> DomainResult<HandlerResult> {
        let callback: TestResultCallback =
            serde_json::from_value(self.context.envelope.data().raw.clone())?;
        Ok(ResultIngestor::new(self.context.services.clone())
            .ingest(&callback)
            .await)
    }
}

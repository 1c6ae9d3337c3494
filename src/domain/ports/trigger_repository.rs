//! Repository port for trigger records.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::trigger::{ProjectCoordinates, StoredTrigger, TriggerKey, TriggerReference};

/// Storage of pull request, branch, release and issue records.
#[async_trait]
pub trait TriggerRepository: Send + Sync {
    /// Upsert the record identified by project plus natural key.
    ///
    /// Concurrent calls with the same key must converge on one record.
    async fn get_or_create(
        &self,
        project: &ProjectCoordinates,
        key: &TriggerKey,
    ) -> DomainResult<TriggerReference>;

    /// Fetch a stored record.
    async fn get(&self, reference: TriggerReference) -> DomainResult<Option<StoredTrigger>>;
}

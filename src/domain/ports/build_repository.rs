//! Repository port for build artifacts.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::build::{BuildArtifactRef, BuildStatus};
use crate::domain::models::trigger::TriggerReference;

/// Lookup and bookkeeping of builds produced by the build service.
#[async_trait]
pub trait BuildRepository: Send + Sync {
    /// Most recent build of `target` for `commit_sha`, whatever its status.
    async fn find_latest_build(
        &self,
        target: &str,
        commit_sha: &str,
    ) -> DomainResult<Option<BuildArtifactRef>>;

    /// Build by ID.
    async fn get_build(&self, build_id: Uuid) -> DomainResult<Option<BuildArtifactRef>>;

    /// Record a build and the trigger it was run for.
    async fn create_build(
        &self,
        build: &BuildArtifactRef,
        trigger: Option<TriggerReference>,
    ) -> DomainResult<()>;

    /// Update a build's status.
    async fn set_status(&self, build_id: Uuid, status: BuildStatus) -> DomainResult<()>;

    /// Trigger the build was run for.
    async fn trigger_of_build(&self, build_id: Uuid) -> DomainResult<Option<TriggerReference>>;
}

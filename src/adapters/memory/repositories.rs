//! In-memory repositories backed by mutex-guarded collections.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::build::{BuildArtifactRef, BuildStatus};
use crate::domain::models::test_run::{TestRun, TestStatus};
use crate::domain::models::trigger::{
    ProjectCoordinates, StoredTrigger, TriggerKey, TriggerReference,
};
use crate::domain::ports::{BuildRepository, TestRunRepository, TriggerRepository};

pub(super) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Trigger records keyed by project URL and natural key.
#[derive(Debug, Default)]
pub struct InMemoryTriggerRepository {
    records: Mutex<Vec<StoredTrigger>>,
    upserts: AtomicUsize,
}

impl InMemoryTriggerRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `get_or_create` calls served so far.
    pub fn upsert_calls(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        lock(&self.records).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TriggerRepository for InMemoryTriggerRepository {
    async fn get_or_create(
        &self,
        project: &ProjectCoordinates,
        key: &TriggerKey,
    ) -> DomainResult<TriggerReference> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        let mut records = lock(&self.records);

        let existing = records.iter().find(|record| {
            record.project.project_url == project.project_url
                && record.key.kind() == key.kind()
                && record.key.natural_key() == key.natural_key()
        });
        if let Some(record) = existing {
            return Ok(record.reference);
        }

        let reference = TriggerReference::new(key.kind(), Uuid::new_v4());
        records.push(StoredTrigger {
            reference,
            project: project.clone(),
            key: key.clone(),
        });
        Ok(reference)
    }

    async fn get(&self, reference: TriggerReference) -> DomainResult<Option<StoredTrigger>> {
        Ok(lock(&self.records)
            .iter()
            .find(|record| record.reference == reference)
            .cloned())
    }
}

/// Builds in insertion order; later builds shadow earlier ones.
#[derive(Debug, Default)]
pub struct InMemoryBuildRepository {
    builds: Mutex<Vec<(BuildArtifactRef, Option<TriggerReference>)>>,
}

impl InMemoryBuildRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builds(&self) -> Vec<BuildArtifactRef> {
        lock(&self.builds).iter().map(|(build, _)| build.clone()).collect()
    }
}

#[async_trait]
impl BuildRepository for InMemoryBuildRepository {
    async fn find_latest_build(
        &self,
        target: &str,
        commit_sha: &str,
    ) -> DomainResult<Option<BuildArtifactRef>> {
        Ok(lock(&self.builds)
            .iter()
            .rev()
            .map(|(build, _)| build)
            .find(|build| build.target == target && build.commit_sha == commit_sha)
            .cloned())
    }

    async fn get_build(&self, build_id: Uuid) -> DomainResult<Option<BuildArtifactRef>> {
        Ok(lock(&self.builds)
            .iter()
            .map(|(build, _)| build)
            .find(|build| build.build_id == build_id)
            .cloned())
    }

    async fn create_build(
        &self,
        build: &BuildArtifactRef,
        trigger: Option<TriggerReference>,
    ) -> DomainResult<()> {
        lock(&self.builds).push((build.clone(), trigger));
        Ok(())
    }

    async fn set_status(&self, build_id: Uuid, status: BuildStatus) -> DomainResult<()> {
        let mut builds = lock(&self.builds);
        let (build, _) = builds
            .iter_mut()
            .find(|(build, _)| build.build_id == build_id)
            .ok_or(DomainError::BuildNotFound(build_id))?;
        build.status = status;
        Ok(())
    }

    async fn trigger_of_build(&self, build_id: Uuid) -> DomainResult<Option<TriggerReference>> {
        Ok(lock(&self.builds)
            .iter()
            .find(|(build, _)| build.build_id == build_id)
            .and_then(|(_, trigger)| *trigger))
    }
}

/// Test runs keyed by pipeline ID.
#[derive(Debug, Default)]
pub struct InMemoryTestRunRepository {
    runs: Mutex<HashMap<String, TestRun>>,
    unavailable: Mutex<bool>,
}

impl InMemoryTestRunRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every run, oldest first.
    pub fn runs(&self) -> Vec<TestRun> {
        let mut runs: Vec<TestRun> = lock(&self.runs).values().cloned().collect();
        runs.sort_by_key(|run| run.submitted_at);
        runs
    }

    /// Make subsequent `create` calls fail.
    pub fn set_unavailable(&self, unavailable: bool) {
        *lock(&self.unavailable) = unavailable;
    }

    fn update(&self, pipeline_id: &str, apply: impl FnOnce(&mut TestRun)) -> DomainResult<()> {
        let mut runs = lock(&self.runs);
        let run = runs
            .get_mut(pipeline_id)
            .ok_or_else(|| DomainError::TestRunNotFound(pipeline_id.to_string()))?;
        apply(run);
        Ok(())
    }
}

#[async_trait]
impl TestRunRepository for InMemoryTestRunRepository {
    async fn create(&self, run: &TestRun) -> DomainResult<()> {
        if *lock(&self.unavailable) {
            return Err(DomainError::DatabaseError(
                "test run storage unavailable".to_string(),
            ));
        }
        let mut runs = lock(&self.runs);
        if runs.contains_key(&run.pipeline_id) {
            return Err(DomainError::ValidationFailed(format!(
                "Test run with pipeline ID {} already exists",
                run.pipeline_id
            )));
        }
        runs.insert(run.pipeline_id.clone(), run.clone());
        Ok(())
    }

    async fn get_by_pipeline_id(&self, pipeline_id: &str) -> DomainResult<Option<TestRun>> {
        Ok(lock(&self.runs).get(pipeline_id).cloned())
    }

    async fn set_status(&self, pipeline_id: &str, status: TestStatus) -> DomainResult<()> {
        self.update(pipeline_id, |run| run.status = status)
    }

    async fn set_log_url(&self, pipeline_id: &str, log_url: &str) -> DomainResult<()> {
        self.update(pipeline_id, |run| run.log_url = Some(log_url.to_string()))
    }

    async fn list(&self) -> DomainResult<Vec<TestRun>> {
        let mut runs = self.runs();
        runs.reverse();
        Ok(runs)
    }
}

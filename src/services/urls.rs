//! Links into the results dashboard.

use uuid::Uuid;

/// Builds dashboard URLs for runs and builds.
#[derive(Debug, Clone)]
pub struct DashboardUrls {
    base: String,
}

impl DashboardUrls {
    /// Links rooted at `base`; a trailing slash is dropped.
    pub fn new(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    /// Page of one test run.
    pub fn testing_farm(&self, run_id: Uuid) -> String {
        format!("{}/results/testing-farm/{run_id}", self.base)
    }

    /// Page of one Copr build.
    pub fn copr_build(&self, build_id: Uuid) -> String {
        format!("{}/results/copr-builds/{build_id}", self.base)
    }

    /// Page of one Koji build.
    pub fn koji_build(&self, build_id: Uuid) -> String {
        format!("{}/results/koji-builds/{build_id}", self.base)
    }
}

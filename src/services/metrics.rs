//! In-process dispatch counters.
//!
//! Counters are plain atomics; finish durations are kept so a caller can
//! summarize them. Every update is also emitted as a tracing event.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;

/// Counters for queued builds and test run lifecycle.
#[derive(Debug, Default)]
pub struct Metrics {
    copr_builds_queued: AtomicU64,
    koji_builds_queued: AtomicU64,
    test_runs_queued: AtomicU64,
    test_runs_started: AtomicU64,
    test_runs_finished: AtomicU64,
    test_run_durations: Mutex<Vec<Duration>>,
}

/// Point-in-time copy of [`Metrics`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    /// Copr builds queued, one per target.
    pub copr_builds_queued: u64,
    /// Koji build jobs queued.
    pub koji_builds_queued: u64,
    /// Test runs handed to the executor.
    pub test_runs_queued: u64,
    /// Running callbacks received.
    pub test_runs_started: u64,
    /// Final callbacks received.
    pub test_runs_finished: u64,
    /// Submit-to-finish durations of known runs.
    pub test_run_durations_secs: Vec<f64>,
}

impl Metrics {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a single queued Copr build.
    pub fn copr_build_queued(&self) {
        self.copr_builds_queued_by(1);
    }

    /// Count one queued build per target a build job covers.
    pub fn copr_builds_queued_by(&self, count: u64) {
        let total = self.copr_builds_queued.fetch_add(count, Ordering::Relaxed) + count;
        tracing::debug!(metric = "copr_builds_queued", total, "metric incremented");
    }

    /// Count a queued Koji build job.
    pub fn koji_build_queued(&self) {
        let total = self.koji_builds_queued.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(metric = "koji_builds_queued", total, "metric incremented");
    }

    /// Count a test run handed to the executor.
    pub fn test_run_queued(&self) {
        let total = self.test_runs_queued.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(metric = "test_runs_queued", total, "metric incremented");
    }

    /// Count a run reported as running.
    pub fn test_run_started(&self) {
        let total = self.test_runs_started.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(metric = "test_runs_started", total, "metric incremented");
    }

    /// Count a finished run, with its duration when the run is known.
    pub fn test_run_finished(&self, duration: Option<Duration>) {
        let total = self.test_runs_finished.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(duration) = duration {
            if let Ok(mut durations) = self.test_run_durations.lock() {
                durations.push(duration);
            }
            tracing::info!(
                metric = "test_runs_finished",
                total,
                duration_secs = duration.as_secs_f64(),
                "test run finished"
            );
        } else {
            tracing::debug!(metric = "test_runs_finished", total, "metric incremented");
        }
    }

    /// Copies the current values.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let durations = self
            .test_run_durations
            .lock()
            .map(|d| d.iter().map(Duration::as_secs_f64).collect())
            .unwrap_or_default();
        MetricsSnapshot {
            copr_builds_queued: self.copr_builds_queued.load(Ordering::Relaxed),
            koji_builds_queued: self.koji_builds_queued.load(Ordering::Relaxed),
            test_runs_queued: self.test_runs_queued.load(Ordering::Relaxed),
            test_runs_started: self.test_runs_started.load(Ordering::Relaxed),
            test_runs_finished: self.test_runs_finished.load(Ordering::Relaxed),
            test_run_durations_secs: durations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_and_durations() {
        let metrics = Metrics::new();
        metrics.test_run_queued();
        metrics.test_run_started();
        metrics.test_run_finished(Some(Duration::from_secs(90)));
        metrics.test_run_finished(None);
        metrics.copr_build_queued();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.test_runs_queued, 1);
        assert_eq!(snapshot.test_runs_started, 1);
        assert_eq!(snapshot.test_runs_finished, 2);
        assert_eq!(snapshot.copr_builds_queued, 1);
        assert_eq!(snapshot.koji_builds_queued, 0);
        assert_eq!(snapshot.test_run_durations_secs, vec![90.0]);
    }
}

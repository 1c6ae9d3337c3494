//! Implementation of the `forge-dispatch dispatch` command.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

use crate::cli::output::{output, table, truncate, CommandOutput};
use crate::cli::runtime::{load_config, read_payload, Runtime};
use crate::domain::models::event::EventKind;
use crate::domain::models::job::{JobOutcome, RepositoryConfig};
use crate::domain::models::status::StatusReport;
use crate::domain::ports::TaskName;
use crate::services::event_parser::Classification;
use crate::services::metrics::MetricsSnapshot;

#[derive(Args, Debug)]
pub struct DispatchArgs {
    /// Webhook payload file, or `-` for stdin
    pub payload: PathBuf,

    /// Repository job configuration (YAML with a `jobs` list)
    #[arg(long)]
    pub jobs: PathBuf,

    /// Configuration file (defaults to .forge-dispatch/ and environment)
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Keep storage, queue and reports in memory and print what would happen
    #[arg(long)]
    pub dry_run: bool,
}

/// A job the dispatch pass submitted to the queue.
#[derive(Debug, Clone, Serialize)]
pub struct QueuedJob {
    pub task: TaskName,
    pub kwargs: Value,
}

#[derive(Debug, Serialize)]
pub struct DispatchOutput {
    pub event_kind: Option<EventKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dropped: Option<String>,
    pub outcomes: Vec<JobOutcome>,
    pub metrics: MetricsSnapshot,
    /// Only filled for dry runs.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub queued: Vec<QueuedJob>,
    /// Only filled for dry runs.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reports: Vec<StatusReport>,
}

impl DispatchOutput {
    pub fn success(&self) -> bool {
        self.outcomes.iter().all(JobOutcome::success)
    }
}

impl CommandOutput for DispatchOutput {
    fn to_human(&self) -> String {
        let Some(kind) = self.event_kind else {
            return format!("Dropped: {}", self.dropped.as_deref().unwrap_or("unknown event"));
        };
        if self.outcomes.is_empty() {
            return format!("Event {kind}: no handler ran.");
        }

        let mut outcomes = table(&["Handler", "Job", "Trigger", "Result", "Message"]);
        for outcome in &self.outcomes {
            outcomes.add_row(vec![
                outcome.handler.clone(),
                outcome.job_type.map_or("-", |j| j.as_str()).to_string(),
                outcome.trigger.map_or("-", |t| t.as_str()).to_string(),
                if outcome.success() { "ok" } else { "failed" }.to_string(),
                outcome.result.msg().unwrap_or_default().to_string(),
            ]);
        }
        let mut sections = vec![format!("Event {kind}"), outcomes.to_string()];

        if !self.queued.is_empty() {
            let mut queued = table(&["Task", "Targets"]);
            for job in &self.queued {
                let targets = job.kwargs["event"]["override_targets"].to_string();
                queued.add_row(vec![job.task.to_string(), targets]);
            }
            sections.push(queued.to_string());
        }

        if !self.reports.is_empty() {
            let mut reports = table(&["Check", "State", "Description"]);
            for report in &self.reports {
                reports.add_row(vec![
                    report.check_names.join(", "),
                    report.state.as_str().to_string(),
                    truncate(&report.description, 60),
                ]);
            }
            sections.push(reports.to_string());
        }

        sections.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Classify `payload` and dispatch it against `repo_config`.
pub async fn run(
    runtime: &Runtime,
    payload: &Value,
    repo_config: RepositoryConfig,
) -> DispatchOutput {
    let (event_kind, dropped, outcomes) = match runtime.parser().classify(payload) {
        Classification::Accepted(envelope) => {
            let kind = envelope.kind();
            let outcomes = runtime
                .dispatcher()
                .dispatch(envelope, Arc::new(repo_config))
                .await;
            (Some(kind), None, outcomes)
        }
        Classification::Dropped { reason } => (None, Some(reason), Vec::new()),
    };

    let (queued, reports) = match runtime.recordings {
        Some(ref recordings) => (
            recordings
                .queue
                .submitted()
                .into_iter()
                .map(|(task, kwargs)| QueuedJob { task, kwargs })
                .collect(),
            recordings.reporter.reports(),
        ),
        None => (Vec::new(), Vec::new()),
    };

    DispatchOutput {
        event_kind,
        dropped,
        outcomes,
        metrics: runtime.services.metrics.snapshot(),
        queued,
        reports,
    }
}

pub async fn execute(args: DispatchArgs, json_mode: bool) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let jobs = tokio::fs::read_to_string(&args.jobs)
        .await
        .with_context(|| format!("Failed to read job configuration {}", args.jobs.display()))?;
    let repo_config = RepositoryConfig::from_yaml(&jobs).context("Invalid job configuration")?;
    let payload = read_payload(&args.payload).await?;

    let runtime = if args.dry_run {
        Runtime::in_memory(config)
    } else {
        Runtime::persistent(config).await?
    };

    let out = run(&runtime, &payload, repo_config).await;
    output(&out, json_mode);
    if !out.success() {
        anyhow::bail!("One or more handlers failed");
    }
    Ok(())
}

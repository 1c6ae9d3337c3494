//! Implementation of the `forge-dispatch runs` command.

use anyhow::Result;
use clap::Args;
use comfy_table::{Cell, Color};
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::output::{output, table, truncate, CommandOutput};
use crate::cli::runtime::{load_config, Runtime};
use crate::domain::models::test_run::{TestRun, TestStatus};

#[derive(Args, Debug)]
pub struct RunsArgs {
    /// Maximum number of runs to display
    #[arg(short, long, default_value = "50")]
    pub limit: usize,

    /// Configuration file (defaults to .forge-dispatch/ and environment)
    #[arg(long, short)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct RunsOutput {
    pub runs: Vec<TestRun>,
    pub total: usize,
}

fn status_color(status: TestStatus) -> Color {
    match status {
        TestStatus::Passed => Color::Green,
        TestStatus::Failed | TestStatus::Error => Color::Red,
        TestStatus::Running => Color::Yellow,
        TestStatus::Queued => Color::Grey,
    }
}

impl CommandOutput for RunsOutput {
    fn to_human(&self) -> String {
        if self.runs.is_empty() {
            return "No test runs found.".to_string();
        }

        let mut runs = table(&["Pipeline", "Target", "Commit", "Status", "Submitted"]);
        for run in &self.runs {
            runs.add_row(vec![
                Cell::new(truncate(&run.pipeline_id, 12)),
                Cell::new(&run.target),
                Cell::new(
                    run.commit_sha
                        .as_deref()
                        .map_or_else(|| "-".to_string(), |sha| sha.chars().take(8).collect()),
                ),
                Cell::new(run.status.as_str()).fg(status_color(run.status)),
                Cell::new(run.submitted_at.format("%Y-%m-%d %H:%M:%S").to_string()),
            ]);
        }
        format!("Showing {} of {} test run(s):\n{runs}", self.runs.len(), self.total)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: RunsArgs, json_mode: bool) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let runtime = Runtime::persistent(config).await?;

    let runs = runtime.services.test_runs.list().await?;
    let total = runs.len();
    let out = RunsOutput {
        runs: runs.into_iter().take(args.limit).collect(),
        total,
    };
    output(&out, json_mode);
    Ok(())
}

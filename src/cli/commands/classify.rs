//! Implementation of the `forge-dispatch classify` command.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::output::{output, CommandOutput};
use crate::cli::runtime::{load_config, read_payload};
use crate::domain::models::event::EventData;
use crate::services::comment_parser::{parse_commands, ParsedCommand};
use crate::services::event_parser::{Classification, EventParser};

#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// Webhook payload file, or `-` for stdin
    pub payload: PathBuf,

    /// Configuration file (defaults to .forge-dispatch/ and environment)
    #[arg(long, short)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct ClassifyOutput {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<EventData>,
    pub commands: Vec<ParsedCommand>,
}

impl ClassifyOutput {
    pub fn from_classification(classification: Classification, parser: &EventParser) -> Self {
        match classification {
            Classification::Accepted(envelope) => {
                let data = envelope.into_data();
                let commands = data
                    .comment
                    .as_deref()
                    .filter(|_| data.kind.is_comment())
                    .map(|c| parse_commands(c, parser.command_prefix()))
                    .unwrap_or_default();
                Self {
                    accepted: true,
                    reason: None,
                    event: Some(data),
                    commands,
                }
            }
            Classification::Dropped { reason } => Self {
                accepted: false,
                reason: Some(reason),
                event: None,
                commands: Vec::new(),
            },
        }
    }
}

impl CommandOutput for ClassifyOutput {
    fn to_human(&self) -> String {
        let Some(ref event) = self.event else {
            return format!(
                "Dropped: {}",
                self.reason.as_deref().unwrap_or("no matching event type")
            );
        };

        let mut lines = vec![format!("Accepted: {}", event.kind)];
        let fields = [
            ("Project", event.project_url.clone()),
            ("Commit", event.commit_sha.clone()),
            ("Ref", event.git_ref.clone()),
            ("Pull request", event.pull_request_id.map(|id| id.to_string())),
            ("Issue", event.issue_id.map(|id| id.to_string())),
            ("Tag", event.tag_name.clone()),
            ("Identifier", event.identifier.clone()),
            ("Build", event.build_id.map(|id| id.to_string())),
        ];
        for (label, value) in fields {
            if let Some(value) = value {
                lines.push(format!("  {label}: {value}"));
            }
        }
        if let Some(ref targets) = event.override_targets {
            let targets: Vec<&str> = targets.iter().map(String::as_str).collect();
            lines.push(format!("  Targets: {}", targets.join(", ")));
        }
        for command in &self.commands {
            lines.push(format!(
                "  Command: {} {}",
                command.keyword.as_str(),
                command.args.join(" ")
            ));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: ClassifyArgs, json_mode: bool) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let payload = read_payload(&args.payload).await?;

    let parser = EventParser::new(config.service.comment_command_prefix);
    let out = ClassifyOutput::from_classification(parser.classify(&payload), &parser);
    output(&out, json_mode);
    Ok(())
}

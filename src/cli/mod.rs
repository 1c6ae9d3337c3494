//! Command-line front end.

pub mod commands;
pub mod output;
pub mod runtime;

use clap::{Parser, Subcommand};

use commands::callback::CallbackArgs;
use commands::classify::ClassifyArgs;
use commands::dispatch::DispatchArgs;
use commands::init::InitArgs;
use commands::runs::RunsArgs;

#[derive(Parser, Debug)]
#[command(name = "forge-dispatch")]
#[command(about = "Classify forge events and dispatch build and test jobs", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the configuration directory, default config and database
    Init(InitArgs),
    /// Classify a webhook payload without dispatching it
    Classify(ClassifyArgs),
    /// Classify a payload and run every matching job handler
    Dispatch(DispatchArgs),
    /// Ingest a Testing Farm completion callback
    Callback(CallbackArgs),
    /// List recorded test runs
    Runs(RunsArgs),
}

impl Commands {
    /// Configuration file named on the command line, if any.
    pub fn config_path(&self) -> Option<&std::path::Path> {
        match self {
            Self::Init(_) => None,
            Self::Classify(args) => args.config.as_deref(),
            Self::Dispatch(args) => args.config.as_deref(),
            Self::Callback(args) => args.config.as_deref(),
            Self::Runs(args) => args.config.as_deref(),
        }
    }
}

/// Print a command failure and exit non-zero.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let body = serde_json::json!({
            "success": false,
            "error": format!("{err:#}"),
        });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1);
}

//! Forge Dispatch CLI entry point.

use clap::Parser;

use forge_dispatch::cli::commands::{callback, classify, dispatch, init, runs};
use forge_dispatch::cli::runtime::load_config;
use forge_dispatch::cli::{handle_error, Cli, Commands};
use forge_dispatch::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Invalid configuration is reported by the command itself.
    let log_config = load_config(cli.command.config_path())
        .map(|config| LogConfig::from(&config.logging))
        .unwrap_or_default();
    let _logger = match LoggerImpl::init(&log_config) {
        Ok(logger) => Some(logger),
        Err(err) => {
            eprintln!("Warning: logging disabled: {err:#}");
            None
        }
    };

    let result = match cli.command {
        Commands::Init(args) => init::execute(args, cli.json).await,
        Commands::Classify(args) => classify::execute(args, cli.json).await,
        Commands::Dispatch(args) => dispatch::execute(args, cli.json).await,
        Commands::Callback(args) => callback::execute(args, cli.json).await,
        Commands::Runs(args) => runs::execute(args, cli.json).await,
    };

    if let Err(err) = result {
        handle_error(err, cli.json);
    }
}

//! Implementation of the `forge-dispatch callback` command.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use crate::cli::commands::dispatch;
use crate::cli::output::output;
use crate::cli::runtime::{load_config, read_payload, Runtime};
use crate::domain::models::event::EventKind;
use crate::domain::models::job::RepositoryConfig;

#[derive(Args, Debug)]
pub struct CallbackArgs {
    /// Testing Farm callback file, or `-` for stdin
    pub payload: PathBuf,

    /// Configuration file (defaults to .forge-dispatch/ and environment)
    #[arg(long, short)]
    pub config: Option<PathBuf>,
}

pub async fn execute(args: CallbackArgs, json_mode: bool) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let payload = read_payload(&args.payload).await?;

    let runtime = Runtime::persistent(config).await?;
    let out = dispatch::run(&runtime, &payload, RepositoryConfig::default()).await;
    if out.event_kind != Some(EventKind::TestingFarmResults) {
        anyhow::bail!("Payload is not a Testing Farm callback (needs pipeline_id and result)");
    }

    output(&out, json_mode);
    Ok(())
}

//! Wiring of configuration, adapters and services for CLI commands.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::adapters::memory::InMemoryServices;
use crate::adapters::reporting::TracingStatusReporter;
use crate::adapters::spool::{QueuedTestExecutor, SpoolJobQueue};
use crate::adapters::sqlite::{
    initialize_configured_database, SqliteBuildRepository, SqliteTestRunRepository,
    SqliteTriggerRepository,
};
use crate::domain::models::config::Config;
use crate::domain::ports::JobQueue;
use crate::infrastructure::config::ConfigLoader;
use crate::services::{EventParser, HandlerRegistry, JobDispatcher, ServiceContext};

/// Services assembled for one CLI invocation.
pub struct Runtime {
    pub config: Config,
    pub services: Arc<ServiceContext>,
    /// Present for dry runs; holds the recorded jobs and reports.
    pub recordings: Option<InMemoryServices>,
}

impl Runtime {
    /// SQLite storage, spooled jobs and log-based status reports.
    pub async fn persistent(config: Config) -> Result<Self> {
        let pool = initialize_configured_database(&config.database)
            .await
            .context("Failed to initialize database. Run 'forge-dispatch init' first.")?;

        let queue: Arc<dyn JobQueue> = Arc::new(SpoolJobQueue::new(&config.queue.spool_path));
        let services = ServiceContext::new(
            Arc::new(SqliteTriggerRepository::new(pool.clone())),
            Arc::new(SqliteBuildRepository::new(pool.clone())),
            Arc::new(SqliteTestRunRepository::new(pool)),
            queue.clone(),
            Arc::new(TracingStatusReporter::new()),
            Arc::new(QueuedTestExecutor::new(queue)),
        )
        .with_settings(config.service.clone());

        Ok(Self {
            config,
            services: Arc::new(services),
            recordings: None,
        })
    }

    /// Everything in memory; nothing leaves the process.
    pub fn in_memory(config: Config) -> Self {
        let recordings = InMemoryServices::new();
        let services = recordings.services().with_settings(config.service.clone());
        Self {
            config,
            services: Arc::new(services),
            recordings: Some(recordings),
        }
    }

    pub fn parser(&self) -> EventParser {
        EventParser::new(self.config.service.comment_command_prefix.clone())
    }

    pub fn dispatcher(&self) -> JobDispatcher {
        JobDispatcher::new(Arc::new(HandlerRegistry::builtin()), self.services.clone())
    }
}

/// Load configuration from `path` when given, else from the working directory.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

/// Read a JSON payload from a file, or from stdin when the path is `-`.
pub async fn read_payload(path: &Path) -> Result<Value> {
    let contents = if path == Path::new("-") {
        use tokio::io::AsyncReadExt;
        let mut buf = String::new();
        tokio::io::stdin()
            .read_to_string(&mut buf)
            .await
            .context("Failed to read payload from stdin")?;
        buf
    } else {
        tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read payload {}", path.display()))?
    };
    serde_json::from_str(&contents).context("Payload is not valid JSON")
}

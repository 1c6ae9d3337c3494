pub mod build;
pub mod config;
pub mod event;
pub mod job;
pub mod status;
pub mod test_run;
pub mod trigger;

pub use build::{BuildArtifactRef, BuildStatus};
pub use config::{Config, DatabaseConfig, LoggingConfig, QueueConfig, ServiceConfig};
pub use event::{EventData, EventEnvelope, EventKind};
pub use job::{HandlerResult, JobOutcome, JobSpec, JobTriggerType, JobType, RepositoryConfig};
pub use status::{CommitState, StatusReport};
pub use test_run::{TestResultCallback, TestRun, TestStatus, TestingFarmResult};
pub use trigger::{ProjectCoordinates, StoredTrigger, TriggerKey, TriggerKind, TriggerReference};

//! Port trait definitions (Hexagonal Architecture)
//!
//! Async trait interfaces that adapters implement:
//! - TriggerRepository, BuildRepository, TestRunRepository: storage
//! - JobQueue: outbound task submission
//! - StatusReporter: commit status publishing
//! - TestExecutor: the external test service

pub mod build_repository;
pub mod job_queue;
pub mod status_reporter;
pub mod test_executor;
pub mod test_run_repository;
pub mod trigger_repository;

pub use build_repository::BuildRepository;
pub use job_queue::{JobQueue, TaskName};
pub use status_reporter::StatusReporter;
pub use test_executor::{TestExecutor, TestRunRequest, TestSubmission};
pub use test_run_repository::TestRunRepository;
pub use trigger_repository::TriggerRepository;

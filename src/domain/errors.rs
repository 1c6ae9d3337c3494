//! Domain errors for the forge dispatch system.

use thiserror::Error;
use uuid::Uuid;

/// Domain-level errors that can occur while dispatching forge events.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Trigger not found: {0}")]
    TriggerNotFound(Uuid),

    #[error("Build not found: {0}")]
    BuildNotFound(Uuid),

    #[error("Test run not found for pipeline {0}")]
    TestRunNotFound(String),

    #[error("Cannot resolve trigger: {0}")]
    UnresolvableTrigger(String),

    #[error("Invalid project URL: {0}")]
    InvalidProjectUrl(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Job submission failed for {task}: {reason}")]
    SubmissionFailed { task: String, reason: String },

    #[error("Status reporting failed: {0}")]
    ReportingFailed(String),

    #[error("Test execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Handler {handler} panicked: {message}")]
    HandlerPanicked { handler: String, message: String },
}

/// Result alias used across the crate.
pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::DatabaseError(err.to_string())
    }
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        DomainError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}

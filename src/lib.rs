//! Forge Dispatch - forge event classification and job dispatch
//!
//! Turns forge webhooks, build-finished notifications and Testing Farm
//! callbacks into jobs: Copr and Koji builds, and Testing Farm runs on top of
//! finished builds. Commit statuses are reported back for every target.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Event, trigger, job and status models plus port traits
//! - **Service Layer** (`services`): Classification, handler registry, dispatch,
//!   target reconciliation and result ingestion
//! - **Adapters** (`adapters`): SQLite storage, JSON-lines job spool, in-memory ports
//! - **Infrastructure Layer** (`infrastructure`): Configuration and logging
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use forge_dispatch::adapters::memory::InMemoryServices;
//! use forge_dispatch::services::{EventParser, HandlerRegistry, JobDispatcher};
//!
//! let envelope = EventParser::default().classify(&payload).accepted()?;
//! let dispatcher = JobDispatcher::new(Arc::new(HandlerRegistry::builtin()), services);
//! let outcomes = dispatcher.dispatch(envelope, repo_config).await;
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::models::{
    Config, EventData, EventEnvelope, EventKind, HandlerResult, JobOutcome, JobSpec,
    RepositoryConfig, TriggerKind, TriggerReference,
};
pub use domain::{DomainError, DomainResult};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{Classification, EventParser, HandlerRegistry, JobDispatcher, ServiceContext};

//! Adapters implementing the domain ports.
//!
//! - `sqlite`: trigger, build and test run storage
//! - `memory`: in-process ports for tests and dry runs
//! - `spool`: JSON-lines job queue and the queue-backed test executor
//! - `reporting`: status reporting

pub mod memory;
pub mod reporting;
pub mod spool;
pub mod sqlite;

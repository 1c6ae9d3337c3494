//! CLI command implementations.

pub mod callback;
pub mod classify;
pub mod dispatch;
pub mod init;
pub mod runs;

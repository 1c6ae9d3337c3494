use serde::{Deserialize, Serialize};

/// Main configuration structure for forge-dispatch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Dispatch behavior
    #[serde(default)]
    pub service: ServiceConfig,

    /// Outbound job queue
    #[serde(default)]
    pub queue: QueueConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to `SQLite` database file
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    ".forge-dispatch/forge-dispatch.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stdout only when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<String>,

    /// Rotation: daily, hourly, never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}

/// Dispatch behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ServiceConfig {
    /// Base URL of the results dashboard
    #[serde(default = "default_dashboard_url")]
    pub dashboard_url: String,

    /// Prefix that marks a comment line as a command
    #[serde(default = "default_comment_command_prefix")]
    pub comment_command_prefix: String,

    /// Koji targets production builds may use; empty allows every target
    #[serde(default)]
    pub supported_production_targets: Vec<String>,
}

fn default_dashboard_url() -> String {
    "https://dashboard.packit.dev".to_string()
}

fn default_comment_command_prefix() -> String {
    "/packit".to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            dashboard_url: default_dashboard_url(),
            comment_command_prefix: default_comment_command_prefix(),
            supported_production_targets: Vec::new(),
        }
    }
}

/// Outbound job queue
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct QueueConfig {
    /// JSON-lines file that submitted jobs are appended to
    #[serde(default = "default_spool_path")]
    pub spool_path: String,
}

fn default_spool_path() -> String {
    ".forge-dispatch/jobs.jsonl".to_string()
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            spool_path: default_spool_path(),
        }
    }
}

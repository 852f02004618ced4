//! Error types for the reconciliation engine.

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReconError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Failure reported by the record source, passed through as-is.
    #[error("Record source error: {0}")]
    Source(String),

    #[error("Unknown cluster: {0}")]
    UnknownCluster(u64),

    #[error(
        "No backup record found at or before {rollback_time}, check the rollback time or retry later"
    )]
    NoBackupNearTime { rollback_time: DateTime<Utc> },
}

pub type Result<T> = std::result::Result<T, ReconError>;

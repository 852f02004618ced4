//! Configuration management for the reconciliation engine.
//!
//! Loads configuration from a TOML file with environment variable overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::models::ClusterTopology;
use crate::reconcile::CompletenessMode;
use crate::{ReconError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub log: LogConfig,

    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub query: QueryConfig,

    /// Known clusters; the topology source of truth lives elsewhere.
    #[serde(default)]
    pub clusters: Vec<ClusterTopology>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Directory holding one sub-directory of `.jsonl` exports per collector
    #[serde(default = "default_source_root")]
    pub root: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Collector holding backup completion records
    #[serde(default = "default_backup_collector")]
    pub backup_collector: String,

    /// Collector holding binlog segment records
    #[serde(default = "default_binlog_collector")]
    pub binlog_collector: String,

    /// How far before the rollback time to look for backups
    #[serde(default = "default_rollback_window_days")]
    pub rollback_window_days: i64,

    /// How far back to look for privilege backups
    #[serde(default = "default_privilege_window_days")]
    pub privilege_window_days: i64,

    /// Widening applied to both ends of a binlog query to absorb shipping delay
    #[serde(default = "default_binlog_margin_minutes")]
    pub binlog_margin_minutes: i64,

    /// Only accept records flagged as full backups
    #[serde(default)]
    pub full_backup_only: bool,
}

/// Upper bound for the day-based search windows.
pub const MAX_WINDOW_DAYS: i64 = 3660;

/// Upper bound for the binlog query widening.
pub const MAX_BINLOG_MARGIN_MINUTES: i64 = 7 * 24 * 60;

impl QueryConfig {
    /// Reject windows that are negative or too wide to add to a timestamp.
    pub fn validate(&self) -> Result<()> {
        let bounded = [
            ("rollback_window_days", self.rollback_window_days, MAX_WINDOW_DAYS),
            ("privilege_window_days", self.privilege_window_days, MAX_WINDOW_DAYS),
            ("binlog_margin_minutes", self.binlog_margin_minutes, MAX_BINLOG_MARGIN_MINUTES),
        ];
        for (field, value, max) in bounded {
            if !(0..=max).contains(&value) {
                return Err(ReconError::Config(format!(
                    "query.{field} must be between 0 and {max}, got {value}"
                )));
            }
        }
        Ok(())
    }

    pub fn completeness_mode(&self) -> CompletenessMode {
        if self.full_backup_only {
            CompletenessMode::FullBackupOnly
        } else {
            CompletenessMode::SchemaAndData
        }
    }
}

// Default values
fn default_log_level() -> String {
    "info".to_string()
}

fn default_source_root() -> PathBuf {
    PathBuf::from("/var/lib/backup-recon/logs")
}

fn default_backup_collector() -> String {
    "mysql_dbbackup_result".to_string()
}

fn default_binlog_collector() -> String {
    "mysql_binlog_result".to_string()
}

fn default_rollback_window_days() -> i64 {
    15
}

fn default_privilege_window_days() -> i64 {
    7
}

fn default_binlog_margin_minutes() -> i64 {
    20
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            root: default_source_root(),
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            backup_collector: default_backup_collector(),
            binlog_collector: default_binlog_collector(),
            rollback_window_days: default_rollback_window_days(),
            privilege_window_days: default_privilege_window_days(),
            binlog_margin_minutes: default_binlog_margin_minutes(),
            full_backup_only: false,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// File (or defaults) first, then `.env` / process environment on top.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        config.query.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(level) = std::env::var("RECON_LOG_LEVEL") {
            self.log.level = level;
        }
        if let Ok(root) = std::env::var("RECON_SOURCE_ROOT") {
            self.source.root = PathBuf::from(root);
        }
        if let Ok(flag) = std::env::var("RECON_FULL_BACKUP_ONLY") {
            self.query.full_backup_only = flag.parse().map_err(|_| {
                ReconError::Config(format!("RECON_FULL_BACKUP_ONLY must be true or false, got {flag:?}"))
            })?;
        }
        Ok(())
    }

    pub fn cluster(&self, id: u64) -> Result<&ClusterTopology> {
        self.clusters
            .iter()
            .find(|c| c.id == id)
            .ok_or(ReconError::UnknownCluster(id))
    }
}

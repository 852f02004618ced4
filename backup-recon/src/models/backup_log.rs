//! Backup completion records as emitted by each node of a cluster.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::wire;

/// Task id written by legacy backup producers that never registered files.
pub const SENTINEL_TASK_ID: &str = "-1";

/// Role of the node that produced a backup record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    PrimaryShard,
    SecondaryShard,
    RouterPrimary,
    RouterSecondary,
    Coordinator,
    /// Any role this engine does not know about, kept under its literal name.
    Other(String),
}

impl Role {
    /// Name used by the producers.
    pub fn as_str(&self) -> &str {
        match self {
            Role::PrimaryShard => "master",
            Role::SecondaryShard => "slave",
            Role::RouterPrimary => "spider_master",
            Role::RouterSecondary => "spider_slave",
            Role::Coordinator => "TDBCTL",
            Role::Other(name) => name,
        }
    }

    /// Shard primaries and secondaries hold the data rows of a cluster.
    pub fn is_shard_node(&self) -> bool {
        matches!(self, Role::PrimaryShard | Role::SecondaryShard)
    }
}

impl From<String> for Role {
    fn from(name: String) -> Self {
        match name.as_str() {
            "master" => Role::PrimaryShard,
            "slave" => Role::SecondaryShard,
            "spider_master" => Role::RouterPrimary,
            "spider_slave" => Role::RouterSecondary,
            "TDBCTL" => Role::Coordinator,
            _ => Role::Other(name),
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BackupKind {
    Logical,
    Physical,
    Other(String),
}

impl Default for BackupKind {
    fn default() -> Self {
        BackupKind::Other(String::new())
    }
}

impl From<String> for BackupKind {
    fn from(raw: String) -> Self {
        match raw.to_lowercase().as_str() {
            "logical" => BackupKind::Logical,
            "physical" => BackupKind::Physical,
            _ => BackupKind::Other(raw),
        }
    }
}

impl From<BackupKind> for String {
    fn from(kind: BackupKind) -> Self {
        match kind {
            BackupKind::Logical => "logical".to_string(),
            BackupKind::Physical => "physical".to_string(),
            BackupKind::Other(raw) => raw,
        }
    }
}

/// What a backup captured, derived from the producer's free-form grant string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaDataScope {
    All,
    SchemaAndData,
    SchemaOnly,
    DataOnly,
    Unknown,
}

impl SchemaDataScope {
    /// Substring matching is deliberately loose: producers emit values such as
    /// `schema,data` or `Schema+Data+Grant` and all of them must keep working.
    pub fn classify(raw: &str) -> Self {
        let lowered = raw.to_lowercase();
        if lowered == "all" {
            return SchemaDataScope::All;
        }
        match (lowered.contains("schema"), lowered.contains("data")) {
            (true, true) => SchemaDataScope::SchemaAndData,
            (true, false) => SchemaDataScope::SchemaOnly,
            (false, true) => SchemaDataScope::DataOnly,
            (false, false) => SchemaDataScope::Unknown,
        }
    }

    pub fn is_complete(self) -> bool {
        matches!(self, SchemaDataScope::All | SchemaDataScope::SchemaAndData)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FileRole {
    Index,
    Privilege,
    #[default]
    Other,
}

impl From<String> for FileRole {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "index" => FileRole::Index,
            "priv" => FileRole::Privilege,
            _ => FileRole::Other,
        }
    }
}

impl From<FileRole> for String {
    fn from(role: FileRole) -> Self {
        match role {
            FileRole::Index => "index",
            FileRole::Privilege => "priv",
            FileRole::Other => "other",
        }
        .to_string()
    }
}

/// One file listed in a backup record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    #[serde(rename = "file_name")]
    pub name: String,

    #[serde(rename = "file_size", default)]
    pub size: u64,

    #[serde(default, deserialize_with = "wire::optional_id")]
    pub task_id: Option<String>,

    #[serde(rename = "file_type", default)]
    pub file_role: FileRole,
}

impl FileEntry {
    pub fn has_valid_task_id(&self) -> bool {
        matches!(self.task_id.as_deref(), Some(id) if id != SENTINEL_TASK_ID)
    }

    /// Projection handed to the restore job.
    pub fn detail(&self) -> FileDetail {
        FileDetail {
            task_id: self.task_id.clone().unwrap_or_default(),
            file_name: self.name.clone(),
            size: self.size,
        }
    }
}

/// `{file_name, size, task_id}` projection of a [`FileEntry`].
///
/// Derived ordering only breaks ties between merged records; recency goes
/// through [`FileDetail::task_order`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FileDetail {
    pub task_id: String,
    pub file_name: String,
    pub size: u64,
}

impl FileDetail {
    /// Task ids are issued in increasing numeric order; non-numeric ids rank
    /// below every numeric one.
    pub fn task_order(&self) -> (Option<u64>, &str, &str, u64) {
        (
            self.task_id.trim().parse().ok(),
            self.task_id.as_str(),
            self.file_name.as_str(),
            self.size,
        )
    }
}

/// One backup completion record emitted by one node for one backup attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupLogRecord {
    pub backup_id: String,

    #[serde(default, deserialize_with = "wire::lenient_string")]
    pub bill_id: String,

    #[serde(default, deserialize_with = "wire::lenient_u64")]
    pub bk_biz_id: u64,

    #[serde(default, deserialize_with = "wire::lenient_u64")]
    pub bk_cloud_id: u64,

    #[serde(default)]
    pub time_zone: String,

    #[serde(deserialize_with = "wire::lenient_u64")]
    pub cluster_id: u64,

    #[serde(default)]
    pub cluster_address: String,

    #[serde(rename = "mysql_role")]
    pub role: Role,

    #[serde(
        rename = "shard_value",
        default,
        deserialize_with = "wire::optional_u32",
        skip_serializing_if = "Option::is_none"
    )]
    pub shard_index: Option<u32>,

    #[serde(rename = "backup_host")]
    pub host: String,

    #[serde(rename = "backup_port", deserialize_with = "wire::lenient_u16")]
    pub port: u16,

    #[serde(
        rename = "backup_consistent_time",
        alias = "consistent_backup_time",
        deserialize_with = "wire::timestamp"
    )]
    pub consistent_time: DateTime<Utc>,

    #[serde(rename = "backup_begin_time", deserialize_with = "wire::timestamp")]
    pub begin_time: DateTime<Utc>,

    #[serde(rename = "backup_end_time", deserialize_with = "wire::timestamp")]
    pub end_time: DateTime<Utc>,

    #[serde(rename = "backup_type", default)]
    pub backup_kind: BackupKind,

    #[serde(default)]
    pub is_full_backup: bool,

    #[serde(rename = "data_schema_grant", default, deserialize_with = "wire::lenient_string")]
    pub schema_data_scope: String,

    #[serde(rename = "file_list", default)]
    pub file_entries: Vec<FileEntry>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binlog_info: Option<serde_json::Value>,
}

impl BackupLogRecord {
    pub fn instance(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn scope(&self) -> SchemaDataScope {
        SchemaDataScope::classify(&self.schema_data_scope)
    }

    pub fn file_of(&self, role: FileRole) -> Option<&FileEntry> {
        self.file_entries.iter().find(|f| f.file_role == role)
    }
}

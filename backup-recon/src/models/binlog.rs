//! Binlog segment records and the restore manifest built from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::wire;

/// One binlog file reported by a storage instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinlogRecord {
    #[serde(default)]
    pub cluster_domain: String,

    #[serde(deserialize_with = "wire::lenient_u64")]
    pub cluster_id: u64,

    pub host: String,

    #[serde(deserialize_with = "wire::lenient_u16")]
    pub port: u16,

    #[serde(deserialize_with = "wire::timestamp")]
    pub file_mtime: DateTime<Utc>,

    #[serde(deserialize_with = "wire::timestamp")]
    pub start_time: DateTime<Utc>,

    #[serde(deserialize_with = "wire::timestamp")]
    pub stop_time: DateTime<Utc>,

    #[serde(default)]
    pub size: u64,

    #[serde(deserialize_with = "wire::lenient_string")]
    pub task_id: String,

    pub filename: String,
}

impl BinlogRecord {
    pub fn detail(&self) -> BinlogFileDetail {
        BinlogFileDetail {
            file_mtime: self.file_mtime,
            start_time: self.start_time,
            stop_time: self.stop_time,
            size: self.size,
            task_id: self.task_id.clone(),
            file_name: self.filename.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinlogFileDetail {
    pub file_mtime: DateTime<Utc>,
    pub start_time: DateTime<Utc>,
    pub stop_time: DateTime<Utc>,
    pub size: u64,
    pub task_id: String,
    pub file_name: String,
}

/// Deduplicated binlog files of one instance, ready for a restore job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinlogManifest {
    pub cluster_domain: String,
    pub cluster_id: u64,
    pub host: String,
    pub port: u16,

    #[serde(rename = "file_list_details")]
    pub files: Vec<BinlogFileDetail>,
}

//! Latest privilege backup file per instance.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::models::{BackupLogRecord, FileRole, Role};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrivilegeFile {
    pub file_name: String,
    pub size: u64,
    pub task_id: String,
    #[serde(rename = "mysql_role")]
    pub role: Role,
    #[serde(rename = "backup_consistent_time")]
    pub consistent_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrivilegeBackupRecord {
    pub cluster_id: u64,
    pub cluster_address: String,
    pub bk_biz_id: u64,
    pub bk_cloud_id: u64,

    /// Keyed by `host:port`.
    #[serde(rename = "file_list")]
    pub files: BTreeMap<String, PrivilegeFile>,
}

/// For every instance keep the privilege file of its most recent backup.
/// On equal times the first record seen wins.
pub fn latest_privilege_files(records: &[BackupLogRecord]) -> Option<PrivilegeBackupRecord> {
    let first = records.first()?;
    let mut files: BTreeMap<String, PrivilegeFile> = BTreeMap::new();

    for record in records {
        let Some(entry) = record.file_of(FileRole::Privilege) else {
            continue;
        };
        let candidate = PrivilegeFile {
            file_name: entry.name.clone(),
            size: entry.size,
            task_id: entry.task_id.clone().unwrap_or_default(),
            role: record.role.clone(),
            consistent_time: record.consistent_time,
        };
        match files.entry(record.instance()) {
            Entry::Vacant(vacant) => {
                vacant.insert(candidate);
            }
            Entry::Occupied(mut occupied) => {
                if candidate.consistent_time > occupied.get().consistent_time {
                    occupied.insert(candidate);
                }
            }
        }
    }

    Some(PrivilegeBackupRecord {
        cluster_id: first.cluster_id,
        cluster_address: first.cluster_address.clone(),
        bk_biz_id: first.bk_biz_id,
        bk_cloud_id: first.bk_cloud_id,
        files,
    })
}

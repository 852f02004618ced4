//! Record builders shared by unit tests.

use chrono::{DateTime, Utc};

use super::backup_log::{BackupKind, BackupLogRecord, FileEntry, FileRole, Role};
use super::binlog::BinlogRecord;

const BASE: i64 = 1_700_000_000;

pub fn ts(offset: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(BASE + offset, 0).unwrap()
}

pub fn file(name: &str, task_id: &str, file_role: FileRole) -> FileEntry {
    FileEntry {
        name: name.to_string(),
        size: 1024,
        task_id: Some(task_id.to_string()),
        file_role,
    }
}

pub fn record(
    backup_id: &str,
    role: Role,
    shard_index: Option<u32>,
    host: &str,
    consistent: i64,
) -> BackupLogRecord {
    let file_name = format!("{backup_id}.{host}.{consistent}.tar");
    BackupLogRecord {
        backup_id: backup_id.to_string(),
        bill_id: "1".to_string(),
        bk_biz_id: 3,
        bk_cloud_id: 0,
        time_zone: "+08:00".to_string(),
        cluster_id: 42,
        cluster_address: "spider.db.example:25000".to_string(),
        role,
        shard_index,
        host: host.to_string(),
        port: 20000,
        consistent_time: ts(consistent),
        begin_time: ts(consistent - 60),
        end_time: ts(consistent + 60),
        backup_kind: BackupKind::Physical,
        is_full_backup: true,
        schema_data_scope: "all".to_string(),
        file_entries: vec![file(&file_name, &format!("{consistent}"), FileRole::Other)],
        binlog_info: None,
    }
}

pub fn binlog(task_id: &str, filename: &str) -> BinlogRecord {
    BinlogRecord {
        cluster_domain: "db.example".to_string(),
        cluster_id: 42,
        host: "10.0.0.1".to_string(),
        port: 20000,
        file_mtime: ts(10),
        start_time: ts(0),
        stop_time: ts(10),
        size: 4096,
        task_id: task_id.to_string(),
        filename: filename.to_string(),
    }
}

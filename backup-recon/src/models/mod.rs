//! Data model shared by every reconciliation stage.

pub mod backup_log;
pub mod backup_set;
pub mod binlog;
pub mod cluster;
pub mod wire;

#[cfg(test)]
pub(crate) mod fixtures;

pub use backup_log::{
    BackupKind, BackupLogRecord, FileDetail, FileEntry, FileRole, Role, SchemaDataScope,
};
pub use backup_set::{BackupLayout, BackupSet, NodeBackup, ShardedSlots};
pub use binlog::{BinlogFileDetail, BinlogManifest, BinlogRecord};
pub use cluster::{ClusterTopology, ClusterType};

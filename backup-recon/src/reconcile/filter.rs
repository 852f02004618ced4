//! Drops records that must never reach aggregation.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use super::aggregate::MergeStrategy;
use crate::models::BackupLogRecord;

/// How strictly a record's captured content is checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CompletenessMode {
    /// Schema and data must both be covered by the grant string.
    #[default]
    SchemaAndData,
    /// Only records flagged as full backups are kept.
    FullBackupOnly,
}

/// Decode raw source records, skipping any that miss required fields.
pub fn decode<T: DeserializeOwned>(raw: Vec<Value>) -> Vec<T> {
    let total = raw.len();
    let decoded: Vec<T> = raw
        .into_iter()
        .filter_map(|value| match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!("Skipping undecodable record: {}", e);
                None
            }
        })
        .collect();
    if decoded.len() < total {
        debug!("Decoded {}/{} records", decoded.len(), total);
    }
    decoded
}

/// Legacy producers leave task ids empty or `-1`; their files cannot be fetched.
pub fn has_valid_task_ids(record: &BackupLogRecord) -> bool {
    record.file_entries.iter().all(|f| f.has_valid_task_id())
}

pub fn is_complete(record: &BackupLogRecord, mode: CompletenessMode) -> bool {
    match mode {
        CompletenessMode::FullBackupOnly => record.is_full_backup,
        CompletenessMode::SchemaAndData => record.scope().is_complete(),
    }
}

/// Whether `record` is subject to the completeness check.
///
/// Sharded clusters only check shard nodes; routers, the coordinator and
/// pass-through roles never carry a full data backup. Single-slot clusters
/// check every record.
fn requires_completeness(record: &BackupLogRecord, strategy: MergeStrategy) -> bool {
    match strategy {
        MergeStrategy::Single => true,
        MergeStrategy::Sharded => record.role.is_shard_node(),
    }
}

pub fn accepts(record: &BackupLogRecord, mode: CompletenessMode, strategy: MergeStrategy) -> bool {
    has_valid_task_ids(record)
        && (!requires_completeness(record, strategy) || is_complete(record, mode))
}

pub fn filter(
    records: Vec<BackupLogRecord>,
    mode: CompletenessMode,
    strategy: MergeStrategy,
) -> Vec<BackupLogRecord> {
    records
        .into_iter()
        .filter(|record| {
            let keep = accepts(record, mode, strategy);
            if !keep {
                debug!(
                    "Dropping record backup_id={} role={} instance={}",
                    record.backup_id,
                    record.role,
                    record.instance()
                );
            }
            keep
        })
        .collect()
}

//! Binlog segment deduplication.

use std::collections::HashSet;

use crate::models::{BinlogFileDetail, BinlogManifest, BinlogRecord};

/// One detail per distinct task id, in first-seen order.
pub fn dedupe_binlog(records: &[BinlogRecord]) -> Vec<BinlogFileDetail> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(records.len());
    let mut details = Vec::with_capacity(records.len());
    for record in records {
        if seen.insert(record.task_id.as_str()) {
            details.push(record.detail());
        }
    }
    details
}

/// Host-level fields are shared by every record of one query, so the first
/// record supplies them. No records means no manifest.
pub fn build_manifest(records: &[BinlogRecord]) -> Option<BinlogManifest> {
    let first = records.first()?;
    Some(BinlogManifest {
        cluster_domain: first.cluster_domain.clone(),
        cluster_id: first.cluster_id,
        host: first.host.clone(),
        port: first.port,
        files: dedupe_binlog(records),
    })
}

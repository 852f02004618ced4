//! Merged view of one backup attempt across every node that took part in it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

use super::backup_log::{BackupKind, BackupLogRecord, FileDetail, FileRole, Role};

/// Winning record for one role/shard slot, plus everything merged into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeBackup {
    pub role: Role,
    pub host: String,
    pub port: u16,
    pub consistent_time: DateTime<Utc>,
    pub begin_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub backup_kind: BackupKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binlog_info: Option<serde_json::Value>,

    #[serde(rename = "file_list_details")]
    pub files: Vec<FileDetail>,

    #[serde(rename = "index", default, skip_serializing_if = "Option::is_none")]
    pub index_file: Option<FileDetail>,

    #[serde(rename = "priv", default, skip_serializing_if = "Option::is_none")]
    pub privilege_file: Option<FileDetail>,

    /// Records merged into this slot, in canonical order.
    #[serde(skip)]
    parts: Vec<NodePart>,
}

/// What one producer record contributed to a slot.
#[derive(Debug, Clone, PartialEq)]
struct NodePart {
    begin_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    backup_kind: BackupKind,
    binlog_info: Option<serde_json::Value>,
    files: Vec<FileDetail>,
    index_files: Vec<FileDetail>,
    privilege_files: Vec<FileDetail>,
}

impl NodePart {
    fn from_record(record: &BackupLogRecord) -> Self {
        let mut part = Self {
            begin_time: record.begin_time,
            end_time: record.end_time,
            backup_kind: record.backup_kind.clone(),
            binlog_info: record.binlog_info.clone(),
            files: Vec::with_capacity(record.file_entries.len()),
            index_files: Vec::new(),
            privilege_files: Vec::new(),
        };
        for entry in &record.file_entries {
            let detail = entry.detail();
            match entry.file_role {
                FileRole::Index => part.index_files.push(detail.clone()),
                FileRole::Privilege => part.privilege_files.push(detail.clone()),
                FileRole::Other => {}
            }
            part.files.push(detail);
        }
        part
    }

    /// Later records sort last; the remaining fields only break ties.
    #[allow(clippy::type_complexity)]
    fn rank(
        &self,
    ) -> (
        DateTime<Utc>,
        DateTime<Utc>,
        &[FileDetail],
        &[FileDetail],
        &[FileDetail],
        String,
        String,
    ) {
        (
            self.end_time,
            self.begin_time,
            self.files.as_slice(),
            self.index_files.as_slice(),
            self.privilege_files.as_slice(),
            self.binlog_info.as_ref().map(|v| v.to_string()).unwrap_or_default(),
            String::from(self.backup_kind.clone()),
        )
    }
}

fn latest_reference<'a, I>(candidates: I) -> Option<FileDetail>
where
    I: Iterator<Item = &'a FileDetail>,
{
    candidates
        .max_by(|a, b| a.task_order().cmp(&b.task_order()))
        .cloned()
}

impl NodeBackup {
    pub fn from_record(record: &BackupLogRecord) -> Self {
        let mut node = Self {
            role: record.role.clone(),
            host: record.host.clone(),
            port: record.port,
            consistent_time: record.consistent_time,
            begin_time: record.begin_time,
            end_time: record.end_time,
            backup_kind: record.backup_kind.clone(),
            binlog_info: None,
            files: Vec::new(),
            index_file: None,
            privilege_file: None,
            parts: Vec::new(),
        };
        node.absorb(record);
        node
    }

    /// Merge a record from the same producer into this slot.
    ///
    /// The outcome does not depend on the order records arrive in: parts are
    /// kept sorted and every derived field is rebuilt from them.
    pub fn absorb(&mut self, record: &BackupLogRecord) {
        let part = NodePart::from_record(record);
        if self.parts.contains(&part) {
            return;
        }
        let at = self.parts.partition_point(|p| p.rank() <= part.rank());
        self.parts.insert(at, part);
        self.rebuild();
    }

    fn rebuild(&mut self) {
        let Some(latest) = self.parts.last() else {
            return;
        };
        self.backup_kind = latest.backup_kind.clone();
        self.binlog_info = self.parts.iter().rev().find_map(|p| p.binlog_info.clone());
        self.begin_time = self.parts.iter().map(|p| p.begin_time).min().unwrap_or(self.begin_time);
        self.end_time = self.parts.iter().map(|p| p.end_time).max().unwrap_or(self.end_time);

        // Producer order within a record, earlier records first.
        let mut seen = HashSet::new();
        self.files = self
            .parts
            .iter()
            .flat_map(|p| p.files.iter())
            .filter(|detail| seen.insert(*detail))
            .cloned()
            .collect();

        self.index_file = latest_reference(self.parts.iter().flat_map(|p| p.index_files.iter()));
        self.privilege_file =
            latest_reference(self.parts.iter().flat_map(|p| p.privilege_files.iter()));
    }
}

/// Slots of a sharded cluster backup: routers, coordinator and data shards.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ShardedSlots {
    #[serde(rename = "tdbctl_node", skip_serializing_if = "Option::is_none")]
    pub coordinator: Option<NodeBackup>,

    #[serde(rename = "spider_node", skip_serializing_if = "Option::is_none")]
    pub router_primary: Option<NodeBackup>,

    #[serde(rename = "spider_slave", skip_serializing_if = "Option::is_none")]
    pub router_secondary: Option<NodeBackup>,

    #[serde(rename = "remote_node")]
    pub shards: BTreeMap<u32, NodeBackup>,

    /// Roles unknown to this engine, keyed by their literal name.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub passthrough: BTreeMap<String, NodeBackup>,
}

impl ShardedSlots {
    pub fn present_shards(&self) -> BTreeSet<u32> {
        self.shards.keys().copied().collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "layout", rename_all = "snake_case")]
pub enum BackupLayout {
    /// Single instance or simple replicated cluster: one slot per attempt.
    Single { node: NodeBackup },
    Sharded(ShardedSlots),
}

/// One logical backup attempt, keyed by `backup_id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackupSet {
    pub backup_id: String,
    pub bill_id: String,
    pub bk_biz_id: u64,
    pub bk_cloud_id: u64,
    pub time_zone: String,
    pub cluster_id: u64,
    pub cluster_address: String,

    #[serde(rename = "backup_begin_time")]
    pub begin_time: DateTime<Utc>,

    #[serde(rename = "backup_end_time")]
    pub end_time: DateTime<Utc>,

    /// Latest consistent time across every slot; the selection axis.
    pub backup_time: DateTime<Utc>,

    #[serde(flatten)]
    pub layout: BackupLayout,
}

impl BackupSet {
    /// Start a set from the first record seen for its `backup_id`.
    pub fn new(record: &BackupLogRecord, layout: BackupLayout) -> Self {
        let mut set = Self {
            backup_id: record.backup_id.clone(),
            bill_id: record.bill_id.clone(),
            bk_biz_id: record.bk_biz_id,
            bk_cloud_id: record.bk_cloud_id,
            time_zone: record.time_zone.clone(),
            cluster_id: record.cluster_id,
            cluster_address: record.cluster_address.clone(),
            begin_time: record.begin_time,
            end_time: record.end_time,
            backup_time: record.consistent_time,
            layout,
        };
        set.refresh_window();
        set
    }

    pub fn nodes(&self) -> Vec<&NodeBackup> {
        match &self.layout {
            BackupLayout::Single { node } => vec![node],
            BackupLayout::Sharded(slots) => slots
                .coordinator
                .iter()
                .chain(slots.router_primary.iter())
                .chain(slots.router_secondary.iter())
                .chain(slots.shards.values())
                .chain(slots.passthrough.values())
                .collect(),
        }
    }

    /// Recompute the overall window from the current slot occupants.
    pub fn refresh_window(&mut self) {
        let nodes = self.nodes();
        let Some(first) = nodes.first() else {
            return;
        };
        let (mut begin, mut end, mut latest) =
            (first.begin_time, first.end_time, first.consistent_time);
        for node in &nodes[1..] {
            begin = begin.min(node.begin_time);
            end = end.max(node.end_time);
            latest = latest.max(node.consistent_time);
        }
        self.begin_time = begin;
        self.end_time = end;
        self.backup_time = latest;
    }

    pub fn sharded(&self) -> Option<&ShardedSlots> {
        match &self.layout {
            BackupLayout::Sharded(slots) => Some(slots),
            BackupLayout::Single { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::{file, record, ts};

    #[test]
    fn test_absorb_dedupes_and_tracks_references() {
        let mut first = record("b-1", Role::PrimaryShard, Some(0), "10.0.0.1", 100);
        first.file_entries = vec![file("data.0", "1", FileRole::Other), file("idx.0", "2", FileRole::Index)];

        let mut second = first.clone();
        second.begin_time = ts(-50);
        second.file_entries = vec![
            file("data.0", "1", FileRole::Other),
            file("idx.1", "3", FileRole::Index),
            file("priv", "4", FileRole::Privilege),
        ];

        let mut node = NodeBackup::from_record(&first);
        node.absorb(&second);

        assert_eq!(node.files.len(), 4);
        assert_eq!(node.index_file.as_ref().unwrap().file_name, "idx.1");
        assert_eq!(node.privilege_file.as_ref().unwrap().task_id, "4");
        assert_eq!(node.begin_time, ts(-50));
    }

    #[test]
    fn test_references_compare_task_ids_numerically() {
        let mut old = record("b-1", Role::PrimaryShard, Some(0), "10.0.0.1", 100);
        old.file_entries = vec![file("old.index", "9", FileRole::Index)];
        let mut new = old.clone();
        new.end_time = ts(500);
        new.file_entries = vec![
            file("new.tar", "11", FileRole::Other),
            file("new.index", "10", FileRole::Index),
        ];

        let mut forward = NodeBackup::from_record(&old);
        forward.absorb(&new);
        let mut backward = NodeBackup::from_record(&new);
        backward.absorb(&old);

        assert_eq!(forward, backward);
        assert_eq!(forward.index_file.as_ref().unwrap().file_name, "new.index");
        let names: Vec<_> = forward.files.iter().map(|f| f.file_name.as_str()).collect();
        assert_eq!(names, vec!["old.index", "new.tar", "new.index"]);
    }

    #[test]
    fn test_absorb_is_idempotent() {
        let rec = record("b-1", Role::PrimaryShard, Some(0), "10.0.0.1", 100);
        let once = NodeBackup::from_record(&rec);
        let mut twice = once.clone();
        twice.absorb(&rec);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_refresh_window_spans_all_slots() {
        let router = record("b-1", Role::RouterPrimary, None, "10.0.0.9", 300);
        let mut shard = record("b-1", Role::PrimaryShard, Some(0), "10.0.0.1", 200);
        shard.begin_time = ts(-1000);

        let mut slots = ShardedSlots::default();
        slots.router_primary = Some(NodeBackup::from_record(&router));
        slots.shards.insert(0, NodeBackup::from_record(&shard));

        let set = BackupSet::new(&shard, BackupLayout::Sharded(slots));

        assert_eq!(set.backup_time, ts(300));
        assert_eq!(set.begin_time, ts(-1000));
        assert_eq!(set.nodes().len(), 2);
    }
}

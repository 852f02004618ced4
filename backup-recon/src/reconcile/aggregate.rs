//! Groups per-node records into one backup set per `backup_id`.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use tracing::debug;

use super::precedence::{resolve, Resolution};
use crate::models::{BackupLayout, BackupLogRecord, BackupSet, NodeBackup, Role, ShardedSlots};

/// Backup sets keyed by `backup_id`, iterated in id order.
pub type BackupSetMap = BTreeMap<String, BackupSet>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStrategy {
    /// Standalone or simple replicated clusters: one slot per attempt.
    Single,
    /// Router/coordinator/shard slot families.
    Sharded,
}

/// Where a record lands inside a sharded backup set.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SlotKey {
    Coordinator,
    RouterPrimary,
    RouterSecondary,
    Shard(u32),
    Passthrough(String),
}

impl SlotKey {
    fn of(record: &BackupLogRecord) -> Option<Self> {
        match &record.role {
            Role::Coordinator => Some(SlotKey::Coordinator),
            Role::RouterPrimary => Some(SlotKey::RouterPrimary),
            Role::RouterSecondary => Some(SlotKey::RouterSecondary),
            Role::PrimaryShard | Role::SecondaryShard => record.shard_index.map(SlotKey::Shard),
            Role::Other(name) => Some(SlotKey::Passthrough(name.clone())),
        }
    }
}

pub fn aggregate(records: &[BackupLogRecord], strategy: MergeStrategy) -> BackupSetMap {
    match strategy {
        MergeStrategy::Single => aggregate_single(records),
        MergeStrategy::Sharded => aggregate_sharded(records),
    }
}

pub fn aggregate_single(records: &[BackupLogRecord]) -> BackupSetMap {
    let mut sets = BackupSetMap::new();
    for record in records {
        match sets.entry(record.backup_id.clone()) {
            Entry::Vacant(vacant) => {
                let node = NodeBackup::from_record(record);
                vacant.insert(BackupSet::new(record, BackupLayout::Single { node }));
            }
            Entry::Occupied(mut occupied) => {
                let set = occupied.get_mut();
                if let BackupLayout::Single { node } = &mut set.layout {
                    upsert_node(node, record);
                }
                set.refresh_window();
            }
        }
    }
    sets
}

pub fn aggregate_sharded(records: &[BackupLogRecord]) -> BackupSetMap {
    let mut sets = BackupSetMap::new();
    for record in records {
        let Some(key) = SlotKey::of(record) else {
            debug!(
                "Dropping {} record without shard index: backup_id={} instance={}",
                record.role,
                record.backup_id,
                record.instance()
            );
            continue;
        };

        let set = sets.entry(record.backup_id.clone()).or_insert_with(|| {
            BackupSet::new(record, BackupLayout::Sharded(ShardedSlots::default()))
        });
        if let BackupLayout::Sharded(slots) = &mut set.layout {
            upsert_slot(slots, key, record);
        }
        set.refresh_window();
    }
    sets
}

fn upsert_slot(slots: &mut ShardedSlots, key: SlotKey, record: &BackupLogRecord) {
    match key {
        SlotKey::Coordinator => upsert_optional(&mut slots.coordinator, record),
        SlotKey::RouterPrimary => upsert_optional(&mut slots.router_primary, record),
        SlotKey::RouterSecondary => upsert_optional(&mut slots.router_secondary, record),
        SlotKey::Shard(index) => upsert_keyed(&mut slots.shards, index, record),
        SlotKey::Passthrough(name) => upsert_keyed(&mut slots.passthrough, name, record),
    }
}

fn upsert_optional(slot: &mut Option<NodeBackup>, record: &BackupLogRecord) {
    match slot {
        Some(node) => upsert_node(node, record),
        None => *slot = Some(NodeBackup::from_record(record)),
    }
}

fn upsert_keyed<K: Ord>(map: &mut BTreeMap<K, NodeBackup>, key: K, record: &BackupLogRecord) {
    match map.entry(key) {
        Entry::Vacant(vacant) => {
            vacant.insert(NodeBackup::from_record(record));
        }
        Entry::Occupied(mut occupied) => upsert_node(occupied.get_mut(), record),
    }
}

fn upsert_node(node: &mut NodeBackup, record: &BackupLogRecord) {
    match resolve(record, node) {
        Resolution::Replace => *node = NodeBackup::from_record(record),
        Resolution::Merge => node.absorb(record),
        Resolution::Keep => {}
    }
}

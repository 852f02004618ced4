//! Drops backup sets that do not cover the cluster topology.

use std::collections::BTreeSet;
use std::fmt;
use tracing::warn;

use crate::models::{BackupLayout, BackupSet};

/// Shards a backup set must contain to be restorable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardRequirement {
    pub shards: BTreeSet<u32>,
    /// The caller named the shards; routers and coordinator become optional.
    pub explicit: bool,
}

impl ShardRequirement {
    /// An empty explicit list means "whole cluster", same as no list.
    pub fn resolve(shard_list: Option<&[u32]>, cluster_shard_count: u32) -> Self {
        match shard_list {
            Some(list) if !list.is_empty() => Self {
                shards: list.iter().copied().collect(),
                explicit: true,
            },
            _ => Self {
                shards: (0..cluster_shard_count).collect(),
                explicit: false,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    MissingShards {
        present: Vec<u32>,
        required: Vec<u32>,
    },
    MissingRouter,
    MissingCoordinator,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::MissingShards { present, required } => {
                write!(f, "shards {:?} do not cover required {:?}", present, required)
            }
            Rejection::MissingRouter => f.write_str("no router primary backup"),
            Rejection::MissingCoordinator => f.write_str("no coordinator backup"),
        }
    }
}

pub fn check(set: &BackupSet, requirement: &ShardRequirement) -> Result<(), Rejection> {
    let slots = match &set.layout {
        BackupLayout::Single { .. } => return Ok(()),
        BackupLayout::Sharded(slots) => slots,
    };

    let present = slots.present_shards();
    if !present.is_superset(&requirement.shards) {
        return Err(Rejection::MissingShards {
            present: present.into_iter().collect(),
            required: requirement.shards.iter().copied().collect(),
        });
    }
    if !requirement.explicit && slots.router_primary.is_none() {
        return Err(Rejection::MissingRouter);
    }
    if !requirement.explicit && slots.coordinator.is_none() {
        return Err(Rejection::MissingCoordinator);
    }
    Ok(())
}

pub fn validate<I>(sets: I, requirement: &ShardRequirement) -> Vec<BackupSet>
where
    I: IntoIterator<Item = BackupSet>,
{
    sets.into_iter()
        .filter(|set| match check(set, requirement) {
            Ok(()) => true,
            Err(reason) => {
                warn!("Ignoring backup {}: {}", set.backup_id, reason);
                false
            }
        })
        .collect()
}

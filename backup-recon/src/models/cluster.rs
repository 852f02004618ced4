//! Cluster topology supplied by the caller.

use serde::{Deserialize, Serialize};

use crate::reconcile::aggregate::MergeStrategy;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterType {
    /// Standalone instance.
    #[default]
    Single,
    /// Primary/secondary replicated pair.
    Ha,
    /// Router + coordinator + sharded storage.
    Sharded,
}

impl ClusterType {
    pub fn merge_strategy(self) -> MergeStrategy {
        match self {
            ClusterType::Single | ClusterType::Ha => MergeStrategy::Single,
            ClusterType::Sharded => MergeStrategy::Sharded,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterTopology {
    pub id: u64,

    #[serde(default)]
    pub cluster_type: ClusterType,

    /// Number of storage shards currently registered for the cluster.
    #[serde(default)]
    pub shard_count: u32,

    /// Instance whose binlogs are replayed when none is given explicitly.
    #[serde(default)]
    pub primary_host: Option<String>,

    #[serde(default)]
    pub primary_port: Option<u16>,
}

impl ClusterTopology {
    pub fn primary(&self) -> Option<(&str, u16)> {
        Some((self.primary_host.as_deref()?, self.primary_port?))
    }
}

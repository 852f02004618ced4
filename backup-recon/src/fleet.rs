//! Rollback point lookup across many clusters.
//!
//! Each cluster runs its own pipeline on the blocking pool; results are
//! joined independently so one failing cluster never hides the others.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::config::QueryConfig;
use crate::models::{BackupSet, ClusterTopology};
use crate::rollback::FixpointRollback;
use crate::source::RecordSource;
use crate::Result;

#[derive(Debug)]
pub struct RollbackPoint {
    pub cluster_id: u64,
    pub outcome: Result<Option<BackupSet>>,
}

/// Latest backup at or before `rollback_time` for every cluster, ordered by
/// cluster id. Clusters whose task panicked are logged and left out.
pub async fn lookup_rollback_points(
    source: Arc<dyn RecordSource>,
    query: QueryConfig,
    clusters: Vec<ClusterTopology>,
    rollback_time: DateTime<Utc>,
) -> Vec<RollbackPoint> {
    let total = clusters.len();
    let mut tasks = JoinSet::new();

    for cluster in clusters {
        let source = Arc::clone(&source);
        let query = query.clone();
        tasks.spawn_blocking(move || {
            let cluster_id = cluster.id;
            let handler = FixpointRollback::new(cluster, source, query);
            RollbackPoint {
                cluster_id,
                outcome: handler.latest_backup(rollback_time, None),
            }
        });
    }

    let mut points = Vec::with_capacity(total);
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(point) => points.push(point),
            Err(e) => error!("Rollback lookup task failed: {}", e),
        }
    }
    points.sort_by_key(|point| point.cluster_id);

    let found = points
        .iter()
        .filter(|point| matches!(point.outcome, Ok(Some(_))))
        .count();
    info!("Rollback points found for {}/{} clusters", found, total);
    points
}

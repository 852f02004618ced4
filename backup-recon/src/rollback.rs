//! Point-in-time rollback lookups for one cluster.
//!
//! Runs the fixed pipeline Source → Filter → Aggregate → Validate → Select
//! against whatever [`RecordSource`] the caller supplies.

use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::QueryConfig;
use crate::models::{
    BackupLogRecord, BackupSet, BinlogManifest, BinlogRecord, ClusterTopology, ClusterType,
};
use crate::reconcile::{self, filter, PrivilegeBackupRecord, ShardRequirement};
use crate::source::{LogQuery, QueryFilter, RecordSource};
use crate::{ReconError, Result};

pub struct FixpointRollback {
    cluster: ClusterTopology,
    source: Arc<dyn RecordSource>,
    query: QueryConfig,
}

fn days(field: &str, value: i64) -> Result<TimeDelta> {
    TimeDelta::try_days(value)
        .filter(|delta| *delta >= TimeDelta::zero())
        .ok_or_else(|| ReconError::Config(format!("query.{field} out of range: {value}")))
}

fn shift(at: DateTime<Utc>, delta: TimeDelta, forward: bool) -> Result<DateTime<Utc>> {
    let shifted = if forward {
        at.checked_add_signed(delta)
    } else {
        at.checked_sub_signed(delta)
    };
    shifted.ok_or_else(|| ReconError::Config(format!("time window around {at} is out of range")))
}

impl FixpointRollback {
    pub fn new(cluster: ClusterTopology, source: Arc<dyn RecordSource>, query: QueryConfig) -> Self {
        Self {
            cluster,
            source,
            query,
        }
    }

    fn cluster_filter(&self) -> QueryFilter {
        QueryFilter::new().term("cluster_id", self.cluster.id)
    }

    fn fetch_backup_records(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<BackupLogRecord>> {
        let raw = self.source.query(&LogQuery {
            collector: self.query.backup_collector.clone(),
            start,
            end,
            filter: self.cluster_filter(),
        })?;
        Ok(filter::decode(raw))
    }

    /// Valid backup sets for the cluster within `[start, end]`.
    ///
    /// `shard_list` only matters for sharded clusters; see [`ShardRequirement`].
    pub fn query_backup_sets(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        shard_list: Option<&[u32]>,
    ) -> Result<Vec<BackupSet>> {
        let records = self.fetch_backup_records(start, end)?;
        let fetched = records.len();
        let strategy = self.cluster.cluster_type.merge_strategy();
        let records = reconcile::filter(records, self.query.completeness_mode(), strategy);
        let sets = reconcile::aggregate(&records, strategy);

        let aggregated = sets.len();
        let valid = match self.cluster.cluster_type {
            ClusterType::Sharded => {
                let requirement = ShardRequirement::resolve(shard_list, self.cluster.shard_count);
                reconcile::validate(sets.into_values(), &requirement)
            }
            ClusterType::Single | ClusterType::Ha => sets.into_values().collect(),
        };

        info!(
            "Cluster {}: {} records, {} kept, {} backup sets, {} valid",
            self.cluster.id,
            fetched,
            records.len(),
            aggregated,
            valid.len()
        );
        Ok(valid)
    }

    /// Latest valid backup set at or before `rollback_time`.
    ///
    /// `Ok(None)` means the cluster has no usable backup in the search window
    /// at all. Backups that exist but all postdate the target are an error,
    /// because the caller asked for a point nothing can restore to.
    pub fn latest_backup(
        &self,
        rollback_time: DateTime<Utc>,
        shard_list: Option<&[u32]>,
    ) -> Result<Option<BackupSet>> {
        let window = days("rollback_window_days", self.query.rollback_window_days)?;
        let start = shift(rollback_time, window, false)?;
        let sets = self.query_backup_sets(start, rollback_time, shard_list)?;
        if sets.is_empty() {
            debug!("Cluster {} has no backup sets before {}", self.cluster.id, rollback_time);
            return Ok(None);
        }

        match reconcile::select_nearest(sets, rollback_time) {
            Some(set) => {
                info!(
                    "Cluster {}: selected backup {} at {} for rollback to {}",
                    self.cluster.id, set.backup_id, set.backup_time, rollback_time
                );
                Ok(Some(set))
            }
            None => Err(ReconError::NoBackupNearTime { rollback_time }),
        }
    }

    /// Binlogs of one instance covering `[start, end]`, widened by the
    /// configured margin to absorb log shipping delay. Defaults to the
    /// cluster primary when no instance is given.
    pub fn query_binlogs(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        instance: Option<(&str, u16)>,
    ) -> Result<Option<BinlogManifest>> {
        let (host, port) = match instance.or_else(|| self.cluster.primary()) {
            Some(instance) => instance,
            None => {
                return Err(ReconError::Config(format!(
                    "cluster {} has no primary instance configured",
                    self.cluster.id
                )))
            }
        };

        let margin = TimeDelta::try_minutes(self.query.binlog_margin_minutes)
            .filter(|delta| *delta >= TimeDelta::zero())
            .ok_or_else(|| {
                ReconError::Config(format!(
                    "query.binlog_margin_minutes out of range: {}",
                    self.query.binlog_margin_minutes
                ))
            })?;
        let raw = self.source.query(&LogQuery {
            collector: self.query.binlog_collector.clone(),
            start: shift(start, margin, false)?,
            end: shift(end, margin, true)?,
            filter: QueryFilter::new()
                .term("host", host)
                .term("port", port)
                .term("cluster_id", self.cluster.id),
        })?;

        let records: Vec<BinlogRecord> = filter::decode(raw);
        debug!("Cluster {}: {} binlog records for {}:{}", self.cluster.id, records.len(), host, port);
        Ok(reconcile::build_manifest(&records))
    }

    /// Most recent privilege backup file of every instance before `end`.
    pub fn query_privilege_backups(&self, end: DateTime<Utc>) -> Result<Option<PrivilegeBackupRecord>> {
        let window = days("privilege_window_days", self.query.privilege_window_days)?;
        let start = shift(end, window, false)?;
        let records = self.fetch_backup_records(start, end)?;
        Ok(reconcile::latest_privilege_files(&records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::{binlog, record, ts};
    use crate::models::{FileRole, Role};
    use crate::source::MemorySource;
    use serde_json::Value;

    const BACKUP: &str = "mysql_dbbackup_result";
    const BINLOG: &str = "mysql_binlog_result";

    fn to_values<T: serde::Serialize>(items: &[T]) -> Vec<Value> {
        items.iter().map(|item| serde_json::to_value(item).unwrap()).collect()
    }

    fn sharded_cluster() -> ClusterTopology {
        ClusterTopology {
            id: 42,
            cluster_type: ClusterType::Sharded,
            shard_count: 2,
            primary_host: Some("10.0.0.1".to_string()),
            primary_port: Some(20000),
        }
    }

    fn full_set(backup_id: &str, at: i64) -> Vec<BackupLogRecord> {
        vec![
            record(backup_id, Role::RouterPrimary, None, "10.0.9.1", at),
            record(backup_id, Role::Coordinator, None, "10.0.8.1", at),
            record(backup_id, Role::PrimaryShard, Some(0), "10.0.0.1", at),
            record(backup_id, Role::PrimaryShard, Some(1), "10.0.1.1", at),
        ]
    }

    fn handler(records: &[BackupLogRecord], binlogs: &[BinlogRecord]) -> FixpointRollback {
        let source = MemorySource::new()
            .with_records(BACKUP, to_values(records))
            .with_records(BINLOG, to_values(binlogs));
        FixpointRollback::new(sharded_cluster(), Arc::new(source), QueryConfig::default())
    }

    #[test]
    fn test_latest_backup_picks_nearest_complete_set() {
        let mut records = full_set("b-100", 100);
        records.extend(full_set("b-200", 200));
        records.extend(full_set("b-300", 300));
        // Incomplete: shard 1 missing.
        records.push(record("b-240", Role::PrimaryShard, Some(0), "10.0.0.1", 240));
        records.push(record("b-240", Role::RouterPrimary, None, "10.0.9.1", 240));
        records.push(record("b-240", Role::Coordinator, None, "10.0.8.1", 240));

        let selected = handler(&records, &[]).latest_backup(ts(250), None).unwrap().unwrap();
        assert_eq!(selected.backup_id, "b-200");
    }

    #[test]
    fn test_other_clusters_are_ignored() {
        let mut records = full_set("b-100", 100);
        for rec in &mut records {
            rec.cluster_id = 7;
        }
        assert!(handler(&records, &[]).latest_backup(ts(250), None).unwrap().is_none());
    }

    #[test]
    fn test_search_window_ends_at_rollback_time() {
        let source = MemorySource::new().with_records(BACKUP, to_values(&full_set("b-300", 300)));
        let mut query = QueryConfig::default();
        query.rollback_window_days = 1;
        let handler = FixpointRollback::new(sharded_cluster(), Arc::new(source), query);

        assert!(handler.latest_backup(ts(100), None).unwrap().is_none());
        assert_eq!(handler.latest_backup(ts(300), None).unwrap().unwrap().backup_id, "b-300");
    }

    #[test]
    fn test_sets_after_target_are_an_error() {
        struct Unwindowed(Vec<Value>);
        impl RecordSource for Unwindowed {
            fn query(&self, query: &LogQuery) -> Result<Vec<Value>> {
                Ok(self.0.iter().filter(|r| query.filter.matches(r)).cloned().collect())
            }
        }

        let source = Unwindowed(to_values(&full_set("b-300", 300)));
        let handler = FixpointRollback::new(sharded_cluster(), Arc::new(source), QueryConfig::default());

        let target = ts(100);
        let err = handler.latest_backup(target, None).unwrap_err();
        assert!(matches!(err, ReconError::NoBackupNearTime { rollback_time } if rollback_time == target));
        assert!(err.to_string().contains(&target.to_string()));
    }

    #[test]
    fn test_unbounded_windows_are_config_errors() {
        let mut query = QueryConfig::default();
        query.rollback_window_days = 100_000_000_000_000;
        query.privilege_window_days = -3;
        query.binlog_margin_minutes = i64::MAX;
        let handler = FixpointRollback::new(sharded_cluster(), Arc::new(MemorySource::new()), query);

        assert!(matches!(handler.latest_backup(ts(0), None), Err(ReconError::Config(_))));
        assert!(matches!(handler.query_privilege_backups(ts(0)), Err(ReconError::Config(_))));
        assert!(matches!(handler.query_binlogs(ts(0), ts(1), None), Err(ReconError::Config(_))));
    }

    #[test]
    fn test_explicit_shard_list_relaxes_router_requirement() {
        let records = vec![record("b-1", Role::PrimaryShard, Some(3), "10.0.3.1", 100)];
        let handler = handler(&records, &[]);

        assert!(handler.query_backup_sets(ts(0), ts(1000), None).unwrap().is_empty());
        assert_eq!(handler.query_backup_sets(ts(0), ts(1000), Some(&[3][..])).unwrap().len(), 1);
    }

    #[test]
    fn test_binlogs_default_to_primary_and_widen_window() {
        let mut early = binlog("1", "binlog.000001");
        early.stop_time = ts(-10 * 60);
        let mut other_host = binlog("2", "binlog.000002");
        other_host.host = "10.0.0.2".to_string();
        let dup = binlog("1", "binlog.000001.dup");
        let mut too_early = binlog("3", "binlog.000003");
        too_early.stop_time = ts(-30 * 60);

        let handler = handler(&[], &[early, other_host, dup, too_early]);
        let manifest = handler.query_binlogs(ts(0), ts(100), None).unwrap().unwrap();

        assert_eq!(manifest.host, "10.0.0.1");
        assert_eq!(manifest.files.len(), 1);
        assert_eq!(manifest.files[0].file_name, "binlog.000001");
    }

    #[test]
    fn test_binlogs_empty_is_not_an_error() {
        let handler = handler(&[], &[]);
        assert!(handler.query_binlogs(ts(0), ts(100), Some(("10.0.0.5", 3306))).unwrap().is_none());
    }

    #[test]
    fn test_binlogs_without_primary_is_config_error() {
        let mut cluster = sharded_cluster();
        cluster.primary_host = None;
        let handler = FixpointRollback::new(cluster, Arc::new(MemorySource::new()), QueryConfig::default());
        assert!(matches!(handler.query_binlogs(ts(0), ts(1), None), Err(ReconError::Config(_))));
    }

    #[test]
    fn test_privilege_backups() {
        let mut rec = record("b-1", Role::PrimaryShard, Some(0), "10.0.0.1", 100);
        rec.file_entries.push(crate::models::fixtures::file("grant.priv", "55", FileRole::Privilege));

        let found = handler(&[rec], &[]).query_privilege_backups(ts(200)).unwrap().unwrap();
        assert_eq!(found.cluster_id, 42);
        assert_eq!(found.files["10.0.0.1:20000"].task_id, "55");
    }
}

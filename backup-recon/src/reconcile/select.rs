//! Point-in-time selection over validated backup sets.

use chrono::{DateTime, Utc};

use crate::models::BackupSet;

/// Index of the last element at or before `target` in an ascending slice.
///
/// `partition_point` returns the first index after every element `<= target`,
/// so the element just before it is an exact match when one exists and the
/// nearest earlier time otherwise. `None` when every element is after the
/// target or the slice is empty.
pub fn nearest_at_or_before(sorted: &[DateTime<Utc>], target: DateTime<Utc>) -> Option<usize> {
    sorted.partition_point(|t| *t <= target).checked_sub(1)
}

/// The set with the latest `backup_time` not after `target`.
pub fn select_nearest(mut sets: Vec<BackupSet>, target: DateTime<Utc>) -> Option<BackupSet> {
    sets.sort_by_key(|set| set.backup_time);
    let times: Vec<DateTime<Utc>> = sets.iter().map(|set| set.backup_time).collect();
    let index = nearest_at_or_before(&times, target)?;
    Some(sets.swap_remove(index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::{record, ts};
    use crate::models::Role;
    use crate::reconcile::aggregate::aggregate_single;

    fn sets_at(times: &[i64]) -> Vec<BackupSet> {
        let records: Vec<_> = times
            .iter()
            .map(|t| record(&format!("b-{t}"), Role::PrimaryShard, None, "10.0.0.1", *t))
            .collect();
        aggregate_single(&records).into_values().collect()
    }

    #[test]
    fn test_nearest_below_target() {
        let selected = select_nearest(sets_at(&[300, 100, 200]), ts(250)).unwrap();
        assert_eq!(selected.backup_time, ts(200));
    }

    #[test]
    fn test_exact_match_preferred() {
        let selected = select_nearest(sets_at(&[100, 200, 300]), ts(200)).unwrap();
        assert_eq!(selected.backup_time, ts(200));
    }

    #[test]
    fn test_all_sets_after_target() {
        assert!(select_nearest(sets_at(&[300, 400]), ts(100)).is_none());
        assert!(select_nearest(Vec::new(), ts(100)).is_none());
    }

    #[test]
    fn test_target_after_everything_returns_latest() {
        let selected = select_nearest(sets_at(&[100, 200, 300]), ts(10_000)).unwrap();
        assert_eq!(selected.backup_time, ts(300));
    }

    #[test]
    fn test_matches_linear_definition() {
        let times = [5, 17, 17, 40, 41, 90];
        let sorted: Vec<_> = times.iter().map(|t| ts(*t)).collect();

        for target in -5..100 {
            let expected = times.iter().filter(|t| **t <= target).max().copied();
            let found = nearest_at_or_before(&sorted, ts(target)).map(|i| times[i]);
            assert_eq!(found, expected, "target={target}");
        }
    }
}

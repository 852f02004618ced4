//! Which record owns a slot when two records claim it.
//!
//! Fixed outcomes live in a table keyed by (incoming role, occupant role).
//! Every pair missing from the table is decided by consistent time, so a new
//! role only needs a table row when it should not follow that default.

use std::cmp::Ordering;

use crate::models::{BackupLogRecord, NodeBackup, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precedence {
    /// The incoming record wins regardless of time.
    Incoming,
    /// The occupant keeps the slot regardless of time.
    Occupant,
    /// The record with the later consistent time wins.
    ByTime,
}

/// Shard primaries always displace secondaries; routers and the coordinator
/// have no row and therefore always follow the most recent record.
const FIXED_PRECEDENCE: &[(&str, &str, Precedence)] = &[
    ("master", "slave", Precedence::Incoming),
    ("slave", "master", Precedence::Occupant),
];

pub fn precedence(incoming: &Role, occupant: &Role) -> Precedence {
    FIXED_PRECEDENCE
        .iter()
        .find(|(i, o, _)| *i == incoming.as_str() && *o == occupant.as_str())
        .map_or(Precedence::ByTime, |(_, _, p)| *p)
}

/// What to do with an occupied slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Replace,
    /// Same producer, same backup: fold the record into the slot.
    Merge,
    Keep,
}

pub fn resolve(incoming: &BackupLogRecord, occupant: &NodeBackup) -> Resolution {
    match precedence(&incoming.role, &occupant.role) {
        Precedence::Incoming => Resolution::Replace,
        Precedence::Occupant => Resolution::Keep,
        Precedence::ByTime => match incoming.consistent_time.cmp(&occupant.consistent_time) {
            Ordering::Greater => Resolution::Replace,
            Ordering::Less => Resolution::Keep,
            // Equal times from different producers go to the lower host:port
            // so that arrival order never changes the winner.
            Ordering::Equal => {
                let incoming_key = (incoming.host.as_str(), incoming.port, incoming.role.as_str());
                let occupant_key = (occupant.host.as_str(), occupant.port, occupant.role.as_str());
                match incoming_key.cmp(&occupant_key) {
                    Ordering::Equal => Resolution::Merge,
                    Ordering::Less => Resolution::Replace,
                    Ordering::Greater => Resolution::Keep,
                }
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::record;

    #[test]
    fn test_precedence_table() {
        assert_eq!(precedence(&Role::PrimaryShard, &Role::SecondaryShard), Precedence::Incoming);
        assert_eq!(precedence(&Role::SecondaryShard, &Role::PrimaryShard), Precedence::Occupant);
        assert_eq!(precedence(&Role::PrimaryShard, &Role::PrimaryShard), Precedence::ByTime);
        assert_eq!(precedence(&Role::RouterPrimary, &Role::RouterPrimary), Precedence::ByTime);
        assert_eq!(precedence(&Role::Coordinator, &Role::Coordinator), Precedence::ByTime);
    }

    #[test]
    fn test_primary_beats_later_secondary() {
        let secondary = NodeBackup::from_record(&record("b", Role::SecondaryShard, Some(0), "10.0.0.2", 10));
        let primary = record("b", Role::PrimaryShard, Some(0), "10.0.0.1", 5);
        assert_eq!(resolve(&primary, &secondary), Resolution::Replace);

        let primary_slot = NodeBackup::from_record(&primary);
        let late_secondary = record("b", Role::SecondaryShard, Some(0), "10.0.0.2", 10);
        assert_eq!(resolve(&late_secondary, &primary_slot), Resolution::Keep);
    }

    #[test]
    fn test_time_decides_same_role() {
        let occupant = NodeBackup::from_record(&record("b", Role::RouterPrimary, None, "10.0.0.9", 10));

        let later = record("b", Role::RouterPrimary, None, "10.0.0.8", 11);
        let earlier = record("b", Role::RouterPrimary, None, "10.0.0.8", 9);
        let same_producer = record("b", Role::RouterPrimary, None, "10.0.0.9", 10);
        let lower_host = record("b", Role::RouterPrimary, None, "10.0.0.1", 10);

        assert_eq!(resolve(&later, &occupant), Resolution::Replace);
        assert_eq!(resolve(&earlier, &occupant), Resolution::Keep);
        assert_eq!(resolve(&same_producer, &occupant), Resolution::Merge);
        assert_eq!(resolve(&lower_host, &occupant), Resolution::Replace);
    }
}

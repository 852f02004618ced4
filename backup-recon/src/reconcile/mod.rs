//! Reconciliation stages: filter, aggregate, validate, select.
//!
//! Every stage is a pure function over already-fetched records. A pipeline
//! owns its intermediate map, so separate clusters can be reconciled
//! concurrently without coordination.

pub mod aggregate;
pub mod binlog;
pub mod filter;
pub mod precedence;
pub mod privilege;
pub mod select;
pub mod validate;

pub use aggregate::{aggregate, BackupSetMap, MergeStrategy};
pub use binlog::{build_manifest, dedupe_binlog};
pub use filter::{filter, CompletenessMode};
pub use privilege::{latest_privilege_files, PrivilegeBackupRecord, PrivilegeFile};
pub use select::select_nearest;
pub use validate::{validate, Rejection, ShardRequirement};

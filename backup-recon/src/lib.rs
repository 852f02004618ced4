//! Backup Reconciliation Library
//!
//! Groups per-node backup completion records into backup sets, validates them
//! against the cluster topology and picks the set to restore for a
//! point-in-time rollback.

pub mod config;
pub mod fleet;
pub mod models;
pub mod reconcile;
pub mod rollback;
pub mod source;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use rollback::FixpointRollback;
pub use utils::errors::ReconError;
pub type Result<T> = std::result::Result<T, ReconError>;

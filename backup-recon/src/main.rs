//! Backup Reconciler - Main entry point
//!
//! Reads exported backup/binlog records from disk and prints rollback
//! lookups as JSON.

use anyhow::{Context, Result};
use backup_recon::fleet::lookup_rollback_points;
use backup_recon::models::wire::parse_timestamp;
use backup_recon::source::FileSource;
use backup_recon::{utils, Config, FixpointRollback};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory of exported records (overrides config)
    #[arg(short, long, value_name = "DIR")]
    source: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List valid backup sets in a time range
    Sets {
        #[arg(long)]
        cluster_id: u64,
        #[arg(long, value_parser = parse_time)]
        start: DateTime<Utc>,
        #[arg(long, value_parser = parse_time)]
        end: DateTime<Utc>,
        /// Shards to require (sharded clusters only)
        #[arg(long = "shard")]
        shards: Vec<u32>,
    },
    /// Latest backup set at or before a rollback time
    Latest {
        #[arg(long)]
        cluster_id: u64,
        #[arg(long, value_parser = parse_time)]
        rollback_time: DateTime<Utc>,
        #[arg(long = "shard")]
        shards: Vec<u32>,
    },
    /// Deduplicated binlog files of one instance
    Binlog {
        #[arg(long)]
        cluster_id: u64,
        #[arg(long, value_parser = parse_time)]
        start: DateTime<Utc>,
        #[arg(long, value_parser = parse_time)]
        end: DateTime<Utc>,
        /// Defaults to the configured primary
        #[arg(long, requires = "port")]
        host: Option<String>,
        #[arg(long, requires = "host")]
        port: Option<u16>,
    },
    /// Latest privilege backup file per instance
    Privileges {
        #[arg(long)]
        cluster_id: u64,
        #[arg(long, value_parser = parse_time)]
        end: DateTime<Utc>,
    },
    /// Latest backup for every configured cluster
    Fleet {
        #[arg(long, value_parser = parse_time)]
        rollback_time: DateTime<Utc>,
    },
}

fn parse_time(raw: &str) -> std::result::Result<DateTime<Utc>, String> {
    parse_timestamp(raw).ok_or_else(|| format!("invalid timestamp: {raw}"))
}

fn shard_list(shards: &[u32]) -> Option<&[u32]> {
    (!shards.is_empty()).then_some(shards)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = Config::load(args.config.as_deref())
        .with_context(|| format!("failed to load configuration from {:?}", args.config))?;
    if let Some(root) = args.source {
        config.source.root = root;
    }

    // Initialize logging
    let log_level = args.log_level.as_deref().unwrap_or(&config.log.level);
    utils::logger::init(log_level)?;

    tracing::info!(
        "Starting backup-recon v{} (source: {})",
        env!("CARGO_PKG_VERSION"),
        config.source.root.display()
    );

    let source = Arc::new(FileSource::new(config.source.root.clone()));
    let handler_for = |cluster_id: u64| -> Result<FixpointRollback> {
        let cluster = config.cluster(cluster_id)?.clone();
        Ok(FixpointRollback::new(cluster, source.clone(), config.query.clone()))
    };

    match args.command {
        Command::Sets { cluster_id, start, end, shards } => {
            let sets = handler_for(cluster_id)?.query_backup_sets(start, end, shard_list(&shards))?;
            print_json(&sets)?;
        }
        Command::Latest { cluster_id, rollback_time, shards } => {
            let latest = handler_for(cluster_id)?.latest_backup(rollback_time, shard_list(&shards))?;
            if latest.is_none() {
                tracing::warn!("No backup found for cluster {} before {}", cluster_id, rollback_time);
            }
            print_json(&latest)?;
        }
        Command::Binlog { cluster_id, start, end, host, port } => {
            let instance = host.as_deref().zip(port);
            let manifest = handler_for(cluster_id)?.query_binlogs(start, end, instance)?;
            print_json(&manifest)?;
        }
        Command::Privileges { cluster_id, end } => {
            let record = handler_for(cluster_id)?.query_privilege_backups(end)?;
            print_json(&record)?;
        }
        Command::Fleet { rollback_time } => {
            let points = lookup_rollback_points(
                source.clone(),
                config.query.clone(),
                config.clusters.clone(),
                rollback_time,
            )
            .await;
            let rendered: Vec<_> = points
                .into_iter()
                .map(|point| match point.outcome {
                    Ok(backup) => json!({ "cluster_id": point.cluster_id, "backup": backup }),
                    Err(e) => json!({ "cluster_id": point.cluster_id, "error": e.to_string() }),
                })
                .collect();
            print_json(&rendered)?;
        }
    }

    Ok(())
}

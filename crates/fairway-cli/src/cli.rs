use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "fairway")]
#[command(about = "Inspect, merge and sync Fairway course snapshots")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Base URL of the fairway-api server (defaults to FAIRWAY_SERVER or http://127.0.0.1:8080)
    #[arg(long, global = true, value_name = "URL")]
    pub server: Option<String>,

    /// Site write key sent as a bearer token (defaults to FAIRWAY_SITE_WRITE_KEY)
    #[arg(long, global = true, value_name = "KEY")]
    pub key: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download the current snapshot from the server
    Fetch {
        /// Write the snapshot to this file instead of stdout
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Push a delta file to the server
    Push {
        /// JSON file with collections to merge (and optionally `baseVersion`)
        deltas: PathBuf,
        /// Version the deltas were prepared against (defaults to the file's
        /// `baseVersion`, then to the server's current version)
        #[arg(long, value_name = "VERSION")]
        base_version: Option<u64>,
        /// Write the merged snapshot returned by the server to this file
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Merge a delta file into a local snapshot file without a server
    Merge {
        /// Snapshot file to merge into (treated as empty when missing)
        #[arg(long, value_name = "PATH")]
        snapshot: PathBuf,
        /// JSON file with collections to merge
        #[arg(long, value_name = "PATH")]
        deltas: PathBuf,
        /// Write the merged snapshot to this file instead of stdout
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
        /// Reject the merge when the result exceeds this many bytes
        #[arg(long, value_name = "BYTES", default_value_t = fairway_core::sync::DEFAULT_MAX_SNAPSHOT_BYTES)]
        max_bytes: usize,
    },
    /// Drop expired tombstones from a filesystem snapshot store
    Gc {
        #[command(flatten)]
        store: LocalStoreArgs,
        /// Tombstones older than this many days are removed
        #[arg(long, value_name = "DAYS", default_value_t = 30)]
        retention_days: u64,
        /// Report what would be removed without writing
        #[arg(long)]
        dry_run: bool,
    },
    /// Show record counts for a snapshot
    Stats {
        /// Read a filesystem snapshot store instead of the server
        #[arg(long)]
        local: bool,
        #[command(flatten)]
        store: LocalStoreArgs,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(clap::Args)]
pub struct LocalStoreArgs {
    /// Directory holding the snapshot document
    #[arg(long, value_name = "PATH", default_value = "./data")]
    pub data_dir: PathBuf,
    /// Logical snapshot key (file name without `.json`)
    #[arg(long, value_name = "NAME", default_value = fairway_core::store::DEFAULT_SNAPSHOT_KEY)]
    pub snapshot_key: String,
}

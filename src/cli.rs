use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "spacetrend", about = "Track disk usage growth over time", version)]
pub struct Cli {
    /// Path to the YAML config file
    #[arg(long, short, global = true, env = "SPACETREND_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan mount points now (defaults to the configured ones)
    Scan {
        mount_points: Vec<String>,
    },
    /// Show whether a scan is running
    Status,
    /// List completed snapshots
    Snapshots {
        #[arg(long)]
        mount: Option<String>,
        /// Only snapshots completed within this many days
        #[arg(long)]
        days: Option<u32>,
        #[arg(long, default_value_t = 100)]
        limit: u32,
    },
    /// Show the latest completed snapshot
    Latest {
        #[arg(long)]
        mount: Option<String>,
    },
    /// List entries of a snapshot
    Browse {
        /// Snapshot id (defaults to the latest completed one)
        #[arg(long)]
        snapshot: Option<i64>,
        /// Only children of this directory
        #[arg(long)]
        parent: Option<String>,
        /// Only entries at this depth (root = 0)
        #[arg(long)]
        depth: Option<u32>,
    },
    /// Size history of one path
    History {
        path: String,
        #[arg(long, default_value_t = 30)]
        days: u32,
    },
    /// Directories that grew the most since the previous snapshot
    Growth {
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long)]
        mount: Option<String>,
    },
    /// Access errors recorded for a snapshot
    Errors {
        snapshot: i64,
        #[arg(long, default_value_t = 100)]
        limit: u32,
    },
    /// Delete snapshots older than the retention period
    Cleanup {
        /// Override the configured retention days
        #[arg(long)]
        days: Option<u32>,
    },
}

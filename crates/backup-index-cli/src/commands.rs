use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "backup-index")]
#[command(about = "Keeps a backup index of local files in sync with a remote store", long_about = None)]
#[command(version)]
pub struct Cli {
    /// The settings file (YAML or TOML)
    #[arg(long, global = true)]
    pub settings: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Run verbosely
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Location for storing execution logs
    #[arg(short = 'l', long = "log-path", global = true)]
    pub log_path: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Register new and changed files under the backup path
    Scan,
    /// Upload queued files to the remote store
    Sync,
    /// Scan, then upload whatever was queued
    Run,
    /// List every indexed resource ordered by name
    List {
        /// Write the listing as CSV to this file instead of stdout
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Show resource counts per sync state
    Status,
    /// List files that exhausted their upload retries
    Stalled,
    /// Copy the remote files to a target directory
    Restore { target: PathBuf },
    /// Flush the file index
    Flush {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Print configuration values
    PrintConfig,
}

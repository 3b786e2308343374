use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Operator CLI for the CareSync offline record store
#[derive(Debug, Parser)]
#[command(name = "caresync")]
#[command(about = "Create, inspect and synchronize offline medical records")]
pub struct Cli {
    /// Configuration file (YAML or TOML)
    #[arg(short, long, global = true, env = "CARESYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Local database path (overrides configuration)
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Acceptance endpoint URL (overrides configuration)
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Record a new visit; it starts out pending
    Add(AddArgs),
    /// List records in creation order
    List {
        /// Only records that still need syncing
        #[arg(long)]
        unsynced: bool,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show one record as JSON
    Show { id: String },
    /// Set a record's sync status (synced, pending, error)
    SetStatus { id: String, status: String },
    /// Run one reconciliation pass now
    Sync,
    /// Probe connectivity and reconcile on every reconnect until Ctrl+C
    Watch {
        /// Probe interval in seconds (overrides configuration)
        #[arg(long)]
        interval: Option<u64>,
    },
}

#[derive(Debug, Args)]
pub struct AddArgs {
    /// Record id; a random UUID when omitted
    #[arg(long)]
    pub id: Option<String>,
    #[arg(long)]
    pub patient_name: String,
    #[arg(long)]
    pub diagnosis: String,
    #[arg(long)]
    pub treatment: String,
    /// Visit date, e.g. 2024-03-02
    #[arg(long)]
    pub date: String,
    #[arg(long)]
    pub created_by: String,
    /// Path to an attached file
    #[arg(long)]
    pub file_path: Option<String>,
}

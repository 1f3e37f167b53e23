use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "vetsync", version, about = "Mirror a clinic API into a local SQLite store")]
pub struct Cli {
    /// Config file (defaults to the platform config dir `vetsync/sync.toml`).
    #[arg(long, short, global = true, env = "VETSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run one full sync (default if no subcommand given).
    Run {
        /// Print the run report as JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Write a default configuration file.
    InitConfig {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },

    /// Print row counts of the local store.
    Status,
}

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command line interface for the application
#[derive(Parser, Debug)]
#[command(name = "orchestrator", version, about = "Task decomposition and agent execution engine")]
pub struct Cli {
    /// Path to a YAML or TOML configuration file; defaults apply when omitted
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Sets the logging verbosity level for the application
    /// Possible values: "error", "warn", "info", "debug", "trace"
    /// Default: "info"
    #[arg(long, global = true, default_value_t = String::from("info"))]
    pub logging_level: String,

    /// Directory for daily rotating log files, in addition to stdout
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Serve the HTTP API
    Serve {
        /// Overrides `api.port` from the configuration
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Create a task from a description and run it to completion
    Run {
        description: String,
        #[arg(long, default_value_t = String::from("cli"))]
        user_id: String,
        /// Task metadata as a JSON object
        #[arg(long)]
        metadata: Option<String>,
    },
    /// Search long-term memory
    Search {
        query: String,
        #[arg(short = 'k', long, default_value_t = crate::constants::DEFAULT_SEARCH_LIMIT)]
        limit: usize,
    },
    /// Verify that the vector index and the database agree
    Check,
}

//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser};

use crate::commands::Command;

/// Command-line client for the healthlog backend.
#[derive(Parser, Debug)]
#[command(name = "healthlog")]
#[command(author, version = env!("HEALTHLOG_VERSION"), about, long_about = None)]
#[command(long_version = concat!(env!("HEALTHLOG_VERSION"), " (commit ", env!("HEALTHLOG_COMMIT"), ")"))]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Connection settings shared by every command.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Backend base URL
    #[arg(long, env = "HEALTHLOG_API", default_value = "http://localhost:8000", global = true)]
    pub api: String,

    /// Request timeout in seconds
    #[arg(long, env = "HEALTHLOG_TIMEOUT", default_value_t = 30, global = true)]
    pub timeout: u64,

    /// Share one refresh exchange between concurrent requests
    #[arg(long, global = true)]
    pub coalesce_refresh: bool,

    /// Session file (defaults to the platform data directory)
    #[arg(long, env = "HEALTHLOG_SESSION_FILE", global = true)]
    pub session_file: Option<PathBuf>,
}

//! Command-line interface, parsed with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// authschema - bootstrap the users/auth_tokens/auth_logs schema
#[derive(Parser)]
#[command(name = "authschema")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file to use instead of the default search paths
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Connect and create any missing tables (default)
    Init,

    /// Connect and run a connectivity check only
    Ping,

    /// Print the DDL for a dialect without connecting
    Schema {
        /// "mysql" or "postgres"; defaults to the configured dialect
        dialect: Option<String>,
    },

    /// Write one entry to auth_logs
    Log {
        /// Action label, e.g. "login"
        action: String,
        /// Origin address of the request
        #[arg(long)]
        ip: String,
        /// Numeric status code
        #[arg(long)]
        status: i32,
        #[arg(long)]
        user_id: Option<i64>,
        #[arg(long)]
        user_agent: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
}

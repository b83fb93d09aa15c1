//! Arcade CLI
//!
//! Command-line tools for arcade stores.
//!
//! # Commands
//!
//! - `shell` - Serve JSON requests from stdin, one per line
//! - `dump` - Print every committed row
//! - `log` - Print the commit log
//! - `verify` - Check the table and commit log

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Arcade key-value store tools.
#[derive(Parser)]
#[command(name = "arcade")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the store directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read JSON requests from stdin and write JSON responses to stdout
    Shell {
        /// Seconds a session may sit idle before it is evicted (0 keeps it)
        #[arg(long, default_value = "1800")]
        session_ttl: u64,

        /// Maximum number of open sessions
        #[arg(long, default_value = "10000")]
        max_sessions: usize,

        /// Milliseconds to wait for a busy writer
        #[arg(long, default_value = "3000")]
        busy_timeout: u64,
    },

    /// Print every committed row, ordered by key
    Dump {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print the commit log
    Log {
        /// Print only the last N records
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Verify the table and commit log
    Verify,

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // stdout carries shell responses, so logs go to stderr
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Shell {
            session_ttl,
            max_sessions,
            busy_timeout,
        } => {
            let path = cli.path.ok_or("Store path required for shell")?;
            let options = commands::shell::ShellOptions {
                session_ttl: (session_ttl > 0).then(|| Duration::from_secs(session_ttl)),
                max_sessions,
                busy_timeout: Duration::from_millis(busy_timeout),
            };
            commands::shell::run(&path, &options)?;
        }
        Commands::Dump { format } => {
            let path = cli.path.ok_or("Store path required for dump")?;
            commands::dump::run(&path, &format)?;
        }
        Commands::Log { limit, format } => {
            let path = cli.path.ok_or("Store path required for log")?;
            commands::log::run(&path, limit, &format)?;
        }
        Commands::Verify => {
            let path = cli.path.ok_or("Store path required for verify")?;
            commands::verify::run(&path)?;
        }
        Commands::Version => {
            println!("Arcade CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("Arcade Core v{}", arcade_core::VERSION);
        }
    }

    Ok(())
}

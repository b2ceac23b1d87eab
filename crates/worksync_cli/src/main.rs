//! worksync CLI
//!
//! Command-line tools for inspecting the local state of a worksync client.
//!
//! # Commands
//!
//! - `inspect` - List cached documents and consent decisions
//! - `consent` - Show or change consent decisions
//! - `bench` - Compare push strategies against a simulated remote

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// worksync command-line tools.
#[derive(Parser)]
#[command(name = "worksync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the local store directory
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
    /// List cached documents and consent decisions
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show or change consent decisions
    Consent {
        /// Document kind (workspace, settings, extensions, sdk); all if omitted
        #[arg(short, long)]
        kind: Option<String>,

        /// Account the decision belongs to
        #[arg(short, long)]
        owner: Option<String>,

        /// New status (enabled, declined, unset)
        #[arg(short, long)]
        set: Option<String>,
    },

    /// Compare push strategies against a simulated remote
    Bench {
        /// Number of files to push
        #[arg(long, default_value = "50")]
        files: usize,

        /// Simulated latency per remote call in milliseconds
        #[arg(long, default_value = "20")]
        latency_ms: u64,

        /// Concurrency limit of the bounded strategy
        #[arg(short, long, default_value = "5")]
        concurrency: usize,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Inspect { format } => {
            let path = cli.path.ok_or("Store path required for inspect")?;
            commands::inspect::run(&path, &format)?;
        }
        Commands::Consent { kind, owner, set } => {
            let path = cli.path.ok_or("Store path required for consent")?;
            commands::consent::run(&path, kind.as_deref(), owner.as_deref(), set.as_deref())?;
        }
        Commands::Bench {
            files,
            latency_ms,
            concurrency,
            format,
        } => {
            commands::bench::run(files, latency_ms, concurrency, &format)?;
        }
        Commands::Version => {
            println!("worksync CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

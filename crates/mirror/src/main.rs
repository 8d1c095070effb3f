//! mirror CLI - incremental Notion mirror.
//!
//! Provides commands for:
//! - `sync`: Mirror configured pages and databases into local snapshots
//! - `status`: Show what the last successful sync recorded

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{StatusArgs, SyncArgs};
use output::Output;

/// mirror - incremental Notion mirror.
#[derive(Parser)]
#[command(name = "mirror", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync pages and databases from Notion.
    Sync(SyncArgs),
    /// Show the stored sync state.
    Status(StatusArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let verbose = matches!(&cli.command, Commands::Sync(args) if args.verbose);
    let filter = if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Sync(args) => args.execute(),
        Commands::Status(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}

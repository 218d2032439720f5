//! vaultkeep CLI
//!
//! Command-line interface for the vaultkeep content-addressable vault

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use vaultkeep_core::logging_facility::{init, Profile};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "vaultkeep")]
#[command(about = "vaultkeep - Deduplicating, verifiable artifact vault", long_about = None)]
struct Cli {
    /// TOML file with the `[vault]` table and `[[artifact]]` catalog
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Hash a directory into the vault
    Ingest(commands::ingest::IngestArgs),
    /// Verify stored blobs and optionally an exported directory
    Verify(commands::verify::VerifyArgs),
    /// Materialize a stored version into a directory
    Export(commands::export::ExportArgs),
    /// Delete a stored version and its blobs
    Purge(commands::purge::PurgeArgs),
    /// Print the manifest summary of a stored version
    Show(commands::show::ShowArgs),
}

fn main() {
    let cli = Cli::parse();
    init(Profile::Development);

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Ingest(args) => commands::ingest::execute(config, args),
        Commands::Verify(args) => commands::verify::execute(config, args),
        Commands::Export(args) => commands::export::execute(config, args),
        Commands::Purge(args) => commands::purge::execute(config, args),
        Commands::Show(args) => commands::show::execute(config, args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

//! Ingest command

use super::Session;
use clap::Args;
use std::path::{Path, PathBuf};
use vaultkeep_core::{ArtifactIdentity, RelPath};
use vaultkeep_engine::{IngestEngine, IngestOptions};

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// Version to store the source tree as
    #[arg(long)]
    pub version: String,

    /// Artifact name (defaults to the catalog entry)
    #[arg(long, requires = "path")]
    pub name: Option<String>,

    /// Storage path under the vault root (defaults to the catalog entry)
    #[arg(long, requires = "name")]
    pub path: Option<String>,

    /// Directory to ingest
    #[arg(long)]
    pub source: PathBuf,

    /// Replace an existing manifest and rewrite existing blobs
    #[arg(long)]
    pub force: bool,
}

pub fn execute(config: Option<&Path>, args: IngestArgs) -> Result<(), Box<dyn std::error::Error>> {
    let session = Session::load(config)?;

    let identity = match (args.name, args.path) {
        (Some(name), Some(path)) => ArtifactIdentity::new(name, args.version, RelPath::new(path)?),
        _ => session.resolve(&args.version)?,
    };

    let engine = IngestEngine::from_config(&session.config);
    let outcome = engine.ingest(
        &session.store,
        &identity,
        &args.source,
        IngestOptions { force: args.force },
    )?;

    let report = outcome.report;
    println!("Ingested {}:", identity);
    println!("  files: {}", report.files);
    println!("  unique_blobs: {}", report.unique_blobs);
    println!("  duplicate_files: {}", report.duplicate_files);
    println!("  written: {}", report.written);
    println!("  overwritten: {}", report.overwritten);
    println!("  pre_existing: {}", report.pre_existing);
    Ok(())
}

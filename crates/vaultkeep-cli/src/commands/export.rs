//! Export command

use super::Session;
use clap::Args;
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct ExportArgs {
    #[arg(long)]
    pub version: String,

    /// Destination directory; existing files are never overwritten
    #[arg(long)]
    pub dest: PathBuf,

    /// Skip verifying the blob store before writing
    #[arg(long)]
    pub no_verify: bool,
}

pub fn execute(config: Option<&Path>, args: ExportArgs) -> Result<(), Box<dyn std::error::Error>> {
    let session = Session::load(config)?;
    let vault = session.open(&args.version)?;

    let report = vault.export(&args.dest, !args.no_verify)?;

    println!("Exported {} to {}:", vault.artifact(), args.dest.display());
    println!("  blobs: {}", report.blobs);
    println!("  files: {}", report.files);
    Ok(())
}

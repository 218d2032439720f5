//! Show command

use super::Session;
use clap::Args;
use std::path::Path;

#[derive(Debug, Args)]
pub struct ShowArgs {
    #[arg(long)]
    pub version: String,

    /// List every digest and its paths
    #[arg(long)]
    pub files: bool,
}

pub fn execute(config: Option<&Path>, args: ShowArgs) -> Result<(), Box<dyn std::error::Error>> {
    let session = Session::load(config)?;
    let vault = session.open(&args.version)?;
    let snapshot = vault.snapshot();

    println!("{}:", vault.artifact());
    println!("  manifest: {}", session.store.manifest_path(vault.artifact()).display());
    println!("  unique_blobs: {}", snapshot.blob_count());
    println!("  files: {}", snapshot.file_count());

    if args.files {
        for (digest, paths) in snapshot.digests() {
            println!("  {}", digest);
            for path in paths {
                println!("    {}", path);
            }
        }
    }
    Ok(())
}

//! Purge command

use super::Session;
use clap::Args;
use std::path::Path;

#[derive(Debug, Args)]
pub struct PurgeArgs {
    #[arg(long)]
    pub version: String,

    /// Acknowledge that blobs shared with other versions are deleted too
    #[arg(long)]
    pub confirm_shared_blobs: bool,
}

pub fn execute(config: Option<&Path>, args: PurgeArgs) -> Result<(), Box<dyn std::error::Error>> {
    if !args.confirm_shared_blobs {
        return Err(
            "purge deletes every blob of this version, including blobs other versions share; \
             pass --confirm-shared-blobs to proceed"
                .into(),
        );
    }

    let session = Session::load(config)?;
    let vault = session.open(&args.version)?;
    let artifact = vault.artifact().clone();

    let report = vault.purge()?;

    println!("Purged {}:", artifact);
    println!("  blobs_removed: {}", report.blobs_removed);
    println!("  blobs_absent: {}", report.blobs_absent);
    Ok(())
}

//! Verify command

use super::Session;
use clap::Args;
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct VerifyArgs {
    #[arg(long, conflicts_with = "all", required_unless_present = "all")]
    pub version: Option<String>,

    /// Verify every catalog version that has a stored manifest
    #[arg(long, conflicts_with_all = ["version", "dir"])]
    pub all: bool,

    /// Also verify an exported directory
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// With --dir, skip re-hashing the blob store
    #[arg(long, requires = "dir")]
    pub skip_database: bool,
}

pub fn execute(config: Option<&Path>, args: VerifyArgs) -> Result<(), Box<dyn std::error::Error>> {
    let session = Session::load(config)?;

    if args.all {
        return verify_all(&session);
    }

    let Some(version) = args.version else {
        return Err("Must specify either --version or --all".into());
    };
    let vault = session.open(&version)?;

    match args.dir {
        Some(dir) => {
            let files = vault.verify_directory(&dir, !args.skip_database)?;
            println!("{}: {} files verified in {}", vault.artifact(), files, dir.display());
        }
        None => {
            let blobs = vault.verify_blobs()?;
            println!("{}: {} blobs verified", vault.artifact(), blobs);
        }
    }
    Ok(())
}

fn verify_all(session: &Session) -> Result<(), Box<dyn std::error::Error>> {
    let mut failed = 0usize;
    let mut checked = 0usize;

    for entry in session.catalog.entries() {
        let identity = entry.identity();
        if !session.store.has_manifest(&identity) {
            continue;
        }
        checked += 1;
        match session.open(&entry.version).and_then(|v| v.verify_blobs()) {
            Ok(blobs) => println!("{}: ok ({} blobs)", identity, blobs),
            Err(e) => {
                failed += 1;
                println!("{}: FAILED\n{}", identity, e);
            }
        }
    }

    if failed > 0 {
        return Err(format!("{} of {} stored versions failed verification", failed, checked).into());
    }
    println!("{} stored versions verified", checked);
    Ok(())
}

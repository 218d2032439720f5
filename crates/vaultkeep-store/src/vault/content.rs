//! Verified reads of files on disk

use crate::errors::{read_error, Result};
use std::fs::{self, File};
use std::path::Path;
use vaultkeep_core::model::digest::mismatch;
use vaultkeep_core::{Blob, Digest};

/// Stream a file through the hasher without loading it whole
///
/// # Errors
///
/// `MissingResource` if the file does not exist, `Io` for other failures.
pub fn hash_file(path: &Path) -> Result<Digest> {
    let file = File::open(path).map_err(|e| read_error("hash_file", path, e))?;
    Digest::of_reader(std::io::BufReader::new(file)).map_err(|e| read_error("hash_file", path, e))
}

/// Read a file and check it hashes to `expected`
///
/// # Errors
///
/// `MissingResource` if the file does not exist, `IntegrityMismatch` if its
/// content does not match, `Io` for other failures.
pub fn read_verified(path: &Path, expected: &Digest) -> Result<Blob> {
    let data = fs::read(path).map_err(|e| read_error("read_verified", path, e))?;
    Blob::with_expected(data, expected).map_err(|e| e.with_op("read_verified").with_path(path))
}

/// Check a file on disk against `expected` without keeping its bytes
///
/// # Errors
///
/// Same as [`read_verified`].
pub fn check_file(path: &Path, expected: &Digest) -> Result<()> {
    let actual = hash_file(path)?;
    if &actual != expected {
        return Err(mismatch(expected, &actual)
            .with_op("check_file")
            .with_path(path));
    }
    Ok(())
}

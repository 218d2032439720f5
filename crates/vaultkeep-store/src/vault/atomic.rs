//! Write primitives
//!
//! `Replace` uses the temp→rename pattern so readers never observe a partial
//! file. `CreateNew` refuses to touch an existing file and removes its own
//! partial output if the write fails midway.

use crate::errors::{io_error, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// How to treat a file that already exists at the target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePolicy {
    /// Leave an existing file untouched
    CreateNew,
    /// Atomically replace any existing file
    Replace,
}

impl WritePolicy {
    /// `Replace` when forced, `CreateNew` otherwise
    pub fn from_force(force: bool) -> Self {
        if force {
            WritePolicy::Replace
        } else {
            WritePolicy::CreateNew
        }
    }
}

/// What a write actually did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Created,
    Replaced,
    /// `CreateNew` found the target already present
    AlreadyExists,
}

/// Write bytes to `target` under `policy`, creating parent directories
///
/// # Errors
///
/// `Io` if a directory cannot be created or the file cannot be written.
pub fn write_file(target: &Path, content: &[u8], policy: WritePolicy) -> Result<WriteOutcome> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| io_error("create_dir", parent, e))?;
    }

    match policy {
        WritePolicy::CreateNew => create_new(target, content),
        WritePolicy::Replace => replace(target, content),
    }
}

fn create_new(target: &Path, content: &[u8]) -> Result<WriteOutcome> {
    let mut file = match OpenOptions::new().write(true).create_new(true).open(target) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            return Ok(WriteOutcome::AlreadyExists)
        }
        Err(e) => return Err(io_error("write_file", target, e)),
    };

    if let Err(e) = file.write_all(content).and_then(|()| file.sync_all()) {
        drop(file);
        let _ = fs::remove_file(target);
        return Err(io_error("write_file", target, e));
    }
    Ok(WriteOutcome::Created)
}

fn replace(target: &Path, content: &[u8]) -> Result<WriteOutcome> {
    let existed = target.exists();
    let temp_path = temp_path_for(target);

    fs::write(&temp_path, content).map_err(|e| io_error("write_temp", &temp_path, e))?;

    if let Err(e) = fs::rename(&temp_path, target) {
        let _ = fs::remove_file(&temp_path);
        return Err(io_error("rename_temp", target, e));
    }

    Ok(if existed {
        WriteOutcome::Replaced
    } else {
        WriteOutcome::Created
    })
}

/// Hidden sibling of `target`, so the rename stays on one filesystem
fn temp_path_for(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{}.{}.tmp", name, std::process::id()))
}

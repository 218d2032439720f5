//! Error handling for vaultkeep-store
//!
//! Wraps vaultkeep-core ExError with store-specific helpers

use std::path::Path;
use vaultkeep_core::errors::{ExError, ExErrorKind};
use vaultkeep_core::Digest;

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

/// Create an IO error
pub fn io_error(operation: &str, path: &Path, err: std::io::Error) -> ExError {
    ExError::new(ExErrorKind::Io)
        .with_op(operation.to_string())
        .with_path(path)
        .with_io_kind(err.kind())
        .with_message(err.to_string())
}

/// Create an error for a create-new write that found its target present
pub fn already_exists(operation: &str, path: &Path) -> ExError {
    ExError::new(ExErrorKind::Io)
        .with_op(operation.to_string())
        .with_path(path)
        .with_io_kind(std::io::ErrorKind::AlreadyExists)
        .with_message("file already exists")
}

/// Map an IO error, classifying not-found as a missing resource
pub fn read_error(operation: &str, path: &Path, err: std::io::Error) -> ExError {
    if err.kind() == std::io::ErrorKind::NotFound {
        missing_resource(operation, path)
    } else {
        io_error(operation, path, err)
    }
}

/// Create a missing resource error
pub fn missing_resource(operation: &str, path: &Path) -> ExError {
    ExError::new(ExErrorKind::MissingResource)
        .with_op(operation.to_string())
        .with_path(path)
        .with_message("resource does not exist")
}

/// Create a missing blob error (blob store is corrupt)
pub fn missing_blob(digest: &Digest, path: &Path) -> ExError {
    ExError::new(ExErrorKind::MissingBlob)
        .with_op("verify_blobs")
        .with_digest(digest.as_str())
        .with_path(path)
        .with_message(format!("Missing blob {}", digest))
}

/// Create a corrupted blob error
pub fn corrupted_blob(expected: &Digest, actual: &Digest, path: &Path) -> ExError {
    ExError::new(ExErrorKind::DatabaseIntegrity)
        .with_op("verify_blobs")
        .with_digest(expected.as_str())
        .with_path(path)
        .with_message(format!(
            "Corrupted blob - Expected hash {} but got {}",
            expected, actual
        ))
}

/// Create a generic blob store error from a lower-level failure
pub fn database_error(operation: &str, source: ExError) -> ExError {
    let message = source.message().to_string();
    ExError::new(ExErrorKind::Database)
        .with_op(operation.to_string())
        .with_message(message)
        .with_source(source)
}

/// Create an invalid input error
pub fn invalid_input(operation: &str, reason: impl Into<String>) -> ExError {
    ExError::new(ExErrorKind::InvalidInput)
        .with_op(operation.to_string())
        .with_message(reason)
}

/// Create a missing version error for an artifact without a manifest
pub fn missing_version(artifact: &str, manifest: &Path) -> ExError {
    ExError::new(ExErrorKind::MissingVersion)
        .with_op("load_manifest")
        .with_path(manifest)
        .with_message(format!("No manifest stored for {}", artifact))
}

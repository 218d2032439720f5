//! On-disk vault layout
//!
//! Provides:
//! - [`VaultStore`]: root, shared blob directory and manifest locations
//! - Write policies for blobs, manifests and exported files
//! - Streaming content verification of files on disk

mod atomic;
mod content;
mod manifest_file;
mod store;

pub use atomic::{write_file, WriteOutcome, WritePolicy};
pub use content::{check_file, hash_file, read_verified};
pub use manifest_file::MANIFEST_FILE_NAME;
pub use store::{VaultStore, DEFAULT_BLOB_SUBDIR};

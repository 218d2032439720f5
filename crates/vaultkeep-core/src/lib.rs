//! vaultkeep Core - in-memory domain of the content-addressable vault
//!
//! This crate provides the foundational data structures for vaultkeep:
//! - Content digests and digest-verified blobs
//! - Relative asset paths and artifact identities
//! - Immutable snapshots (digest → set of relative paths)
//! - The schema-versioned manifest codec
//! - The canonical error facility and structured logging facility
//!
//! Filesystem access lives in `vaultkeep-store`; orchestration of ingest,
//! verification and export lives in `vaultkeep-engine`.

pub mod errors;
pub mod logging_facility;
pub mod model;
pub mod snapshot;

// Re-export commonly used types
pub use errors::{ExError, ExErrorKind, Result};
pub use model::{ArtifactIdentity, Blob, Digest, RelPath};
pub use snapshot::{DecodedManifest, Snapshot};

#[doc(hidden)]
pub use vaultkeep_core_types as core_types;

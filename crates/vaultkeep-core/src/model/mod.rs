//! Domain model for the vault
//!
//! - [`Digest`]: content fingerprint used as lookup key and blob file name
//! - [`Blob`]: byte content bound to a verified digest
//! - [`RelPath`]: normalized relative asset path recorded in snapshots
//! - [`ArtifactIdentity`]: name, version and storage path of one manifest

pub mod artifact;
pub mod digest;
pub mod rel_path;

pub use artifact::ArtifactIdentity;
pub use digest::{Blob, Digest};
pub use rel_path::RelPath;

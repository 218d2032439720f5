//! vaultkeep Store - filesystem persistence for the vault
//!
//! Provides:
//! - The on-disk vault layout (shared blob directory, per-artifact manifests)
//! - Create-new and replace write policies with no partial files left behind
//! - Parallel content hashing of directory trees into snapshots
//! - Vault configuration and the static version catalog

pub mod catalog;
pub mod config;
pub mod errors;
pub mod hashing;
pub mod vault;

// Re-export key types
pub use catalog::{Availability, Catalog, CatalogEntry};
pub use config::VaultConfig;
pub use errors::Result;
pub use hashing::{ContentHasher, SnapshotBuilder};
pub use vault::{VaultStore, WriteOutcome, WritePolicy};

//! vaultkeep Engine - Orchestration layer
//!
//! Coordinates the in-memory domain (`vaultkeep-core`) with the on-disk
//! vault (`vaultkeep-store`):
//! - [`IngestEngine`]: source tree → blobs + manifest
//! - [`VerifiedVault`]: store verification, directory verification, export, purge
//! - [`FanOut`]: the fail-fast worker pool both are built on

pub mod fanout;
pub mod ingest;
pub mod verified;

pub use fanout::{CancellationToken, FanOut, FanOutStats};
pub use ingest::{IngestEngine, IngestOptions, IngestOutcome, IngestReport};
pub use verified::{ExportReport, PurgeReport, VerifiedVault};

//! Immutable digest → path-set snapshots
//!
//! A [`Snapshot`] is built once, either from hashing a directory or from
//! decoding a manifest, and is never mutated afterwards. The backing map is
//! ordered, so iteration (and therefore encoding) is deterministic.
//!
//! Shared references are safe to read from any number of worker threads at
//! once; no locking is involved because nothing mutates after construction.

pub mod codec;

pub use codec::{DecodeOptions, DecodedManifest, ManifestError, CURRENT_SCHEMA};

use crate::errors::{ExError, ExErrorKind, Result};
use crate::model::{Digest, RelPath};
use std::collections::{BTreeMap, BTreeSet};

/// Digest → set of relative paths that held that content.
///
/// One digest may map to many paths (deduplication); each path maps to
/// exactly one digest. Equality is structural and independent of the order
/// entries were added in. `Clone` produces a fully independent copy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    blobs: BTreeMap<Digest, BTreeSet<RelPath>>,
}

impl Snapshot {
    /// An empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from (digest, path) pairs
    ///
    /// Repeated identical pairs are harmless.
    ///
    /// # Errors
    ///
    /// `InvalidInput` if one path is paired with two different digests.
    pub fn from_pairs<I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (Digest, RelPath)>,
    {
        let mut owner: BTreeMap<RelPath, Digest> = BTreeMap::new();
        let mut blobs: BTreeMap<Digest, BTreeSet<RelPath>> = BTreeMap::new();
        for (digest, path) in pairs {
            if let Some(existing) = owner.get(&path) {
                if existing != &digest {
                    return Err(ExError::new(ExErrorKind::InvalidInput)
                        .with_op("build_snapshot")
                        .with_path(path.as_str())
                        .with_message(format!(
                            "path is recorded with two digests: {} and {}",
                            existing, digest
                        )));
                }
                continue;
            }
            owner.insert(path.clone(), digest.clone());
            blobs.entry(digest).or_default().insert(path);
        }
        Ok(Self { blobs })
    }

    /// Adopt an already-validated grouping
    ///
    /// Callers must have checked that no path appears under two digests and
    /// that no digest has an empty path set. Only the codec uses this.
    pub(crate) fn from_validated_groups(blobs: BTreeMap<Digest, BTreeSet<RelPath>>) -> Self {
        Self { blobs }
    }

    /// Full digest → paths view
    pub fn digests(&self) -> &BTreeMap<Digest, BTreeSet<RelPath>> {
        &self.blobs
    }

    /// Paths recorded for one digest
    pub fn paths(&self, digest: &Digest) -> Option<&BTreeSet<RelPath>> {
        self.blobs.get(digest)
    }

    pub fn contains_digest(&self, digest: &Digest) -> bool {
        self.blobs.contains_key(digest)
    }

    /// Unique digests in ascending order
    pub fn unique_digests(&self) -> impl Iterator<Item = &Digest> {
        self.blobs.keys()
    }

    /// Every (digest, path) pair, grouped by digest
    pub fn entries(&self) -> impl Iterator<Item = (&Digest, &RelPath)> {
        self.blobs
            .iter()
            .flat_map(|(digest, paths)| paths.iter().map(move |p| (digest, p)))
    }

    /// Number of distinct blobs the vault must hold for this snapshot
    pub fn blob_count(&self) -> usize {
        self.blobs.len()
    }

    /// Number of recorded files, counting duplicates
    pub fn file_count(&self) -> usize {
        self.blobs.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

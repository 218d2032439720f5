//! Verified vault handle: verification, export and purge
//!
//! ## Logging Ownership
//!
//! Each public operation here owns its lifecycle events:
//! - `log_op_start!` at entry
//! - `log_op_end!` on success
//! - `log_op_error!` on failure
//!
//! Lower layers (store, core) use only `tracing::debug!()` for internal details.

use crate::fanout::{CancellationToken, FanOut};
use dashmap::DashMap;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use vaultkeep_core::{
    log_op_end, log_op_error, log_op_start, ArtifactIdentity, Digest, ExError, ExErrorKind,
    RelPath, Result, Snapshot,
};
use vaultkeep_store::errors::{already_exists, corrupted_blob, database_error, missing_blob};
use vaultkeep_store::vault::{hash_file, write_file, WriteOutcome, WritePolicy};
use vaultkeep_store::VaultStore;

type Group<'a> = (&'a Digest, &'a BTreeSet<RelPath>);

/// Counts from a successful export
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportReport {
    pub blobs: usize,
    pub files: usize,
}

/// Counts from a purge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub blobs_removed: usize,
    /// Blobs the snapshot referenced that were already gone
    pub blobs_absent: usize,
}

/// One snapshot bound to one vault and one artifact.
///
/// Built by loading a stored manifest ([`VerifiedVault::open`]) or returned
/// by ingest. Holds no locks; operations may be called from any thread.
#[derive(Debug, Clone)]
pub struct VerifiedVault {
    store: VaultStore,
    artifact: ArtifactIdentity,
    snapshot: Snapshot,
    fanout: FanOut,
}

impl VerifiedVault {
    /// Load the stored manifest for `artifact`
    ///
    /// # Errors
    ///
    /// `MissingVersion` if the artifact has no manifest; decode errors
    /// otherwise.
    pub fn open(store: VaultStore, artifact: ArtifactIdentity) -> Result<Self> {
        let decoded = store.load_manifest(&artifact)?;
        Ok(Self::from_snapshot(store, artifact, decoded.snapshot))
    }

    pub(crate) fn from_snapshot(
        store: VaultStore,
        artifact: ArtifactIdentity,
        snapshot: Snapshot,
    ) -> Self {
        Self {
            store,
            artifact,
            snapshot,
            fanout: FanOut::default(),
        }
    }

    /// Use `fanout` for every parallel operation
    pub fn with_fanout(mut self, fanout: FanOut) -> Self {
        self.fanout = fanout;
        self
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn artifact(&self) -> &ArtifactIdentity {
        &self.artifact
    }

    pub fn store(&self) -> &VaultStore {
        &self.store
    }

    fn groups(&self) -> Vec<Group<'_>> {
        self.snapshot.digests().iter().collect()
    }

    /// Check that every referenced blob exists and hashes to its digest
    ///
    /// Every digest is checked; all problems are reported together.
    /// Returns the number of blobs checked.
    ///
    /// # Errors
    ///
    /// `DatabaseIntegrity` carrying one problem per bad blob: `MissingBlob`
    /// for absent files, `DatabaseIntegrity` for corrupted content and
    /// `Database` for read failures.
    pub fn verify_blobs(&self) -> Result<usize> {
        log_op_start!("verify_blobs", artifact = %self.artifact);
        let start = Instant::now();

        let result = self.verify_blobs_impl().map_err(|e| {
            log_op_error!(
                "verify_blobs",
                e,
                duration_ms = start.elapsed().as_millis() as u64,
                artifact = %self.artifact,
                problem_count = e.problems().len()
            );
            e
        })?;

        log_op_end!(
            "verify_blobs",
            duration_ms = start.elapsed().as_millis() as u64,
            artifact = %self.artifact,
            blob_count = result
        );
        Ok(result)
    }

    fn verify_blobs_impl(&self) -> Result<usize> {
        let problems: DashMap<Digest, ExError> = DashMap::new();
        let groups = self.groups();

        self.fanout.run(&groups, |(digest, _), _| {
            if let Some(problem) = self.blob_problem(digest) {
                problems.insert((*digest).clone(), problem);
            }
            Ok(())
        })?;

        if !problems.is_empty() {
            let mut problems: Vec<(Digest, ExError)> = problems.into_iter().collect();
            problems.sort_by(|a, b| a.0.cmp(&b.0));
            let problems: Vec<ExError> = problems.into_iter().map(|(_, p)| p).collect();
            return Err(ExError::new(ExErrorKind::DatabaseIntegrity)
                .with_op("verify_blobs")
                .with_path(self.store.blob_dir())
                .with_message(format!(
                    "Database Verification Failed: {} of {} blobs are missing or corrupt",
                    problems.len(),
                    groups.len()
                ))
                .with_problems(problems));
        }
        Ok(groups.len())
    }

    fn blob_problem(&self, digest: &Digest) -> Option<ExError> {
        let path = self.store.blob_path(digest);
        match hash_file(&path) {
            Ok(actual) if &actual == digest => None,
            Ok(actual) => Some(corrupted_blob(digest, &actual, &path)),
            Err(e) if e.kind() == ExErrorKind::MissingResource => Some(missing_blob(digest, &path)),
            Err(e) => Some(database_error("verify_blobs", e).with_digest(digest.as_str())),
        }
    }

    /// Check that `dest` holds every recorded file with the recorded content
    ///
    /// Extra files under `dest` are ignored. Returns the number of files
    /// checked.
    ///
    /// # Errors
    ///
    /// The `verify_blobs` error if `verify_database_first` is set and the
    /// store is bad; otherwise `VerificationFailed` carrying one problem per
    /// bad file (`MissingResource`, `IntegrityMismatch` or `Io`).
    pub fn verify_directory(&self, dest: &Path, verify_database_first: bool) -> Result<usize> {
        log_op_start!("verify_directory", artifact = %self.artifact, path = %dest.display());
        let start = Instant::now();

        let result = self
            .verify_directory_impl(dest, verify_database_first)
            .map_err(|e| {
                log_op_error!(
                    "verify_directory",
                    e,
                    duration_ms = start.elapsed().as_millis() as u64,
                    artifact = %self.artifact,
                    problem_count = e.problems().len()
                );
                e
            })?;

        log_op_end!(
            "verify_directory",
            duration_ms = start.elapsed().as_millis() as u64,
            artifact = %self.artifact,
            file_count = result
        );
        Ok(result)
    }

    fn verify_directory_impl(&self, dest: &Path, verify_database_first: bool) -> Result<usize> {
        if verify_database_first {
            self.verify_blobs()?;
        }

        let problems: DashMap<RelPath, ExError> = DashMap::new();
        let groups = self.groups();

        self.fanout.run(&groups, |(digest, paths), _| {
            for rel in paths.iter() {
                if let Some(problem) = file_problem(dest, rel, digest) {
                    problems.insert(rel.clone(), problem);
                }
            }
            Ok(())
        })?;

        let checked = self.snapshot.file_count();
        if !problems.is_empty() {
            let mut problems: Vec<(RelPath, ExError)> = problems.into_iter().collect();
            problems.sort_by(|a, b| a.0.cmp(&b.0));
            let problems: Vec<ExError> = problems.into_iter().map(|(_, p)| p).collect();
            return Err(ExError::new(ExErrorKind::VerificationFailed)
                .with_op("verify_directory")
                .with_path(dest)
                .with_message(format!(
                    "Verification Failed: {} of {} files are missing or differ",
                    problems.len(),
                    checked
                ))
                .with_problems(problems));
        }
        Ok(checked)
    }

    /// Materialize every recorded file under `dest`
    ///
    /// Each blob is read and verified once, then written to every path that
    /// maps to it. Existing files are never overwritten. The written tree is
    /// verified before returning.
    ///
    /// # Errors
    ///
    /// The `verify_blobs` error when `verify_first` is set and the store is
    /// bad; the first write or blob-read failure (remaining work is
    /// cancelled); or the `verify_directory` error for the written tree.
    pub fn export(&self, dest: &Path, verify_first: bool) -> Result<ExportReport> {
        log_op_start!("export", artifact = %self.artifact, path = %dest.display());
        let start = Instant::now();

        let result = self.export_impl(dest, verify_first).map_err(|e| {
            log_op_error!(
                "export",
                e,
                duration_ms = start.elapsed().as_millis() as u64,
                artifact = %self.artifact
            );
            e
        })?;

        log_op_end!(
            "export",
            duration_ms = start.elapsed().as_millis() as u64,
            artifact = %self.artifact,
            blob_count = result.blobs,
            file_count = result.files
        );
        Ok(result)
    }

    fn export_impl(&self, dest: &Path, verify_first: bool) -> Result<ExportReport> {
        if verify_first {
            self.verify_blobs()?;
        }

        let files = AtomicUsize::new(0);
        let groups = self.groups();

        self.fanout
            .run(&groups, |(digest, paths), token| {
                self.export_group(dest, digest, paths, token, &files)
            })?;

        self.verify_directory(dest, false)?;

        Ok(ExportReport {
            blobs: groups.len(),
            files: files.load(Ordering::SeqCst),
        })
    }

    fn export_group(
        &self,
        dest: &Path,
        digest: &Digest,
        paths: &BTreeSet<RelPath>,
        token: &CancellationToken,
        files: &AtomicUsize,
    ) -> Result<()> {
        let blob = self.store.read_blob(digest).map_err(|e| match e.kind() {
            ExErrorKind::MissingResource => missing_blob(digest, &self.store.blob_path(digest)),
            ExErrorKind::IntegrityMismatch => ExError::new(ExErrorKind::DatabaseIntegrity)
                .with_op("export")
                .with_digest(digest.as_str())
                .with_path(self.store.blob_path(digest))
                .with_message(format!("Corrupted blob - {}", e.message())),
            _ => database_error("export", e),
        })?;

        for rel in paths {
            if token.is_cancelled() {
                return Ok(());
            }
            let target = rel.resolve_under(dest);
            match write_file(&target, blob.data(), WritePolicy::CreateNew)? {
                WriteOutcome::AlreadyExists => {
                    return Err(already_exists("export", &target).with_digest(digest.as_str()))
                }
                WriteOutcome::Created | WriteOutcome::Replaced => {
                    files.fetch_add(1, Ordering::SeqCst);
                }
            }
        }
        Ok(())
    }

    /// Delete the manifest and every blob this snapshot references.
    ///
    /// # Safety of shared storage
    ///
    /// Blobs are shared between artifacts. The caller must guarantee that no
    /// other stored manifest references any of these digests; nothing here
    /// counts references and a violation silently corrupts the other
    /// artifacts, which `verify_blobs` on them will then report.
    ///
    /// The manifest goes first, so an interrupted purge leaves orphaned blobs
    /// rather than a manifest pointing at missing ones.
    ///
    /// # Errors
    ///
    /// `Database` wrapping the first filesystem failure.
    pub fn purge(self) -> Result<PurgeReport> {
        log_op_start!("purge", artifact = %self.artifact);
        let start = Instant::now();

        let result = self.purge_impl().map_err(|e| {
            log_op_error!(
                "purge",
                e,
                duration_ms = start.elapsed().as_millis() as u64,
                artifact = %self.artifact
            );
            e
        })?;

        log_op_end!(
            "purge",
            duration_ms = start.elapsed().as_millis() as u64,
            artifact = %self.artifact,
            blob_count = result.blobs_removed
        );
        Ok(result)
    }

    fn purge_impl(&self) -> Result<PurgeReport> {
        self.store
            .remove_manifest(&self.artifact)
            .map_err(|e| database_error("purge", e))?;

        let removed = AtomicUsize::new(0);
        let absent = AtomicUsize::new(0);
        let groups = self.groups();

        self.fanout.run(&groups, |(digest, _), _| {
            let gone = self
                .store
                .remove_blob(digest)
                .map_err(|e| database_error("purge", e).with_digest(digest.as_str()))?;
            if gone {
                removed.fetch_add(1, Ordering::SeqCst);
            } else {
                absent.fetch_add(1, Ordering::SeqCst);
            }
            Ok(())
        })?;

        Ok(PurgeReport {
            blobs_removed: removed.load(Ordering::SeqCst),
            blobs_absent: absent.load(Ordering::SeqCst),
        })
    }
}

fn file_problem(dest: &Path, rel: &RelPath, digest: &Digest) -> Option<ExError> {
    let path = rel.resolve_under(dest);
    match hash_file(&path) {
        Ok(actual) if &actual == digest => None,
        Ok(actual) => Some(
            ExError::new(ExErrorKind::IntegrityMismatch)
                .with_op("verify_directory")
                .with_digest(digest.as_str())
                .with_path(&path)
                .with_message(format!("Expected hash {} but got {}", digest, actual)),
        ),
        Err(e) if e.kind() == ExErrorKind::MissingResource => Some(
            ExError::new(ExErrorKind::MissingResource)
                .with_op("verify_directory")
                .with_digest(digest.as_str())
                .with_path(&path)
                .with_message(format!("Missing file {}", rel)),
        ),
        Err(e) => Some(e.with_op("verify_directory").with_digest(digest.as_str())),
    }
}

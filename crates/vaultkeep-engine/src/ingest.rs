//! Ingest: hash a source tree into the vault and record its manifest

use crate::fanout::FanOut;
use crate::verified::VerifiedVault;
use dashmap::DashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use vaultkeep_core::{
    log_op_end, log_op_error, log_op_start, ArtifactIdentity, Blob, Digest, ExError, ExErrorKind,
    Result,
};
use vaultkeep_store::errors::database_error;
use vaultkeep_store::{
    ContentHasher, SnapshotBuilder, VaultConfig, VaultStore, WriteOutcome, WritePolicy,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestOptions {
    /// Replace an existing manifest and rewrite blobs that already exist
    pub force: bool,
}

/// What an ingest run found and wrote
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub files: usize,
    pub unique_blobs: usize,
    /// Files whose content was already seen earlier in the same run
    pub duplicate_files: usize,
    pub written: usize,
    pub overwritten: usize,
    /// Blobs left untouched because the vault already had them
    pub pre_existing: usize,
}

#[derive(Debug)]
pub struct IngestOutcome {
    pub vault: VerifiedVault,
    pub report: IngestReport,
}

/// Writes new content into a vault
#[derive(Debug, Clone)]
pub struct IngestEngine {
    builder: SnapshotBuilder,
    fanout: FanOut,
}

#[derive(Default)]
struct BlobCounters {
    claimed: DashSet<Digest>,
    written: AtomicUsize,
    overwritten: AtomicUsize,
    pre_existing: AtomicUsize,
}

impl IngestEngine {
    pub fn new(workers: usize) -> Self {
        Self {
            builder: SnapshotBuilder::new(ContentHasher::new(workers)),
            fanout: FanOut::new(workers),
        }
    }

    pub fn from_config(config: &VaultConfig) -> Self {
        Self::new(config.workers)
    }

    /// Ingest `source_dir` as `artifact`
    ///
    /// Every recorded path is relative to `source_dir`. Content is written
    /// at most once per digest per run. Without `force`, blobs already in the
    /// vault are left alone and an existing manifest is an error. Nothing is
    /// rolled back on failure.
    ///
    /// # Errors
    ///
    /// `InvalidInput` if the artifact path overlaps the blob directory or a
    /// file name cannot be recorded; `AlreadyIngested` if a manifest exists
    /// and `force` is off;
    /// `MissingResource` if `source_dir` does not exist; `Io` for read
    /// failures; `Database` for blob or manifest write failures.
    pub fn ingest(
        &self,
        store: &VaultStore,
        artifact: &ArtifactIdentity,
        source_dir: &Path,
        options: IngestOptions,
    ) -> Result<IngestOutcome> {
        log_op_start!("ingest", artifact = %artifact, path = %source_dir.display());
        let start = Instant::now();

        let outcome = self
            .ingest_impl(store, artifact, source_dir, options)
            .map_err(|e| {
                log_op_error!(
                    "ingest",
                    e,
                    duration_ms = start.elapsed().as_millis() as u64,
                    artifact = %artifact
                );
                e
            })?;

        log_op_end!(
            "ingest",
            duration_ms = start.elapsed().as_millis() as u64,
            artifact = %artifact,
            blob_count = outcome.report.unique_blobs
        );
        Ok(outcome)
    }

    fn ingest_impl(
        &self,
        store: &VaultStore,
        artifact: &ArtifactIdentity,
        source_dir: &Path,
        options: IngestOptions,
    ) -> Result<IngestOutcome> {
        store.check_artifact(artifact)?;
        if store.has_manifest(artifact) && !options.force {
            return Err(already_ingested(store, artifact));
        }

        let policy = WritePolicy::from_force(options.force);
        let counters = BlobCounters::default();
        let snapshot = self
            .builder
            .from_directory_relative(source_dir, |blob| {
                store_blob(store, blob, policy, &counters)
            })?;

        match store
            .save_manifest(artifact, &snapshot, policy)
            .map_err(|e| database_error("ingest", e))?
        {
            WriteOutcome::AlreadyExists => return Err(already_ingested(store, artifact)),
            WriteOutcome::Created | WriteOutcome::Replaced => {}
        }

        let report = IngestReport {
            files: snapshot.file_count(),
            unique_blobs: snapshot.blob_count(),
            duplicate_files: snapshot.file_count() - snapshot.blob_count(),
            written: counters.written.load(Ordering::SeqCst),
            overwritten: counters.overwritten.load(Ordering::SeqCst),
            pre_existing: counters.pre_existing.load(Ordering::SeqCst),
        };

        tracing::info!(
            component = module_path!(),
            op = "ingest",
            artifact = %artifact,
            files = report.files,
            unique_blobs = report.unique_blobs,
            duplicate_files = report.duplicate_files,
            written = report.written,
            overwritten = report.overwritten,
            pre_existing = report.pre_existing,
            "ingest summary"
        );

        let vault = VerifiedVault::from_snapshot(store.clone(), artifact.clone(), snapshot)
            .with_fanout(self.fanout.clone());
        Ok(IngestOutcome { vault, report })
    }
}

impl Default for IngestEngine {
    fn default() -> Self {
        Self {
            builder: SnapshotBuilder::default(),
            fanout: FanOut::default(),
        }
    }
}

/// Write one blob unless another worker already claimed its digest
fn store_blob(
    store: &VaultStore,
    blob: &Blob,
    policy: WritePolicy,
    counters: &BlobCounters,
) -> Result<()> {
    if !counters.claimed.insert(blob.digest().clone()) {
        return Ok(());
    }
    let outcome = store
        .write_blob(blob, policy)
        .map_err(|e| database_error("ingest", e).with_digest(blob.digest().as_str()))?;
    let counter = match outcome {
        WriteOutcome::Created => &counters.written,
        WriteOutcome::Replaced => &counters.overwritten,
        WriteOutcome::AlreadyExists => &counters.pre_existing,
    };
    counter.fetch_add(1, Ordering::SeqCst);
    Ok(())
}

fn already_ingested(store: &VaultStore, artifact: &ArtifactIdentity) -> ExError {
    ExError::new(ExErrorKind::AlreadyIngested)
        .with_op("ingest")
        .with_path(store.manifest_path(artifact))
        .with_message(format!(
            "{} already has a manifest; pass force to overwrite",
            artifact
        ))
}

//! Directory hashing
//!
//! [`ContentHasher`] walks a tree and hashes every regular file on a bounded
//! rayon pool. [`SnapshotBuilder`] composes a hasher with a path transform to
//! turn that output into a [`Snapshot`].
//!
//! Walk order is sorted by file name at every level and results are
//! collected in walk order, so the output is identical across runs for a
//! fixed filesystem state regardless of worker scheduling.

use crate::errors::{invalid_input, io_error, missing_resource, Result};
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use vaultkeep_core::{Blob, Digest, ExError, ExErrorKind, RelPath, Snapshot};
use walkdir::WalkDir;

/// One hashed regular file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashedFile {
    pub digest: Digest,
    /// Path as found during the walk (under the walked root)
    pub path: PathBuf,
    pub len: u64,
}

/// Hashes every regular file under a directory
#[derive(Debug, Clone)]
pub struct ContentHasher {
    workers: usize,
}

impl ContentHasher {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    /// Size the pool to the machine's available parallelism
    pub fn with_available_parallelism() -> Self {
        Self::new(
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        )
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Regular files under `root`, in deterministic walk order
    ///
    /// Symlinks are not followed and are not recorded.
    ///
    /// # Errors
    ///
    /// `MissingResource` if `root` is not a directory, `Io` if traversal fails.
    pub fn list_files(&self, root: &Path) -> Result<Vec<PathBuf>> {
        if !root.is_dir() {
            return Err(missing_resource("hash_tree", root)
                .with_message("source directory does not exist"));
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
                io_error("walk_dir", &path, e.into())
            })?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }

    /// Hash every regular file under `root`
    ///
    /// `sink` receives each file's verified content while it is in memory; it
    /// runs on pool threads and may be called concurrently. The first failure
    /// from reading or from `sink` aborts the whole operation.
    ///
    /// # Errors
    ///
    /// `MissingResource`, `Io`, or whatever `sink` returns.
    pub fn hash_tree<S>(&self, root: &Path, sink: S) -> Result<Vec<HashedFile>>
    where
        S: Fn(&Blob) -> Result<()> + Sync,
    {
        let files = self.list_files(root)?;
        let hashed = self.hash_files(&files, sink)?;
        tracing::debug!(
            component = module_path!(),
            root = %root.display(),
            files = hashed.len(),
            "hashed directory"
        );
        Ok(hashed)
    }

    /// Hash `files` in parallel, returning results in the same order
    ///
    /// # Errors
    ///
    /// `Io` if a file cannot be read, or whatever `sink` returns.
    pub fn hash_files<S>(&self, files: &[PathBuf], sink: S) -> Result<Vec<HashedFile>>
    where
        S: Fn(&Blob) -> Result<()> + Sync,
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|idx| format!("vaultkeep-hash-{}", idx))
            .build()
            .map_err(|e| {
                ExError::new(ExErrorKind::Internal)
                    .with_op("hash_tree")
                    .with_message(format!("failed to build hashing pool: {}", e))
            })?;

        pool.install(|| {
            files
                .par_iter()
                .map(|path| {
                    let data = fs::read(path).map_err(|e| io_error("hash_file", path, e))?;
                    let len = data.len() as u64;
                    let blob = Blob::new(data);
                    sink(&blob)?;
                    Ok(HashedFile {
                        digest: blob.digest().clone(),
                        path: path.clone(),
                        len,
                    })
                })
                .collect::<Result<Vec<_>>>()
        })
    }
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::with_available_parallelism()
    }
}

/// Builds snapshots from directories using a [`ContentHasher`]
#[derive(Debug, Clone, Default)]
pub struct SnapshotBuilder {
    hasher: ContentHasher,
}

impl SnapshotBuilder {
    pub fn new(hasher: ContentHasher) -> Self {
        Self { hasher }
    }

    pub fn hasher(&self) -> &ContentHasher {
        &self.hasher
    }

    /// Hash `root` and record each file under `transform(path)`
    ///
    /// `transform` receives the walked path and must return a relative path.
    /// Every recorded path is validated before any content is read, so a
    /// rejected tree never reaches `sink`.
    ///
    /// # Errors
    ///
    /// `InvalidInput` if `transform` yields an unsafe path, a name is not
    /// valid UTF-8, or two files map onto one recorded path; otherwise
    /// anything [`ContentHasher::hash_files`] returns.
    pub fn from_directory<T, S>(&self, root: &Path, transform: T, sink: S) -> Result<Snapshot>
    where
        T: Fn(&Path) -> PathBuf,
        S: Fn(&Blob) -> Result<()> + Sync,
    {
        let files = self.hasher.list_files(root)?;
        let recorded = files
            .iter()
            .map(|file| {
                RelPath::from_path(&transform(file.as_path())).map_err(|e| e.with_op("build_snapshot"))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut seen = HashSet::with_capacity(recorded.len());
        for (file, path) in files.iter().zip(&recorded) {
            if !seen.insert(path) {
                return Err(invalid_input(
                    "build_snapshot",
                    format!("two files are recorded as {}", path),
                )
                .with_path(file));
            }
        }

        let hashed = self.hasher.hash_files(&files, sink)?;
        tracing::debug!(
            component = module_path!(),
            root = %root.display(),
            files = hashed.len(),
            "hashed directory"
        );
        Snapshot::from_pairs(
            hashed
                .into_iter()
                .zip(recorded)
                .map(|(file, path)| (file.digest, path)),
        )
    }

    /// Hash `root`, recording paths relative to it
    ///
    /// # Errors
    ///
    /// Same as [`SnapshotBuilder::from_directory`].
    pub fn from_directory_relative<S>(&self, root: &Path, sink: S) -> Result<Snapshot>
    where
        S: Fn(&Blob) -> Result<()> + Sync,
    {
        self.from_directory(
            root,
            |path| path.strip_prefix(root).unwrap_or(path).to_path_buf(),
            sink,
        )
    }
}

//! Vault root and shared blob directory

use super::atomic::{write_file, WriteOutcome, WritePolicy};
use super::content::{check_file, read_verified};
use crate::config::VaultConfig;
use crate::errors::{invalid_input, io_error, Result};
use std::fs;
use std::path::{Component, Path, PathBuf};
use vaultkeep_core::{Blob, Digest};

/// Blob directory name under the vault root unless configured otherwise
pub const DEFAULT_BLOB_SUBDIR: &str = "blobs";

/// The on-disk vault: one blob file per unique digest plus per-artifact
/// manifests.
///
/// ```text
/// <root>/
///   blobs/<digest_hex>
///   <artifact path>/blobs.json
/// ```
///
/// Cheap to clone; holds only paths. No process-wide instance exists; build
/// one from a [`VaultConfig`] or directly from a root path.
#[derive(Debug, Clone)]
pub struct VaultStore {
    root: PathBuf,
    blob_dir: PathBuf,
    legacy_install_dir: Option<PathBuf>,
}

impl VaultStore {
    /// Open (creating if needed) a vault with the default blob directory
    ///
    /// # Errors
    ///
    /// `Io` if the directories cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        Self::open_with_subdir(root, DEFAULT_BLOB_SUBDIR)
    }

    /// Open (creating if needed) a vault whose blobs live in `blob_subdir`
    ///
    /// # Errors
    ///
    /// `InvalidInput` if `blob_subdir` is absolute or does not resolve to a
    /// descendant of `root`; `Io` if the directories cannot be created.
    pub fn open_with_subdir(root: impl Into<PathBuf>, blob_subdir: impl AsRef<Path>) -> Result<Self> {
        let root = normalize_lexically(&root.into());
        let blob_subdir = blob_subdir.as_ref();

        if blob_subdir.is_absolute() || blob_subdir.has_root() {
            return Err(invalid_input(
                "open_vault",
                format!(
                    "blob directory must be relative to the vault root, got {}",
                    blob_subdir.display()
                ),
            ));
        }

        let blob_dir = normalize_lexically(&root.join(blob_subdir));
        if blob_dir == root || !blob_dir.starts_with(&root) {
            return Err(invalid_input(
                "open_vault",
                format!(
                    "blob directory {} escapes vault root {}",
                    blob_dir.display(),
                    root.display()
                ),
            ));
        }

        fs::create_dir_all(&blob_dir).map_err(|e| io_error("open_vault", &blob_dir, e))?;

        tracing::debug!(
            component = module_path!(),
            root = %root.display(),
            blob_dir = %blob_dir.display(),
            "vault opened"
        );

        Ok(Self {
            root,
            blob_dir,
            legacy_install_dir: None,
        })
    }

    /// Open the vault described by `config`
    ///
    /// # Errors
    ///
    /// Same as [`VaultStore::open_with_subdir`].
    pub fn from_config(config: &VaultConfig) -> Result<Self> {
        let store = Self::open_with_subdir(&config.root, &config.blob_subdir)?;
        Ok(store.with_legacy_install_dir(config.legacy_install_dir.clone()))
    }

    /// Directory legacy manifests' absolute paths are rebased against
    pub fn with_legacy_install_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.legacy_install_dir = dir;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn blob_dir(&self) -> &Path {
        &self.blob_dir
    }

    pub(crate) fn legacy_install_dir(&self) -> Option<&Path> {
        self.legacy_install_dir.as_deref()
    }

    /// Location of the blob file for `digest`
    pub fn blob_path(&self, digest: &Digest) -> PathBuf {
        self.blob_dir.join(digest.as_str())
    }

    pub fn has_blob(&self, digest: &Digest) -> bool {
        self.blob_path(digest).is_file()
    }

    /// Read a blob and verify its content
    ///
    /// # Errors
    ///
    /// `MissingResource` if no blob file exists, `IntegrityMismatch` if the
    /// stored content no longer hashes to `digest`.
    pub fn read_blob(&self, digest: &Digest) -> Result<Blob> {
        read_verified(&self.blob_path(digest), digest).map_err(|e| e.with_op("read_blob"))
    }

    /// Re-hash a stored blob without holding it in memory
    ///
    /// # Errors
    ///
    /// Same as [`VaultStore::read_blob`].
    pub fn check_blob(&self, digest: &Digest) -> Result<()> {
        check_file(&self.blob_path(digest), digest)
    }

    /// Store a blob under its digest
    ///
    /// # Errors
    ///
    /// `Io` if the write fails.
    pub fn write_blob(&self, blob: &Blob, policy: WritePolicy) -> Result<WriteOutcome> {
        write_file(&self.blob_path(blob.digest()), blob.data(), policy)
    }

    /// Delete a blob file; `Ok(false)` if it was already gone
    ///
    /// # Errors
    ///
    /// `Io` for any failure other than the file being absent.
    pub fn remove_blob(&self, digest: &Digest) -> Result<bool> {
        remove_if_exists(&self.blob_path(digest))
    }
}

pub(crate) fn remove_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(io_error("remove_file", path, e)),
    }
}

/// Resolve `.` and `..` without touching the filesystem
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use vaultkeep_core::ExErrorKind;

    fn setup_store() -> (VaultStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = VaultStore::open(temp_dir.path().join("vault")).unwrap();
        (store, temp_dir)
    }

    #[test]
    fn test_open_creates_blob_dir() {
        let (store, _dir) = setup_store();
        assert!(store.blob_dir().is_dir());
        assert!(store.blob_dir().ends_with(DEFAULT_BLOB_SUBDIR));
    }

    #[test]
    fn test_absolute_subdir_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let err = VaultStore::open_with_subdir(temp_dir.path(), temp_dir.path().join("abs"))
            .unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidInput);
    }

    #[test]
    fn test_escaping_subdir_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("vault");
        for sub in ["../outside", "a/../../outside", ".", "a/.."] {
            let err = VaultStore::open_with_subdir(&root, sub).unwrap_err();
            assert_eq!(err.kind(), ExErrorKind::InvalidInput, "subdir {:?}", sub);
        }
        assert!(!temp_dir.path().join("outside").exists());
    }

    #[test]
    fn test_nested_subdir_allowed() {
        let temp_dir = TempDir::new().unwrap();
        let store = VaultStore::open_with_subdir(temp_dir.path(), "data/./blobs").unwrap();
        assert_eq!(store.blob_dir(), temp_dir.path().join("data").join("blobs"));
    }

    #[test]
    fn test_blob_write_read_roundtrip() {
        let (store, _dir) = setup_store();
        let blob = Blob::new(b"Hello, vault!".to_vec());

        store.write_blob(&blob, WritePolicy::CreateNew).unwrap();

        assert!(store.has_blob(blob.digest()));
        let read = store.read_blob(blob.digest()).unwrap();
        assert_eq!(read, blob);
        store.check_blob(blob.digest()).unwrap();
    }

    #[test]
    fn test_read_missing_blob() {
        let (store, _dir) = setup_store();
        let err = store.read_blob(&Digest::of_bytes(b"absent")).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::MissingResource);
        assert_eq!(err.op(), Some("read_blob"));
    }

    #[test]
    fn test_read_corrupt_blob() {
        let (store, _dir) = setup_store();
        let blob = Blob::new(b"original".to_vec());
        store.write_blob(&blob, WritePolicy::CreateNew).unwrap();
        fs::write(store.blob_path(blob.digest()), b"changed").unwrap();

        let err = store.read_blob(blob.digest()).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::IntegrityMismatch);
        assert_eq!(err.digest(), Some(blob.digest().as_str()));
    }

    #[test]
    fn test_remove_blob_tolerates_absence() {
        let (store, _dir) = setup_store();
        let blob = Blob::new(b"gone soon".to_vec());
        store.write_blob(&blob, WritePolicy::CreateNew).unwrap();

        assert!(store.remove_blob(blob.digest()).unwrap());
        assert!(!store.remove_blob(blob.digest()).unwrap());
        assert!(!store.has_blob(blob.digest()));
    }

    #[test]
    fn test_normalize_lexically() {
        assert_eq!(
            normalize_lexically(Path::new("/a/b/../c/./d")),
            PathBuf::from("/a/c/d")
        );
    }
}

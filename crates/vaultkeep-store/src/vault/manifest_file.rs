//! Per-artifact manifest files

use super::atomic::{write_file, WriteOutcome, WritePolicy};
use super::store::{remove_if_exists, VaultStore};
use crate::errors::{invalid_input, io_error, missing_version, Result};
use std::fs;
use std::path::PathBuf;
use vaultkeep_core::snapshot::codec::{self, DecodeOptions};
use vaultkeep_core::{ArtifactIdentity, DecodedManifest, Snapshot};

/// File name of every manifest, inside the artifact's storage path
pub const MANIFEST_FILE_NAME: &str = "blobs.json";

impl VaultStore {
    /// `<root>/<artifact path>/blobs.json`
    pub fn manifest_path(&self, artifact: &ArtifactIdentity) -> PathBuf {
        artifact
            .path
            .resolve_under(self.root())
            .join(MANIFEST_FILE_NAME)
    }

    /// Reject an artifact whose storage path overlaps the blob directory
    ///
    /// # Errors
    ///
    /// `InvalidInput` if the manifest would land inside the blob directory
    /// or the blob directory inside the artifact's manifest file.
    pub fn check_artifact(&self, artifact: &ArtifactIdentity) -> Result<()> {
        let manifest = self.manifest_path(artifact);
        if manifest.starts_with(self.blob_dir()) || self.blob_dir().starts_with(&manifest) {
            return Err(invalid_input(
                "check_artifact",
                format!(
                    "artifact path {} overlaps the blob directory {}",
                    artifact.path,
                    self.blob_dir().display()
                ),
            )
            .with_path(manifest));
        }
        Ok(())
    }

    pub fn has_manifest(&self, artifact: &ArtifactIdentity) -> bool {
        self.manifest_path(artifact).is_file()
    }

    /// Load and decode the manifest stored for `artifact`
    ///
    /// # Errors
    ///
    /// `InvalidInput` if the artifact overlaps the blob directory;
    /// `MissingVersion` if no manifest exists; `InvalidManifest` or
    /// `UnsupportedSchema` if it cannot be decoded; `Io` otherwise.
    pub fn load_manifest(&self, artifact: &ArtifactIdentity) -> Result<DecodedManifest> {
        self.check_artifact(artifact)?;
        let path = self.manifest_path(artifact);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(missing_version(&artifact.to_string(), &path))
            }
            Err(e) => return Err(io_error("load_manifest", &path, e)),
        };

        let options = DecodeOptions {
            legacy_install_dir: self.legacy_install_dir().map(PathBuf::from),
        };
        let decoded = codec::decode(&bytes, &options).map_err(|e| e.with_path(&path))?;
        if decoded.is_legacy() {
            tracing::warn!(
                component = module_path!(),
                artifact = %artifact,
                path = %path.display(),
                "manifest uses legacy schema 0; re-ingest to upgrade"
            );
        }
        Ok(decoded)
    }

    /// Encode and persist the manifest for `artifact`
    ///
    /// # Errors
    ///
    /// `InvalidInput` if the artifact overlaps the blob directory,
    /// `Serialization` if encoding fails, `Io` if the write fails.
    pub fn save_manifest(
        &self,
        artifact: &ArtifactIdentity,
        snapshot: &Snapshot,
        policy: WritePolicy,
    ) -> Result<WriteOutcome> {
        self.check_artifact(artifact)?;
        let bytes = codec::encode(snapshot)?;
        write_file(&self.manifest_path(artifact), &bytes, policy)
    }

    /// Delete the manifest; `Ok(false)` if it was already gone
    ///
    /// # Errors
    ///
    /// `Io` for any failure other than absence.
    pub fn remove_manifest(&self, artifact: &ArtifactIdentity) -> Result<bool> {
        self.check_artifact(artifact)?;
        remove_if_exists(&self.manifest_path(artifact))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use vaultkeep_core::{Digest, ExErrorKind, RelPath};

    fn artifact() -> ArtifactIdentity {
        artifact_at("game/1.0")
    }

    fn artifact_at(path: &str) -> ArtifactIdentity {
        ArtifactIdentity::new("game", "1.0", RelPath::new(path).unwrap())
    }

    fn snapshot() -> Snapshot {
        Snapshot::from_pairs(vec![(
            Digest::of_bytes(b"hello"),
            RelPath::new("a.txt").unwrap(),
        )])
        .unwrap()
    }

    #[test]
    fn test_manifest_path_layout() {
        let dir = TempDir::new().unwrap();
        let store = VaultStore::open(dir.path()).unwrap();
        assert_eq!(
            store.manifest_path(&artifact()),
            dir.path().join("game").join("1.0").join("blobs.json")
        );
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = VaultStore::open(dir.path()).unwrap();

        let outcome = store
            .save_manifest(&artifact(), &snapshot(), WritePolicy::CreateNew)
            .unwrap();

        assert_eq!(outcome, WriteOutcome::Created);
        assert!(store.has_manifest(&artifact()));
        let loaded = store.load_manifest(&artifact()).unwrap();
        assert_eq!(loaded.snapshot, snapshot());
    }

    #[test]
    fn test_load_absent_manifest_is_missing_version() {
        let dir = TempDir::new().unwrap();
        let store = VaultStore::open(dir.path()).unwrap();

        let err = store.load_manifest(&artifact()).unwrap_err();

        assert_eq!(err.kind(), ExErrorKind::MissingVersion);
        assert!(err.is_not_found());
    }

    #[test]
    fn test_corrupt_manifest_names_file() {
        let dir = TempDir::new().unwrap();
        let store = VaultStore::open(dir.path()).unwrap();
        let path = store.manifest_path(&artifact());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"{\"schema\": 9, \"blobs\": {}}").unwrap();

        let err = store.load_manifest(&artifact()).unwrap_err();

        assert_eq!(err.kind(), ExErrorKind::UnsupportedSchema);
        assert!(err.path().unwrap().ends_with("blobs.json"));
    }

    #[test]
    fn test_legacy_manifest_rebased_with_install_dir() {
        let dir = TempDir::new().unwrap();
        let store = VaultStore::open(dir.path())
            .unwrap()
            .with_legacy_install_dir(Some(PathBuf::from("/games/install")));
        let path = store.manifest_path(&artifact());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let digest = Digest::of_bytes(b"hello");
        fs::write(
            &path,
            format!(r#"{{"{}":["/games/install/data/a.txt"]}}"#, digest),
        )
        .unwrap();

        let loaded = store.load_manifest(&artifact()).unwrap();

        assert_eq!(loaded.source_schema, 0);
        let paths = loaded.snapshot.paths(&digest).unwrap();
        assert!(paths.contains(&RelPath::new("data/a.txt").unwrap()));
    }

    #[test]
    fn test_artifact_inside_blob_dir_is_rejected() {
        let dir = TempDir::new().unwrap();
        let store = VaultStore::open(dir.path()).unwrap();

        for path in ["blobs", "blobs/game"] {
            let inside = artifact_at(path);
            let err = store
                .save_manifest(&inside, &snapshot(), WritePolicy::CreateNew)
                .unwrap_err();
            assert_eq!(err.kind(), ExErrorKind::InvalidInput, "{}", path);
            assert_eq!(err.op(), Some("check_artifact"));
            assert_eq!(
                store.load_manifest(&inside).unwrap_err().kind(),
                ExErrorKind::InvalidInput
            );
        }
        assert_eq!(fs::read_dir(store.blob_dir()).unwrap().count(), 0);
    }

    #[test]
    fn test_blob_dir_inside_manifest_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let store = VaultStore::open_with_subdir(dir.path(), "game/blobs.json").unwrap();

        let err = store.check_artifact(&artifact_at("game")).unwrap_err();

        assert_eq!(err.kind(), ExErrorKind::InvalidInput);
        assert!(store.check_artifact(&artifact()).is_ok());
    }

    #[test]
    fn test_remove_manifest() {
        let dir = TempDir::new().unwrap();
        let store = VaultStore::open(dir.path()).unwrap();
        store
            .save_manifest(&artifact(), &snapshot(), WritePolicy::CreateNew)
            .unwrap();

        assert!(store.remove_manifest(&artifact()).unwrap());
        assert!(!store.remove_manifest(&artifact()).unwrap());
    }
}

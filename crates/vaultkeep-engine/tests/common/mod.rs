#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use vaultkeep_core::{ArtifactIdentity, RelPath};
use vaultkeep_engine::{IngestEngine, IngestOptions, VerifiedVault};
use vaultkeep_store::VaultStore;

pub struct Fixture {
    pub dir: TempDir,
    pub store: VaultStore,
    pub engine: IngestEngine,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let store = VaultStore::open(dir.path().join("vault")).unwrap();
        Self {
            dir,
            store,
            engine: IngestEngine::new(4),
        }
    }

    /// Create `source/<name>` files with the given contents
    pub fn source(&self, name: &str, files: &[(&str, &[u8])]) -> PathBuf {
        let root = self.dir.path().join("sources").join(name);
        for (rel, content) in files {
            let path = root.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, content).unwrap();
        }
        fs::create_dir_all(&root).unwrap();
        root
    }

    pub fn ingest(&self, artifact: &ArtifactIdentity, source: &Path) -> VerifiedVault {
        self.engine
            .ingest(&self.store, artifact, source, IngestOptions::default())
            .unwrap()
            .vault
    }

    pub fn dest(&self, name: &str) -> PathBuf {
        self.dir.path().join("exports").join(name)
    }

    pub fn blob_file_count(&self) -> usize {
        fs::read_dir(self.store.blob_dir()).unwrap().count()
    }
}

pub fn artifact(version: &str) -> ArtifactIdentity {
    ArtifactIdentity::new(
        "game",
        version,
        RelPath::new(format!("game/{}", version)).unwrap(),
    )
}

pub fn sample_files() -> Vec<(&'static str, &'static [u8])> {
    vec![
        ("a.txt", b"hello".as_slice()),
        ("b.txt", b"hello".as_slice()),
        ("data/level1.bin", b"\x00\x01\x02level".as_slice()),
        ("data/nested/readme.md", b"# readme".as_slice()),
        ("empty.dat", b"".as_slice()),
    ]
}

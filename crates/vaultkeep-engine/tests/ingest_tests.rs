#![allow(clippy::unwrap_used, clippy::expect_used)]

// Integration tests for ingest: dedup, idempotence, overwrite policy

mod common;

use common::{artifact, sample_files, Fixture};
use std::collections::BTreeSet;
use std::fs;
use vaultkeep_core::{ArtifactIdentity, Digest, ExErrorKind, RelPath};
use vaultkeep_engine::{IngestOptions, VerifiedVault};
use vaultkeep_store::vault::MANIFEST_FILE_NAME;

#[test]
fn test_hello_scenario() {
    // Given: a.txt and b.txt both containing "hello"
    let fx = Fixture::new();
    let source = fx.source("hello", &[("a.txt", b"hello"), ("b.txt", b"hello")]);
    let id = artifact("1.0");

    // When: the directory is ingested
    let outcome = fx
        .engine
        .ingest(&fx.store, &id, &source, IngestOptions::default())
        .unwrap();

    // Then: one digest maps to both paths
    let d = Digest::of_bytes(b"hello");
    let snapshot = outcome.vault.snapshot();
    assert_eq!(snapshot.blob_count(), 1);
    let paths: BTreeSet<&str> = snapshot.paths(&d).unwrap().iter().map(|p| p.as_str()).collect();
    assert_eq!(paths, BTreeSet::from(["a.txt", "b.txt"]));

    // And: exactly one blob file exists, named by the digest
    assert_eq!(fx.blob_file_count(), 1);
    assert_eq!(fs::read(fx.store.blob_path(&d)).unwrap(), b"hello");

    // And: the manifest has the documented shape
    let manifest = fx.dir.path().join("vault/game/1.0").join(MANIFEST_FILE_NAME);
    let value: serde_json::Value = serde_json::from_slice(&fs::read(manifest).unwrap()).unwrap();
    assert_eq!(value["schema"], 1);
    let listed: BTreeSet<&str> = value["blobs"][d.as_str()]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert_eq!(listed, BTreeSet::from(["a.txt", "b.txt"]));

    // And: the report counts the duplicate
    assert_eq!(outcome.report.files, 2);
    assert_eq!(outcome.report.unique_blobs, 1);
    assert_eq!(outcome.report.duplicate_files, 1);
    assert_eq!(outcome.report.written, 1);
}

#[test]
fn test_second_ingest_without_force_is_rejected() {
    // Given: an ingested artifact
    let fx = Fixture::new();
    let source = fx.source("v1", &sample_files());
    let id = artifact("1.0");
    fx.ingest(&id, &source);
    let blobs_before = fx.blob_file_count();

    // When: new content is ingested under the same identity without force
    fs::write(source.join("new.txt"), b"brand new content").unwrap();
    let err = fx
        .engine
        .ingest(&fx.store, &id, &source, IngestOptions::default())
        .unwrap_err();

    // Then: the ingest is refused and nothing new is written
    assert_eq!(err.kind(), ExErrorKind::AlreadyIngested);
    assert_eq!(fx.blob_file_count(), blobs_before);
    assert!(!fx.store.has_blob(&Digest::of_bytes(b"brand new content")));
}

#[test]
fn test_force_replaces_manifest_and_blobs() {
    // Given: an ingested artifact
    let fx = Fixture::new();
    let source = fx.source("v1", &[("a.txt", b"one")]);
    let id = artifact("1.0");
    fx.ingest(&id, &source);

    // When: the source changes and ingest is forced
    fs::write(source.join("b.txt"), b"two").unwrap();
    let outcome = fx
        .engine
        .ingest(&fx.store, &id, &source, IngestOptions { force: true })
        .unwrap();

    // Then: the existing blob is overwritten and the new one written
    assert_eq!(outcome.report.overwritten, 1);
    assert_eq!(outcome.report.written, 1);
    let reloaded = VerifiedVault::open(fx.store.clone(), id).unwrap();
    assert_eq!(reloaded.snapshot().file_count(), 2);
}

#[test]
fn test_shared_blobs_counted_as_pre_existing() {
    // Given: version 1.0 already in the vault
    let fx = Fixture::new();
    let v1 = fx.source("v1", &[("a.txt", b"shared"), ("b.txt", b"only in v1")]);
    fx.ingest(&artifact("1.0"), &v1);

    // When: version 1.1 with overlapping content is ingested
    let v11 = fx.source("v11", &[("a.txt", b"shared"), ("c.txt", b"only in v1.1")]);
    let outcome = fx
        .engine
        .ingest(&fx.store, &artifact("1.1"), &v11, IngestOptions::default())
        .unwrap();

    // Then: the shared blob is reused
    assert_eq!(outcome.report.pre_existing, 1);
    assert_eq!(outcome.report.written, 1);
    assert_eq!(fx.blob_file_count(), 3);
}

#[test]
fn test_ingest_round_trips_through_manifest() {
    // Given: an ingested tree
    let fx = Fixture::new();
    let source = fx.source("v1", &sample_files());
    let id = artifact("1.0");
    let vault = fx.ingest(&id, &source);

    // When: the manifest is loaded back
    let reopened = VerifiedVault::open(fx.store.clone(), id).unwrap();

    // Then: the snapshots are structurally equal
    assert_eq!(reopened.snapshot(), vault.snapshot());
    assert_eq!(vault.snapshot().file_count(), sample_files().len());
}

#[test]
fn test_missing_source_directory() {
    let fx = Fixture::new();
    let err = fx
        .engine
        .ingest(
            &fx.store,
            &artifact("1.0"),
            &fx.dir.path().join("does-not-exist"),
            IngestOptions::default(),
        )
        .unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::MissingResource);
    assert!(!fx.store.has_manifest(&artifact("1.0")));
}

#[test]
fn test_open_without_manifest_is_missing_version() {
    let fx = Fixture::new();
    let err = VerifiedVault::open(fx.store.clone(), artifact("9.9")).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::MissingVersion);
}

#[cfg(unix)]
#[test]
fn test_unusual_file_names_round_trip() {
    // Given: a backslash inside a file name next to a same-looking nested file,
    // plus names with spaces and non-ASCII characters
    let fx = Fixture::new();
    let files: Vec<(&str, &[u8])> = vec![
        ("plain.txt", b"plain".as_slice()),
        ("a\\b.txt", b"flat name with a backslash".as_slice()),
        ("a/b.txt", b"nested file".as_slice()),
        ("with space/file name.txt", b"spaced".as_slice()),
        ("données/été.txt", b"accents".as_slice()),
    ];
    let source = fx.source("unusual", &files);
    let id = artifact("1.0");

    // When: the tree is ingested
    let vault = fx.ingest(&id, &source);

    // Then: every name is recorded as it appears on disk
    let recorded: BTreeSet<&str> = vault.snapshot().entries().map(|(_, p)| p.as_str()).collect();
    let expected: BTreeSet<&str> = files.iter().map(|(rel, _)| *rel).collect();
    assert_eq!(recorded, expected);
    assert_eq!(vault.verify_directory(&source, false).unwrap(), files.len());

    // And: a reloaded manifest exports the same bytes under the same names
    let reopened = VerifiedVault::open(fx.store.clone(), id).unwrap();
    let dest = fx.dest("unusual");
    reopened.export(&dest, true).unwrap();
    assert_eq!(reopened.verify_directory(&dest, true).unwrap(), files.len());
    for (rel, content) in &files {
        assert_eq!(fs::read(dest.join(rel)).unwrap(), *content, "{}", rel);
    }
    assert!(dest.join("a").join("b.txt").is_file());
    assert!(dest.join("a\\b.txt").is_file());
}

#[cfg(unix)]
#[test]
fn test_non_utf8_name_fails_before_any_blob_is_written() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    // Given: a tree where one file name is not valid UTF-8
    let fx = Fixture::new();
    let source = fx.source("bad-name", &[("good.txt", b"fine")]);
    if fs::write(source.join(OsStr::from_bytes(b"bad\xff.bin")), b"bytes").is_err() {
        return;
    }

    // When: the tree is ingested
    let err = fx
        .engine
        .ingest(&fx.store, &artifact("1.0"), &source, IngestOptions::default())
        .unwrap_err();

    // Then: the ingest is refused without touching the vault
    assert_eq!(err.kind(), ExErrorKind::InvalidInput);
    assert_eq!(fx.blob_file_count(), 0);
    assert!(!fx.store.has_manifest(&artifact("1.0")));
}

#[test]
fn test_artifact_stored_in_blob_dir_is_refused() {
    // Given: an artifact whose storage path is the blob directory itself
    let fx = Fixture::new();
    let source = fx.source("v1", &sample_files());
    let id = ArtifactIdentity::new("game", "1.0", RelPath::new("blobs").unwrap());

    // When: it is ingested
    let err = fx
        .engine
        .ingest(&fx.store, &id, &source, IngestOptions::default())
        .unwrap_err();

    // Then: nothing lands in the blob directory
    assert_eq!(err.kind(), ExErrorKind::InvalidInput);
    assert_eq!(fx.blob_file_count(), 0);
    assert!(!fx.store.blob_dir().join(MANIFEST_FILE_NAME).exists());
}

#![allow(clippy::unwrap_used, clippy::expect_used)]

//! CLI integration tests
//!
//! Drive the `vaultkeep` binary end to end against a temporary vault.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

struct Env {
    dir: TempDir,
    config: PathBuf,
}

impl Env {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("vaultkeep.toml");
        let root = dir.path().join("vault");
        fs::write(
            &config,
            format!(
                r#"
[vault]
root = "{}"
workers = 2

[[artifact]]
name = "game"
version = "1.0"
path = "game/1.0"

[[artifact]]
name = "game"
version = "0.9-beta"
path = "game/0.9-beta"
blocked = "only public branches may be downloaded"
"#,
                root.display().to_string().replace('\\', "/")
            ),
        )
        .unwrap();
        Self { dir, config }
    }

    fn source(&self) -> PathBuf {
        let source = self.dir.path().join("source");
        fs::create_dir_all(source.join("data")).unwrap();
        fs::write(source.join("a.txt"), b"hello").unwrap();
        fs::write(source.join("b.txt"), b"hello").unwrap();
        fs::write(source.join("data/level.bin"), b"level data").unwrap();
        source
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_vaultkeep"))
            .arg("--config")
            .arg(&self.config)
            .args(args)
            .env_remove("VAULTKEEP_HOME")
            .output()
            .expect("Failed to execute CLI")
    }
}

fn path_arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "CLI command should succeed. Stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn test_cli_ingest_export_verify() {
    // Given: a config with a catalog and a source tree
    let env = Env::new();
    let source = env.source();

    // When: the tree is ingested under a catalog version
    let output = env.run(&["ingest", "--version", "1.0", "--source", path_arg(&source)]);

    // Then: the report counts the duplicate file
    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("unique_blobs: 2"), "{}", stdout);
    assert!(stdout.contains("duplicate_files: 1"), "{}", stdout);

    // When: it is exported and the export verified
    let dest = env.dir.path().join("out");
    assert_success(&env.run(&["export", "--version", "1.0", "--dest", path_arg(&dest)]));
    let output = env.run(&["verify", "--version", "1.0", "--dir", path_arg(&dest)]);

    // Then: the exported tree matches the source
    assert_success(&output);
    assert_eq!(fs::read(dest.join("b.txt")).unwrap(), b"hello");
    assert_eq!(fs::read(dest.join("data/level.bin")).unwrap(), b"level data");
}

#[test]
fn test_cli_second_ingest_fails_without_force() {
    let env = Env::new();
    let source = env.source();
    assert_success(&env.run(&["ingest", "--version", "1.0", "--source", path_arg(&source)]));

    let output = env.run(&["ingest", "--version", "1.0", "--source", path_arg(&source)]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERR_ALREADY_INGESTED"), "{}", stderr);

    let output = env.run(&[
        "ingest", "--version", "1.0", "--source", path_arg(&source), "--force",
    ]);
    assert_success(&output);
    assert!(String::from_utf8_lossy(&output.stdout).contains("overwritten: 2"));
}

#[test]
fn test_cli_verify_reports_corruption() {
    // Given: an ingested version with a tampered blob
    let env = Env::new();
    let source = env.source();
    assert_success(&env.run(&["ingest", "--version", "1.0", "--source", path_arg(&source)]));
    let blobs = env.dir.path().join("vault/blobs");
    let victim = fs::read_dir(&blobs).unwrap().next().unwrap().unwrap().path();
    fs::write(&victim, b"tampered").unwrap();

    // When: every stored version is verified
    let output = env.run(&["verify", "--all"]);

    // Then: the command fails naming the bad digest
    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let digest = victim.file_name().unwrap().to_str().unwrap();
    assert!(stdout.contains(digest), "{}", stdout);
}

#[test]
fn test_cli_unknown_version() {
    let env = Env::new();
    let output = env.run(&["show", "--version", "7.7"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("ERR_UNKNOWN_VERSION"));
}

#[test]
fn test_cli_purge_requires_confirmation() {
    // Given: an ingested version
    let env = Env::new();
    let source = env.source();
    assert_success(&env.run(&["ingest", "--version", "1.0", "--source", path_arg(&source)]));

    // When: purge runs without the confirmation flag
    let refused = env.run(&["purge", "--version", "1.0"]);

    // Then: nothing is deleted
    assert!(!refused.status.success());
    assert_success(&env.run(&["show", "--version", "1.0"]));

    // When: purge is confirmed
    let output = env.run(&["purge", "--version", "1.0", "--confirm-shared-blobs"]);

    // Then: the version is gone
    assert_success(&output);
    assert!(String::from_utf8_lossy(&output.stdout).contains("blobs_removed: 2"));
    assert!(!env.run(&["show", "--version", "1.0"]).status.success());
}

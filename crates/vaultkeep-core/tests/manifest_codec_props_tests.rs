#![allow(clippy::unwrap_used, clippy::expect_used)]

use proptest::collection::{btree_map, vec};
use proptest::prelude::*;
use std::collections::BTreeMap;
use vaultkeep_core::snapshot::codec::{decode, encode, DecodeOptions};
use vaultkeep_core::{Digest, RelPath, Snapshot};

/// One file name: spaces, non-ASCII and (where the platform allows it)
/// backslashes are ordinary characters
fn segment_strategy() -> impl Strategy<Value = String> {
    let pattern: &'static str = if cfg!(windows) {
        "[a-zA-Z0-9_ \\-éü漢]{1,6}(\\.[a-z]{1,3})?"
    } else {
        "[a-zA-Z0-9_ \\\\\\-éü漢]{1,6}(\\.[a-z]{1,3})?"
    };
    pattern
}

fn path_strategy() -> impl Strategy<Value = String> {
    vec(segment_strategy(), 1..4).prop_map(|segments| segments.join("/"))
}

/// Paths mapped to a small content alphabet, so many paths share a digest
fn snapshot_strategy() -> impl Strategy<Value = Snapshot> {
    btree_map(path_strategy(), 0u8..8, 0..40).prop_map(|entries: BTreeMap<String, u8>| {
        Snapshot::from_pairs(
            entries
                .into_iter()
                .map(|(path, content)| (Digest::of_bytes(&[content]), RelPath::new(path).unwrap())),
        )
        .unwrap()
    })
}

proptest! {
    #[test]
    fn prop_unusual_names_survive_encoding(path in path_strategy()) {
        let rel = RelPath::new(path.clone()).unwrap();
        let snapshot = Snapshot::from_pairs(vec![(Digest::of_bytes(b"x"), rel)]).unwrap();
        let decoded = decode(&encode(&snapshot).unwrap(), &DecodeOptions::default()).unwrap();
        let recorded: Vec<&str> = decoded.snapshot.entries().map(|(_, p)| p.as_str()).collect();
        prop_assert_eq!(recorded, vec![path.as_str()]);
    }

    #[test]
    fn prop_decode_inverts_encode(snapshot in snapshot_strategy()) {
        let bytes = encode(&snapshot).unwrap();
        let decoded = decode(&bytes, &DecodeOptions::default()).unwrap();
        prop_assert_eq!(&decoded.snapshot, &snapshot);
        prop_assert!(!decoded.is_legacy());
    }

    #[test]
    fn prop_encoding_is_deterministic(snapshot in snapshot_strategy()) {
        let first = encode(&snapshot).unwrap();
        let second = encode(&snapshot.clone()).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_insertion_order_does_not_change_bytes(snapshot in snapshot_strategy()) {
        let mut pairs: Vec<(Digest, RelPath)> = snapshot
            .entries()
            .map(|(d, p)| (d.clone(), p.clone()))
            .collect();
        pairs.reverse();
        let rebuilt = Snapshot::from_pairs(pairs).unwrap();
        prop_assert_eq!(encode(&rebuilt).unwrap(), encode(&snapshot).unwrap());
    }
}

#[test]
fn test_concrete_hello_manifest() {
    // Given a.txt and b.txt both containing "hello"
    let hello = Digest::of_bytes(b"hello");
    let snapshot = Snapshot::from_pairs(vec![
        (hello.clone(), RelPath::new("a.txt").unwrap()),
        (hello.clone(), RelPath::new("b.txt").unwrap()),
    ])
    .unwrap();

    // When encoded
    let value: serde_json::Value = serde_json::from_slice(&encode(&snapshot).unwrap()).unwrap();

    // Then one digest maps to both paths
    assert_eq!(value["schema"], 1);
    let blobs = value["blobs"].as_object().unwrap();
    assert_eq!(blobs.len(), 1);
    let paths = blobs[hello.as_str()].as_array().unwrap();
    assert_eq!(paths.len(), 2);
}

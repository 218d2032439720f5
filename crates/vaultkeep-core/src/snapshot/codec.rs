//! Schema-versioned manifest codec
//!
//! Schema 1 is the only shape ever written:
//!
//! ```text
//! {
//!   "schema": 1,
//!   "blobs": { "<digest>": ["<path>", ...], ... }
//! }
//! ```
//!
//! Digest keys and path arrays are emitted in ascending order, so equal
//! snapshots always encode to identical bytes.
//!
//! A document without a `schema` tag is a legacy schema-0 manifest: a flat
//! digest → path-array map whose paths may be absolute under the install
//! directory of the tool that wrote them. Legacy documents are imported on a
//! best-effort basis and always reported through
//! [`DecodedManifest::source_schema`].

use super::Snapshot;
use crate::errors::{ExError, ExErrorKind};
use crate::model::{Digest, RelPath};
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Schema version written by [`encode`]
pub const CURRENT_SCHEMA: u32 = 1;

/// Manifest-level parse and validation failures
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("malformed manifest document: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("manifest schema {found} is newer than supported schema {supported}")]
    UnsupportedSchema { found: i64, supported: u32 },

    #[error("manifest schema {0} is not a valid schema version")]
    InvalidSchema(i64),

    #[error("manifest has a blobs section but no schema tag")]
    MissingSchema,

    #[error("schema {schema} manifest has no blobs section")]
    MissingBlobs { schema: i64 },

    #[error("unexpected top-level field '{0}' in schema 1 manifest")]
    UnexpectedField(String),

    #[error("'{key}' is not a valid digest")]
    InvalidDigest { key: String },

    #[error("unsafe path '{path}' under digest {digest}: {reason}")]
    UnsafePath {
        digest: String,
        path: String,
        reason: String,
    },

    #[error("path '{path}' is recorded under both {first} and {second}")]
    ConflictingPath {
        path: String,
        first: String,
        second: String,
    },

    #[error("legacy absolute path '{path}' is not under the configured install directory")]
    LegacyAbsolutePath { digest: String, path: String },
}

impl From<ManifestError> for ExError {
    fn from(err: ManifestError) -> Self {
        let kind = match err {
            ManifestError::UnsupportedSchema { .. } => ExErrorKind::UnsupportedSchema,
            _ => ExErrorKind::InvalidManifest,
        };
        let base = ExError::new(kind)
            .with_op("decode_manifest")
            .with_message(err.to_string());
        match &err {
            ManifestError::UnsafePath { digest, path, .. }
            | ManifestError::LegacyAbsolutePath { digest, path } => {
                base.with_digest(digest.clone()).with_path(path)
            }
            ManifestError::ConflictingPath { path, .. } => base.with_path(path),
            ManifestError::InvalidDigest { key } => base.with_digest(key.clone()),
            _ => base,
        }
    }
}

/// Knobs for reading manifests
#[derive(Debug, Clone, Default)]
pub struct DecodeOptions {
    /// Directory legacy absolute paths are rebased against
    pub legacy_install_dir: Option<PathBuf>,
}

/// A decoded snapshot plus the schema it was read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedManifest {
    pub snapshot: Snapshot,
    pub source_schema: u32,
}

impl DecodedManifest {
    /// True when the document predates the current schema
    pub fn is_legacy(&self) -> bool {
        self.source_schema < CURRENT_SCHEMA
    }
}

#[derive(Serialize)]
struct DocumentOut<'a> {
    schema: u32,
    blobs: &'a BTreeMap<Digest, BTreeSet<RelPath>>,
}

/// Encode a snapshot as a schema-1 manifest document
///
/// # Errors
///
/// `Serialization` if the JSON writer fails.
pub fn encode(snapshot: &Snapshot) -> crate::errors::Result<Vec<u8>> {
    let doc = DocumentOut {
        schema: CURRENT_SCHEMA,
        blobs: snapshot.digests(),
    };
    let mut out = serde_json::to_vec_pretty(&doc).map_err(|e| {
        ExError::new(ExErrorKind::Serialization)
            .with_op("encode_manifest")
            .with_message(e.to_string())
    })?;
    out.push(b'\n');
    Ok(out)
}

/// Decode a manifest document of any supported schema
///
/// # Errors
///
/// `UnsupportedSchema` for schemas newer than [`CURRENT_SCHEMA`];
/// `InvalidManifest` for every other parse or validation failure.
pub fn decode(bytes: &[u8], options: &DecodeOptions) -> crate::errors::Result<DecodedManifest> {
    decode_document(bytes, options).map_err(ExError::from)
}

/// Decode without converting failures into `ExError`
///
/// # Errors
///
/// See [`ManifestError`].
pub fn decode_document(
    bytes: &[u8],
    options: &DecodeOptions,
) -> Result<DecodedManifest, ManifestError> {
    let raw: RawDocument = serde_json::from_slice(bytes)?;

    match raw.schema {
        Some(found) if found > i64::from(CURRENT_SCHEMA) => Err(ManifestError::UnsupportedSchema {
            found,
            supported: CURRENT_SCHEMA,
        }),
        Some(found) if found < 1 => Err(ManifestError::InvalidSchema(found)),
        Some(found) => {
            if let Some(key) = raw.legacy.0.into_keys().next() {
                return Err(ManifestError::UnexpectedField(key));
            }
            let groups = raw
                .blobs
                .ok_or(ManifestError::MissingBlobs { schema: found })?;
            let snapshot = build_snapshot(groups, |digest, path| current_path(digest, path))?;
            Ok(DecodedManifest {
                snapshot,
                source_schema: CURRENT_SCHEMA,
            })
        }
        None => {
            if raw.blobs.is_some() {
                return Err(ManifestError::MissingSchema);
            }
            let install_dir = options.legacy_install_dir.as_deref();
            let snapshot = build_snapshot(raw.legacy, |digest, path| {
                legacy_path(digest, path, install_dir)
            })?;
            tracing::warn!(
                component = module_path!(),
                op = "decode_manifest",
                schema = 0,
                blob_count = snapshot.blob_count(),
                "imported legacy manifest without a schema tag; paths are best-effort"
            );
            Ok(DecodedManifest {
                snapshot,
                source_schema: 0,
            })
        }
    }
}

fn build_snapshot<F>(groups: RawGroups, resolve: F) -> Result<Snapshot, ManifestError>
where
    F: Fn(&Digest, &str) -> Result<RelPath, ManifestError>,
{
    let mut owner: BTreeMap<RelPath, Digest> = BTreeMap::new();
    let mut blobs: BTreeMap<Digest, BTreeSet<RelPath>> = BTreeMap::new();

    for (key, raw_paths) in groups.0 {
        let digest = Digest::parse(&key).map_err(|_| ManifestError::InvalidDigest { key })?;
        for raw_path in raw_paths {
            let path = resolve(&digest, &raw_path)?;
            if let Some(previous) = owner.insert(path.clone(), digest.clone()) {
                if previous != digest {
                    return Err(ManifestError::ConflictingPath {
                        path: path.to_string(),
                        first: previous.to_string(),
                        second: digest.to_string(),
                    });
                }
            }
            blobs.entry(digest.clone()).or_default().insert(path);
        }
    }

    Ok(Snapshot::from_validated_groups(blobs))
}

fn current_path(digest: &Digest, raw: &str) -> Result<RelPath, ManifestError> {
    RelPath::new(raw).map_err(|e| ManifestError::UnsafePath {
        digest: digest.to_string(),
        path: raw.to_string(),
        reason: e.message().to_string(),
    })
}

fn legacy_path(
    digest: &Digest,
    raw: &str,
    install_dir: Option<&Path>,
) -> Result<RelPath, ManifestError> {
    // legacy writers recorded platform separators
    let normalized = raw.replace('\\', "/");
    if !normalized.starts_with('/') {
        return current_path(digest, &normalized);
    }

    let absolute = || ManifestError::LegacyAbsolutePath {
        digest: digest.to_string(),
        path: raw.to_string(),
    };
    let base = install_dir.ok_or_else(absolute)?;
    let rest = Path::new(&normalized)
        .strip_prefix(base)
        .map_err(|_| absolute())?;
    RelPath::from_path(rest).map_err(|e| ManifestError::UnsafePath {
        digest: digest.to_string(),
        path: raw.to_string(),
        reason: e.message().to_string(),
    })
}

/// Digest text → merged path texts; repeated keys accumulate
#[derive(Default)]
struct RawGroups(BTreeMap<String, BTreeSet<String>>);

impl RawGroups {
    fn merge(&mut self, key: String, paths: Vec<String>) {
        self.0.entry(key).or_default().extend(paths);
    }
}

impl<'de> Deserialize<'de> for RawGroups {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct GroupsVisitor;

        impl<'de> Visitor<'de> for GroupsVisitor {
            type Value = RawGroups;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of digest to path array")
            }

            fn visit_map<A>(self, mut map: A) -> Result<RawGroups, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut groups = RawGroups::default();
                while let Some(key) = map.next_key::<String>()? {
                    let paths: Vec<String> = map.next_value()?;
                    groups.merge(key, paths);
                }
                Ok(groups)
            }
        }

        deserializer.deserialize_map(GroupsVisitor)
    }
}

/// Top-level document before schema dispatch
struct RawDocument {
    schema: Option<i64>,
    blobs: Option<RawGroups>,
    legacy: RawGroups,
}

impl<'de> Deserialize<'de> for RawDocument {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DocumentVisitor;

        impl<'de> Visitor<'de> for DocumentVisitor {
            type Value = RawDocument;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a manifest object")
            }

            fn visit_map<A>(self, mut map: A) -> Result<RawDocument, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut doc = RawDocument {
                    schema: None,
                    blobs: None,
                    legacy: RawGroups::default(),
                };
                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        "schema" => doc.schema = Some(map.next_value()?),
                        "blobs" => {
                            let groups: RawGroups = map.next_value()?;
                            let target = doc.blobs.get_or_insert_with(RawGroups::default);
                            for (digest, paths) in groups.0 {
                                target.0.entry(digest).or_default().extend(paths);
                            }
                        }
                        _ => {
                            let paths: Vec<String> = map.next_value()?;
                            doc.legacy.merge(key, paths);
                        }
                    }
                }
                Ok(doc)
            }
        }

        deserializer.deserialize_map(DocumentVisitor)
    }
}

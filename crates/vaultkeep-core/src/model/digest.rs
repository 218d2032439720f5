//! Content digests and digest-verified blobs.
//!
//! A [`Digest`] is the lowercase hex SHA256 of a file's bytes. It is a pure
//! function of content: identical bytes always produce the identical digest.
//! Collisions are an accepted risk of the hash width and are not defended
//! against.

use crate::errors::{ExError, ExErrorKind, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use std::fmt;
use std::io::Read;
use std::str::FromStr;

/// Lowercase hex SHA256 of a byte sequence.
///
/// Ordering is lexicographic on the hex text, which is the order manifest
/// keys are written in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Digest(String);

impl Digest {
    /// Length of a digest in hex characters
    pub const HEX_LEN: usize = 64;

    /// Compute the digest of an in-memory byte slice
    pub fn of_bytes(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(hex::encode(hasher.finalize()))
    }

    /// Compute the digest of everything readable from `reader`
    ///
    /// Streams the content, so files of any size can be verified without
    /// holding them in memory.
    ///
    /// # Errors
    ///
    /// Propagates any I/O error raised while reading.
    pub fn of_reader(mut reader: impl Read) -> std::io::Result<Self> {
        let mut hasher = Sha256::new();
        std::io::copy(&mut reader, &mut hasher)?;
        Ok(Self(hex::encode(hasher.finalize())))
    }

    /// Parse a digest from its hex text form
    ///
    /// Uppercase input is accepted and normalized to lowercase.
    ///
    /// # Errors
    ///
    /// `InvalidInput` if the text is not exactly 64 hex characters.
    pub fn parse(text: &str) -> Result<Self> {
        if text.len() != Self::HEX_LEN || !text.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ExError::new(ExErrorKind::InvalidInput)
                .with_op("parse_digest")
                .with_message(format!(
                    "'{}' is not a {}-character hex digest",
                    text,
                    Self::HEX_LEN
                )));
        }
        Ok(Self(text.to_ascii_lowercase()))
    }

    /// Hex text of the digest; also the blob file name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Digest {
    type Err = ExError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Digest {
    type Error = ExError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Digest> for String {
    fn from(value: Digest) -> Self {
        value.0
    }
}

/// Byte content paired with the digest it is known to hash to.
///
/// A `Blob` can only be built by hashing its bytes, so holding one is proof
/// that `digest()` matches `data()`. This is the sole corruption-detection
/// mechanism of the vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    digest: Digest,
    data: Vec<u8>,
}

impl Blob {
    /// Wrap bytes, computing their digest
    pub fn new(data: Vec<u8>) -> Self {
        let digest = Digest::of_bytes(&data);
        Self { digest, data }
    }

    /// Wrap bytes that are expected to hash to `expected`
    ///
    /// # Errors
    ///
    /// `IntegrityMismatch` naming both digests if the content hashes to
    /// something else.
    pub fn with_expected(data: Vec<u8>, expected: &Digest) -> Result<Self> {
        let blob = Self::new(data);
        if &blob.digest != expected {
            return Err(mismatch(expected, &blob.digest));
        }
        Ok(blob)
    }

    pub fn digest(&self) -> &Digest {
        &self.digest
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

/// Build the canonical digest-mismatch error
pub fn mismatch(expected: &Digest, actual: &Digest) -> ExError {
    ExError::new(ExErrorKind::IntegrityMismatch)
        .with_digest(expected.as_str())
        .with_message(format!("Expected hash {} but got {}", expected, actual))
}

//! Normalized relative asset paths.

use crate::errors::{ExError, ExErrorKind, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// A relative path recorded in a snapshot.
///
/// Always `/`-separated, non-empty, never absolute and never containing
/// `.` or `..` segments, so it cannot escape the directory it is resolved
/// under. Every other character, backslash included, belongs to the file
/// name; on Windows segments that the platform would read as separators or
/// drive prefixes are rejected.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RelPath(String);

impl RelPath {
    /// Validate a `/`-separated textual path
    ///
    /// # Errors
    ///
    /// `InvalidInput` if the path is empty, absolute, has an empty segment or
    /// contains a `.` or `..` segment.
    pub fn new(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        if text.is_empty() {
            return Err(unsafe_path(&text, "path is empty"));
        }
        if text.starts_with('/') {
            return Err(unsafe_path(&text, "path is absolute"));
        }
        for segment in text.split('/') {
            check_segment(segment).map_err(|reason| unsafe_path(&text, reason))?;
        }
        Ok(Self(text))
    }

    /// Build from a filesystem path that is already relative
    ///
    /// Each plain component becomes one segment, exactly as named on disk.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for absolute paths, names that are not valid UTF-8 and
    /// any component other than a plain name.
    pub fn from_path(path: &Path) -> Result<Self> {
        let mut segments = Vec::new();
        for component in path.components() {
            let Component::Normal(name) = component else {
                return Err(unsafe_path(path, "path must be relative with plain components"));
            };
            let name = name
                .to_str()
                .ok_or_else(|| unsafe_path(path, "file name is not valid UTF-8"))?;
            check_segment(name).map_err(|reason| unsafe_path(path, reason))?;
            segments.push(name);
        }
        if segments.is_empty() {
            return Err(unsafe_path(path, "path is empty"));
        }
        Ok(Self(segments.join("/")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Segments of the path in order
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// Resolve under `base` using the platform separator
    pub fn resolve_under(&self, base: &Path) -> PathBuf {
        let mut out = base.to_path_buf();
        out.extend(self.segments());
        out
    }
}

fn check_segment(segment: &str) -> std::result::Result<(), &'static str> {
    match segment {
        "" => Err("path has an empty segment"),
        "." | ".." => Err("path has a dot segment"),
        s if s.contains('/') || s.contains('\0') => Err("segment contains a separator or NUL"),
        s if cfg!(windows) && (s.contains('\\') || s.contains(':')) => {
            Err("segment is not a plain file name on this platform")
        }
        _ => Ok(()),
    }
}

fn unsafe_path(path: impl AsRef<Path>, reason: &str) -> ExError {
    ExError::new(ExErrorKind::InvalidInput)
        .with_op("parse_rel_path")
        .with_path(path)
        .with_message(format!("unsafe relative path: {}", reason))
}

impl fmt::Display for RelPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RelPath {
    type Error = ExError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl TryFrom<&str> for RelPath {
    type Error = ExError;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

impl From<RelPath> for String {
    fn from(value: RelPath) -> Self {
        value.0
    }
}

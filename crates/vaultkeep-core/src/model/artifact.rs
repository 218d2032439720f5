use super::RelPath;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of one artifact version stored in the vault.
///
/// `path` is where its manifest lives relative to the vault root; it must be
/// unique per version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactIdentity {
    pub name: String,
    pub version: String,
    pub path: RelPath,
}

impl ArtifactIdentity {
    pub fn new(name: impl Into<String>, version: impl Into<String>, path: RelPath) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            path,
        }
    }
}

impl fmt::Display for ArtifactIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

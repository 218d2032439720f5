//! Static version catalog
//!
//! Lists the artifact versions the vault knows about, read from
//! `[[artifact]]` tables of the configuration file:
//!
//! ```toml
//! [[artifact]]
//! name = "game"
//! version = "1.0+112"
//! path = "game/1.0+112"
//!
//! [[artifact]]
//! name = "game"
//! version = "0.9-beta"
//! path = "game/0.9-beta"
//! blocked = "only public branches may be downloaded"
//! ```
//!
//! Whether a version may be downloaded is plain data ([`Availability`]);
//! blocked versions can still be verified and exported if already stored.

use crate::config::{read_config, ConfigError};
use crate::errors::{invalid_input, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use vaultkeep_core::{ArtifactIdentity, ExError, ExErrorKind, RelPath};

/// Whether a catalog entry may be fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    Available,
    Blocked { reason: String },
}

impl Availability {
    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Available)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    pub version: String,
    pub path: RelPath,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked: Option<String>,
}

impl CatalogEntry {
    pub fn identity(&self) -> ArtifactIdentity {
        ArtifactIdentity::new(self.name.clone(), self.version.clone(), self.path.clone())
    }

    pub fn availability(&self) -> Availability {
        match &self.blocked {
            Some(reason) => Availability::Blocked {
                reason: reason.clone(),
            },
            None => Availability::Available,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    artifact: Vec<CatalogEntry>,
}

/// Known artifact versions, in file order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    /// Build a catalog, rejecting duplicate versions or storage paths
    ///
    /// # Errors
    ///
    /// `InvalidInput` naming the first duplicate.
    pub fn new(entries: Vec<CatalogEntry>) -> Result<Self> {
        let mut versions = HashSet::new();
        let mut paths = HashSet::new();
        for entry in &entries {
            if !versions.insert(entry.version.as_str()) {
                return Err(invalid_input(
                    "load_catalog",
                    format!("version {} is listed twice", entry.version),
                ));
            }
            if !paths.insert(entry.path.as_str()) {
                return Err(invalid_input(
                    "load_catalog",
                    format!("storage path {} is used by two versions", entry.path),
                ));
            }
        }
        Ok(Self { entries })
    }

    /// Parse the `[[artifact]]` tables of a TOML document
    ///
    /// # Errors
    ///
    /// `InvalidInput` for malformed TOML, unsafe paths or duplicates.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let doc: CatalogDocument = toml::from_str(text).map_err(ConfigError::from)?;
        Self::new(doc.artifact)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    ///
    /// `MissingResource`/`Io` if unreadable, otherwise as
    /// [`Catalog::from_toml_str`].
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = read_config(path)?;
        Self::from_toml_str(&text).map_err(|e| e.with_path(path))
    }

    /// Identity stored for `version`
    ///
    /// # Errors
    ///
    /// `UnknownVersion` if the catalog has no such version.
    pub fn resolve(&self, version: &str) -> Result<ArtifactIdentity> {
        self.entry(version).map(CatalogEntry::identity).ok_or_else(|| {
            ExError::new(ExErrorKind::UnknownVersion)
                .with_op("resolve_version")
                .with_message(format!("version '{}' is not in the catalog", version))
        })
    }

    pub fn entry(&self, version: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.version == version)
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Entries that are not blocked
    pub fn available(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.iter().filter(|e| e.availability().is_available())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

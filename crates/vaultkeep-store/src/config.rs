//! Vault configuration
//!
//! Loaded from the `[vault]` table of a TOML file; every field is optional.
//!
//! ```toml
//! [vault]
//! root = "/srv/vaultkeep"
//! blob_subdir = "blobs"
//! workers = 8
//! legacy_install_dir = "/opt/game"
//! ```
//!
//! `VAULTKEEP_HOME`, when set, overrides `root`.

use crate::vault::DEFAULT_BLOB_SUBDIR;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use vaultkeep_core::{ExError, ExErrorKind};

/// Environment variable overriding the vault root
pub const ENV_HOME: &str = "VAULTKEEP_HOME";

/// Directory name under the user's home used when nothing is configured
pub const DEFAULT_DIR_NAME: &str = "vaultkeep";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("no home directory could be determined; set VAULTKEEP_HOME")]
    NoHome,

    #[error("workers must be at least 1")]
    ZeroWorkers,
}

impl From<ConfigError> for ExError {
    fn from(err: ConfigError) -> Self {
        let kind = match &err {
            ConfigError::Read { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
                ExErrorKind::MissingResource
            }
            ConfigError::Read { .. } => ExErrorKind::Io,
            _ => ExErrorKind::InvalidInput,
        };
        let base = ExError::new(kind)
            .with_op("load_config")
            .with_message(err.to_string());
        match &err {
            ConfigError::Read { path, .. } => base.with_path(path),
            _ => base,
        }
    }
}

/// Where the vault lives and how much parallelism to use
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    pub root: PathBuf,
    #[serde(default = "default_blob_subdir")]
    pub blob_subdir: PathBuf,
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Install directory legacy schema-0 manifests recorded absolute paths under
    #[serde(default)]
    pub legacy_install_dir: Option<PathBuf>,
}

fn default_blob_subdir() -> PathBuf {
    PathBuf::from(DEFAULT_BLOB_SUBDIR)
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// `[vault]` table with every field optional
#[derive(Debug, Default, Deserialize)]
struct VaultSection {
    root: Option<PathBuf>,
    blob_subdir: Option<PathBuf>,
    workers: Option<usize>,
    legacy_install_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigDocument {
    #[serde(default)]
    vault: VaultSection,
}

impl VaultConfig {
    /// Config rooted at `root` with defaults for everything else
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            blob_subdir: default_blob_subdir(),
            workers: default_workers(),
            legacy_install_dir: None,
        }
    }

    /// `<home>/vaultkeep`, the conventional per-user vault
    ///
    /// # Errors
    ///
    /// [`ConfigError::NoHome`] if the platform reports no home directory.
    pub fn default_location() -> Result<Self, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHome)?;
        Ok(Self::with_root(home.join(DEFAULT_DIR_NAME)))
    }

    /// Parse the `[vault]` table of a TOML document
    ///
    /// A missing `root` falls back to [`VaultConfig::default_location`].
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] for malformed TOML, [`ConfigError::ZeroWorkers`]
    /// for `workers = 0`, [`ConfigError::NoHome`] if no root can be found.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let doc: ConfigDocument = toml::from_str(text)?;
        let section = doc.vault;

        let mut config = match section.root {
            Some(root) => Self::with_root(root),
            None => Self::default_location()?,
        };
        if let Some(sub) = section.blob_subdir {
            config.blob_subdir = sub;
        }
        if let Some(workers) = section.workers {
            if workers == 0 {
                return Err(ConfigError::ZeroWorkers);
            }
            config.workers = workers;
        }
        config.legacy_install_dir = section.legacy_install_dir;
        Ok(config)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    ///
    /// [`ConfigError::Read`] if the file cannot be read, otherwise as
    /// [`VaultConfig::from_toml_str`].
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let text = read_config(path)?;
        let config = Self::from_toml_str(&text)?;
        tracing::info!(
            component = module_path!(),
            path = %path.display(),
            root = %config.root.display(),
            "loaded vault configuration"
        );
        Ok(config)
    }

    /// Apply overrides looked up through `lookup` (normally the process env)
    pub fn apply_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(home) = lookup(ENV_HOME).filter(|v| !v.is_empty()) {
            self.root = PathBuf::from(home);
        }
        self
    }

    /// Resolve the effective configuration
    ///
    /// Reads `path` when given, otherwise starts from the default location,
    /// then applies environment overrides.
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`] from reading or parsing.
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        let env = |key: &str| std::env::var(key).ok();
        let base = match path {
            Some(path) => Self::from_toml_file(path)?,
            None => match env(ENV_HOME) {
                Some(home) if !home.is_empty() => Self::with_root(home),
                _ => Self::default_location()?,
            },
        };
        Ok(base.apply_overrides(env))
    }
}

pub(crate) fn read_config(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}

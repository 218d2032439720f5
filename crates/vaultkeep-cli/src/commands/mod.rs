//! Subcommands
//!
//! Each module exposes an `Args` struct and an `execute` function taking the
//! optional `--config` path.

pub mod export;
pub mod ingest;
pub mod purge;
pub mod show;
pub mod verify;

use std::path::Path;
use vaultkeep_core::{ArtifactIdentity, ExError, Result};
use vaultkeep_engine::{FanOut, VerifiedVault};
use vaultkeep_store::{Availability, Catalog, VaultConfig, VaultStore};

/// Everything a command needs, resolved once from `--config`
pub struct Session {
    pub config: VaultConfig,
    pub store: VaultStore,
    pub catalog: Catalog,
}

impl Session {
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = VaultConfig::resolve(config_path).map_err(ExError::from)?;
        let catalog = match config_path {
            Some(path) => Catalog::from_toml_file(path)?,
            None => Catalog::default(),
        };
        let store = VaultStore::from_config(&config)?;
        Ok(Self {
            config,
            store,
            catalog,
        })
    }

    /// Catalog identity for `version`, warning when it is blocked
    pub fn resolve(&self, version: &str) -> Result<ArtifactIdentity> {
        let identity = self.catalog.resolve(version)?;
        if let Some(entry) = self.catalog.entry(version) {
            if let Availability::Blocked { reason } = entry.availability() {
                tracing::warn!(
                    component = module_path!(),
                    artifact = %identity,
                    reason = %reason,
                    "version is blocked from download"
                );
            }
        }
        Ok(identity)
    }

    pub fn open(&self, version: &str) -> Result<VerifiedVault> {
        let identity = self.resolve(version)?;
        Ok(VerifiedVault::open(self.store.clone(), identity)?
            .with_fanout(FanOut::new(self.config.workers)))
    }
}

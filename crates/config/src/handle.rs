//! Shared, reloadable configuration.
//!
//! Readers take an `Arc` snapshot per turn, so a reload never changes the
//! settings of a turn that is already running. A failed reload leaves the
//! previous snapshot in place.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::{AppConfig, ConfigError, ProfileSet};

/// Configuration plus the profiles derived from it.
#[derive(Debug, Clone)]
pub struct ConfigSnapshot {
    pub config: AppConfig,
    pub profiles: ProfileSet,
}

impl ConfigSnapshot {
    pub fn build(config: AppConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let profiles = ProfileSet::load(&config)?;
        Ok(Self { config, profiles })
    }
}

#[derive(Debug)]
pub struct ConfigHandle {
    path: Option<PathBuf>,
    current: RwLock<Arc<ConfigSnapshot>>,
}

impl ConfigHandle {
    /// Load from a file; `reload` re-reads the same file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let snapshot = ConfigSnapshot::build(AppConfig::load_from(path)?)?;
        Ok(Self {
            path: Some(path.to_path_buf()),
            current: RwLock::new(Arc::new(snapshot)),
        })
    }

    /// Wrap an in-memory configuration; `reload` re-reads profiles only.
    pub fn from_config(config: AppConfig) -> Result<Self, ConfigError> {
        let snapshot = ConfigSnapshot::build(config)?;
        Ok(Self::from_snapshot(snapshot))
    }

    pub fn from_snapshot(snapshot: ConfigSnapshot) -> Self {
        Self {
            path: None,
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    pub fn snapshot(&self) -> Arc<ConfigSnapshot> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Re-read configuration and profiles, then swap atomically.
    pub fn reload(&self) -> Result<Arc<ConfigSnapshot>, ConfigError> {
        let config = match &self.path {
            Some(path) => AppConfig::load_from(path)?,
            None => self.snapshot().config.clone(),
        };
        let next = Arc::new(ConfigSnapshot::build(config)?);

        *self.current.write().unwrap_or_else(|e| e.into_inner()) = next.clone();
        match &self.path {
            Some(path) => tracing::info!(path = %path.display(), "Configuration reloaded"),
            None => tracing::info!("Profiles reloaded"),
        }
        Ok(next)
    }
}

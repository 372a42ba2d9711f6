//! Configuration for embedders of the sync layer.
//!
//! Read from a TOML file with sensible defaults for every field:
//!
//! ```toml
//! [cache]
//! path = "/var/lib/teamboard/boards.sqlite"
//!
//! [demo]
//! seed = true
//! ```
//!
//! With no `[cache] path`, the cache runs in memory: durable for the
//! process lifetime only, which is what tests and the demo deployment
//! want.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cache::{BoardCache, CacheHandle};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub demo: DemoConfig,
}

/// Where the durable board cache lives.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Path of the SQLite cache database. In-memory when absent.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Demo-deployment knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoConfig {
    /// Seed the in-memory backends with sample data.
    #[serde(default = "default_seed")]
    pub seed: bool,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
        }
    }
}

fn default_seed() -> bool {
    true
}

impl SyncConfig {
    /// Parse a configuration document. Unknown keys are ignored.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("Failed to parse sync configuration")
    }

    /// Load the configuration file at `path`, or defaults when it does not
    /// exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at {}", path.display()))?;
        Self::from_toml_str(&raw)
    }

    /// Open the configured board cache.
    pub fn open_cache(&self) -> Result<CacheHandle> {
        let cache = match &self.cache.path {
            Some(path) => BoardCache::open(path)?,
            None => BoardCache::open_in_memory()?,
        };
        Ok(CacheHandle::new(cache))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_in_memory_with_demo_seed() {
        let config = SyncConfig::default();
        assert!(config.cache.path.is_none());
        assert!(config.demo.seed);
    }

    #[test]
    fn parses_full_document() {
        let config = SyncConfig::from_toml_str(
            r#"
            [cache]
            path = "/var/lib/teamboard/boards.sqlite"

            [demo]
            seed = false
            "#,
        )
        .unwrap();
        assert_eq!(
            config.cache.path.as_deref(),
            Some(Path::new("/var/lib/teamboard/boards.sqlite"))
        );
        assert!(!config.demo.seed);
    }

    #[test]
    fn partial_document_keeps_defaults() {
        let config = SyncConfig::from_toml_str("[cache]\n").unwrap();
        assert!(config.cache.path.is_none());
        assert!(config.demo.seed);
    }

    #[test]
    fn missing_file_loads_defaults() {
        let config = SyncConfig::load(Path::new("/definitely/not/here.toml")).unwrap();
        assert!(config.cache.path.is_none());
    }

    #[test]
    fn open_cache_honors_the_configured_path() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("boards.sqlite");
        let config = SyncConfig {
            cache: CacheConfig {
                path: Some(path.clone()),
            },
            demo: DemoConfig::default(),
        };
        let _handle = config.open_cache()?;
        assert!(path.exists());
        Ok(())
    }
}

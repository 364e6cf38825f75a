//! Session context
//!
//! All long-lived state — the provenance store, the identity cache, the
//! plugin and template tables — hangs off one explicitly constructed
//! `Session`. Nothing is process-global, so tests and concurrent projects
//! stay isolated and a session's lifetime bounds everything it caches.

use std::path::{Path, PathBuf};
use std::time::Duration;

use prov_archive::PluginRegistry;
use prov_fs::{IdentityCache, ScanOptions, io};
use prov_instr::{SolveOptions, TemplateCatalogue};
use serde::{Deserialize, Serialize};

use crate::classify::{DriftReport, classify};
use crate::store::ProvenanceStore;
use crate::{Error, Result};

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Durable session settings, loaded from `provenance.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Directory holding per-mod provenance documents.
    pub store_dir: PathBuf,
    /// Where healing moves unexpected files.
    pub overwrite_dir: PathBuf,
    /// Optional persisted identity cache.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_cache: Option<PathBuf>,
    /// Worker pool size for scans and solves.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Soft timeout for long scans and solves, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soft_timeout_secs: Option<u64>,
}

impl SessionConfig {
    /// A config rooted under one project directory.
    pub fn rooted_at(project_dir: &Path) -> Self {
        Self {
            store_dir: project_dir.join("provenance"),
            overwrite_dir: project_dir.join("overwrite"),
            identity_cache: Some(project_dir.join("identity-cache.json")),
            workers: default_workers(),
            soft_timeout_secs: None,
        }
    }

    /// Load a config from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigNotFound` if the file does not exist, and
    /// `Error::TomlDe` if it does not parse.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }
        let text = io::read_text(path)?;
        Ok(toml::from_str(&text)?)
    }

    /// Scan options derived from this config.
    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            workers: self.workers,
            soft_timeout: self.soft_timeout_secs.map(Duration::from_secs),
        }
    }

    /// Solver options derived from this config.
    pub fn solve_options(&self) -> SolveOptions {
        SolveOptions {
            workers: self.workers,
            soft_timeout: self.soft_timeout_secs.map(Duration::from_secs),
        }
    }
}

/// One isolated reconciliation context.
pub struct Session {
    config: SessionConfig,
    store: ProvenanceStore,
    identity: IdentityCache,
    registry: PluginRegistry,
    catalogue: TemplateCatalogue,
}

impl Session {
    /// A fresh session with an empty store and cache.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            store: ProvenanceStore::new(),
            identity: IdentityCache::new(),
            registry: PluginRegistry::new(),
            catalogue: TemplateCatalogue::new(),
        }
    }

    /// Open a session, loading persisted state where it exists.
    ///
    /// # Errors
    ///
    /// Surfaces store and cache load failures; an absent store directory or
    /// cache file simply starts empty.
    pub fn open(config: SessionConfig) -> Result<Self> {
        let store = if config.store_dir.is_dir() {
            ProvenanceStore::load_from_dir(&config.store_dir)?
        } else {
            ProvenanceStore::new()
        };
        let identity = match &config.identity_cache {
            Some(path) if path.is_file() => IdentityCache::load(path)?,
            _ => IdentityCache::new(),
        };
        Ok(Self {
            config,
            store,
            identity,
            registry: PluginRegistry::new(),
            catalogue: TemplateCatalogue::new(),
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn store(&self) -> &ProvenanceStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ProvenanceStore {
        &mut self.store
    }

    pub fn identity_mut(&mut self) -> &mut IdentityCache {
        &mut self.identity
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut PluginRegistry {
        &mut self.registry
    }

    pub fn catalogue(&self) -> &TemplateCatalogue {
        &self.catalogue
    }

    pub fn catalogue_mut(&mut self) -> &mut TemplateCatalogue {
        &mut self.catalogue
    }

    /// Scan a tracked root and classify it against the store.
    ///
    /// Hashing runs on the configured worker pool; classification happens
    /// here on the calling thread, which is also the only thread permitted
    /// to append to the store.
    pub fn reconcile(&self, root: &Path) -> Result<DriftReport> {
        let scan = prov_fs::scan_tree(root, &self.config.scan_options())?;
        Ok(classify(&scan, &self.store))
    }

    /// Persist the store and identity cache.
    pub fn persist(&self) -> Result<()> {
        self.store.save_to_dir(&self.config.store_dir)?;
        if let Some(cache_path) = &self.config.identity_cache {
            self.identity.save(cache_path)?;
        }
        Ok(())
    }
}

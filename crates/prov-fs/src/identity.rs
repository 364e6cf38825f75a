//! Stat-validated hash cache
//!
//! Re-hashing an unchanged multi-gigabyte mod tree on every scan is the
//! dominant cost of reconciliation. The cache keys each known digest by
//! (size, mtime) and re-hashes whenever either differs from the live stat;
//! a matching mtime alone is never taken as proof of unchanged content.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::hash::{ContentHash, hash_file};
use crate::{Error, Result, io};

/// One cached digest with the stat signature it was computed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedIdentity {
    pub hash: ContentHash,
    pub size: u64,
    pub modified: DateTime<Utc>,
}

/// File digest cache keyed by absolute path.
///
/// Serializable so a session can persist it between runs; entries are
/// validated against the live filesystem on every lookup.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct IdentityCache {
    entries: HashMap<PathBuf, CachedIdentity>,
}

impl IdentityCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hash a file, reusing the cached digest when the stat signature
    /// (size + mtime) still matches.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the file cannot be stat'ed or read.
    pub fn hash_file_cached(&mut self, path: &Path) -> Result<ContentHash> {
        let meta = std::fs::metadata(path).map_err(|e| Error::io(path, e))?;
        let size = meta.len();
        let modified: DateTime<Utc> = meta
            .modified()
            .map_err(|e| Error::io(path, e))?
            .into();

        if let Some(cached) = self.entries.get(path)
            && cached.size == size
            && cached.modified == modified
        {
            return Ok(cached.hash);
        }

        let hash = hash_file(path)?;
        self.entries.insert(
            path.to_path_buf(),
            CachedIdentity {
                hash,
                size,
                modified,
            },
        );
        Ok(hash)
    }

    /// Look up a cached identity without touching the filesystem.
    pub fn peek(&self, path: &Path) -> Option<&CachedIdentity> {
        self.entries.get(path)
    }

    /// Drop the entry for a path, if present.
    pub fn invalidate(&mut self, path: &Path) -> Option<CachedIdentity> {
        self.entries.remove(path)
    }

    /// Persist the cache as JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        io::write_atomic(path, json.as_bytes())
    }

    /// Load a previously persisted cache.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the file is unreadable and `Error::Json` if it
    /// does not parse.
    pub fn load(path: &Path) -> Result<Self> {
        let content = io::read_text(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

//! Normalized relative paths
//!
//! Every tracked file, archive entry, and instruction destination is keyed by
//! a `RelPath`: relative, forward-slash separated, lowercase. Mod archives
//! routinely mix separators and letter case between releases, and the target
//! filesystems are case-insensitive, so normalization happens once at the
//! boundary and the rest of the workspace compares paths byte-for-byte.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Error, Result};

/// A normalized relative path.
///
/// Invariants: non-empty, forward slashes only, lowercase, no `.` or `..`
/// segments, no leading or trailing slash, no empty segments. Ordered so
/// that path-keyed maps serialize in a stable order.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelPath {
    inner: String,
}

impl RelPath {
    /// Normalize and validate a relative path.
    ///
    /// Accepts either separator and any letter case.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidPath` for empty paths, absolute paths, and
    /// paths containing `.` or `..` segments.
    pub fn new(path: impl AsRef<str>) -> Result<Self> {
        let raw = path.as_ref();
        let normalized = raw.replace('\\', "/").to_lowercase();
        let trimmed = normalized
            .strip_prefix("./")
            .unwrap_or(&normalized)
            .trim_matches('/');

        if trimmed.is_empty() {
            return Err(Error::invalid_path(raw, "empty path"));
        }
        if normalized.starts_with('/') || raw.contains(':') {
            return Err(Error::invalid_path(raw, "path must be relative"));
        }
        for segment in trimmed.split('/') {
            if segment.is_empty() {
                return Err(Error::invalid_path(raw, "empty path segment"));
            }
            if segment == "." || segment == ".." {
                return Err(Error::invalid_path(raw, "dot segments not allowed"));
            }
        }
        Ok(Self {
            inner: trimmed.to_string(),
        })
    }

    /// Build a `RelPath` from a filesystem path relative to `root`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidPath` if `path` is not under `root` or does
    /// not normalize cleanly.
    pub fn from_root_relative(root: &Path, path: &Path) -> Result<Self> {
        let rel = path.strip_prefix(root).map_err(|_| {
            Error::invalid_path(path.to_string_lossy(), "path is not under scan root")
        })?;
        Self::new(rel.to_string_lossy())
    }

    /// The normalized string form.
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Convert to a platform-native path under `root` for I/O.
    pub fn to_native(&self, root: &Path) -> PathBuf {
        let mut out = root.to_path_buf();
        for segment in self.inner.split('/') {
            out.push(segment);
        }
        out
    }

    /// Join a further relative segment.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidPath` if the joined result does not validate.
    pub fn join(&self, segment: &str) -> Result<Self> {
        Self::new(format!("{}/{}", self.inner, segment))
    }

    /// The parent path, if any.
    pub fn parent(&self) -> Option<Self> {
        self.inner.rfind('/').map(|idx| Self {
            inner: self.inner[..idx].to_string(),
        })
    }

    /// The final path segment.
    pub fn file_name(&self) -> &str {
        self.inner.rsplit('/').next().unwrap_or(&self.inner)
    }

    /// The extension of the final segment, if present.
    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name();
        let idx = name.rfind('.')?;
        if idx == 0 { None } else { Some(&name[idx + 1..]) }
    }

    /// Whether this path lies under the directory `dir`.
    ///
    /// `dir` is treated as a directory prefix: `a/b` is under `a` but
    /// `a/bc` is not.
    pub fn starts_with_dir(&self, dir: &RelPath) -> bool {
        self.inner == dir.inner
            || (self.inner.len() > dir.inner.len()
                && self.inner.starts_with(&dir.inner)
                && self.inner.as_bytes()[dir.inner.len()] == b'/')
    }

    /// The remainder of this path after stripping the directory `dir`.
    pub fn strip_dir(&self, dir: &RelPath) -> Option<&str> {
        if !self.starts_with_dir(dir) || self.inner.len() == dir.inner.len() {
            return None;
        }
        Some(&self.inner[dir.inner.len() + 1..])
    }
}

impl fmt::Display for RelPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl fmt::Debug for RelPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RelPath({:?})", self.inner)
    }
}

impl Serialize for RelPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.inner)
    }
}

impl<'de> Deserialize<'de> for RelPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        RelPath::new(&s).map_err(serde::de::Error::custom)
    }
}

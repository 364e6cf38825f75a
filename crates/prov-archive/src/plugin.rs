//! Capability traits for external collaborators
//!
//! Archive decoding, tool execution, and the overwrite/VFS layer live
//! outside this workspace. The core talks to them through these traits and
//! treats every implementation as opaque.

use std::path::{Path, PathBuf};

use prov_fs::{ContentHash, RelPath};

use crate::Result;

/// An entry as reported by an archive reader, before hashing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub path: RelPath,
    pub size: u64,
}

/// Decodes one archive format (7z, rar, zip, ...).
///
/// Implementations are registered by format tag in a
/// [`crate::PluginRegistry`] and must be safe to call from multiple scan
/// workers; they receive no mutable state.
pub trait ArchiveReader: Send + Sync {
    /// List the entries of the archive at `archive`.
    fn list_entries(&self, archive: &Path) -> Result<Vec<RawEntry>>;

    /// Extract the named entries into `destination`, preserving relative
    /// entry paths.
    fn extract(&self, archive: &Path, entries: &[RelPath], destination: &Path) -> Result<()>;
}

/// Runs an external tool referenced by an instruction step.
///
/// The engine never models what a tool does; it records the declared
/// expected outputs and delegates execution here.
pub trait ToolRunner: Send + Sync {
    /// Invoke the tool on `inputs` with opaque `parameters`; returns the
    /// paths the tool produced.
    fn invoke(&self, tool_id: &str, inputs: &[PathBuf], parameters: &str) -> Result<Vec<PathBuf>>;
}

/// The overwrite/VFS layer consumed by healing.
pub trait OverwriteSink {
    /// Move an unexpected file out of the managed area into the overwrite
    /// area. Never deletes.
    fn move_to_overwrite(&self, path: &RelPath) -> Result<()>;

    /// Restore a file from an archive entry.
    fn restore(&self, path: &RelPath, archive: &ContentHash, entry: &RelPath) -> Result<()>;
}

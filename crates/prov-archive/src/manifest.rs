//! Content-addressed archive manifests
//!
//! A manifest records what an archive contains — entry paths, per-entry
//! digests, sizes — keyed by the digest of the archive file itself. Once
//! built it is immutable: the same archive hash always implies the same
//! entry set, which is what lets provenance stay resolvable years after the
//! original archive bytes are gone.

use prov_fs::{ContentHash, RelPath};
use serde::{Deserialize, Serialize};

/// One file inside an archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveEntry {
    pub path: RelPath,
    pub hash: ContentHash,
    pub size: u64,
}

/// Immutable description of an archive's contents.
///
/// Entries are held sorted by path; duplicate paths keep the last entry
/// given to [`ArchiveManifest::new`]. Fields are private so a manifest can
/// only be constructed in canonical form, including when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawManifest")]
pub struct ArchiveManifest {
    archive_hash: ContentHash,
    entries: Vec<ArchiveEntry>,
}

/// Serialized shape; re-canonicalized on load.
#[derive(Deserialize)]
struct RawManifest {
    archive_hash: ContentHash,
    entries: Vec<ArchiveEntry>,
}

impl From<RawManifest> for ArchiveManifest {
    fn from(raw: RawManifest) -> Self {
        Self::new(raw.archive_hash, raw.entries)
    }
}

impl ArchiveManifest {
    /// Build a manifest, sorting entries and dropping duplicate paths
    /// (last one wins).
    pub fn new(archive_hash: ContentHash, mut entries: Vec<ArchiveEntry>) -> Self {
        entries.reverse();
        let mut seen = std::collections::BTreeSet::new();
        entries.retain(|e| seen.insert(e.path.clone()));
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Self {
            archive_hash,
            entries,
        }
    }

    /// Digest of the archive file itself.
    pub fn archive_hash(&self) -> ContentHash {
        self.archive_hash
    }

    /// All entries, sorted by path.
    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the archive is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry by exact path.
    pub fn entry(&self, path: &RelPath) -> Option<&ArchiveEntry> {
        self.entries
            .binary_search_by(|e| e.path.cmp(path))
            .ok()
            .map(|idx| &self.entries[idx])
    }

    /// All entries under a directory prefix, in path order.
    ///
    /// Uses a range scan over the sorted entry list rather than a full
    /// filter pass; installer documents reference folders far more often
    /// than individual files.
    pub fn entries_under<'a>(
        &'a self,
        dir: &'a RelPath,
    ) -> impl Iterator<Item = &'a ArchiveEntry> + 'a {
        // Range over the half-open interval of paths starting with "dir/";
        // the trailing slash keeps siblings like "dir.txt" out of the range.
        let prefix = format!("{dir}/");
        let start = self
            .entries
            .partition_point(|e| e.path.as_str() < prefix.as_str());
        self.entries[start..]
            .iter()
            .take_while(move |e| e.path.as_str().starts_with(&prefix))
    }

    /// Stable JSON form for persistence alongside provenance documents.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).expect("manifest serialization cannot fail")
    }
}

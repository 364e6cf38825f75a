//! Manifest construction from archive bytes
//!
//! Building a manifest is the one operation that needs the actual archive:
//! entries are extracted to scratch space, hashed, and discarded. Afterwards
//! the manifest alone is enough for simulation, classification, and solving.

use std::path::Path;

use prov_fs::{RelPath, hash_file};

use crate::manifest::{ArchiveEntry, ArchiveManifest};
use crate::plugin::ArchiveReader;
use crate::{Error, Result};

/// Build the [`ArchiveManifest`] for the archive file at `archive`.
///
/// Lists entries through the reader, extracts them into a temporary
/// directory, and hashes each extracted file plus the archive file itself.
///
/// # Errors
///
/// Returns the reader's error if listing or extraction fails, and
/// `Error::Plugin` if the reader claims an entry it did not extract.
pub fn manifest_for_archive(
    reader: &dyn ArchiveReader,
    archive: &Path,
) -> Result<ArchiveManifest> {
    let archive_hash = hash_file(archive)?;

    let raw_entries = reader.list_entries(archive)?;
    let paths: Vec<RelPath> = raw_entries.iter().map(|e| e.path.clone()).collect();

    let scratch = tempfile::tempdir().map_err(|e| prov_fs::Error::io(archive, e))?;
    reader.extract(archive, &paths, scratch.path())?;

    let mut entries = Vec::with_capacity(raw_entries.len());
    for raw in raw_entries {
        let extracted = raw.path.to_native(scratch.path());
        if !extracted.is_file() {
            return Err(Error::plugin(format!(
                "reader listed {} but did not extract it",
                raw.path
            )));
        }
        let hash = hash_file(&extracted)?;
        entries.push(ArchiveEntry {
            path: raw.path,
            hash,
            size: raw.size,
        });
    }

    tracing::debug!(
        archive = %archive.display(),
        hash = %archive_hash,
        entries = entries.len(),
        "built archive manifest"
    );

    Ok(ArchiveManifest::new(archive_hash, entries))
}

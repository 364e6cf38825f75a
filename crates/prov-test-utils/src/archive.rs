//! In-memory archives for simulation and healing tests.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::PathBuf;

use prov_archive::{ArchiveEntry, ArchiveManifest, OverwriteSink};
use prov_fs::{ContentHash, RelPath, hash_bytes};
use prov_instr::ContentSource;

/// A content-addressed set of fake archives held in memory.
///
/// Each added archive gets a deterministic hash derived from its contents,
/// a proper [`ArchiveManifest`], and blob storage for every entry, so the
/// same fixture can drive manifest-only simulation, patch steps (via
/// [`ContentSource`]), availability checks, and byte-accurate restores.
#[derive(Debug, Default)]
pub struct MemoryArchiveStore {
    archives: HashMap<ContentHash, BTreeMap<RelPath, Vec<u8>>>,
    blobs: HashMap<ContentHash, Vec<u8>>,
}

impl MemoryArchiveStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an archive from (path, content) pairs; returns its manifest.
    pub fn add_archive(&mut self, files: &[(&str, &[u8])]) -> ArchiveManifest {
        // Derive the archive hash from its full contents, like hashing the
        // archive file itself would.
        let mut identity = Vec::new();
        let mut contents = BTreeMap::new();
        let mut entries = Vec::new();
        for (path, content) in files {
            let path = RelPath::new(path).expect("MemoryArchiveStore: valid entry path");
            identity.extend_from_slice(path.as_str().as_bytes());
            identity.push(0);
            identity.extend_from_slice(content);
            identity.push(0);
            let hash = hash_bytes(content);
            self.blobs.insert(hash, content.to_vec());
            entries.push(ArchiveEntry {
                path: path.clone(),
                hash,
                size: content.len() as u64,
            });
            contents.insert(path, content.to_vec());
        }
        let archive_hash = hash_bytes(&identity);
        self.archives.insert(archive_hash, contents);
        ArchiveManifest::new(archive_hash, entries)
    }

    /// Whether an archive with this hash was added.
    pub fn contains(&self, hash: &ContentHash) -> bool {
        self.archives.contains_key(hash)
    }

    /// Bytes of one entry of one archive.
    pub fn entry_bytes(&self, archive: &ContentHash, entry: &RelPath) -> Option<&[u8]> {
        self.archives
            .get(archive)
            .and_then(|contents| contents.get(entry))
            .map(Vec::as_slice)
    }

    /// Forget an archive, keeping its blobs; models "the download is gone".
    pub fn drop_archive(&mut self, hash: &ContentHash) {
        self.archives.remove(hash);
    }
}

impl ContentSource for MemoryArchiveStore {
    fn read(&self, hash: &ContentHash) -> prov_instr::Result<Vec<u8>> {
        self.blobs
            .get(hash)
            .cloned()
            .ok_or(prov_instr::Error::ContentUnavailable { hash: *hash })
    }
}

/// An [`OverwriteSink`] operating on a real temp tree, restoring bytes from
/// a [`MemoryArchiveStore`].
pub struct DiskSink<'a> {
    root: PathBuf,
    overwrite_dir: PathBuf,
    store: &'a MemoryArchiveStore,
    restored: RefCell<Vec<RelPath>>,
}

impl<'a> DiskSink<'a> {
    pub fn new(root: PathBuf, overwrite_dir: PathBuf, store: &'a MemoryArchiveStore) -> Self {
        Self {
            root,
            overwrite_dir,
            store,
            restored: RefCell::new(Vec::new()),
        }
    }

    /// Paths restored so far, in call order.
    pub fn restored(&self) -> Vec<RelPath> {
        self.restored.borrow().clone()
    }
}

impl OverwriteSink for DiskSink<'_> {
    fn move_to_overwrite(&self, path: &RelPath) -> prov_archive::Result<()> {
        let from = path.to_native(&self.root);
        let to = path.to_native(&self.overwrite_dir);
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent).map_err(|e| prov_fs::Error::io(parent, e))?;
        }
        fs::rename(&from, &to).map_err(|e| prov_fs::Error::io(&from, e))?;
        Ok(())
    }

    fn restore(
        &self,
        path: &RelPath,
        archive: &ContentHash,
        entry: &RelPath,
    ) -> prov_archive::Result<()> {
        let bytes = self.store.entry_bytes(archive, entry).ok_or_else(|| {
            prov_archive::Error::NoSuchEntry {
                archive: *archive,
                entry: entry.to_string(),
            }
        })?;
        let target = path.to_native(&self.root);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| prov_fs::Error::io(parent, e))?;
        }
        fs::write(&target, bytes).map_err(|e| prov_fs::Error::io(&target, e))?;
        self.restored.borrow_mut().push(path.clone());
        Ok(())
    }
}

//! The provenance store
//!
//! A mapping from every tracked file to the archive and instruction run
//! that produced it, plus the full per-path history of superseded entries.
//! Persisted as one pretty-printed JSON document per mod with stable
//! ordering, written atomically, so the store's own change history is
//! line-diffable and fit for version control.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use prov_fs::{RelPath, io};
use serde::{Deserialize, Serialize};

use crate::model::{Mod, ModId, ProvenanceEntry};
use crate::{Error, Result};

/// File suffix for persisted per-mod documents.
const DOC_SUFFIX: &str = ".provenance.json";

/// Serialized form of one mod and its entries.
#[derive(Debug, Serialize, Deserialize)]
struct ModDocument {
    version: String,
    #[serde(rename = "mod")]
    mod_info: Mod,
    entries: Vec<ProvenanceEntry>,
}

/// In-memory provenance store.
///
/// `record` is append-only: an entry for an already-tracked path supersedes
/// the current one but never removes it, so history length per path only
/// grows. Writes to disk rewrite whole documents atomically; nothing is
/// ever physically deleted from them.
#[derive(Debug, Default)]
pub struct ProvenanceStore {
    mods: BTreeMap<ModId, Mod>,
    history: BTreeMap<RelPath, Vec<ProvenanceEntry>>,
}

impl ProvenanceStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mod.
    ///
    /// # Errors
    ///
    /// Returns `Error::DuplicateMod` if the id is already registered.
    pub fn add_mod(&mut self, mod_info: Mod) -> Result<()> {
        if self.mods.contains_key(&mod_info.id) {
            return Err(Error::DuplicateMod {
                id: mod_info.id.to_string(),
            });
        }
        self.mods.insert(mod_info.id.clone(), mod_info);
        Ok(())
    }

    /// Look up a mod by id.
    pub fn mod_by_id(&self, id: &ModId) -> Option<&Mod> {
        self.mods.get(id)
    }

    /// All registered mods in id order.
    pub fn mods(&self) -> impl Iterator<Item = &Mod> {
        self.mods.values()
    }

    /// The mod whose managed root contains `path`, if any.
    ///
    /// With nested roots the deepest match wins.
    pub fn mod_for_path(&self, path: &RelPath) -> Option<&Mod> {
        self.mods
            .values()
            .filter(|m| !m.retracted && path.starts_with_dir(&m.root))
            .max_by_key(|m| m.root.as_str().len())
    }

    /// Append an entry, superseding any current entry for its path.
    ///
    /// # Errors
    ///
    /// Returns `Error::EntryForUnknownMod` if the entry's mod is not
    /// registered.
    pub fn record(&mut self, entry: ProvenanceEntry) -> Result<()> {
        if !self.mods.contains_key(&entry.mod_id) {
            return Err(Error::EntryForUnknownMod {
                path: entry.path.to_string(),
                id: entry.mod_id.to_string(),
            });
        }
        tracing::trace!(path = %entry.path, mod_id = %entry.mod_id, hash = %entry.hash, "recording provenance");
        self.history.entry(entry.path.clone()).or_default().push(entry);
        Ok(())
    }

    /// The current (latest non-retracted) entry for a path.
    pub fn current_for(&self, path: &RelPath) -> Option<&ProvenanceEntry> {
        self.history
            .get(path)?
            .iter()
            .rev()
            .find(|e| !e.retracted)
    }

    /// Full history for a path, oldest first.
    pub fn history_for(&self, path: &RelPath) -> &[ProvenanceEntry] {
        self.history.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every entry belonging to a mod, current and superseded alike.
    pub fn entries_for_mod(&self, id: &ModId) -> Vec<&ProvenanceEntry> {
        self.history
            .values()
            .flat_map(|entries| entries.iter())
            .filter(|e| &e.mod_id == id)
            .collect()
    }

    /// All paths with a current entry, with that entry.
    pub fn current_entries(&self) -> impl Iterator<Item = (&RelPath, &ProvenanceEntry)> {
        self.history.iter().filter_map(|(path, entries)| {
            entries
                .iter()
                .rev()
                .find(|e| !e.retracted)
                .map(|e| (path, e))
        })
    }

    /// Invalidate a mod: mark its entries retracted and stop treating its
    /// root as a managed area. History is preserved, nothing is deleted.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownMod` for an unregistered id.
    pub fn retract_mod(&mut self, id: &ModId) -> Result<()> {
        let mod_info = self.mods.get_mut(id).ok_or_else(|| Error::UnknownMod {
            id: id.to_string(),
        })?;
        mod_info.retracted = true;
        for entries in self.history.values_mut() {
            for entry in entries.iter_mut().filter(|e| &e.mod_id == id) {
                entry.retracted = true;
            }
        }
        Ok(())
    }

    /// Serialize one mod's document in canonical form.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownMod` for an unregistered id.
    pub fn render_document(&self, id: &ModId) -> Result<String> {
        let mod_info = self.mods.get(id).ok_or_else(|| Error::UnknownMod {
            id: id.to_string(),
        })?;
        let mut entries: Vec<ProvenanceEntry> = self
            .entries_for_mod(id)
            .into_iter()
            .cloned()
            .collect();
        entries.sort_by(|a, b| {
            (&a.path, a.recorded_at, a.entry_id).cmp(&(&b.path, b.recorded_at, b.entry_id))
        });
        let doc = ModDocument {
            version: "1.0".to_string(),
            mod_info: mod_info.clone(),
            entries,
        };
        Ok(serde_json::to_string_pretty(&doc)? + "\n")
    }

    /// Persist every mod document into `dir`, atomically per file.
    pub fn save_to_dir(&self, dir: &Path) -> Result<()> {
        for id in self.mods.keys() {
            let rendered = self.render_document(id)?;
            io::write_atomic(&self.document_path(dir, id), rendered.as_bytes())?;
        }
        Ok(())
    }

    /// Load a store from a directory of mod documents.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedDocument` for files that do not parse as
    /// provenance documents.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let mut store = Self::new();
        let mut entries: Vec<ProvenanceEntry> = Vec::new();

        let dir_entries = std::fs::read_dir(dir).map_err(|e| prov_fs::Error::io(dir, e))?;
        for dir_entry in dir_entries {
            let dir_entry = dir_entry.map_err(|e| prov_fs::Error::io(dir, e))?;
            let path = dir_entry.path();
            if !path
                .file_name()
                .is_some_and(|n| n.to_string_lossy().ends_with(DOC_SUFFIX))
            {
                continue;
            }
            let text = io::read_text(&path)?;
            let doc: ModDocument =
                serde_json::from_str(&text).map_err(|e| Error::MalformedDocument {
                    path: path.clone(),
                    message: e.to_string(),
                })?;
            store.add_mod(doc.mod_info)?;
            entries.extend(doc.entries);
        }

        // Interleave entries from all documents into per-path history in
        // recording order.
        entries.sort_by(|a, b| (a.recorded_at, a.entry_id).cmp(&(b.recorded_at, b.entry_id)));
        for entry in entries {
            store
                .history
                .entry(entry.path.clone())
                .or_default()
                .push(entry);
        }
        Ok(store)
    }

    /// Unified diff between the persisted document and the in-memory state
    /// for one mod. Empty when in sync.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownMod` for an unregistered id; a missing disk
    /// file diffs against the empty string.
    pub fn diff_against_disk(&self, dir: &Path, id: &ModId) -> Result<String> {
        let rendered = self.render_document(id)?;
        let doc_path = self.document_path(dir, id);
        let on_disk = if doc_path.is_file() {
            io::read_text(&doc_path)?
        } else {
            String::new()
        };
        if on_disk == rendered {
            return Ok(String::new());
        }
        let diff = similar::TextDiff::from_lines(on_disk.as_str(), rendered.as_str());
        Ok(diff
            .unified_diff()
            .header("disk", "memory")
            .to_string())
    }

    fn document_path(&self, dir: &Path, id: &ModId) -> PathBuf {
        dir.join(format!("{id}{DOC_SUFFIX}"))
    }
}

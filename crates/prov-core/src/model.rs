//! Mods, modpacks, and provenance entries

use chrono::{DateTime, Utc};
use prov_fs::{ContentHash, RelPath};
use prov_instr::{FileSource, OptionSelections, SolvedInstall};
use semver::Version;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Identifier of a mod: a non-empty lowercase slug.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModId(String);

impl ModId {
    /// Validate and build a mod id.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidModId` if the id is empty or contains
    /// characters other than lowercase alphanumerics, `-`, `_`, `.`.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(Error::InvalidModId {
                id,
                reason: "empty id".to_string(),
            });
        }
        if !id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.'))
        {
            return Err(Error::InvalidModId {
                id,
                reason: "only lowercase alphanumerics, '-', '_', '.' allowed".to_string(),
            });
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ModId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ModId> for String {
    fn from(id: ModId) -> String {
        id.0
    }
}

impl std::fmt::Display for ModId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How one tracked file came to exist.
///
/// The unit of truth for reconciliation: replaying `instruction_id` with
/// `selections` against the manifest of `archive` must reproduce `hash` at
/// `path`. Entries are superseded, never edited; `retracted` marks entries
/// of removed mods without losing the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceEntry {
    /// Stable identity of this entry across supersessions.
    pub entry_id: Uuid,
    /// Where the file lives, relative to the managed root.
    pub path: RelPath,
    /// The mod this entry belongs to.
    pub mod_id: ModId,
    /// Digest of the source archive.
    pub archive: ContentHash,
    /// Instruction document that produced the file.
    pub instruction_id: String,
    /// Option selections the instruction was resolved with.
    pub selections: OptionSelections,
    /// Path of the originating entry inside the archive, when the file is
    /// a verbatim or patched copy of one; `None` for tool outputs.
    pub source_entry: Option<RelPath>,
    /// Content digest at install time.
    pub hash: ContentHash,
    /// When the entry was recorded.
    pub recorded_at: DateTime<Utc>,
    /// Set when the owning mod was removed; the entry stays as history.
    #[serde(default)]
    pub retracted: bool,
}

/// One installed mod and its managed area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mod {
    pub id: ModId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Version>,
    /// Where the mod came from (download page, pack reference).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    /// The directory this mod owns; files under it with no provenance are
    /// unexpected rather than merely unknown.
    pub root: RelPath,
    /// Set when the mod was removed; kept for history, no longer managing
    /// its root.
    #[serde(default)]
    pub retracted: bool,
}

/// One member of a modpack: a mod plus the instructions that install it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModPackMember {
    pub mod_id: ModId,
    pub instruction_id: String,
    pub archive: ContentHash,
}

/// A versioned, shareable bundle of mods and install instructions.
///
/// Upgrading a pack means re-resolving member instructions against newer
/// archive manifests, which records a new generation of provenance entries;
/// the old generation stays in history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModPack {
    pub id: String,
    pub version: Version,
    pub members: Vec<ModPackMember>,
}

/// Build provenance entries for one simulated install run.
///
/// Every file the simulation produced becomes one entry owned by `mod_id`,
/// stamped with the archive, instruction, and selections that reproduce it.
pub fn entries_from_simulation(
    mod_id: &ModId,
    archive: ContentHash,
    instruction_id: &str,
    selections: &OptionSelections,
    files: &prov_instr::SimulatedSet,
    recorded_at: DateTime<Utc>,
) -> Vec<ProvenanceEntry> {
    files
        .iter()
        .map(|(path, file)| ProvenanceEntry {
            entry_id: Uuid::new_v4(),
            path: path.clone(),
            mod_id: mod_id.clone(),
            archive,
            instruction_id: instruction_id.to_string(),
            selections: selections.clone(),
            source_entry: match &file.source {
                FileSource::Archive { entry } => Some(entry.clone()),
                FileSource::Patched { base } => Some(base.clone()),
                FileSource::Tool { .. } => None,
            },
            hash: file.hash,
            recorded_at,
            retracted: false,
        })
        .collect()
}

/// Build the provenance entries a solved reverse-install implies.
pub fn entries_from_solution(
    mod_id: &ModId,
    archive: ContentHash,
    solved: &SolvedInstall,
    recorded_at: DateTime<Utc>,
) -> Vec<ProvenanceEntry> {
    entries_from_simulation(
        mod_id,
        archive,
        &solved.instruction_id,
        &solved.selections,
        &solved.files,
        recorded_at,
    )
}

//! Shared setup for end-to-end scenarios.

// Not every test binary uses every helper.
#![allow(dead_code)]

use chrono::Utc;
use prov_core::{Mod, ModId, ProvenanceStore, entries_from_simulation};
use prov_fs::RelPath;
use prov_instr::{ContentSource, OptionSelections, SimulatedSet};
use prov_test_utils::{MemoryArchiveStore, TestTree};

/// `ArchiveAvailability` view over a [`MemoryArchiveStore`].
pub struct Availability<'a>(pub &'a MemoryArchiveStore);

impl prov_core::ArchiveAvailability for Availability<'_> {
    fn has_archive(&self, hash: &prov_fs::ContentHash) -> bool {
        self.0.contains(hash)
    }
}

/// Nothing is available; every restore must be flagged.
pub struct NothingAvailable;

impl prov_core::ArchiveAvailability for NothingAvailable {
    fn has_archive(&self, _hash: &prov_fs::ContentHash) -> bool {
        false
    }
}

pub fn rel(s: &str) -> RelPath {
    RelPath::new(s).unwrap()
}

pub fn test_mod(id: &str, root: &str) -> Mod {
    Mod {
        id: ModId::new(id).unwrap(),
        name: id.to_string(),
        version: None,
        origin: None,
        root: rel(root),
        retracted: false,
    }
}

/// Materialize a simulated install on disk under `prefix` and record its
/// provenance, the way an install step would.
pub fn install_simulation(
    tree: &TestTree,
    store: &mut ProvenanceStore,
    archives: &MemoryArchiveStore,
    mod_id: &ModId,
    archive: prov_fs::ContentHash,
    instruction_id: &str,
    selections: &OptionSelections,
    prefix: &str,
    files: &SimulatedSet,
) {
    // Rebase the simulated set under the mod's managed root.
    let mut rebased = SimulatedSet::new();
    for (path, file) in files {
        let target = rel(&format!("{prefix}/{path}"));
        tree.write(target.as_str(), &archives.read(&file.hash).unwrap());
        rebased.insert(target, file.clone());
    }
    for entry in entries_from_simulation(
        mod_id,
        archive,
        instruction_id,
        selections,
        &rebased,
        Utc::now(),
    ) {
        store.record(entry).unwrap();
    }
}

//! Pack upgrades: re-resolving instructions records a new generation of
//! provenance without losing the old one.

mod common;

use common::{Availability, install_simulation, rel, test_mod};
use pretty_assertions::assert_eq;
use prov_core::{
    DriftClassification, ModId, ModPack, ModPackMember, ProvenanceStore, classify, execute_plan,
    plan_healing,
};
use prov_fs::{ScanOptions, hash_bytes, scan_tree};
use prov_instr::{Engine, InstructionDocument, OptionSelections, Step};
use prov_test_utils::{DiskSink, MemoryArchiveStore, TestTree};

#[test]
fn upgrading_a_pack_supersedes_without_discarding_history() {
    let tree = TestTree::new();
    let mut archives = MemoryArchiveStore::new();

    let v1 = archives.add_archive(&[("skyui.swf", b"interface v1")]);
    let v2 = archives.add_archive(&[("skyui.swf", b"interface v2")]);
    assert_ne!(v1.archive_hash(), v2.archive_hash());

    let doc = InstructionDocument::new("base", "base install", vec![Step::ExtractAll { to: None }]);
    let mod_id = ModId::new("skyui").unwrap();
    let mut store = ProvenanceStore::new();
    store.add_mod(test_mod("skyui", "mods/skyui")).unwrap();

    // Generation 1: install from the v1 archive.
    let files_v1 = Engine::new()
        .simulate(&v1, &doc, &OptionSelections::none())
        .unwrap();
    install_simulation(
        &tree,
        &mut store,
        &archives,
        &mod_id,
        v1.archive_hash(),
        "base",
        &OptionSelections::none(),
        "mods/skyui",
        &files_v1,
    );

    let pack_v1 = ModPack {
        id: "my-pack".to_string(),
        version: semver::Version::new(1, 0, 0),
        members: vec![ModPackMember {
            mod_id: mod_id.clone(),
            instruction_id: "base".to_string(),
            archive: v1.archive_hash(),
        }],
    };

    // Generation 2: the pack moves to the v2 archive; the same instruction
    // document is re-resolved against the new manifest and re-recorded.
    let pack_v2 = ModPack {
        id: pack_v1.id.clone(),
        version: semver::Version::new(2, 0, 0),
        members: vec![ModPackMember {
            mod_id: mod_id.clone(),
            instruction_id: "base".to_string(),
            archive: v2.archive_hash(),
        }],
    };
    assert!(pack_v2.version > pack_v1.version);

    let files_v2 = Engine::new()
        .simulate(&v2, &doc, &OptionSelections::none())
        .unwrap();
    let mut rebased = prov_instr::SimulatedSet::new();
    for (path, file) in &files_v2 {
        rebased.insert(rel(&format!("mods/skyui/{path}")), file.clone());
    }
    for entry in prov_core::entries_from_simulation(
        &mod_id,
        v2.archive_hash(),
        "base",
        &OptionSelections::none(),
        &rebased,
        chrono::Utc::now(),
    ) {
        store.record(entry).unwrap();
    }

    // Both generations are retained; the new one is current.
    let path = rel("mods/skyui/skyui.swf");
    assert_eq!(store.history_for(&path).len(), 2);
    let current = store.current_for(&path).unwrap();
    assert_eq!(current.archive, v2.archive_hash());
    assert_eq!(current.hash, hash_bytes(b"interface v2"));
    assert_eq!(store.history_for(&path)[0].archive, v1.archive_hash());

    // The disk still holds v1 content, so it now counts as drift; healing
    // brings the managed area up to the new generation.
    let report = classify(&scan_tree(tree.root(), &ScanOptions::default()).unwrap(), &store);
    assert_eq!(
        report.classification(&path),
        Some(DriftClassification::ModifiedInPlace)
    );

    let plan = plan_healing(&report, &store, &Availability(&archives));
    let sink = DiskSink::new(
        tree.root().to_path_buf(),
        tree.root().join("overwrite"),
        &archives,
    );
    let healed = execute_plan(&plan, &sink);
    assert!(healed.failures.is_empty());
    assert_eq!(tree.read("mods/skyui/skyui.swf"), b"interface v2");

    let after = classify(&scan_tree(tree.root(), &ScanOptions::default()).unwrap(), &store);
    assert!(after.is_clean());
}

#[test]
fn retracting_a_mod_leaves_files_unknown_but_history_intact() {
    let tree = TestTree::new();
    let mut archives = MemoryArchiveStore::new();
    let manifest = archives.add_archive(&[("mod.esp", b"esp bytes")]);

    let doc = InstructionDocument::new("base", "base install", vec![Step::ExtractAll { to: None }]);
    let mod_id = ModId::new("doomed").unwrap();
    let mut store = ProvenanceStore::new();
    store.add_mod(test_mod("doomed", "mods/doomed")).unwrap();

    let files = Engine::new()
        .simulate(&manifest, &doc, &OptionSelections::none())
        .unwrap();
    install_simulation(
        &tree,
        &mut store,
        &archives,
        &mod_id,
        manifest.archive_hash(),
        "base",
        &OptionSelections::none(),
        "mods/doomed",
        &files,
    );

    store.retract_mod(&mod_id).unwrap();

    // No current entry, no managed root: the leftover file is unknown, and
    // healing will not touch it.
    let report = classify(&scan_tree(tree.root(), &ScanOptions::default()).unwrap(), &store);
    let path = rel("mods/doomed/mod.esp");
    assert_eq!(report.classification(&path), Some(DriftClassification::Unknown));
    assert_eq!(store.history_for(&path).len(), 1);
    assert!(store.history_for(&path)[0].retracted);
}

//! End-to-end reconciliation scenarios: install, drift, classify, heal.

mod common;

use common::{Availability, NothingAvailable, install_simulation, rel, test_mod};
use pretty_assertions::assert_eq;
use prov_core::{
    DriftClassification, ModId, ProvenanceStore, classify, execute_plan, plan_healing,
};
use prov_fs::{ScanOptions, hash_bytes, scan_tree};
use prov_instr::{Engine, InstructionDocument, OptionSelections, Step};
use prov_test_utils::{DiskSink, MemoryArchiveStore, TestTree};

struct Setup {
    tree: TestTree,
    archives: MemoryArchiveStore,
    store: ProvenanceStore,
}

/// Install one mod from a two-file archive and record its provenance.
fn installed_setup() -> Setup {
    prov_test_utils::logging::init();
    let tree = TestTree::new();
    let mut archives = MemoryArchiveStore::new();
    let manifest = archives.add_archive(&[
        ("skyui.swf", b"interface bytes"),
        ("skyui.esp", b"plugin bytes"),
    ]);

    let doc = InstructionDocument::new("base", "base install", vec![Step::ExtractAll { to: None }]);
    let files = Engine::new()
        .simulate(&manifest, &doc, &OptionSelections::none())
        .unwrap();

    let mut store = ProvenanceStore::new();
    let mod_id = ModId::new("skyui").unwrap();
    store.add_mod(test_mod("skyui", "mods/skyui")).unwrap();
    install_simulation(
        &tree,
        &mut store,
        &archives,
        &mod_id,
        manifest.archive_hash(),
        "base",
        &OptionSelections::none(),
        "mods/skyui",
        &files,
    );

    Setup {
        tree,
        archives,
        store,
    }
}

fn scan(setup: &Setup) -> prov_fs::ScanOutcome {
    scan_tree(setup.tree.root(), &ScanOptions::default()).unwrap()
}

#[test]
fn recorded_install_rescans_unchanged() {
    let setup = installed_setup();
    let report = classify(&scan(&setup), &setup.store);
    assert_eq!(report.len(), 2);
    assert!(report.is_clean());
}

#[test]
fn tampered_file_classifies_modified_and_heals_back() {
    let setup = installed_setup();
    let target = "mods/skyui/skyui.swf";

    setup.tree.write(target, b"tampered bytes");
    let report = classify(&scan(&setup), &setup.store);
    assert_eq!(
        report.classification(&rel(target)),
        Some(DriftClassification::ModifiedInPlace)
    );

    let plan = plan_healing(&report, &setup.store, &Availability(&setup.archives));
    let sink = DiskSink::new(
        setup.tree.root().to_path_buf(),
        setup.tree.root().join("overwrite"),
        &setup.archives,
    );
    let healed = execute_plan(&plan, &sink);
    assert!(healed.failures.is_empty());
    assert_eq!(sink.restored(), vec![rel(target)]);

    // Post-heal, the original recorded content is back.
    let report = classify(&scan(&setup), &setup.store);
    assert_eq!(
        report.classification(&rel(target)),
        Some(DriftClassification::Unchanged)
    );
    assert_eq!(setup.tree.read(target), b"interface bytes");
    assert_eq!(
        setup.store.current_for(&rel(target)).unwrap().hash,
        hash_bytes(b"interface bytes")
    );
}

#[test]
fn deleted_file_classifies_missing_and_is_restored() {
    let setup = installed_setup();
    let target = "mods/skyui/skyui.esp";

    setup.tree.remove(target);
    let report = classify(&scan(&setup), &setup.store);
    assert_eq!(
        report.classification(&rel(target)),
        Some(DriftClassification::MissingExpected)
    );

    let plan = plan_healing(&report, &setup.store, &Availability(&setup.archives));
    let sink = DiskSink::new(
        setup.tree.root().to_path_buf(),
        setup.tree.root().join("overwrite"),
        &setup.archives,
    );
    execute_plan(&plan, &sink);

    setup.tree.assert_exists(target);
    assert_eq!(setup.tree.read(target), b"plugin bytes");
}

#[test]
fn stray_file_in_managed_area_moves_to_overwrite() {
    let setup = installed_setup();
    setup.tree.write("mods/skyui/stray.ini", b"user edit");

    let report = classify(&scan(&setup), &setup.store);
    assert_eq!(
        report.classification(&rel("mods/skyui/stray.ini")),
        Some(DriftClassification::NewUnexpected)
    );

    let plan = plan_healing(&report, &setup.store, &Availability(&setup.archives));
    let sink = DiskSink::new(
        setup.tree.root().to_path_buf(),
        setup.tree.root().join("overwrite"),
        &setup.archives,
    );
    let healed = execute_plan(&plan, &sink);
    assert!(healed.failures.is_empty());

    // Moved, not deleted: the bytes survive in the overwrite area.
    setup.tree.assert_absent("mods/skyui/stray.ini");
    setup
        .tree
        .assert_exists("overwrite/mods/skyui/stray.ini");
    assert_eq!(
        setup.tree.read("overwrite/mods/skyui/stray.ini"),
        b"user edit"
    );
}

#[test]
fn file_outside_managed_areas_stays_unknown_and_untouched() {
    let setup = installed_setup();
    setup.tree.write("downloads/loose.7z", b"archive bytes");

    let report = classify(&scan(&setup), &setup.store);
    assert_eq!(
        report.classification(&rel("downloads/loose.7z")),
        Some(DriftClassification::Unknown)
    );

    let plan = plan_healing(&report, &setup.store, &Availability(&setup.archives));
    let sink = DiskSink::new(
        setup.tree.root().to_path_buf(),
        setup.tree.root().join("overwrite"),
        &setup.archives,
    );
    execute_plan(&plan, &sink);
    setup.tree.assert_exists("downloads/loose.7z");
}

#[test]
fn healing_is_idempotent() {
    let setup = installed_setup();
    setup.tree.write("mods/skyui/skyui.swf", b"tampered");
    setup.tree.write("mods/skyui/stray.ini", b"user edit");

    let sink = DiskSink::new(
        setup.tree.root().to_path_buf(),
        setup.tree.root().join("overwrite"),
        &setup.archives,
    );

    let first = plan_healing(
        &classify(&scan(&setup), &setup.store),
        &setup.store,
        &Availability(&setup.archives),
    );
    assert!(!first.is_noop());
    let report = execute_plan(&first, &sink);
    assert!(report.failures.is_empty());

    // A second pass over the healed tree has nothing left to do.
    let second = plan_healing(
        &classify(&scan(&setup), &setup.store),
        &setup.store,
        &Availability(&setup.archives),
    );
    assert!(second.is_noop());
}

#[test]
fn unavailable_archive_flags_instead_of_touching_the_file() {
    let setup = installed_setup();
    setup.tree.write("mods/skyui/skyui.swf", b"tampered bytes");

    let report = classify(&scan(&setup), &setup.store);
    let plan = plan_healing(&report, &setup.store, &NothingAvailable);
    let sink = DiskSink::new(
        setup.tree.root().to_path_buf(),
        setup.tree.root().join("overwrite"),
        &setup.archives,
    );
    let healed = execute_plan(&plan, &sink);

    assert_eq!(healed.flagged, vec![rel("mods/skyui/skyui.swf")]);
    assert!(healed.performed.is_empty());
    // The tampered file is surfaced, never reverted or removed blindly.
    assert_eq!(setup.tree.read("mods/skyui/skyui.swf"), b"tampered bytes");

    // Flagged entries stay flagged on a re-run; nothing oscillates.
    let again = plan_healing(
        &classify(&scan(&setup), &setup.store),
        &setup.store,
        &NothingAvailable,
    );
    assert!(matches!(
        again.actions.as_slice(),
        [prov_core::Action::FlagUnresolvable { .. }]
    ));
}

//! End-to-end provenance backfill: reverse-solving a pre-existing setup.

mod common;

use std::collections::BTreeMap;

use chrono::Utc;
use common::{rel, test_mod};
use pretty_assertions::assert_eq;
use prov_core::{ModId, ProvenanceStore, classify, entries_from_simulation};
use prov_fs::{ScanOptions, scan_tree};
use prov_instr::{
    InstructionDocument, InstructionTemplate, ObservedSet, OptionBranch, OptionSelections,
    OptionSpec, SolveOutcome, Step, TemplateCatalogue, solve, solve_parallel,
};
use prov_test_utils::{MemoryArchiveStore, TestTree};

/// T1: plain full extract.
fn t1() -> InstructionTemplate {
    InstructionTemplate::fixed(InstructionDocument::new(
        "t1",
        "plain extract",
        vec![Step::ExtractAll { to: None }],
    ))
}

/// T2: one variant folder selected by option.
fn t2() -> InstructionTemplate {
    InstructionTemplate {
        document: InstructionDocument::new(
            "t2",
            "variant install",
            vec![Step::SelectByOption {
                option: "variant".to_string(),
                default: None,
                branches: vec![
                    OptionBranch {
                        value: "a".to_string(),
                        steps: vec![Step::ExtractSubset {
                            source: rel("variant_a"),
                            dest: None,
                        }],
                    },
                    OptionBranch {
                        value: "b".to_string(),
                        steps: vec![Step::ExtractSubset {
                            source: rel("variant_b"),
                            dest: None,
                        }],
                    },
                ],
            }],
        ),
        options: vec![OptionSpec::new("variant", ["a", "b"])],
        presets: Vec::new(),
    }
}

fn catalogue() -> TemplateCatalogue {
    let mut cat = TemplateCatalogue::new();
    cat.register("fomod", t1());
    cat.register("fomod", t2());
    cat
}

/// The observed file set of one mod root, paths relative to that root.
fn observe_mod_root(tree: &TestTree, mod_root: &str) -> ObservedSet {
    let outcome = scan_tree(tree.root(), &ScanOptions::default()).unwrap();
    let root = rel(mod_root);
    let mut observed = BTreeMap::new();
    for (path, record) in &outcome.records {
        if let Some(remainder) = path.strip_dir(&root) {
            observed.insert(rel(remainder), record.hash);
        }
    }
    observed
}

#[test]
fn backfills_provenance_for_a_pre_existing_install() {
    prov_test_utils::logging::init();

    // A setup installed long ago, with nothing recorded: variant B of the
    // archive, extracted into the mod folder.
    let tree = TestTree::new();
    let mut archives = MemoryArchiveStore::new();
    let manifest = archives.add_archive(&[
        ("variant_a/mod.esp", b"esp variant a"),
        ("variant_b/mod.esp", b"esp variant b"),
    ]);
    tree.write("mods/legacy/mod.esp", b"esp variant b");

    let mut store = ProvenanceStore::new();
    let mod_id = ModId::new("legacy").unwrap();
    store.add_mod(test_mod("legacy", "mods/legacy")).unwrap();

    // Before backfill the file is unexpected: tracked area, no record.
    let before = classify(&scan_tree(tree.root(), &ScanOptions::default()).unwrap(), &store);
    assert_eq!(
        before.classification(&rel("mods/legacy/mod.esp")),
        Some(prov_core::DriftClassification::NewUnexpected)
    );

    // Reverse-solve against the registered templates.
    let observed = observe_mod_root(&tree, "mods/legacy");
    let cat = catalogue();
    let report = solve(&manifest, &observed, cat.templates("fomod"), None);
    let solved = report.outcome.matched().expect("T2/b must match");
    assert_eq!(solved.instruction_id, "t2");
    assert_eq!(
        solved.selections,
        OptionSelections::from_pairs([("variant", "b")])
    );

    // Record the reconstructed provenance, rebased under the mod root.
    let mut rebased = prov_instr::SimulatedSet::new();
    for (path, file) in &solved.files {
        rebased.insert(rel(&format!("mods/legacy/{path}")), file.clone());
    }
    for entry in entries_from_simulation(
        &mod_id,
        manifest.archive_hash(),
        &solved.instruction_id,
        &solved.selections,
        &rebased,
        Utc::now(),
    ) {
        store.record(entry).unwrap();
    }

    // The same disk state now reconciles clean.
    let after = classify(&scan_tree(tree.root(), &ScanOptions::default()).unwrap(), &store);
    assert_eq!(
        after.classification(&rel("mods/legacy/mod.esp")),
        Some(prov_core::DriftClassification::Unchanged)
    );

    // And replaying the recorded instruction reproduces the recorded hash.
    let entry = store.current_for(&rel("mods/legacy/mod.esp")).unwrap();
    let replayed = prov_instr::Engine::new()
        .simulate(&manifest, &t2().document, &entry.selections)
        .unwrap();
    assert_eq!(replayed[&rel("mod.esp")].hash, entry.hash);
}

#[test]
fn unsolvable_setup_reports_unresolved_and_stays_unknown() {
    let tree = TestTree::new();
    let mut archives = MemoryArchiveStore::new();
    let manifest = archives.add_archive(&[("variant_a/mod.esp", b"esp variant a")]);
    tree.write("loose/handmade.esp", b"hand-crafted bytes");

    let observed = observe_mod_root(&tree, "loose");
    let cat = catalogue();
    let report = solve_parallel(
        &manifest,
        &observed,
        cat.templates("fomod"),
        None,
        &prov_instr::SolveOptions::default(),
    );

    match &report.outcome {
        SolveOutcome::Unresolved { archive, observed } => {
            assert_eq!(*archive, manifest.archive_hash());
            assert_eq!(observed.len(), 1);
        }
        SolveOutcome::Match(_) => panic!("nothing should match hand-crafted bytes"),
    }

    // Provenance stays unrecorded; the files classify as unknown, which is
    // a diagnostic state, not an error.
    let store = ProvenanceStore::new();
    let classified = classify(&scan_tree(tree.root(), &ScanOptions::default()).unwrap(), &store);
    assert_eq!(
        classified.classification(&rel("loose/handmade.esp")),
        Some(prov_core::DriftClassification::Unknown)
    );
}

//! Drift classification
//!
//! Compares one live scan against the provenance store and labels every
//! path. The result is derived state: it is computed fresh on every run and
//! never persisted, because external tools may touch files between runs and
//! a stale classification would claim certainty the disk no longer backs.

use std::collections::BTreeMap;

use prov_fs::{Completion, RelPath, ScanOutcome};
use serde::{Deserialize, Serialize};

use crate::store::ProvenanceStore;

/// How one path relates to its recorded provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriftClassification {
    /// On disk with the exact recorded content.
    Unchanged,
    /// On disk, tracked, but content differs from the record.
    ModifiedInPlace,
    /// On disk inside a mod's managed area with no provenance.
    NewUnexpected,
    /// Tracked but absent from disk.
    MissingExpected,
    /// On disk under no mod's managed area and never tracked.
    Unknown,
}

/// Classification of every path seen by a scan or known to the store.
#[derive(Debug)]
pub struct DriftReport {
    classifications: BTreeMap<RelPath, DriftClassification>,
    /// Carried over from the scan: paths that could not be hashed.
    pub scan_failures: usize,
    /// Whether the underlying scan was complete; a partial scan makes
    /// `MissingExpected` conclusions unreliable.
    pub completion: Completion,
}

impl DriftReport {
    /// The classification for one path, if it was seen.
    pub fn classification(&self, path: &RelPath) -> Option<DriftClassification> {
        self.classifications.get(path).copied()
    }

    /// All (path, classification) pairs in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&RelPath, DriftClassification)> {
        self.classifications.iter().map(|(p, c)| (p, *c))
    }

    /// Paths with a given classification, in path order.
    pub fn paths_with(&self, wanted: DriftClassification) -> Vec<&RelPath> {
        self.classifications
            .iter()
            .filter(|(_, c)| **c == wanted)
            .map(|(p, _)| p)
            .collect()
    }

    /// Count of paths with a given classification.
    pub fn count(&self, wanted: DriftClassification) -> usize {
        self.classifications.values().filter(|c| **c == wanted).count()
    }

    /// Whether every path is `Unchanged`.
    pub fn is_clean(&self) -> bool {
        self.classifications
            .values()
            .all(|c| *c == DriftClassification::Unchanged)
    }

    /// Total number of classified paths.
    pub fn len(&self) -> usize {
        self.classifications.len()
    }

    /// Whether nothing was classified.
    pub fn is_empty(&self) -> bool {
        self.classifications.is_empty()
    }
}

/// Classify every path from `scan` and every tracked path in `store`.
///
/// Rules, per path: tracked but not on disk → `MissingExpected`; on disk
/// and tracked → `Unchanged` or `ModifiedInPlace` by hash comparison; on
/// disk and untracked → `NewUnexpected` when some mod's managed root
/// contains it, otherwise `Unknown`.
pub fn classify(scan: &ScanOutcome, store: &ProvenanceStore) -> DriftReport {
    let mut classifications = BTreeMap::new();

    for (path, record) in &scan.records {
        let classification = match store.current_for(path) {
            Some(entry) => {
                if entry.hash == record.hash {
                    DriftClassification::Unchanged
                } else {
                    DriftClassification::ModifiedInPlace
                }
            }
            None => {
                if store.mod_for_path(path).is_some() {
                    DriftClassification::NewUnexpected
                } else {
                    DriftClassification::Unknown
                }
            }
        };
        classifications.insert(path.clone(), classification);
    }

    for (path, _entry) in store.current_entries() {
        if !scan.records.contains_key(path) {
            classifications.insert(path.clone(), DriftClassification::MissingExpected);
        }
    }

    let report = DriftReport {
        classifications,
        scan_failures: scan.failures.len(),
        completion: scan.completion,
    };
    tracing::debug!(
        paths = report.len(),
        unchanged = report.count(DriftClassification::Unchanged),
        modified = report.count(DriftClassification::ModifiedInPlace),
        unexpected = report.count(DriftClassification::NewUnexpected),
        missing = report.count(DriftClassification::MissingExpected),
        unknown = report.count(DriftClassification::Unknown),
        "classified scan"
    );
    report
}

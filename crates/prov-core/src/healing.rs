//! Healing: minimal corrective actions for drifted state
//!
//! Turns a drift report into an ordered action plan and executes it against
//! the overwrite/VFS layer. Two rules are absolute: unexpected files are
//! moved aside, never deleted, and a tracked file is only restored from a
//! source that provably matches its provenance — anything else is flagged
//! for the operator instead of silently skipped or destroyed.

use prov_archive::OverwriteSink;
use prov_fs::{ContentHash, RelPath};
use serde::{Deserialize, Serialize};

use crate::classify::{DriftClassification, DriftReport};
use crate::store::ProvenanceStore;

/// Availability of archive bytes (or a manifest-equivalent source) for
/// restoration.
pub trait ArchiveAvailability {
    fn has_archive(&self, hash: &ContentHash) -> bool;
}

/// One corrective action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Move an unexpected file out of the managed area, preserving it.
    MoveToOverwrite { path: RelPath },
    /// Re-extract a file from its source archive.
    RestoreFromArchive {
        path: RelPath,
        archive: ContentHash,
        entry: RelPath,
    },
    /// Leave the path alone (unknown files are not ours to touch).
    Ignore { path: RelPath },
    /// Healing cannot proceed safely; surfaced to the operator.
    FlagUnresolvable { path: RelPath, reason: String },
}

impl Action {
    /// The path this action concerns.
    pub fn path(&self) -> &RelPath {
        match self {
            Action::MoveToOverwrite { path }
            | Action::RestoreFromArchive { path, .. }
            | Action::Ignore { path }
            | Action::FlagUnresolvable { path, .. } => path,
        }
    }
}

/// Ordered corrective actions for one drift report.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealingPlan {
    pub actions: Vec<Action>,
}

impl HealingPlan {
    /// Actions that will modify the filesystem (moves and restores).
    pub fn effective_actions(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter().filter(|a| {
            matches!(
                a,
                Action::MoveToOverwrite { .. } | Action::RestoreFromArchive { .. }
            )
        })
    }

    /// Whether the plan would change nothing on disk.
    pub fn is_noop(&self) -> bool {
        self.effective_actions().next().is_none()
    }
}

/// A failure executing one action; the rest of the plan continues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealingFailure {
    pub path: RelPath,
    pub message: String,
}

/// Result of executing a plan.
#[derive(Debug, Default)]
pub struct HealingReport {
    /// Paths moved or restored successfully.
    pub performed: Vec<RelPath>,
    /// Paths flagged for the operator.
    pub flagged: Vec<RelPath>,
    /// Per-path execution failures.
    pub failures: Vec<HealingFailure>,
}

/// Build the corrective plan for a drift report.
///
/// Per classification: `NewUnexpected` → move to overwrite;
/// `ModifiedInPlace` / `MissingExpected` → restore when the source archive
/// is available and the entry records its archive-internal origin,
/// otherwise flag; `Unknown` → ignore; `Unchanged` → nothing.
pub fn plan_healing(
    report: &DriftReport,
    store: &ProvenanceStore,
    availability: &dyn ArchiveAvailability,
) -> HealingPlan {
    let mut actions = Vec::new();

    for (path, classification) in report.iter() {
        match classification {
            DriftClassification::Unchanged => {}
            DriftClassification::NewUnexpected => {
                actions.push(Action::MoveToOverwrite { path: path.clone() });
            }
            DriftClassification::Unknown => {
                actions.push(Action::Ignore { path: path.clone() });
            }
            DriftClassification::ModifiedInPlace | DriftClassification::MissingExpected => {
                let action = match store.current_for(path) {
                    Some(entry) => match (&entry.source_entry, availability.has_archive(&entry.archive)) {
                        (Some(source_entry), true) => Action::RestoreFromArchive {
                            path: path.clone(),
                            archive: entry.archive,
                            entry: source_entry.clone(),
                        },
                        (None, _) => Action::FlagUnresolvable {
                            path: path.clone(),
                            reason: "recorded content came from a tool, not an archive entry"
                                .to_string(),
                        },
                        (_, false) => Action::FlagUnresolvable {
                            path: path.clone(),
                            reason: format!("source archive {} is not available", entry.archive),
                        },
                    },
                    // Classification said tracked, store disagrees now:
                    // treat as unresolvable rather than guessing.
                    None => Action::FlagUnresolvable {
                        path: path.clone(),
                        reason: "no current provenance entry".to_string(),
                    },
                };
                actions.push(action);
            }
        }
    }

    HealingPlan { actions }
}

/// Execute a plan against the overwrite/VFS layer.
///
/// Failures are per-action and never abort the run; `Ignore` and
/// `FlagUnresolvable` touch nothing.
pub fn execute_plan(plan: &HealingPlan, sink: &dyn OverwriteSink) -> HealingReport {
    let mut report = HealingReport::default();

    for action in &plan.actions {
        match action {
            Action::MoveToOverwrite { path } => match sink.move_to_overwrite(path) {
                Ok(()) => report.performed.push(path.clone()),
                Err(err) => {
                    tracing::warn!(path = %path, error = %err, "move to overwrite failed");
                    report.failures.push(HealingFailure {
                        path: path.clone(),
                        message: err.to_string(),
                    });
                }
            },
            Action::RestoreFromArchive {
                path,
                archive,
                entry,
            } => match sink.restore(path, archive, entry) {
                Ok(()) => report.performed.push(path.clone()),
                Err(err) => {
                    tracing::warn!(path = %path, error = %err, "restore failed");
                    report.failures.push(HealingFailure {
                        path: path.clone(),
                        message: err.to_string(),
                    });
                }
            },
            Action::Ignore { .. } => {}
            Action::FlagUnresolvable { path, reason } => {
                tracing::warn!(path = %path, reason = %reason, "unresolvable drift");
                report.flagged.push(path.clone());
            }
        }
    }

    report
}

//! Reverse install solving
//!
//! Given an archive manifest and an observed file set with no recorded
//! provenance, search the registered templates for an (instruction, option
//! selection) pair whose simulation reproduces the observation exactly.
//! The search is exhaustive over a finite, enumerable candidate space —
//! presets first, then the declared option product — not heuristic
//! guessing. A failed search is a diagnostic outcome, not an error: the
//! operator may register more templates or accept the files as unknown.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use prov_archive::ArchiveManifest;
use prov_fs::{Completion, ContentHash, RelPath};

use crate::engine::{ContentSource, Engine, SimulatedSet};
use crate::options::{InstructionTemplate, OptionSelections};

/// The file set whose provenance is being reconstructed.
pub type ObservedSet = BTreeMap<RelPath, ContentHash>;

/// A successful reconstruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolvedInstall {
    /// Id of the matched instruction document.
    pub instruction_id: String,
    /// The option selections that reproduce the observation.
    pub selections: OptionSelections,
    /// The matching simulated output (path, hash, size, source per file).
    pub files: SimulatedSet,
}

/// Outcome of a solve run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveOutcome {
    /// A candidate reproduced the observed set exactly.
    Match(SolvedInstall),
    /// Every candidate was tried (or the deadline hit) without a match.
    Unresolved {
        archive: ContentHash,
        observed: ObservedSet,
    },
}

impl SolveOutcome {
    /// The solved install, if any.
    pub fn matched(&self) -> Option<&SolvedInstall> {
        match self {
            SolveOutcome::Match(solved) => Some(solved),
            SolveOutcome::Unresolved { .. } => None,
        }
    }
}

/// Outcome plus search accounting.
#[derive(Debug)]
pub struct SolveReport {
    pub outcome: SolveOutcome,
    /// Whether the search ran to exhaustion or hit its soft deadline.
    pub completion: Completion,
    /// Candidates simulated before stopping.
    pub candidates_tried: usize,
}

/// Search tuning for [`solve_parallel`].
#[derive(Debug, Clone)]
pub struct SolveOptions {
    pub workers: usize,
    pub soft_timeout: Option<Duration>,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            soft_timeout: None,
        }
    }
}

/// Sequentially search `templates` for a candidate reproducing `observed`.
///
/// Candidates are tried template by template in slice order; within a
/// template, presets first, then the declared option product. Candidates
/// whose simulation errors (malformed for this manifest, missing content)
/// are skipped — an error only rules the candidate out.
pub fn solve(
    manifest: &ArchiveManifest,
    observed: &ObservedSet,
    templates: &[InstructionTemplate],
    content: Option<&dyn ContentSource>,
) -> SolveReport {
    let cancelled = AtomicBool::new(false);
    let mut tried = 0usize;
    let outcome = solve_slice(manifest, observed, templates, content, &cancelled, None, &mut tried);
    SolveReport {
        outcome: outcome.unwrap_or_else(|| unresolved(manifest, observed)),
        completion: if cancelled.load(Ordering::Relaxed) {
            Completion::Partial
        } else {
            Completion::Complete
        },
        candidates_tried: tried,
    }
}

/// Search with the templates partitioned across a fixed worker pool.
///
/// The first worker to find a match raises a shared cancellation flag; the
/// others stop at their next candidate boundary. A soft timeout raises the
/// same flag and the report comes back `Partial` with progress retained.
pub fn solve_parallel(
    manifest: &ArchiveManifest,
    observed: &ObservedSet,
    templates: &[InstructionTemplate],
    content: Option<&(dyn ContentSource + Sync)>,
    options: &SolveOptions,
) -> SolveReport {
    if templates.is_empty() {
        return SolveReport {
            outcome: unresolved(manifest, observed),
            completion: Completion::Complete,
            candidates_tried: 0,
        };
    }

    let started = Instant::now();
    let deadline = options.soft_timeout.map(|t| started + t);
    let workers = options.workers.max(1);
    let chunk_size = templates.len().div_ceil(workers).max(1);

    let cancelled = AtomicBool::new(false);
    let timed_out = AtomicBool::new(false);
    let found: Mutex<Option<SolveOutcome>> = Mutex::new(None);
    let total_tried = Mutex::new(0usize);

    std::thread::scope(|scope| {
        for chunk in templates.chunks(chunk_size) {
            let cancelled = &cancelled;
            let timed_out = &timed_out;
            let found = &found;
            let total_tried = &total_tried;
            scope.spawn(move || {
                let mut tried = 0usize;
                let content_ref = content.map(|c| c as &dyn ContentSource);
                let outcome = solve_slice(
                    manifest,
                    observed,
                    chunk,
                    content_ref,
                    cancelled,
                    deadline.map(|d| (d, timed_out)),
                    &mut tried,
                );
                if let Some(matched) = outcome {
                    let mut slot = found.lock().expect("solver result lock");
                    // Two workers can match simultaneously; the first
                    // locked-in result wins, matching the sequential
                    // template order is not guaranteed in that race.
                    if slot.is_none() {
                        *slot = Some(matched);
                    }
                    cancelled.store(true, Ordering::Relaxed);
                }
                *total_tried.lock().expect("solver counter lock") += tried;
            });
        }
    });

    let outcome = found
        .lock()
        .expect("solver result lock")
        .take()
        .unwrap_or_else(|| unresolved(manifest, observed));
    let candidates_tried = *total_tried.lock().expect("solver counter lock");

    let elapsed_ms = started.elapsed().as_millis() as u64;
    tracing::debug!(
        archive = %manifest.archive_hash(),
        candidates_tried,
        matched = outcome.matched().is_some(),
        elapsed_ms,
        "reverse solve finished"
    );

    SolveReport {
        outcome,
        completion: if timed_out.load(Ordering::Relaxed) {
            Completion::Partial
        } else {
            Completion::Complete
        },
        candidates_tried,
    }
}

fn unresolved(manifest: &ArchiveManifest, observed: &ObservedSet) -> SolveOutcome {
    SolveOutcome::Unresolved {
        archive: manifest.archive_hash(),
        observed: observed.clone(),
    }
}

/// Try every candidate of every template in the slice, polling the
/// cancellation flag between candidates.
fn solve_slice(
    manifest: &ArchiveManifest,
    observed: &ObservedSet,
    templates: &[InstructionTemplate],
    content: Option<&dyn ContentSource>,
    cancelled: &AtomicBool,
    deadline: Option<(Instant, &AtomicBool)>,
    tried: &mut usize,
) -> Option<SolveOutcome> {
    let engine = match content {
        Some(source) => Engine::with_content(source),
        None => Engine::new(),
    };

    for template in templates {
        for selections in template.candidates() {
            if cancelled.load(Ordering::Relaxed) {
                return None;
            }
            if let Some((deadline, timed_out)) = deadline
                && Instant::now() >= deadline
            {
                timed_out.store(true, Ordering::Relaxed);
                cancelled.store(true, Ordering::Relaxed);
                return None;
            }

            *tried += 1;
            let simulated = match engine.simulate(manifest, &template.document, &selections) {
                Ok(set) => set,
                Err(err) => {
                    tracing::trace!(
                        instruction = %template.document.id,
                        error = %err,
                        "candidate ruled out by simulation error"
                    );
                    continue;
                }
            };

            if matches_observed(&simulated, observed) {
                return Some(SolveOutcome::Match(SolvedInstall {
                    instruction_id: template.document.id.clone(),
                    selections,
                    files: simulated,
                }));
            }
        }
    }
    None
}

/// Exact equality of (path → hash) between simulation and observation.
fn matches_observed(simulated: &SimulatedSet, observed: &ObservedSet) -> bool {
    simulated.len() == observed.len()
        && simulated
            .iter()
            .all(|(path, file)| observed.get(path) == Some(&file.hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::{InstructionDocument, OptionBranch, Step};
    use crate::options::OptionSpec;
    use prov_archive::ArchiveEntry;
    use prov_fs::hash_bytes;

    fn rel(s: &str) -> RelPath {
        RelPath::new(s).unwrap()
    }

    fn entry(path: &str, content: &[u8]) -> ArchiveEntry {
        ArchiveEntry {
            path: rel(path),
            hash: hash_bytes(content),
            size: content.len() as u64,
        }
    }

    fn manifest() -> ArchiveManifest {
        ArchiveManifest::new(
            hash_bytes(b"archive"),
            vec![
                entry("variant_a/mod.esp", b"esp variant a"),
                entry("variant_b/mod.esp", b"esp variant b"),
            ],
        )
    }

    /// T1: extracts everything verbatim.
    fn t1() -> InstructionTemplate {
        InstructionTemplate::fixed(InstructionDocument::new(
            "t1",
            "plain extract",
            vec![Step::ExtractAll { to: None }],
        ))
    }

    /// T2: picks one variant folder by option.
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

    fn observed_variant_b() -> ObservedSet {
        BTreeMap::from([(rel("mod.esp"), hash_bytes(b"esp variant b"))])
    }

    #[test]
    fn finds_the_unique_matching_template_and_options() {
        let report = solve(&manifest(), &observed_variant_b(), &[t1(), t2()], None);
        let solved = report.outcome.matched().expect("should match");
        assert_eq!(solved.instruction_id, "t2");
        assert_eq!(
            solved.selections,
            OptionSelections::from_pairs([("variant", "b")])
        );
        assert_eq!(report.completion, Completion::Complete);
        // t1, then t2 with variant=a, then the match.
        assert_eq!(report.candidates_tried, 3);
    }

    #[test]
    fn exhaustion_reports_unresolved_with_observation() {
        let observed = BTreeMap::from([(rel("other.esp"), hash_bytes(b"unrelated"))]);
        let report = solve(&manifest(), &observed, &[t1(), t2()], None);
        match report.outcome {
            SolveOutcome::Unresolved { archive, observed } => {
                assert_eq!(archive, manifest().archive_hash());
                assert_eq!(observed.len(), 1);
            }
            SolveOutcome::Match(_) => panic!("must not match"),
        }
        assert_eq!(report.candidates_tried, 3);
    }

    #[test]
    fn preset_shortcut_is_tried_first() {
        let mut template = t2();
        template.presets = vec![OptionSelections::from_pairs([("variant", "b")])];
        let report = solve(&manifest(), &observed_variant_b(), &[template], None);
        assert!(report.outcome.matched().is_some());
        assert_eq!(report.candidates_tried, 1);
    }

    #[test]
    fn extra_observed_file_prevents_match() {
        let mut observed = observed_variant_b();
        observed.insert(rel("stray.txt"), hash_bytes(b"stray"));
        let report = solve(&manifest(), &observed, &[t1(), t2()], None);
        assert!(report.outcome.matched().is_none());
    }

    #[test]
    fn parallel_solve_agrees_with_sequential() {
        let templates = [t1(), t2()];
        let sequential = solve(&manifest(), &observed_variant_b(), &templates, None);
        let parallel = solve_parallel(
            &manifest(),
            &observed_variant_b(),
            &templates,
            None,
            &SolveOptions {
                workers: 4,
                soft_timeout: None,
            },
        );
        assert_eq!(
            sequential.outcome.matched().map(|s| &s.instruction_id),
            parallel.outcome.matched().map(|s| &s.instruction_id)
        );
        assert_eq!(parallel.completion, Completion::Complete);
    }

    #[test]
    fn parallel_solve_with_no_templates_is_unresolved() {
        let report = solve_parallel(
            &manifest(),
            &observed_variant_b(),
            &[],
            None,
            &SolveOptions::default(),
        );
        assert!(report.outcome.matched().is_none());
        assert_eq!(report.candidates_tried, 0);
    }

    #[test]
    fn expired_deadline_reports_partial() {
        let report = solve_parallel(
            &manifest(),
            &observed_variant_b(),
            &[t1(), t2()],
            None,
            &SolveOptions {
                workers: 1,
                soft_timeout: Some(Duration::ZERO),
            },
        );
        assert_eq!(report.completion, Completion::Partial);
        assert!(report.outcome.matched().is_none());
    }
}

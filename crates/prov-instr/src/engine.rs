//! Deterministic instruction interpretation
//!
//! `simulate` computes the exact file set an install procedure produces,
//! from declarative data alone: the archive manifest, the instruction
//! document, and one option selection per decision point. Running it twice
//! with the same inputs yields the same output, which is what makes
//! replay-based verification and reverse solving possible.

use std::collections::BTreeMap;

use prov_archive::ArchiveManifest;
use prov_fs::{ContentHash, RelPath, hash_bytes};

use crate::doc::{InstructionDocument, PatchMode, Step};
use crate::options::OptionSelections;
use crate::patch::patch_ini;
use crate::{Error, Result};

/// Content-addressed blob access.
///
/// Patch steps are the only place simulation needs actual bytes; everything
/// else is pure manifest arithmetic. Blob storage is content-addressed so a
/// source can serve bytes long after the original archive is gone.
pub trait ContentSource {
    /// Fetch the bytes with the given digest.
    ///
    /// # Errors
    ///
    /// Returns `Error::ContentUnavailable` if the digest is unknown.
    fn read(&self, hash: &ContentHash) -> Result<Vec<u8>>;
}

/// Where a simulated file's content came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSource {
    /// Verbatim copy of an archive entry.
    Archive { entry: RelPath },
    /// An archive entry with a modeled text patch applied.
    Patched { base: RelPath },
    /// Declared output of an external tool step.
    Tool { tool: String },
}

/// One file in a simulated install output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedFile {
    pub hash: ContentHash,
    pub size: u64,
    pub source: FileSource,
}

/// The complete output of one simulated install, keyed by destination path.
pub type SimulatedSet = BTreeMap<RelPath, SimulatedFile>;

/// The instruction interpreter.
///
/// Stateless apart from an optional [`ContentSource`]; safe to share across
/// solver workers by reference.
#[derive(Default)]
pub struct Engine<'a> {
    content: Option<&'a dyn ContentSource>,
}

impl<'a> Engine<'a> {
    /// An engine without blob access; patch steps will report
    /// `ContentUnavailable`.
    pub fn new() -> Self {
        Self { content: None }
    }

    /// An engine that can patch text files using `content`.
    pub fn with_content(content: &'a dyn ContentSource) -> Self {
        Self {
            content: Some(content),
        }
    }

    /// Interpret `doc` against `manifest` under `selections`.
    ///
    /// # Errors
    ///
    /// - `UnresolvableOption` / `UnknownOptionValue` for underspecified or
    ///   out-of-domain selections
    /// - `StepPreconditionFailed` when a step references state no prior
    ///   step produced
    /// - `UnknownEntry` when an instruction references a path the manifest
    ///   does not contain
    /// - `ContentUnavailable` / `NotText` from patch steps
    pub fn simulate(
        &self,
        manifest: &ArchiveManifest,
        doc: &InstructionDocument,
        selections: &OptionSelections,
    ) -> Result<SimulatedSet> {
        let mut state = SimulatedSet::new();
        let mut step_counter = 0usize;
        self.apply_steps(manifest, &doc.steps, selections, &mut state, &mut step_counter)?;
        tracing::trace!(
            instruction = %doc.id,
            files = state.len(),
            "simulated install"
        );
        Ok(state)
    }

    fn apply_steps(
        &self,
        manifest: &ArchiveManifest,
        steps: &[Step],
        selections: &OptionSelections,
        state: &mut SimulatedSet,
        counter: &mut usize,
    ) -> Result<()> {
        for step in steps {
            *counter += 1;
            let step_no = *counter;
            match step {
                Step::ExtractAll { to } => {
                    for entry in manifest.entries() {
                        let dest = match to {
                            Some(prefix) => prefix.join(entry.path.as_str())?,
                            None => entry.path.clone(),
                        };
                        state.insert(
                            dest,
                            SimulatedFile {
                                hash: entry.hash,
                                size: entry.size,
                                source: FileSource::Archive {
                                    entry: entry.path.clone(),
                                },
                            },
                        );
                    }
                }

                Step::ExtractSubset { source, dest } => {
                    self.extract_subset(manifest, source, dest.as_ref(), state)?;
                }

                Step::Move { from, to } => {
                    move_produced(state, from, to, step_no)?;
                }

                Step::SelectByOption {
                    option,
                    default,
                    branches,
                } => {
                    let chosen = selections
                        .get(option)
                        .or(default.as_deref())
                        .ok_or_else(|| Error::UnresolvableOption {
                            option: option.clone(),
                        })?;
                    let branch = branches
                        .iter()
                        .find(|b| b.value == chosen)
                        .ok_or_else(|| Error::UnknownOptionValue {
                            option: option.clone(),
                            value: chosen.to_string(),
                        })?;
                    self.apply_steps(manifest, &branch.steps, selections, state, counter)?;
                }

                Step::PatchIniSegment {
                    path,
                    section,
                    key,
                    value,
                    mode,
                } => {
                    self.patch_file(path, section, key, value, *mode, state, step_no)?;
                }

                Step::InvokeTool {
                    tool,
                    inputs,
                    outputs,
                } => {
                    for input in inputs {
                        if !state.contains_key(input) {
                            return Err(Error::precondition(
                                step_no,
                                format!("tool input {input} was not produced"),
                            ));
                        }
                    }
                    for output in outputs {
                        state.insert(
                            output.path.clone(),
                            SimulatedFile {
                                hash: output.hash,
                                size: output.size,
                                source: FileSource::Tool { tool: tool.clone() },
                            },
                        );
                    }
                }
            }
        }
        Ok(())
    }

    fn extract_subset(
        &self,
        manifest: &ArchiveManifest,
        source: &RelPath,
        dest: Option<&RelPath>,
        state: &mut SimulatedSet,
    ) -> Result<()> {
        if let Some(entry) = manifest.entry(source) {
            let dest = dest.cloned().unwrap_or_else(|| source.clone());
            state.insert(
                dest,
                SimulatedFile {
                    hash: entry.hash,
                    size: entry.size,
                    source: FileSource::Archive {
                        entry: entry.path.clone(),
                    },
                },
            );
            return Ok(());
        }

        let mut any = false;
        for entry in manifest.entries_under(source) {
            any = true;
            let remainder = entry
                .path
                .strip_dir(source)
                .expect("entries_under guarantees the prefix");
            let dest_path = match dest {
                Some(d) => d.join(remainder)?,
                None => RelPath::new(remainder)?,
            };
            state.insert(
                dest_path,
                SimulatedFile {
                    hash: entry.hash,
                    size: entry.size,
                    source: FileSource::Archive {
                        entry: entry.path.clone(),
                    },
                },
            );
        }

        if any {
            Ok(())
        } else {
            Err(Error::UnknownEntry {
                path: source.clone(),
            })
        }
    }

    fn patch_file(
        &self,
        path: &RelPath,
        section: &str,
        key: &str,
        value: &str,
        mode: PatchMode,
        state: &mut SimulatedSet,
        step_no: usize,
    ) -> Result<()> {
        let current = state.get(path).ok_or_else(|| {
            Error::precondition(step_no, format!("patch target {path} was not produced"))
        })?;

        let source = self.content.ok_or(Error::ContentUnavailable {
            hash: current.hash,
        })?;
        let bytes = source.read(&current.hash)?;
        let text = String::from_utf8(bytes).map_err(|_| Error::NotText { path: path.clone() })?;

        let patched = patch_ini(&text, section, key, value, mode);
        let base = match &current.source {
            FileSource::Archive { entry } | FileSource::Patched { base: entry } => entry.clone(),
            FileSource::Tool { .. } => path.clone(),
        };
        state.insert(
            path.clone(),
            SimulatedFile {
                hash: hash_bytes(patched.as_bytes()),
                size: patched.len() as u64,
                source: FileSource::Patched { base },
            },
        );
        Ok(())
    }
}

/// Relocate a produced file or subtree; precondition: `from` exists in the
/// working set.
fn move_produced(
    state: &mut SimulatedSet,
    from: &RelPath,
    to: &RelPath,
    step_no: usize,
) -> Result<()> {
    if let Some(file) = state.remove(from) {
        state.insert(to.clone(), file);
        return Ok(());
    }

    let moved: Vec<RelPath> = state
        .keys()
        .filter(|p| p.starts_with_dir(from))
        .cloned()
        .collect();
    if moved.is_empty() {
        return Err(Error::precondition(
            step_no,
            format!("move source {from} was not produced by a prior step"),
        ));
    }
    for path in moved {
        let remainder = path
            .strip_dir(from)
            .expect("filtered on starts_with_dir");
        let dest = to.join(remainder)?;
        let file = state.remove(&path).expect("key listed from state");
        state.insert(dest, file);
    }
    Ok(())
}

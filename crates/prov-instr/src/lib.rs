//! Install instruction documents and their deterministic interpretation
//!
//! An [`doc::InstructionDocument`] is an ordered list of declarative steps.
//! The [`engine::Engine`] interprets one against an archive manifest and a
//! set of option selections, producing the exact file set the install would
//! leave behind — without touching the archive bytes except for modeled text
//! patches. The [`solver`] runs the engine in reverse: given an observed
//! file set with no recorded provenance, it searches registered templates
//! and option combinations for one whose simulation reproduces the
//! observation.

pub mod catalogue;
pub mod doc;
pub mod engine;
pub mod error;
pub mod options;
pub mod patch;
pub mod solver;

pub use catalogue::TemplateCatalogue;
pub use doc::{DeclaredOutput, InstructionDocument, OptionBranch, PatchMode, Step};
pub use engine::{ContentSource, Engine, FileSource, SimulatedFile, SimulatedSet};
pub use error::{Error, Result};
pub use options::{InstructionTemplate, OptionSelections, OptionSpec};
pub use solver::{
    ObservedSet, SolveOptions, SolveOutcome, SolveReport, SolvedInstall, solve, solve_parallel,
};

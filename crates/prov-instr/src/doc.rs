//! Instruction documents
//!
//! The declarative description of one install procedure. Documents are
//! plain JSON with a tagged step list; field order is fixed by the struct
//! definitions and map-valued fields are sorted, so serializing the same
//! document always yields the same bytes and diffs stay line-oriented.

use prov_fs::{ContentHash, RelPath};
use serde::{Deserialize, Serialize};

use crate::Result;

/// One declarative install procedure for one archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionDocument {
    /// Stable identifier referenced by provenance entries.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Steps, executed in document order.
    pub steps: Vec<Step>,
}

impl InstructionDocument {
    pub fn new(id: impl Into<String>, name: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            steps,
        }
    }

    /// Serialize to the canonical pretty-printed JSON form.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).expect("instruction serialization cannot fail")
    }

    /// Parse a document from its JSON form.
    ///
    /// # Errors
    ///
    /// Returns `Error::Json` on malformed input.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// How a patch step combines with an existing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PatchMode {
    /// Replace the key's value, inserting the key if absent.
    Replace,
    /// Append another `key=value` line to the section.
    Append,
}

/// An output a tool step promises to produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredOutput {
    pub path: RelPath,
    pub hash: ContentHash,
    pub size: u64,
}

/// One branch of a conditional step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionBranch {
    /// The option value that activates this branch.
    pub value: String,
    /// Steps executed when the branch is taken.
    pub steps: Vec<Step>,
}

/// One declarative install step.
///
/// A closed enumeration: new step kinds are added here and to the engine,
/// never through dynamic dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Step {
    /// Place every archive entry at its manifest path, optionally under a
    /// destination prefix.
    ExtractAll {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        to: Option<RelPath>,
    },

    /// Place one entry or one folder subtree.
    ///
    /// For a file source, `dest` is the full destination path (default: the
    /// source path unchanged). For a folder source, each entry lands at
    /// `dest/<remainder>`; with no `dest` the remainder lands at the root.
    ExtractSubset {
        source: RelPath,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dest: Option<RelPath>,
    },

    /// Relocate a previously produced file, or a whole produced subtree.
    Move { from: RelPath, to: RelPath },

    /// Branch on an option selection.
    SelectByOption {
        option: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<String>,
        branches: Vec<OptionBranch>,
    },

    /// Deterministically edit a `key=value` line inside an ini-style
    /// section of a previously produced text file.
    PatchIniSegment {
        path: RelPath,
        section: String,
        key: String,
        value: String,
        mode: PatchMode,
    },

    /// Opaque external tool call: inputs must already exist; the declared
    /// outputs are taken on faith and recorded as such.
    InvokeTool {
        tool: String,
        inputs: Vec<RelPath>,
        outputs: Vec<DeclaredOutput>,
    },
}

//! Error types for prov-instr

use prov_fs::{ContentHash, RelPath};

/// Result type for prov-instr operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while interpreting or solving instructions
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required option has no default and no supplied selection.
    #[error("Option {option:?} has no selection and no default")]
    UnresolvableOption { option: String },

    /// A selected value is outside the option's declared domain.
    #[error("Option {option:?} has no branch for value {value:?}")]
    UnknownOptionValue { option: String, value: String },

    /// A step referenced state that no prior step produced.
    #[error("Step {step} precondition failed: {reason}")]
    StepPreconditionFailed { step: usize, reason: String },

    /// An instruction referenced an archive entry the manifest lacks.
    #[error("Archive manifest has no entry or folder {path}")]
    UnknownEntry { path: RelPath },

    /// A patch step needed blob bytes no content source can supply.
    #[error("Content {hash} is not available for patching")]
    ContentUnavailable { hash: ContentHash },

    /// A patched file is not valid UTF-8 text.
    #[error("Patch target {path} is not text")]
    NotText { path: RelPath },

    #[error(transparent)]
    Fs(#[from] prov_fs::Error),

    #[error(transparent)]
    Archive(#[from] prov_archive::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn precondition(step: usize, reason: impl Into<String>) -> Self {
        Self::StepPreconditionFailed {
            step,
            reason: reason.into(),
        }
    }
}

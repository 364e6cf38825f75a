//! Error types for prov-core

use std::path::PathBuf;

/// Result type for prov-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in prov-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration file not found at the expected path
    #[error("Configuration not found at {path}")]
    ConfigNotFound { path: PathBuf },

    /// Invalid mod identifier
    #[error("Invalid mod id {id:?}: {reason}")]
    InvalidModId { id: String, reason: String },

    /// A mod id was registered twice
    #[error("Mod {id} is already registered")]
    DuplicateMod { id: String },

    /// An operation referenced an unknown mod
    #[error("Unknown mod: {id}")]
    UnknownMod { id: String },

    /// An entry was recorded for a mod the store does not know
    #[error("Entry for {path} references unknown mod {id}")]
    EntryForUnknownMod { path: String, id: String },

    /// A persisted provenance document failed validation
    #[error("Malformed provenance document at {path}: {message}")]
    MalformedDocument { path: PathBuf, message: String },

    // Transparent wrappers for underlying crate errors
    /// Filesystem error from prov-fs
    #[error(transparent)]
    Fs(#[from] prov_fs::Error),

    /// Archive error from prov-archive
    #[error(transparent)]
    Archive(#[from] prov_archive::Error),

    /// Instruction error from prov-instr
    #[error(transparent)]
    Instr(#[from] prov_instr::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// TOML deserialization error
    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),
}

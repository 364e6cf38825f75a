//! Error types for prov-fs

use std::path::PathBuf;

/// Result type for prov-fs operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in prov-fs operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid relative path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Invalid content hash {value:?}")]
    InvalidHash { value: String },

    #[error("Scan root {path} is not a directory")]
    NotADirectory { path: PathBuf },

    #[error("Lock acquisition failed for {path}")]
    LockFailed { path: PathBuf },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

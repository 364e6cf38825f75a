//! Error types for prov-archive

use prov_fs::ContentHash;

/// Result type for prov-archive operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in prov-archive operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("No archive reader registered for format {format:?}")]
    UnknownFormat { format: String },

    #[error("No tool registered with id {tool:?}")]
    UnknownTool { tool: String },

    #[error("Archive {archive} has no entry {entry:?}")]
    NoSuchEntry { archive: ContentHash, entry: String },

    #[error("Archive plugin failure: {message}")]
    Plugin { message: String },

    #[error(transparent)]
    Fs(#[from] prov_fs::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn plugin(message: impl Into<String>) -> Self {
        Self::Plugin {
            message: message.into(),
        }
    }
}

//! Errors raised by the entry stores and the state manager.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure taxonomy shared by the codec, the journal and the state manager.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The name is in neither the active nor the disabled store.
    #[error("Server '{0}' not found")]
    NotFound(String),

    /// `add` was asked to create a name that already exists.
    #[error("Server '{0}' already exists")]
    AlreadyExists(String),

    /// Reading or writing a backing file failed.
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A document could not be parsed.
    ///
    /// Reads swallow this and fall back to an empty document; only host
    /// writes surface it, so a file owned by another program is never
    /// clobbered.
    #[error("Malformed document {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },

    /// Encoding a document to JSON failed.
    #[error("Failed to encode document: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists(_))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

//! Error types for checkpoint persistence.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while writing a checkpoint record.
///
/// Reads never fail: an unreadable or invalid record is recovered as empty.
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// Filesystem error while writing the record.
    #[error("IO error writing checkpoint {path}: {source}")]
    Io {
        /// Checkpoint file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The record could not be serialized.
    #[error("failed to serialize checkpoint {path}: {source}")]
    Serialize {
        /// Checkpoint file path.
        path: PathBuf,
        /// Underlying serializer error.
        #[source]
        source: serde_json::Error,
    },
}

impl CheckpointError {
    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a serialization error.
    pub fn serialize(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Serialize {
            path: path.into(),
            source,
        }
    }
}

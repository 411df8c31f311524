//! Error types for artifact retrieval and verification.
//!
//! Every variant is a per-item failure: the orchestrator counts it and moves
//! on to the next item.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::transport::TransportError;

/// Errors that can occur while producing, verifying or finalizing an artifact.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// The transport could not deliver the artifact.
    #[error("artifact request failed for {identity}: {source}")]
    Transport {
        /// Item whose artifact was requested.
        identity: String,
        /// The underlying transport error.
        #[source]
        source: TransportError,
    },

    /// No artifact appeared in the folder before the deadline.
    #[error("no artifact appeared in {folder} within {}s", timeout.as_secs())]
    MaterializationTimeout {
        /// Folder being watched.
        folder: PathBuf,
        /// Bound that elapsed.
        timeout: Duration,
    },

    /// The artifact was smaller than the minimum size and has been removed.
    #[error("artifact {path} is {bytes} bytes, below the {minimum} byte minimum")]
    UndersizedArtifact {
        /// Removed file.
        path: PathBuf,
        /// Observed size.
        bytes: u64,
        /// Configured minimum.
        minimum: u64,
    },

    /// File system error while staging, inspecting or renaming the artifact.
    #[error("IO error on {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl ArtifactError {
    /// Creates a transport error for an item.
    pub fn transport(identity: impl Into<String>, source: TransportError) -> Self {
        Self::Transport {
            identity: identity.into(),
            source,
        }
    }

    /// Creates a materialization timeout error.
    pub fn timeout(folder: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self::MaterializationTimeout {
            folder: folder.into(),
            timeout,
        }
    }

    /// Creates an undersized artifact error.
    pub fn undersized(path: impl Into<PathBuf>, bytes: u64, minimum: u64) -> Self {
        Self::UndersizedArtifact {
            path: path.into(),
            bytes,
            minimum,
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Short category name used when tallying failures.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "transport",
            Self::MaterializationTimeout { .. } => "timeout",
            Self::UndersizedArtifact { .. } => "undersized",
            Self::Io { .. } => "io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_error_timeout_display() {
        let error = ArtifactError::timeout("/out/job", Duration::from_secs(30));
        let msg = error.to_string();
        assert!(msg.contains("/out/job"), "Expected folder in: {msg}");
        assert!(msg.contains("30s"), "Expected timeout in: {msg}");
        assert_eq!(error.category(), "timeout");
    }

    #[test]
    fn test_artifact_error_undersized_display() {
        let error = ArtifactError::undersized("/out/a.pdf", 500, 1000);
        let msg = error.to_string();
        assert!(msg.contains("500 bytes"), "Expected size in: {msg}");
        assert!(msg.contains("1000"), "Expected minimum in: {msg}");
    }

    #[test]
    fn test_artifact_error_transport_keeps_source() {
        let error = ArtifactError::transport("cand-1", TransportError::not_found("artifact", "x.pdf"));
        assert!(error.to_string().contains("cand-1"));
        assert!(std::error::Error::source(&error).is_some());
        assert_eq!(error.category(), "transport");
    }

    #[test]
    fn test_artifact_error_io_display() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let error = ArtifactError::io(PathBuf::from("/tmp/test.pdf"), io_error);
        let msg = error.to_string();
        assert!(msg.contains("/tmp/test.pdf"), "Expected path in: {msg}");
        assert_eq!(error.category(), "io");
    }
}

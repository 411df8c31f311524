//! Error type for transport collaborators.

use thiserror::Error;

/// Failure reported by a [`CollectionSource`](super::CollectionSource) or
/// [`ArtifactSource`](super::ArtifactSource).
///
/// Transport faults are never fatal to a run: a failed page fetch ends the
/// current pass and a failed artifact fetch fails a single item.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The remote system could not be reached or answered with an error.
    #[error("transport fault during {operation}: {reason}")]
    Fault {
        /// What was being attempted (e.g. "list collections").
        operation: String,
        /// Why it failed.
        reason: String,
    },

    /// The requested collection or artifact does not exist upstream.
    #[error("{kind} '{id}' not found")]
    NotFound {
        /// Resource kind ("collection", "artifact").
        kind: &'static str,
        /// Identifier or locator that was requested.
        id: String,
    },
}

impl TransportError {
    /// Creates a generic transport fault.
    pub fn fault(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Fault {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Creates a not-found error.
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound { kind, id: id.into() }
    }
}

//! Capability that makes an item's artifact appear in a folder.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::constants::ARTIFACT_EXTENSION;
use super::error::ArtifactError;
use super::filename::sanitize_filename;
use crate::model::Item;
use crate::transport::ArtifactSource;

/// Triggers retrieval of an item's artifact into `folder`.
///
/// Implementations only have to cause a file with the expected extension to
/// appear in the folder; the verifier detects and finalizes it.
#[async_trait]
pub trait ArtifactProducer: Send + Sync {
    /// Requests the artifact of `item` into `folder`.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError`] if the request itself fails.
    async fn produce(&self, item: &Item, folder: &Path) -> Result<(), ArtifactError>;
}

/// Producer that fetches raw bytes from an [`ArtifactSource`] and stages them
/// into the folder as `<identity>.<ext>`.
///
/// Bytes are written to a `.part` file first so the verifier never sees a
/// half-written artifact.
pub struct BytesArtifactProducer {
    source: Arc<dyn ArtifactSource>,
    extension: String,
}

impl BytesArtifactProducer {
    /// Creates a producer writing `.pdf` artifacts.
    #[must_use]
    pub fn new(source: Arc<dyn ArtifactSource>) -> Self {
        Self {
            source,
            extension: ARTIFACT_EXTENSION.to_string(),
        }
    }

    /// Overrides the artifact extension.
    #[must_use]
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }
}

#[async_trait]
impl ArtifactProducer for BytesArtifactProducer {
    async fn produce(&self, item: &Item, folder: &Path) -> Result<(), ArtifactError> {
        let bytes = self
            .source
            .fetch_artifact_bytes(&item.artifact_locator)
            .await
            .map_err(|e| ArtifactError::transport(&item.identity, e))?;

        let stem = sanitize_filename(&item.identity);
        let target = folder.join(format!("{stem}.{}", self.extension));
        let staging = folder.join(format!("{stem}.{}.part", self.extension));

        tokio::fs::write(&staging, &bytes)
            .await
            .map_err(|e| ArtifactError::io(&staging, e))?;
        tokio::fs::rename(&staging, &target)
            .await
            .map_err(|e| ArtifactError::io(&target, e))?;

        debug!(
            identity = %item.identity,
            bytes = bytes.len(),
            path = %target.display(),
            "artifact staged"
        );
        Ok(())
    }
}

//! Bounded wait for an artifact to appear, size check, and final rename.

use std::collections::HashSet;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use chrono::Local;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use super::constants::{
    ARTIFACT_EXTENSION, DEFAULT_VERIFY_TIMEOUT_SECS, MIN_ARTIFACT_BYTES,
    PARTIAL_DOWNLOAD_EXTENSIONS, POLL_INTERVAL,
};
use super::error::ArtifactError;
use super::filename::{artifact_file_name, resolve_unique_path};
use super::producer::ArtifactProducer;
use crate::model::Item;
use crate::reconcile::has_extension;

/// State of a folder just before an artifact is requested.
///
/// A file counts as materialized if its name was absent from the snapshot,
/// or if it was modified at or after `since`.
#[derive(Debug, Clone)]
pub struct FolderSnapshot {
    /// Moment the snapshot was taken.
    pub since: SystemTime,
    existing: HashSet<OsString>,
}

impl FolderSnapshot {
    /// Records the file names currently in `folder`. A missing folder is empty.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError::Io`] if the folder exists but cannot be listed.
    pub async fn take(folder: &Path) -> Result<Self, ArtifactError> {
        let since = SystemTime::now();
        let mut existing = HashSet::new();
        let mut entries = match tokio::fs::read_dir(folder).await {
            Ok(entries) => entries,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                return Ok(Self { since, existing });
            }
            Err(error) => return Err(ArtifactError::io(folder, error)),
        };
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ArtifactError::io(folder, e))?
        {
            existing.insert(entry.file_name());
        }
        Ok(Self { since, existing })
    }

    /// Returns true if `name` was present when the snapshot was taken.
    #[must_use]
    pub fn contains(&self, name: &OsString) -> bool {
        self.existing.contains(name)
    }
}

fn is_partial_download(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| {
            PARTIAL_DOWNLOAD_EXTENSIONS
                .iter()
                .any(|p| e.eq_ignore_ascii_case(p))
        })
}

/// Requests, detects, checks and finalizes artifacts one at a time.
pub struct DownloadVerifier {
    producer: Arc<dyn ArtifactProducer>,
    timeout: Duration,
    poll_interval: Duration,
    min_bytes: u64,
    extension: String,
}

impl DownloadVerifier {
    /// Creates a verifier with the default timeout, poll interval and size floor.
    #[must_use]
    pub fn new(producer: Arc<dyn ArtifactProducer>) -> Self {
        Self {
            producer,
            timeout: Duration::from_secs(DEFAULT_VERIFY_TIMEOUT_SECS),
            poll_interval: POLL_INTERVAL,
            min_bytes: MIN_ARTIFACT_BYTES,
            extension: ARTIFACT_EXTENSION.to_string(),
        }
    }

    /// Sets the bound on the materialization wait.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the interval between folder scans.
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Sets the minimum accepted artifact size.
    #[must_use]
    pub fn with_min_bytes(mut self, min_bytes: u64) -> Self {
        self.min_bytes = min_bytes;
        self
    }

    /// Sets the expected artifact extension.
    #[must_use]
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Configured materialization bound.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Delegates retrieval of `item`'s artifact to the producer.
    ///
    /// # Errors
    ///
    /// Returns the producer's [`ArtifactError`].
    pub async fn request_artifact(&self, item: &Item, folder: &Path) -> Result<(), ArtifactError> {
        self.producer.produce(item, folder).await
    }

    /// Polls `folder` until a file with the expected extension materializes
    /// relative to `snapshot`, or `timeout` elapses.
    ///
    /// Partial-download files are ignored. When several candidates exist the
    /// most recently modified one is returned.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError::MaterializationTimeout`] when the bound elapses.
    pub async fn wait_for_materialization(
        &self,
        folder: &Path,
        snapshot: &FolderSnapshot,
        timeout: Duration,
    ) -> Result<PathBuf, ArtifactError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(path) = self.find_candidate(folder, snapshot).await {
                return Ok(path);
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(ArtifactError::timeout(folder, timeout));
            }
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }
    }

    async fn find_candidate(&self, folder: &Path, snapshot: &FolderSnapshot) -> Option<PathBuf> {
        let mut entries = tokio::fs::read_dir(folder).await.ok()?;
        let mut best: Option<(SystemTime, PathBuf)> = None;

        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if is_partial_download(&path) || !has_extension(&path, &self.extension) {
                continue;
            }
            let Ok(metadata) = entry.metadata().await else {
                continue;
            };
            if !metadata.is_file() {
                continue;
            }
            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            let is_new = !snapshot.contains(&entry.file_name());
            if !is_new && modified < snapshot.since {
                continue;
            }
            if best.as_ref().is_none_or(|(at, _)| modified > *at) {
                best = Some((modified, path));
            }
        }

        best.map(|(_, path)| path)
    }

    /// Removes `path` and fails if it is smaller than the minimum size.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError::UndersizedArtifact`] for a file below the
    /// floor, or [`ArtifactError::Io`] if it cannot be inspected.
    pub async fn check_size(&self, path: &Path) -> Result<u64, ArtifactError> {
        let bytes = tokio::fs::metadata(path)
            .await
            .map_err(|e| ArtifactError::io(path, e))?
            .len();
        if bytes >= self.min_bytes {
            return Ok(bytes);
        }

        warn!(path = %path.display(), bytes, minimum = self.min_bytes, "undersized artifact discarded");
        if let Err(error) = tokio::fs::remove_file(path).await {
            warn!(path = %path.display(), %error, "failed to remove undersized artifact");
        }
        Err(ArtifactError::undersized(path, bytes, self.min_bytes))
    }

    /// Renames `path` to `<sanitized display name>_<timestamp>.<ext>` in the
    /// same folder, de-colliding with a numeric suffix.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError::Io`] if the rename fails.
    pub async fn finalize(&self, path: &Path, display_name: &str) -> Result<PathBuf, ArtifactError> {
        let folder = path.parent().unwrap_or_else(|| Path::new("."));
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or(self.extension.as_str());
        let file_name = artifact_file_name(display_name, Local::now().naive_local(), extension);
        let target = resolve_unique_path(folder, &file_name);

        tokio::fs::rename(path, &target)
            .await
            .map_err(|e| ArtifactError::io(&target, e))?;
        Ok(target)
    }

    /// Full cycle for one item: snapshot, request, wait, size check, finalize.
    ///
    /// # Errors
    ///
    /// Returns the first [`ArtifactError`] encountered. Nothing is left behind
    /// for an undersized artifact.
    #[instrument(skip(self, item, folder), fields(item = %item.identity))]
    pub async fn download(&self, item: &Item, folder: &Path) -> Result<PathBuf, ArtifactError> {
        let snapshot = FolderSnapshot::take(folder).await?;
        self.request_artifact(item, folder).await?;
        let materialized = self
            .wait_for_materialization(folder, &snapshot, self.timeout)
            .await?;
        let bytes = self.check_size(&materialized).await?;
        let finalized = self.finalize(&materialized, &item.display_name).await?;
        debug!(path = %finalized.display(), bytes, "artifact finalized");
        Ok(finalized)
    }
}

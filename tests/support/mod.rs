//! Shared fixtures for integration tests.
//!
//! A [`Fixture`] owns a temp dir laid out like a real run: a manifest with
//! its artifact files, an output root and a log dir for the global
//! checkpoint.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use harvester_core::transport::{Manifest, ManifestCollection, ManifestItem};
use harvester_core::{
    ArtifactProducer, BytesArtifactProducer, CheckpointStore, CollectionSource, CollectionStatus,
    DownloadVerifier, HarvestOptions, HarvestOrchestrator, ManifestSource,
};
use tempfile::TempDir;

/// Size of a valid artifact in fixtures.
pub const VALID_ARTIFACT_BYTES: usize = 4096;

/// Size of an artifact below the acceptance floor.
pub const UNDERSIZED_ARTIFACT_BYTES: usize = 500;

pub struct Fixture {
    pub dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        std::fs::create_dir_all(dir.path().join("cvs")).expect("create cvs dir");
        Self { dir }
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.path().join("manifest.json")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.dir.path().join("downloads")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.dir.path().join("logs")
    }

    /// Writes the artifact behind `locator` with `size` bytes.
    pub fn write_artifact(&self, locator: &str, size: usize) {
        let path = self.dir.path().join(locator);
        let mut bytes = b"%PDF-1.4\n".to_vec();
        bytes.resize(size.max(bytes.len()), b'%');
        bytes.truncate(size);
        std::fs::write(path, bytes).expect("write artifact");
    }

    /// Writes `manifest` as the fixture's manifest file.
    pub fn write_manifest(&self, manifest: &Manifest) {
        let raw = serde_json::to_string_pretty(manifest).expect("serialize manifest");
        std::fs::write(self.manifest_path(), raw).expect("write manifest");
    }

    pub fn source(&self) -> Arc<ManifestSource> {
        Arc::new(ManifestSource::load(&self.manifest_path()).expect("load manifest"))
    }

    /// Options rooted in this fixture with no delays.
    pub fn options(&self) -> HarvestOptions {
        HarvestOptions {
            output_dir: self.output_dir(),
            ..HarvestOptions::default()
        }
    }

    /// Orchestrator over the fixture manifest with fast polling.
    pub fn orchestrator(&self, options: HarvestOptions) -> HarvestOrchestrator {
        let source = self.source();
        let producer = Arc::new(BytesArtifactProducer::new(source.clone()));
        self.orchestrator_with(source, producer, options)
    }

    /// Orchestrator over explicit collaborators, sharing the fixture's
    /// checkpoint and polling settings.
    pub fn orchestrator_with(
        &self,
        source: Arc<dyn CollectionSource>,
        producer: Arc<dyn ArtifactProducer>,
        options: HarvestOptions,
    ) -> HarvestOrchestrator {
        let verifier = DownloadVerifier::new(producer)
            .with_timeout(Duration::from_secs(2))
            .with_poll_interval(Duration::from_millis(10));
        let checkpoint = CheckpointStore::open_in(&self.log_dir());
        HarvestOrchestrator::new(source, verifier, checkpoint, options)
    }

    /// Finalized artifacts in `folder`.
    pub fn artifacts_in(folder: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(folder)
            .map(|entries| {
                entries
                    .flatten()
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .filter(|name| name.ends_with(".pdf"))
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }
}

/// Manifest item with a locator under `cvs/`.
pub fn item(identity: &str, display_name: &str, category: &str) -> ManifestItem {
    ManifestItem {
        identity: Some(identity.to_string()),
        display_name: display_name.to_string(),
        artifact_locator: Some(format!("cvs/{identity}.pdf")),
        category: Some(category.to_string()),
    }
}

/// Active collection created on 2025-09-22.
pub fn collection(identity: &str, title: &str, items: Vec<ManifestItem>) -> ManifestCollection {
    ManifestCollection {
        identity: identity.to_string(),
        title: title.to_string(),
        status: CollectionStatus::Active,
        created_date: chrono::NaiveDate::from_ymd_opt(2025, 9, 22),
        announced_item_count: None,
        items,
    }
}

pub fn manifest(window_limit: Option<u64>, collections: Vec<ManifestCollection>) -> Manifest {
    Manifest {
        window_limit,
        collections,
    }
}

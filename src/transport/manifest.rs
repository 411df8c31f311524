//! File-backed collection source.
//!
//! A manifest is a JSON export of the remote system:
//!
//! ```json
//! {
//!   "window_limit": 3000,
//!   "collections": [
//!     {
//!       "identity": "job-1",
//!       "title": "Ingénieur Logiciel (H/F)",
//!       "status": "ACTIVE",
//!       "created_date": "2025-09-22",
//!       "items": [
//!         { "identity": "c-1", "display_name": "Jean Dupont",
//!           "artifact_locator": "cvs/c-1.pdf", "category": "NEW" }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! `window_limit` reproduces the upstream result-window cap: any single
//! ordered query only ever exposes its first `window_limit` entries.
//! Artifact locators are paths relative to the manifest file.

use std::cmp::Ordering;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{ArtifactSource, CollectionSource, PageRequest, TransportError};
use crate::model::{Collection, CollectionStatus, Item, Page, SortDirection, SortKey};

/// Root of a manifest file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    /// Per-query cap on visible results. `None` means uncapped.
    #[serde(default)]
    pub window_limit: Option<u64>,
    /// Collections in listing order.
    #[serde(default)]
    pub collections: Vec<ManifestCollection>,
}

/// One collection entry of a manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestCollection {
    /// Upstream identifier.
    pub identity: String,
    /// Raw title.
    pub title: String,
    /// Posting status.
    pub status: CollectionStatus,
    /// Creation date.
    #[serde(default)]
    pub created_date: Option<NaiveDate>,
    /// Advertised item count; defaults to the number of listed items.
    #[serde(default)]
    pub announced_item_count: Option<u64>,
    /// Items in creation order.
    #[serde(default)]
    pub items: Vec<ManifestItem>,
}

/// One item entry of a manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestItem {
    /// Stable identifier; may be absent upstream.
    #[serde(default)]
    pub identity: Option<String>,
    /// Candidate display name.
    #[serde(default)]
    pub display_name: String,
    /// Artifact path relative to the manifest; may be absent upstream.
    #[serde(default)]
    pub artifact_locator: Option<String>,
    /// Filter category (disposition). Items without one match every filter.
    #[serde(default)]
    pub category: Option<String>,
}

impl ManifestItem {
    fn to_item(&self) -> Item {
        Item::new(
            self.identity.clone().unwrap_or_default(),
            self.display_name.clone(),
            self.artifact_locator.clone().unwrap_or_default(),
        )
    }
}

/// [`CollectionSource`] and [`ArtifactSource`] backed by a manifest file.
#[derive(Debug, Clone)]
pub struct ManifestSource {
    manifest: Manifest,
    base_dir: PathBuf,
}

impl ManifestSource {
    /// Creates a source from an in-memory manifest. Locators resolve against `base_dir`.
    pub fn new(manifest: Manifest, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            manifest,
            base_dir: base_dir.into(),
        }
    }

    /// Loads a manifest file. Locators resolve against the file's directory.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Fault`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, TransportError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            TransportError::fault("load manifest", format!("{}: {e}", path.display()))
        })?;
        let manifest: Manifest = serde_json::from_str(&raw).map_err(|e| {
            TransportError::fault("parse manifest", format!("{}: {e}", path.display()))
        })?;
        let base_dir = path
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        debug!(
            path = %path.display(),
            collections = manifest.collections.len(),
            window_limit = ?manifest.window_limit,
            "loaded manifest"
        );
        Ok(Self::new(manifest, base_dir))
    }

    /// Returns the parsed manifest.
    #[must_use]
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    fn find(&self, collection_id: &str) -> Result<&ManifestCollection, TransportError> {
        self.manifest
            .collections
            .iter()
            .find(|c| c.identity == collection_id)
            .ok_or_else(|| TransportError::not_found("collection", collection_id))
    }
}

fn compare_items(
    left: &(usize, &ManifestItem),
    right: &(usize, &ManifestItem),
    key: SortKey,
) -> Ordering {
    match key {
        SortKey::CreationDate => left.0.cmp(&right.0),
        SortKey::DisplayName => left
            .1
            .display_name
            .to_lowercase()
            .cmp(&right.1.display_name.to_lowercase())
            .then(left.0.cmp(&right.0)),
    }
}

#[async_trait]
impl CollectionSource for ManifestSource {
    async fn list_collections(
        &self,
        statuses: &[CollectionStatus],
    ) -> Result<Vec<Collection>, TransportError> {
        Ok(self
            .manifest
            .collections
            .iter()
            .filter(|c| statuses.contains(&c.status))
            .map(|c| Collection {
                identity: c.identity.clone(),
                title: c.title.clone(),
                status: c.status,
                created_date: c.created_date,
                announced_item_count: c
                    .announced_item_count
                    .unwrap_or(c.items.len() as u64),
            })
            .collect())
    }

    #[instrument(level = "trace", skip(self), fields(collection = request.collection_id, offset = request.offset))]
    async fn fetch_items_page(&self, request: &PageRequest<'_>) -> Result<Page, TransportError> {
        let collection = self.find(request.collection_id)?;

        let mut visible: Vec<(usize, &ManifestItem)> = collection
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| {
                item.category
                    .as_deref()
                    .is_none_or(|category| request.filters.contains(category))
            })
            .collect();
        let announced_total = visible.len() as u64;

        visible.sort_by(|a, b| compare_items(a, b, request.sort_key));
        if request.direction == SortDirection::Descending {
            visible.reverse();
        }
        if let Some(limit) = self.manifest.window_limit {
            visible.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }

        let len = visible.len();
        let start = usize::try_from(request.offset).unwrap_or(usize::MAX).min(len);
        let end = start
            .saturating_add(usize::try_from(request.limit).unwrap_or(usize::MAX))
            .min(len);

        Ok(Page {
            items: visible[start..end].iter().map(|(_, i)| i.to_item()).collect(),
            has_more: end < len,
            announced_total,
        })
    }
}

#[async_trait]
impl ArtifactSource for ManifestSource {
    async fn fetch_artifact_bytes(&self, locator: &str) -> Result<Vec<u8>, TransportError> {
        if !is_contained_locator(locator) {
            return Err(TransportError::fault(
                "fetch artifact",
                format!("locator '{locator}' escapes the manifest folder"),
            ));
        }
        let path = self.base_dir.join(locator);
        tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TransportError::not_found("artifact", locator)
            } else {
                TransportError::fault("fetch artifact", format!("{}: {e}", path.display()))
            }
        })
    }
}

/// True when `locator` stays below the manifest folder once joined to it.
fn is_contained_locator(locator: &str) -> bool {
    !locator.is_empty()
        && Path::new(locator)
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

//! Boundary to the remote system that lists collections and serves artifacts.
//!
//! The harvester never talks to the network itself. It depends on two
//! capabilities, both object-safe so the orchestrator can hold them as
//! `Arc<dyn ...>`:
//!
//! - [`CollectionSource`] - lists collections and pages through their items
//! - [`ArtifactSource`] - returns the raw bytes behind an item's locator
//!
//! [`ManifestSource`] implements both from a JSON export on disk.
//!
//! # Object Safety
//!
//! These traits use `async_trait` to support dynamic dispatch. Rust 2024
//! native async traits are not object-safe.

mod error;
mod manifest;

pub use error::TransportError;
pub use manifest::{Manifest, ManifestCollection, ManifestItem, ManifestSource};

use async_trait::async_trait;

use crate::model::{Collection, CollectionStatus, FilterSet, Page, SortDirection, SortKey};

/// Parameters of a single page fetch.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest<'a> {
    /// Collection being listed.
    pub collection_id: &'a str,
    /// Zero-based offset into the ordered listing.
    pub offset: u64,
    /// Maximum number of items to return.
    pub limit: u64,
    /// Categories to include.
    pub filters: &'a FilterSet,
    /// Ordering key.
    pub sort_key: SortKey,
    /// Ordering direction.
    pub direction: SortDirection,
}

/// Lists collections and pages through their items.
#[async_trait]
pub trait CollectionSource: Send + Sync {
    /// Returns every collection whose status is in `statuses`.
    async fn list_collections(
        &self,
        statuses: &[CollectionStatus],
    ) -> Result<Vec<Collection>, TransportError>;

    /// Fetches one page of a collection's items.
    ///
    /// Callers treat an error exactly like [`Page::end_of_pass`]: the pass
    /// ends, nothing is retried.
    async fn fetch_items_page(&self, request: &PageRequest<'_>) -> Result<Page, TransportError>;
}

/// Serves the raw artifact behind an item locator.
#[async_trait]
pub trait ArtifactSource: Send + Sync {
    /// Fetches the artifact bytes for `locator`.
    async fn fetch_artifact_bytes(&self, locator: &str) -> Result<Vec<u8>, TransportError>;
}

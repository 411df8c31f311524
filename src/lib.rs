//! Resumable Harvester Core Library
//!
//! This library harvests every item of a set of remote collections, together
//! with each item's document artifact, into a local folder tree. It works
//! around a listing that silently caps how far a single ordered query can
//! page, and it can be stopped and restarted at any point without
//! re-downloading anything.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`model`] - Items, collections, filters and pages
//! - [`transport`] - Source traits and the offline manifest source
//! - [`harvest`] - Multi-pass pagination and identity dedup
//! - [`checkpoint`] - Durable global and per-collection ledgers
//! - [`download`] - Artifact production, verification and naming
//! - [`reconcile`] - Matching collections to existing local folders
//! - [`orchestrator`] - The sequential harvest state machine

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod checkpoint;
pub mod download;
pub mod harvest;
pub mod model;
pub mod orchestrator;
pub mod reconcile;
pub mod transport;

// Re-export commonly used types
pub use checkpoint::{CheckpointError, CheckpointStore, CollectionScope};
pub use download::{ArtifactError, ArtifactProducer, BytesArtifactProducer, DownloadVerifier};
pub use harvest::{Deduplicator, HarvestOutcome, PaginationStrategy};
pub use model::{Collection, CollectionStatus, FilterSet, Item, Page, SortDirection, SortKey};
pub use orchestrator::{
    HarvestError, HarvestOptions, HarvestOrchestrator, HarvestPlan, HarvestState, RunReport,
};
pub use reconcile::{Classification, FolderReconciler, ReconcilePolicy};
pub use transport::{ArtifactSource, CollectionSource, ManifestSource, TransportError};

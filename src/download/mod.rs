//! Artifact retrieval and verification.
//!
//! An [`ArtifactProducer`] makes an item's artifact appear in a collection
//! folder; [`DownloadVerifier`] waits for it under a bounded timeout, rejects
//! undersized files, and renames the survivor to its canonical name.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use harvester_core::download::{BytesArtifactProducer, DownloadVerifier};
//! use harvester_core::model::Item;
//! use harvester_core::transport::ManifestSource;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let source = Arc::new(ManifestSource::load(Path::new("export/manifest.json"))?);
//! let verifier = DownloadVerifier::new(Arc::new(BytesArtifactProducer::new(source)));
//! let item = Item::new("cand-1", "Ada Lovelace", "cvs/ada.pdf");
//! let path = verifier.download(&item, Path::new("downloads/Data Analyst")).await?;
//! println!("Saved: {}", path.display());
//! # Ok(())
//! # }
//! ```

pub mod constants;
mod error;
mod filename;
mod producer;
mod verifier;

pub use constants::{
    ARTIFACT_EXTENSION, DEFAULT_VERIFY_TIMEOUT_SECS, MIN_ARTIFACT_BYTES, POLL_INTERVAL,
};
pub use error::ArtifactError;
pub use filename::{artifact_file_name, sanitize_display_name};
pub use producer::{ArtifactProducer, BytesArtifactProducer};
pub use verifier::{DownloadVerifier, FolderSnapshot};

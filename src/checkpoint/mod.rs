//! Durable idempotency ledger for harvested items and collections.
//!
//! Two scopes are kept:
//!
//! - [`CheckpointStore`] - the global record (`checkpoint_unified.json`):
//!   persisted item identities and names, plus completed collections
//! - [`CollectionScope`] - a record inside each collection folder
//!   (`checkpoint.json`): persisted item identities and names for that
//!   folder only
//!
//! Lookups during a harvest consult the union of both ([`MergedView`]).
//!
//! Every mutation loads the on-disk record, unions in the new value and
//! rewrites the whole file through a temp file and rename. Writes are
//! therefore idempotent, and an interrupted write loses at most the mutation
//! in flight. Sets only ever grow.

mod error;
mod names;
mod record;

pub use error::CheckpointError;
pub use names::{name_from_artifact_stem, normalize_name};
pub use record::{
    CheckpointRecord, CollectionCheckpoint, GlobalCheckpoint, load_record, store_record,
    update_record,
};

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

/// Global checkpoint file name, stored in the log directory.
pub const GLOBAL_CHECKPOINT_FILE: &str = "checkpoint_unified.json";

/// Per-collection checkpoint file name, stored in the collection folder.
pub const COLLECTION_CHECKPOINT_FILE: &str = "checkpoint.json";

fn name_index<'a>(names: impl IntoIterator<Item = &'a String>) -> HashSet<String> {
    names
        .into_iter()
        .map(|name| normalize_name(name))
        .filter(|key| !key.is_empty())
        .collect()
}

/// Global checkpoint scope.
#[derive(Debug)]
pub struct CheckpointStore {
    path: PathBuf,
    record: GlobalCheckpoint,
    names: HashSet<String>,
}

impl CheckpointStore {
    /// Opens the global record at `path`. A missing or invalid file yields an
    /// empty store.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let record: GlobalCheckpoint = load_record(&path);
        debug!(
            path = %path.display(),
            ids = record.downloaded_ids.len(),
            names = record.downloaded_names.len(),
            completed_collections = record.completed_jobs.len(),
            "opened global checkpoint"
        );
        let names = name_index(&record.downloaded_names);
        Self {
            path,
            record,
            names,
        }
    }

    /// Opens `<log_dir>/checkpoint_unified.json`.
    #[must_use]
    pub fn open_in(log_dir: &Path) -> Self {
        Self::open(log_dir.join(GLOBAL_CHECKPOINT_FILE))
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current in-memory view of the record.
    #[must_use]
    pub fn record(&self) -> &GlobalCheckpoint {
        &self.record
    }

    /// Returns true if the item identity has been persisted.
    #[must_use]
    pub fn is_done(&self, identity: &str) -> bool {
        self.record.downloaded_ids.contains(identity)
    }

    /// Returns true if an item with an equivalent name has been persisted.
    #[must_use]
    pub fn is_done_by_name(&self, name: &str) -> bool {
        let key = normalize_name(name);
        !key.is_empty() && self.names.contains(&key)
    }

    /// Records a persisted item.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError`] if the record cannot be rewritten. The
    /// in-memory view is updated regardless.
    #[instrument(level = "debug", skip(self))]
    pub fn mark_done(&mut self, identity: &str, display_name: &str) -> Result<(), CheckpointError> {
        let mut delta = GlobalCheckpoint::default();
        if !identity.is_empty() {
            delta.downloaded_ids.insert(identity.to_string());
        }
        if !display_name.trim().is_empty() {
            delta.downloaded_names.insert(display_name.to_string());
        }
        self.apply(&delta)
    }

    /// Returns true if the collection was harvested to completion.
    #[must_use]
    pub fn is_collection_complete(&self, collection_id: &str) -> bool {
        self.record.completed_jobs.contains(collection_id)
    }

    /// Records a collection as harvested to completion.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError`] if the record cannot be rewritten.
    #[instrument(level = "debug", skip(self))]
    pub fn mark_collection_complete(&mut self, collection_id: &str) -> Result<(), CheckpointError> {
        let mut delta = GlobalCheckpoint::default();
        delta.completed_jobs.insert(collection_id.to_string());
        self.apply(&delta)
    }

    /// Opens the per-collection scope stored in `folder`.
    #[must_use]
    pub fn open_scope(&self, folder: &Path) -> CollectionScope {
        CollectionScope::open(folder)
    }

    /// Union view of this store and a collection scope.
    #[must_use]
    pub fn merged<'a>(&'a self, scope: &'a CollectionScope) -> MergedView<'a> {
        MergedView {
            global: self,
            scope,
        }
    }

    fn apply(&mut self, delta: &GlobalCheckpoint) -> Result<(), CheckpointError> {
        let result = update_record(&self.path, &mut self.record, delta);
        self.names.extend(name_index(&delta.downloaded_names));
        result
    }
}

/// Per-collection checkpoint scope.
#[derive(Debug)]
pub struct CollectionScope {
    folder: PathBuf,
    path: PathBuf,
    record: CollectionCheckpoint,
    names: HashSet<String>,
}

impl CollectionScope {
    /// Opens `<folder>/checkpoint.json`.
    #[must_use]
    pub fn open(folder: &Path) -> Self {
        let path = folder.join(COLLECTION_CHECKPOINT_FILE);
        let record: CollectionCheckpoint = load_record(&path);
        let names = name_index(&record.downloaded_names);
        Self {
            folder: folder.to_path_buf(),
            path,
            record,
            names,
        }
    }

    /// Collection folder this scope belongs to.
    #[must_use]
    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Current in-memory view of the record.
    #[must_use]
    pub fn record(&self) -> &CollectionCheckpoint {
        &self.record
    }

    /// Returns true if the identity was persisted into this folder.
    #[must_use]
    pub fn is_done(&self, identity: &str) -> bool {
        self.record.downloaded_ids.contains(identity)
    }

    /// Returns true if an equivalent name was persisted into this folder, or
    /// was seeded from artifacts already on disk.
    #[must_use]
    pub fn is_done_by_name(&self, name: &str) -> bool {
        let key = normalize_name(name);
        !key.is_empty() && self.names.contains(&key)
    }

    /// Number of known names, including seeded ones.
    #[must_use]
    pub fn known_name_count(&self) -> usize {
        self.names.len()
    }

    /// Records an item persisted into this folder.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError`] if the record cannot be rewritten.
    pub fn mark_done(&mut self, identity: &str, display_name: &str) -> Result<(), CheckpointError> {
        let mut delta = CollectionCheckpoint::default();
        if !identity.is_empty() {
            delta.downloaded_ids.insert(identity.to_string());
        }
        let key = normalize_name(display_name);
        if !key.is_empty() {
            self.names.insert(key.clone());
            delta.downloaded_names.insert(key);
        }
        update_record(&self.path, &mut self.record, &delta)
    }

    /// Adds the names of artifacts already present in the folder to the
    /// in-memory name set. Returns how many artifact files were scanned.
    ///
    /// Used when a folder pre-dates its checkpoint (e.g. a run keyed
    /// differently). Seeded names are not written back.
    pub fn seed_names_from_artifacts(&mut self, extension: &str) -> usize {
        let Ok(entries) = fs::read_dir(&self.folder) else {
            return 0;
        };

        let mut scanned = 0usize;
        for entry in entries.flatten() {
            let path = entry.path();
            let matches_extension = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(extension));
            if !matches_extension || !path.is_file() {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            scanned += 1;
            let key = normalize_name(name_from_artifact_stem(stem));
            if !key.is_empty() {
                self.names.insert(key);
            }
        }

        debug!(
            folder = %self.folder.display(),
            scanned,
            known_names = self.names.len(),
            "seeded names from existing artifacts"
        );
        scanned
    }
}

/// Union of the global and one per-collection scope.
#[derive(Debug, Clone, Copy)]
pub struct MergedView<'a> {
    global: &'a CheckpointStore,
    scope: &'a CollectionScope,
}

impl MergedView<'_> {
    /// Identity known to either scope.
    #[must_use]
    pub fn is_done(&self, identity: &str) -> bool {
        self.scope.is_done(identity) || self.global.is_done(identity)
    }

    /// Name known to either scope.
    #[must_use]
    pub fn is_done_by_name(&self, name: &str) -> bool {
        self.scope.is_done_by_name(name) || self.global.is_done_by_name(name)
    }
}

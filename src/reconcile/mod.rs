//! Matching remote collections to local output folders.
//!
//! A collection is matched to a folder by normalized title: exact equality
//! first, then containment in either direction when both keys reach
//! [`MIN_FUZZY_KEY_LEN`]. Matched collections are
//! classified by comparing the artifacts on disk with the announced count.
//! What to do with each class is a [`ReconcilePolicy`] chosen by the caller.

mod title;

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::NaiveDate;
use thiserror::Error;
use tracing::debug;

pub use title::{
    FOLDER_DATE_FORMAT, MAX_FOLDER_TITLE_CHARS, clean_title, folder_name_for, normalize_key,
    parse_folder_name,
};

use crate::model::Collection;

/// Minimum key length, in bytes, for containment matching.
pub const MIN_FUZZY_KEY_LEN: usize = 8;

/// Errors raised while scanning the output root.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The output root could not be listed.
    #[error("cannot scan output folder {path}: {source}")]
    Scan {
        /// Folder being listed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// A folder found under the output root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFolderInfo {
    /// Folder name as found on disk.
    pub name: String,
    /// Full path.
    pub path: PathBuf,
    /// Title part of the name.
    pub title: String,
    /// Date suffix of the name, if any.
    pub date: Option<NaiveDate>,
    /// Comparison key of the title.
    pub key: String,
    /// Artifact files present in the folder.
    pub artifact_count: u64,
}

/// Counts files in `folder` with the given extension, case-insensitively.
///
/// An unreadable folder counts as empty.
#[must_use]
pub fn count_artifacts(folder: &Path, extension: &str) -> u64 {
    let Ok(entries) = fs::read_dir(folder) else {
        return 0;
    };
    let count = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
        .filter(|entry| has_extension(&entry.path(), extension))
        .count();
    count as u64
}

pub(crate) fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(extension))
}

/// Lists the folders directly under `root`, sorted by name.
///
/// A missing root yields no folders.
///
/// # Errors
///
/// Returns [`ReconcileError::Scan`] if `root` exists but cannot be listed.
pub fn scan_local_folders(root: &Path, extension: &str) -> Result<Vec<LocalFolderInfo>, ReconcileError> {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(error) if error.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(ReconcileError::Scan {
                path: root.to_path_buf(),
                source,
            });
        }
    };

    let mut folders: Vec<LocalFolderInfo> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
        .filter_map(|entry| {
            let name = entry.file_name().into_string().ok()?;
            let path = entry.path();
            let (title, date) = parse_folder_name(&name);
            let title = title.to_string();
            Some(LocalFolderInfo {
                key: normalize_key(&title),
                artifact_count: count_artifacts(&path, extension),
                name,
                path,
                title,
                date,
            })
        })
        .collect();
    folders.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(folders)
}

/// Finds the local folder holding `collection`, if any.
///
/// Exact key equality wins, preferring a folder whose date matches the
/// collection's creation date. Otherwise the first folder whose key contains,
/// or is contained in, the collection key is returned, provided both keys are
/// at least [`MIN_FUZZY_KEY_LEN`] long.
#[must_use]
pub fn match_collection<'a>(
    collection: &Collection,
    folders: &'a [LocalFolderInfo],
) -> Option<&'a LocalFolderInfo> {
    let key = normalize_key(&collection.title);
    if key.is_empty() {
        return None;
    }

    let exact: Vec<_> = folders.iter().filter(|f| f.key == key).collect();
    if !exact.is_empty() {
        return exact
            .iter()
            .find(|f| f.date.is_some() && f.date == collection.created_date)
            .or_else(|| exact.first())
            .copied();
    }

    if key.len() < MIN_FUZZY_KEY_LEN {
        return None;
    }
    folders.iter().find(|f| {
        f.key.len() >= MIN_FUZZY_KEY_LEN && (f.key.contains(&key) || key.contains(&f.key))
    })
}

/// Local state of a remote collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// No local folder matched.
    New,
    /// A folder matched but holds fewer artifacts than announced.
    Partial {
        /// Matched folder.
        folder: PathBuf,
        /// Artifacts on disk.
        persisted: u64,
    },
    /// A folder matched and holds at least the announced count.
    Complete {
        /// Matched folder.
        folder: PathBuf,
        /// Artifacts on disk.
        persisted: u64,
    },
}

impl Classification {
    /// Matched folder, if any.
    #[must_use]
    pub fn folder(&self) -> Option<&Path> {
        match self {
            Self::New => None,
            Self::Partial { folder, .. } | Self::Complete { folder, .. } => Some(folder),
        }
    }

    /// Artifacts already on disk.
    #[must_use]
    pub fn persisted(&self) -> u64 {
        match self {
            Self::New => 0,
            Self::Partial { persisted, .. } | Self::Complete { persisted, .. } => *persisted,
        }
    }

    /// Short label used in logs and summaries.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Partial { .. } => "partial",
            Self::Complete { .. } => "complete",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classifies `collection` against `folders`.
#[must_use]
pub fn classify(collection: &Collection, folders: &[LocalFolderInfo]) -> Classification {
    let Some(folder) = match_collection(collection, folders) else {
        return Classification::New;
    };
    let persisted = folder.artifact_count;
    if persisted >= collection.announced_item_count {
        Classification::Complete {
            folder: folder.path.clone(),
            persisted,
        }
    } else {
        Classification::Partial {
            folder: folder.path.clone(),
            persisted,
        }
    }
}

/// What to do with collections that already have a local folder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReconcilePolicy {
    /// Skip every matched collection.
    SkipExisting,
    /// Extend partial collections, skip complete ones.
    #[default]
    PartialOnly,
    /// Process every collection again.
    RedoAll,
}

impl ReconcilePolicy {
    /// Returns true if a collection in state `classification` should be harvested.
    #[must_use]
    pub fn admits(self, classification: &Classification) -> bool {
        match (self, classification) {
            (_, Classification::New) | (Self::RedoAll, _) => true,
            (Self::PartialOnly, Classification::Partial { .. }) => true,
            (Self::PartialOnly, Classification::Complete { .. }) | (Self::SkipExisting, _) => {
                false
            }
        }
    }

    /// Canonical name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SkipExisting => "skip",
            Self::PartialOnly => "partial-only",
            Self::RedoAll => "redo",
        }
    }
}

impl fmt::Display for ReconcilePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReconcilePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "skip" | "skip-existing" | "skip-all" => Ok(Self::SkipExisting),
            "partial-only" | "partial" | "new-only" => Ok(Self::PartialOnly),
            "redo" | "redo-all" | "keep-all" => Ok(Self::RedoAll),
            other => Err(format!(
                "invalid policy '{other}': expected skip, partial-only or redo"
            )),
        }
    }
}

/// Snapshot of the output root used to place collections.
#[derive(Debug, Clone)]
pub struct FolderReconciler {
    root: PathBuf,
    folders: Vec<LocalFolderInfo>,
}

impl FolderReconciler {
    /// Scans `root` for existing collection folders.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::Scan`] if `root` exists but cannot be listed.
    pub fn scan(root: &Path, extension: &str) -> Result<Self, ReconcileError> {
        let folders = scan_local_folders(root, extension)?;
        debug!(root = %root.display(), folders = folders.len(), "scanned output folders");
        Ok(Self {
            root: root.to_path_buf(),
            folders,
        })
    }

    /// Builds a reconciler from an already known folder list.
    #[must_use]
    pub fn with_folders(root: impl Into<PathBuf>, folders: Vec<LocalFolderInfo>) -> Self {
        Self {
            root: root.into(),
            folders,
        }
    }

    /// Output root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Folders found by the scan.
    #[must_use]
    pub fn folders(&self) -> &[LocalFolderInfo] {
        &self.folders
    }

    /// Classifies `collection` against the scanned folders.
    #[must_use]
    pub fn classify(&self, collection: &Collection) -> Classification {
        classify(collection, &self.folders)
    }

    /// Folder the collection's artifacts go into: the matched folder, or a
    /// fresh one named by [`folder_name_for`].
    #[must_use]
    pub fn target_folder(&self, collection: &Collection, classification: &Classification) -> PathBuf {
        classification
            .folder()
            .map_or_else(|| self.root.join(folder_name_for(collection)), Path::to_path_buf)
    }
}

//! On-disk checkpoint records and their load/union/rewrite cycle.

use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::CheckpointError;

/// A record whose every field is a grow-only set of strings.
pub trait CheckpointRecord: Serialize + DeserializeOwned + Default + Clone {
    /// Unions `other` into `self`. Never removes anything.
    fn union_with(&mut self, other: &Self);
}

/// Global ledger shared by every collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalCheckpoint {
    /// Display names of persisted items.
    pub downloaded_names: BTreeSet<String>,
    /// Identities of persisted items.
    pub downloaded_ids: BTreeSet<String>,
    /// Identities of collections harvested to completion.
    pub completed_jobs: BTreeSet<String>,
}

impl CheckpointRecord for GlobalCheckpoint {
    fn union_with(&mut self, other: &Self) {
        self.downloaded_names
            .extend(other.downloaded_names.iter().cloned());
        self.downloaded_ids.extend(other.downloaded_ids.iter().cloned());
        self.completed_jobs.extend(other.completed_jobs.iter().cloned());
    }
}

/// Ledger stored inside one collection folder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionCheckpoint {
    /// Identities of items persisted into this folder.
    pub downloaded_ids: BTreeSet<String>,
    /// Normalized names of items persisted into this folder.
    pub downloaded_names: BTreeSet<String>,
}

impl CheckpointRecord for CollectionCheckpoint {
    fn union_with(&mut self, other: &Self) {
        self.downloaded_ids.extend(other.downloaded_ids.iter().cloned());
        self.downloaded_names
            .extend(other.downloaded_names.iter().cloned());
    }
}

/// Loads a record, recovering any unreadable or invalid file as empty.
///
/// An invalid file is moved aside to `<name>.corrupt` so the next rewrite
/// does not destroy it.
pub fn load_record<R: CheckpointRecord>(path: &Path) -> R {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == ErrorKind::NotFound => return R::default(),
        Err(error) => {
            warn!(path = %path.display(), %error, "checkpoint unreadable, starting empty");
            return R::default();
        }
    };

    if raw.trim().is_empty() {
        return R::default();
    }

    match serde_json::from_str(&raw) {
        Ok(record) => record,
        Err(error) => {
            let aside = corrupt_path(path);
            warn!(
                path = %path.display(),
                moved_to = %aside.display(),
                %error,
                "checkpoint invalid, starting empty"
            );
            if let Err(rename_error) = fs::rename(path, &aside) {
                warn!(error = %rename_error, "failed to move invalid checkpoint aside");
            }
            R::default()
        }
    }
}

/// Writes a record through a sibling temp file and an atomic rename.
///
/// # Errors
///
/// Returns [`CheckpointError`] if the record cannot be serialized or written.
pub fn store_record<R: CheckpointRecord>(path: &Path, record: &R) -> Result<(), CheckpointError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| CheckpointError::io(parent, e))?;
    }

    let payload =
        serde_json::to_vec_pretty(record).map_err(|e| CheckpointError::serialize(path, e))?;
    let tmp = temp_path(path);
    fs::write(&tmp, payload).map_err(|e| CheckpointError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| CheckpointError::io(path, e))?;
    Ok(())
}

/// Applies `delta` to the record at `path`: load, union, rewrite.
///
/// `cached` is unioned in as well and then replaced by what was written, so
/// an on-disk reset can never shrink what this process already knows.
///
/// # Errors
///
/// Returns [`CheckpointError`] if the rewrite fails. `cached` still receives
/// the delta in that case.
pub fn update_record<R: CheckpointRecord>(
    path: &Path,
    cached: &mut R,
    delta: &R,
) -> Result<(), CheckpointError> {
    let mut merged = load_record::<R>(path);
    merged.union_with(cached);
    merged.union_with(delta);
    let result = store_record(path, &merged);
    if let Err(error) = &result {
        debug!(path = %path.display(), %error, "checkpoint rewrite failed");
    }
    *cached = merged;
    result
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn corrupt_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".corrupt");
    path.with_file_name(name)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_record_missing_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let record: GlobalCheckpoint = load_record(&temp_dir.path().join("absent.json"));
        assert_eq!(record, GlobalCheckpoint::default());
    }

    #[test]
    fn test_load_record_empty_object_populates_default_sets() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("checkpoint.json");
        fs::write(&path, "{}").unwrap();

        let record: GlobalCheckpoint = load_record(&path);
        assert!(record.downloaded_names.is_empty());
        assert!(record.downloaded_ids.is_empty());
        assert!(record.completed_jobs.is_empty());
    }

    #[test]
    fn test_load_record_partial_keys_keep_present_values() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("checkpoint.json");
        fs::write(&path, r#"{"downloaded_ids": ["a", "b"]}"#).unwrap();

        let record: CollectionCheckpoint = load_record(&path);
        assert_eq!(record.downloaded_ids.len(), 2);
        assert!(record.downloaded_names.is_empty());
    }

    #[test]
    fn test_load_record_invalid_json_recovers_and_moves_aside() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("checkpoint.json");
        fs::write(&path, "{ not json").unwrap();

        let record: GlobalCheckpoint = load_record(&path);
        assert_eq!(record, GlobalCheckpoint::default());
        assert!(!path.exists());
        assert!(temp_dir.path().join("checkpoint.json.corrupt").exists());
    }

    #[test]
    fn test_load_record_wrong_shape_recovers_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("checkpoint.json");
        fs::write(&path, r#"{"downloaded_ids": 42}"#).unwrap();

        let record: GlobalCheckpoint = load_record(&path);
        assert!(record.downloaded_ids.is_empty());
    }

    #[test]
    fn test_store_record_writes_upstream_field_names() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("logs").join("checkpoint_unified.json");
        let mut record = GlobalCheckpoint::default();
        record.completed_jobs.insert("job-1".to_string());

        store_record(&path, &record).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"downloaded_names\""));
        assert!(raw.contains("\"downloaded_ids\""));
        assert!(raw.contains("\"completed_jobs\""));
        assert!(!temp_dir.path().join("logs").join("checkpoint_unified.json.tmp").exists());
    }

    #[test]
    fn test_update_record_unions_disk_cache_and_delta() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("checkpoint.json");
        fs::write(&path, r#"{"downloaded_ids": ["on-disk"]}"#).unwrap();

        let mut cached = CollectionCheckpoint::default();
        cached.downloaded_ids.insert("cached".to_string());
        let mut delta = CollectionCheckpoint::default();
        delta.downloaded_ids.insert("new".to_string());

        update_record(&path, &mut cached, &delta).unwrap();

        let reloaded: CollectionCheckpoint = load_record(&path);
        for id in ["on-disk", "cached", "new"] {
            assert!(reloaded.downloaded_ids.contains(id), "missing {id}");
            assert!(cached.downloaded_ids.contains(id), "cache missing {id}");
        }
    }

    #[test]
    fn test_update_record_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("checkpoint.json");
        let mut cached = GlobalCheckpoint::default();
        let mut delta = GlobalCheckpoint::default();
        delta.downloaded_ids.insert("x".to_string());

        update_record(&path, &mut cached, &delta).unwrap();
        let first = fs::read_to_string(&path).unwrap();
        update_record(&path, &mut cached, &delta).unwrap();
        let second = fs::read_to_string(&path).unwrap();
        assert_eq!(first, second);
    }
}

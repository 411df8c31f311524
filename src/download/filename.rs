//! Artifact file naming, sanitization, and unique path resolution.

use std::path::{Component, Path, PathBuf};

use chrono::NaiveDateTime;

use super::constants::{ARTIFACT_TIMESTAMP_FORMAT, MAX_ARTIFACT_NAME_CHARS};

/// Reduces a display name to letters, digits, spaces, `-` and `_`, with
/// whitespace collapsed. Falls back to `artifact` when nothing is left.
#[must_use]
pub fn sanitize_display_name(name: &str) -> String {
    let kept: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_') {
                c
            } else {
                ' '
            }
        })
        .collect();
    let collapsed: String = kept
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(MAX_ARTIFACT_NAME_CHARS)
        .collect();
    let trimmed = collapsed.trim();
    if trimmed.is_empty() {
        "artifact".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Builds `<sanitized display name>_<YYYYMMDD_HHMMSS>.<extension>`.
#[must_use]
pub fn artifact_file_name(display_name: &str, at: NaiveDateTime, extension: &str) -> String {
    format!(
        "{}_{}.{}",
        sanitize_display_name(display_name),
        at.format(ARTIFACT_TIMESTAMP_FORMAT),
        extension.trim_start_matches('.')
    )
}

/// Sanitizes filename for filesystem safety.
///
/// Replaces characters that are invalid on common filesystems:
/// / \ : * ? " < > |
pub(crate) fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.is_empty() {
        return "_".to_string();
    }

    if is_safe_filename_segment(&sanitized) {
        sanitized
    } else {
        sanitized
            .chars()
            .map(|c| if c == '.' { '_' } else { c })
            .collect()
    }
}

/// Resolves a unique file path in `dir`, adding `_1`, `_2`, ... before the
/// extension while the name is taken.
pub(crate) fn resolve_unique_path(dir: &Path, filename: &str) -> PathBuf {
    let filename = {
        let sanitized = sanitize_filename(filename);
        if sanitized.trim_matches('_').is_empty() {
            "artifact.bin".to_string()
        } else {
            sanitized
        }
    };
    let base_path = dir.join(&filename);

    if !base_path.exists() {
        return base_path;
    }

    let (stem, ext) = match filename.rfind('.') {
        Some(pos) if pos > 0 => (&filename[..pos], &filename[pos..]),
        _ => (filename.as_str(), ""),
    };

    for i in 1..1000 {
        let new_path = dir.join(format!("{stem}_{i}{ext}"));
        if !new_path.exists() {
            return new_path;
        }
    }

    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    dir.join(format!("{stem}_{nanos}{ext}"))
}

fn is_safe_filename_segment(name: &str) -> bool {
    !Path::new(name).components().any(|component| {
        matches!(
            component,
            Component::CurDir | Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    })
}

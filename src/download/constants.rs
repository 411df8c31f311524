//! Constants for artifact download verification.

use std::time::Duration;

/// Interval between two scans of the target folder.
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Default bound on the wait for an artifact to appear (30 seconds).
pub const DEFAULT_VERIFY_TIMEOUT_SECS: u64 = 30;

/// Artifacts smaller than this many bytes are treated as failed downloads.
pub const MIN_ARTIFACT_BYTES: u64 = 1000;

/// Extension of harvested artifacts.
pub const ARTIFACT_EXTENSION: &str = "pdf";

/// Extensions of files still being written; never picked up.
pub const PARTIAL_DOWNLOAD_EXTENSIONS: [&str; 3] = ["crdownload", "part", "tmp"];

/// Timestamp appended to finalized artifact names.
pub const ARTIFACT_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Longest sanitized display name kept in an artifact name, in characters.
pub const MAX_ARTIFACT_NAME_CHARS: usize = 120;

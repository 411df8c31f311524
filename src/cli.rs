//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use harvester_core::{CollectionStatus, ReconcilePolicy};

/// Resumable harvest of collection items and their document artifacts.
///
/// Lists remote collections, matches them to folders already on disk, and
/// downloads every item not yet recorded in the checkpoint. Safe to stop and
/// run again at any point.
#[derive(Parser, Debug)]
#[command(name = "resume-harvester")]
#[command(author, version, about)]
pub struct Args {
    /// Manifest export (JSON) describing collections, items and artifacts
    #[arg(short, long, value_name = "FILE")]
    pub source: PathBuf,

    /// Root folder for collection folders [default: downloads]
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Folder holding the global checkpoint [default: logs]
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Config file to use instead of the default location
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Collection statuses to harvest, comma separated [default: active]
    #[arg(long, value_delimiter = ',', value_name = "STATUS")]
    pub status: Vec<CollectionStatus>,

    /// What to do with collections already on disk: skip, partial-only, redo
    #[arg(long, value_name = "POLICY")]
    pub policy: Option<ReconcilePolicy>,

    /// Harvest a single collection by identity
    #[arg(long, value_name = "ID")]
    pub collection: Option<String>,

    /// Item categories to include, comma separated [default: all pipeline stages]
    #[arg(long, value_delimiter = ',', value_name = "CATEGORY")]
    pub category: Vec<String>,

    /// Stop after this many download attempts
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub max_items: Option<u64>,

    /// Seconds to wait for each artifact to appear (1-3600) [default: 30]
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub verify_timeout: Option<u64>,

    /// Delay between page fetches in milliseconds (max 60000) [default: 300]
    #[arg(long, value_name = "MS", value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub page_delay: Option<u64>,

    /// List and reconcile collections without downloading
    #[arg(long)]
    pub dry_run: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Disable colored log output
    #[arg(long)]
    pub no_color: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_minimal_args_parse() {
        let args = Args::try_parse_from(["resume-harvester", "--source", "m.json"]).unwrap();
        assert_eq!(args.source, PathBuf::from("m.json"));
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        assert!(!args.dry_run);
        assert!(args.status.is_empty());
        assert!(args.policy.is_none());
    }

    #[test]
    fn test_cli_source_is_required() {
        let err = Args::try_parse_from(["resume-harvester"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["resume-harvester", "-s", "m.json", "-vv"]).unwrap();
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_cli_status_list_parses() {
        let args = Args::try_parse_from([
            "resume-harvester",
            "-s",
            "m.json",
            "--status",
            "active,closed",
        ])
        .unwrap();
        assert_eq!(
            args.status,
            [CollectionStatus::Active, CollectionStatus::Closed]
        );
    }

    #[test]
    fn test_cli_invalid_status_rejected() {
        let err = Args::try_parse_from(["resume-harvester", "-s", "m.json", "--status", "gone"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_policy_parses() {
        let args =
            Args::try_parse_from(["resume-harvester", "-s", "m.json", "--policy", "redo"]).unwrap();
        assert_eq!(args.policy, Some(ReconcilePolicy::RedoAll));
    }

    #[test]
    fn test_cli_verify_timeout_zero_rejected() {
        let err = Args::try_parse_from([
            "resume-harvester",
            "-s",
            "m.json",
            "--verify-timeout",
            "0",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_max_items_and_collection() {
        let args = Args::try_parse_from([
            "resume-harvester",
            "-s",
            "m.json",
            "--collection",
            "job-7",
            "--max-items",
            "25",
        ])
        .unwrap();
        assert_eq!(args.collection.as_deref(), Some("job-7"));
        assert_eq!(args.max_items, Some(25));
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let err = Args::try_parse_from(["resume-harvester", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }
}

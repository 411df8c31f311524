//! Merge of CLI flags, file config and built-in defaults.

use std::path::PathBuf;
use std::time::Duration;

use harvester_core::download::{DEFAULT_VERIFY_TIMEOUT_SECS, MIN_ARTIFACT_BYTES};
use harvester_core::{CollectionStatus, FilterSet, HarvestOptions, ReconcilePolicy};

use crate::app_config::FileConfig;
use crate::cli::Args;

const DEFAULT_OUTPUT_DIR: &str = "downloads";
const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_PAGE_DELAY_MS: u64 = 300;
const DEFAULT_ITEM_DELAY_MS: u64 = 0;

/// Effective settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct HarvestConfig {
    pub(crate) output_dir: PathBuf,
    pub(crate) log_dir: PathBuf,
    pub(crate) verify_timeout_secs: u64,
    pub(crate) min_artifact_bytes: u64,
    pub(crate) page_delay_ms: u64,
    pub(crate) item_delay_ms: u64,
    pub(crate) max_items: Option<u64>,
    pub(crate) policy: ReconcilePolicy,
    pub(crate) statuses: Vec<CollectionStatus>,
    pub(crate) filters: FilterSet,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            verify_timeout_secs: DEFAULT_VERIFY_TIMEOUT_SECS,
            min_artifact_bytes: MIN_ARTIFACT_BYTES,
            page_delay_ms: DEFAULT_PAGE_DELAY_MS,
            item_delay_ms: DEFAULT_ITEM_DELAY_MS,
            max_items: None,
            policy: ReconcilePolicy::default(),
            statuses: vec![CollectionStatus::Active],
            filters: FilterSet::default(),
        }
    }
}

impl HarvestConfig {
    /// Options for the orchestrator.
    pub(crate) fn harvest_options(&self, collection: Option<String>) -> HarvestOptions {
        HarvestOptions {
            output_dir: self.output_dir.clone(),
            statuses: self.statuses.clone(),
            policy: self.policy,
            filters: self.filters.clone(),
            collection,
            max_items: self
                .max_items
                .map(|n| usize::try_from(n).unwrap_or(usize::MAX)),
            page_delay: Duration::from_millis(self.page_delay_ms),
            item_delay: Duration::from_millis(self.item_delay_ms),
            ..HarvestOptions::default()
        }
    }
}

/// Resolves effective settings. CLI flags win over the file, which wins over
/// defaults.
pub(crate) fn resolve_config(args: &Args, file: Option<&FileConfig>) -> HarvestConfig {
    let defaults = HarvestConfig::default();
    let file = file.cloned().unwrap_or_default();

    let statuses = if args.status.is_empty() {
        file.statuses.unwrap_or(defaults.statuses)
    } else {
        args.status.clone()
    };
    let filters = if args.category.is_empty() {
        file.categories.map_or(defaults.filters, FilterSet::new)
    } else {
        FilterSet::new(args.category.iter().cloned())
    };

    HarvestConfig {
        output_dir: args
            .output_dir
            .clone()
            .or(file.output_dir)
            .unwrap_or(defaults.output_dir),
        log_dir: args
            .log_dir
            .clone()
            .or(file.log_dir)
            .unwrap_or(defaults.log_dir),
        verify_timeout_secs: args
            .verify_timeout
            .or(file.verify_timeout_secs)
            .unwrap_or(defaults.verify_timeout_secs),
        min_artifact_bytes: file
            .min_artifact_bytes
            .unwrap_or(defaults.min_artifact_bytes),
        page_delay_ms: args
            .page_delay
            .or(file.page_delay_ms)
            .unwrap_or(defaults.page_delay_ms),
        item_delay_ms: file.item_delay_ms.unwrap_or(defaults.item_delay_ms),
        max_items: args.max_items.or(file.max_items),
        policy: args.policy.or(file.policy).unwrap_or(defaults.policy),
        statuses,
        filters,
    }
}

/// Default log level from flags, then file verbosity.
///
/// Priority: quiet flag > verbose flag > file verbosity > info.
pub(crate) fn resolve_default_log_level(args: &Args, file: Option<&FileConfig>) -> &'static str {
    if args.quiet {
        return "error";
    }
    match args.verbose {
        0 => file
            .and_then(|f| f.verbosity)
            .map_or("info", |v| v.log_level()),
        1 => "debug",
        _ => "trace",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::app_config::VerbositySetting;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["resume-harvester", "--source", "m.json"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_resolve_config_defaults() {
        let config = resolve_config(&args(&[]), None);
        assert_eq!(config, HarvestConfig::default());
        assert_eq!(config.output_dir, PathBuf::from("downloads"));
        assert_eq!(config.log_dir, PathBuf::from("logs"));
        assert_eq!(config.verify_timeout_secs, 30);
        assert_eq!(config.min_artifact_bytes, 1000);
        assert_eq!(config.page_delay_ms, 300);
        assert_eq!(config.policy, ReconcilePolicy::PartialOnly);
    }

    #[test]
    fn test_resolve_config_file_overrides_defaults() {
        let file = FileConfig {
            output_dir: Some(PathBuf::from("/cv")),
            page_delay_ms: Some(0),
            policy: Some(ReconcilePolicy::SkipExisting),
            statuses: Some(vec![CollectionStatus::Closed]),
            ..FileConfig::default()
        };
        let config = resolve_config(&args(&[]), Some(&file));
        assert_eq!(config.output_dir, PathBuf::from("/cv"));
        assert_eq!(config.page_delay_ms, 0);
        assert_eq!(config.policy, ReconcilePolicy::SkipExisting);
        assert_eq!(config.statuses, [CollectionStatus::Closed]);
    }

    #[test]
    fn test_resolve_config_cli_overrides_file() {
        let file = FileConfig {
            output_dir: Some(PathBuf::from("/cv")),
            verify_timeout_secs: Some(90),
            policy: Some(ReconcilePolicy::SkipExisting),
            ..FileConfig::default()
        };
        let config = resolve_config(
            &args(&["-o", "/elsewhere", "--verify-timeout", "5", "--policy", "redo"]),
            Some(&file),
        );
        assert_eq!(config.output_dir, PathBuf::from("/elsewhere"));
        assert_eq!(config.verify_timeout_secs, 5);
        assert_eq!(config.policy, ReconcilePolicy::RedoAll);
    }

    #[test]
    fn test_resolve_config_categories_from_cli() {
        let config = resolve_config(&args(&["--category", "NEW,OFFER_MADE"]), None);
        assert_eq!(config.filters.categories(), ["NEW", "OFFER_MADE"]);
    }

    #[test]
    fn test_harvest_options_carry_delays_and_cap() {
        let config = resolve_config(&args(&["--max-items", "3", "--page-delay", "0"]), None);
        let options = config.harvest_options(Some("job".to_string()));
        assert_eq!(options.max_items, Some(3));
        assert_eq!(options.page_delay, Duration::ZERO);
        assert_eq!(options.collection.as_deref(), Some("job"));
    }

    #[test]
    fn test_resolve_default_log_level_priority() {
        let file = FileConfig {
            verbosity: Some(VerbositySetting::Debug),
            ..FileConfig::default()
        };
        assert_eq!(resolve_default_log_level(&args(&[]), None), "info");
        assert_eq!(resolve_default_log_level(&args(&[]), Some(&file)), "trace");
        assert_eq!(resolve_default_log_level(&args(&["-v"]), Some(&file)), "debug");
        assert_eq!(resolve_default_log_level(&args(&["-q", "-v"]), None), "error");
    }
}

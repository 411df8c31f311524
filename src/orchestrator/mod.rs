//! Sequential harvest of every eligible collection.
//!
//! The orchestrator walks a fixed state machine:
//!
//! ```text
//! Listing -> Reconciling -> Harvesting(collection) -> Verifying(item)*
//!         -> CollectionComplete -> (next collection | Done)
//! ```
//!
//! Exactly one item is in flight at any time. Every per-item write to the
//! checkpoint is independent, so stopping between two items always leaves a
//! resumable state. Only an interrupt, or an output root that cannot be
//! created, ends a run early; every other fault is counted and skipped.

mod report;

pub use report::{
    CollectionDisposition, CollectionReport, HarvestPlan, PlanAction, PlanEntry, RunReport,
    SkipReason,
};

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::checkpoint::CheckpointStore;
use crate::download::{ARTIFACT_EXTENSION, DownloadVerifier};
use crate::harvest::PaginationStrategy;
use crate::model::{CollectionStatus, FilterSet, Item};
use crate::reconcile::{FolderReconciler, ReconcilePolicy, count_artifacts};
use crate::transport::CollectionSource;

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum HarvestError {
    /// The output root could not be created.
    #[error("cannot create output folder {path}: {source}")]
    OutputRoot {
        /// Output root.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Current step of the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HarvestState {
    /// Not started.
    Idle,
    /// Fetching the collection list.
    Listing,
    /// Matching collections to local folders and applying the policy.
    Reconciling,
    /// Running pagination passes for a collection.
    Harvesting(String),
    /// Requesting and verifying one item.
    Verifying(String),
    /// Recording a collection as complete.
    CollectionComplete(String),
    /// Finished, or stopped.
    Done,
}

impl fmt::Display for HarvestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Listing => f.write_str("listing"),
            Self::Reconciling => f.write_str("reconciling"),
            Self::Harvesting(id) => write!(f, "harvesting({id})"),
            Self::Verifying(id) => write!(f, "verifying({id})"),
            Self::CollectionComplete(id) => write!(f, "collection_complete({id})"),
            Self::Done => f.write_str("done"),
        }
    }
}

/// Run parameters.
#[derive(Debug, Clone)]
pub struct HarvestOptions {
    /// Root under which collection folders live.
    pub output_dir: PathBuf,
    /// Collection statuses to list.
    pub statuses: Vec<CollectionStatus>,
    /// Treatment of collections with an existing folder.
    pub policy: ReconcilePolicy,
    /// Item categories to harvest.
    pub filters: FilterSet,
    /// Restrict the run to one collection identity.
    pub collection: Option<String>,
    /// Stop after this many download attempts.
    pub max_items: Option<usize>,
    /// Pause between page fetches.
    pub page_delay: Duration,
    /// Pause between item downloads.
    pub item_delay: Duration,
    /// Artifact extension.
    pub extension: String,
}

impl Default for HarvestOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("downloads"),
            statuses: vec![CollectionStatus::Active],
            policy: ReconcilePolicy::default(),
            filters: FilterSet::default(),
            collection: None,
            max_items: None,
            page_delay: Duration::ZERO,
            item_delay: Duration::ZERO,
            extension: ARTIFACT_EXTENSION.to_string(),
        }
    }
}

/// Drives listing, reconciliation, harvesting and verification.
pub struct HarvestOrchestrator {
    source: Arc<dyn CollectionSource>,
    verifier: DownloadVerifier,
    checkpoint: CheckpointStore,
    options: HarvestOptions,
    interrupt: Arc<AtomicBool>,
    state: HarvestState,
    attempted: usize,
}

impl HarvestOrchestrator {
    /// Creates an orchestrator over an explicit checkpoint store.
    #[must_use]
    pub fn new(
        source: Arc<dyn CollectionSource>,
        verifier: DownloadVerifier,
        checkpoint: CheckpointStore,
        options: HarvestOptions,
    ) -> Self {
        Self {
            source,
            verifier,
            checkpoint,
            options,
            interrupt: Arc::new(AtomicBool::new(false)),
            state: HarvestState::Idle,
            attempted: 0,
        }
    }

    /// Uses `flag` as the interrupt signal. Setting it stops the run before
    /// the next item or collection.
    #[must_use]
    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupt = flag;
        self
    }

    /// Handle that can be set from a signal handler.
    #[must_use]
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupt)
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> &HarvestState {
        &self.state
    }

    /// Checkpoint store.
    #[must_use]
    pub fn checkpoint(&self) -> &CheckpointStore {
        &self.checkpoint
    }

    /// Run parameters.
    #[must_use]
    pub fn options(&self) -> &HarvestOptions {
        &self.options
    }

    fn enter(&mut self, state: HarvestState) {
        debug!(from = %self.state, to = %state, "state transition");
        self.state = state;
    }

    fn interrupted(&self) -> bool {
        self.interrupt.load(Ordering::SeqCst)
    }

    fn budget_exhausted(&self) -> bool {
        self.options
            .max_items
            .is_some_and(|max| self.attempted >= max)
    }

    /// Lists and reconciles collections without downloading anything.
    ///
    /// A listing failure is reported in the plan, not raised.
    #[instrument(skip(self))]
    pub async fn plan(&mut self) -> HarvestPlan {
        self.enter(HarvestState::Listing);
        let mut collections = match self.source.list_collections(&self.options.statuses).await {
            Ok(collections) => collections,
            Err(error) => {
                warn!(%error, "collection listing failed");
                return HarvestPlan {
                    entries: Vec::new(),
                    listing_error: Some(error.to_string()),
                };
            }
        };
        info!(collections = collections.len(), "collections listed");

        if let Some(only) = &self.options.collection {
            collections.retain(|c| &c.identity == only);
            if collections.is_empty() {
                warn!(collection = %only, "requested collection not listed");
                return HarvestPlan {
                    entries: Vec::new(),
                    listing_error: Some(format!("collection '{only}' not found in listing")),
                };
            }
        }

        self.enter(HarvestState::Reconciling);
        let root = &self.options.output_dir;
        let reconciler = FolderReconciler::scan(root, &self.options.extension).unwrap_or_else(|error| {
            warn!(%error, "output folder scan failed, treating every collection as new");
            FolderReconciler::with_folders(root.clone(), Vec::new())
        });

        let entries = collections
            .into_iter()
            .map(|collection| {
                let classification = reconciler.classify(&collection);
                let folder = reconciler.target_folder(&collection, &classification);
                let action = if self.checkpoint.is_collection_complete(&collection.identity) {
                    PlanAction::Skip(SkipReason::AlreadyComplete)
                } else if self.options.policy.admits(&classification) {
                    PlanAction::Harvest
                } else {
                    PlanAction::Skip(SkipReason::Policy)
                };
                debug!(
                    collection = %collection.identity,
                    classification = %classification,
                    persisted = classification.persisted(),
                    announced = collection.announced_item_count,
                    ?action,
                    "collection reconciled"
                );
                PlanEntry {
                    collection,
                    classification,
                    folder,
                    action,
                }
            })
            .collect();

        HarvestPlan {
            entries,
            listing_error: None,
        }
    }

    /// Runs the whole harvest.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError::OutputRoot`] if the output root cannot be
    /// created. Every other fault is recorded in the report.
    #[instrument(skip(self), fields(policy = %self.options.policy))]
    pub async fn run(&mut self) -> Result<RunReport, HarvestError> {
        let started = Instant::now();
        let root = self.options.output_dir.clone();
        std::fs::create_dir_all(&root).map_err(|source| HarvestError::OutputRoot {
            path: root.clone(),
            source,
        })?;

        let plan = self.plan().await;
        let mut report = RunReport {
            listed: plan.entries.len(),
            listing_error: plan.listing_error.clone(),
            ..RunReport::default()
        };

        for entry in &plan.entries {
            if self.interrupted() {
                report.interrupted = true;
                break;
            }
            if self.budget_exhausted() {
                report.budget_exhausted = true;
                break;
            }

            let mut collection_report = CollectionReport::new(entry);
            if let PlanAction::Skip(reason) = entry.action {
                info!(
                    collection = %entry.collection.identity,
                    title = %entry.collection.title,
                    %reason,
                    "collection skipped"
                );
                report.collections.push(collection_report);
                continue;
            }

            self.harvest_entry(entry, &mut collection_report).await;
            report.interrupted |= self.interrupted();
            report.budget_exhausted |= self.budget_exhausted();
            report.collections.push(collection_report);
        }

        self.enter(HarvestState::Done);
        report.elapsed = started.elapsed();
        info!(
            downloaded = report.downloaded(),
            skipped = report.skipped(),
            failed = report.failed(),
            interrupted = report.interrupted,
            elapsed_secs = report.elapsed.as_secs(),
            "run finished"
        );
        Ok(report)
    }

    #[instrument(skip(self, entry, report), fields(collection = %entry.collection.identity))]
    async fn harvest_entry(&mut self, entry: &PlanEntry, report: &mut CollectionReport) {
        let collection = &entry.collection;
        let folder = &entry.folder;
        self.enter(HarvestState::Harvesting(collection.identity.clone()));

        let pre_existing = count_artifacts(folder, &self.options.extension) > 0;
        if let Err(error) = std::fs::create_dir_all(folder) {
            warn!(folder = %folder.display(), %error, "cannot create collection folder");
            report.disposition =
                CollectionDisposition::Errored(format!("cannot create {}: {error}", folder.display()));
            return;
        }

        let mut scope = self.checkpoint.open_scope(folder);
        if pre_existing {
            let scanned = scope.seed_names_from_artifacts(&self.options.extension);
            info!(scanned, known_names = scope.known_name_count(), "resuming existing folder");
        }

        let strategy =
            PaginationStrategy::new(self.source.as_ref()).with_page_delay(self.options.page_delay);
        let outcome = strategy
            .harvest_collection(collection, &self.options.filters)
            .await;
        report.announced_total = outcome.announced_total;
        report.harvested = outcome.items.len();
        report.passes = outcome.passes_run();
        report.unrecoverable = outcome.unrecoverable;
        report.faulted_passes = outcome.passes.iter().filter(|p| p.faulted).count();

        let pending: Vec<Item> = {
            let done = self.checkpoint.merged(&scope);
            outcome
                .items
                .into_iter()
                .filter(|item| {
                    let already = done.is_done(&item.identity)
                        || (pre_existing && done.is_done_by_name(&item.display_name));
                    if already {
                        report.skipped += 1;
                    }
                    !already
                })
                .collect()
        };
        info!(
            harvested = report.harvested,
            pending = pending.len(),
            skipped = report.skipped,
            "items to download"
        );

        let mut stopped = false;
        for item in &pending {
            if self.interrupted() || self.budget_exhausted() {
                stopped = true;
                break;
            }
            self.enter(HarvestState::Verifying(item.identity.clone()));
            self.attempted += 1;

            match self.verifier.download(item, folder).await {
                Ok(path) => {
                    if let Err(error) = scope.mark_done(&item.identity, &item.display_name) {
                        warn!(%error, "collection checkpoint write failed");
                    }
                    if let Err(error) = self.checkpoint.mark_done(&item.identity, &item.display_name) {
                        warn!(%error, "global checkpoint write failed");
                    }
                    report.downloaded += 1;
                    debug!(item = %item.identity, path = %path.display(), "item done");
                }
                Err(error) => {
                    warn!(item = %item.identity, name = %item.display_name, %error, "item failed");
                    report.record_failure(error.category());
                }
            }

            if !self.options.item_delay.is_zero() {
                tokio::time::sleep(self.options.item_delay).await;
            }
        }

        // Faulted passes keep the collection open for the next run.
        if stopped || report.failed > 0 || report.faulted_passes > 0 {
            info!(
                downloaded = report.downloaded,
                failed = report.failed,
                faulted_passes = report.faulted_passes,
                stopped,
                "collection left resumable"
            );
            return;
        }

        self.enter(HarvestState::CollectionComplete(collection.identity.clone()));
        if let Err(error) = self.checkpoint.mark_collection_complete(&collection.identity) {
            warn!(%error, "global checkpoint write failed");
        }
        report.disposition = CollectionDisposition::Completed;
        info!(
            downloaded = report.downloaded,
            skipped = report.skipped,
            "collection complete"
        );
    }
}

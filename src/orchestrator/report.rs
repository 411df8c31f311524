//! Per-collection and per-run outcome reporting.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::model::Collection;
use crate::reconcile::Classification;

/// Why a listed collection was not harvested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The global checkpoint lists the collection as complete.
    AlreadyComplete,
    /// The reconcile policy excluded the collection's local state.
    Policy,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyComplete => f.write_str("already complete"),
            Self::Policy => f.write_str("excluded by policy"),
        }
    }
}

/// Planned handling of one listed collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanAction {
    /// Harvest the collection.
    Harvest,
    /// Leave it alone.
    Skip(SkipReason),
}

/// One collection in a [`HarvestPlan`].
#[derive(Debug, Clone)]
pub struct PlanEntry {
    /// Listed collection.
    pub collection: Collection,
    /// Local state found by the reconciler.
    pub classification: Classification,
    /// Folder that receives the collection's artifacts.
    pub folder: PathBuf,
    /// What the run does with it.
    pub action: PlanAction,
}

/// Listing and reconciliation result, before any download.
#[derive(Debug, Clone, Default)]
pub struct HarvestPlan {
    /// Collections in listing order.
    pub entries: Vec<PlanEntry>,
    /// Listing failure, if the remote listing could not be obtained.
    pub listing_error: Option<String>,
}

impl HarvestPlan {
    /// Entries that will be harvested.
    pub fn to_harvest(&self) -> impl Iterator<Item = &PlanEntry> {
        self.entries
            .iter()
            .filter(|e| e.action == PlanAction::Harvest)
    }
}

/// How a collection ended within a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionDisposition {
    /// Harvested and marked complete.
    Completed,
    /// Harvested, but some items failed or the run stopped early.
    Incomplete,
    /// Not harvested.
    Skipped(SkipReason),
    /// Could not be processed at all.
    Errored(String),
}

/// Counts for one collection.
#[derive(Debug, Clone)]
pub struct CollectionReport {
    /// Collection identity.
    pub identity: String,
    /// Collection title.
    pub title: String,
    /// Local state label (`new`, `partial`, `complete`).
    pub classification: &'static str,
    /// Target folder.
    pub folder: PathBuf,
    /// Final disposition.
    pub disposition: CollectionDisposition,
    /// Total announced by the listing.
    pub announced_total: u64,
    /// Distinct items the passes retrieved.
    pub harvested: usize,
    /// Passes executed.
    pub passes: usize,
    /// Items downloaded in this run.
    pub downloaded: usize,
    /// Items skipped as already done.
    pub skipped: usize,
    /// Items whose download failed.
    pub failed: usize,
    /// Entries dropped for lacking an identity or locator.
    pub unrecoverable: usize,
    /// Passes ended early by a transport fault.
    pub faulted_passes: usize,
    /// Failures by category.
    pub failures: BTreeMap<&'static str, usize>,
}

impl CollectionReport {
    /// Creates an empty report for a planned collection.
    #[must_use]
    pub fn new(entry: &PlanEntry) -> Self {
        let disposition = match entry.action {
            PlanAction::Harvest => CollectionDisposition::Incomplete,
            PlanAction::Skip(reason) => CollectionDisposition::Skipped(reason),
        };
        Self {
            identity: entry.collection.identity.clone(),
            title: entry.collection.title.clone(),
            classification: entry.classification.label(),
            folder: entry.folder.clone(),
            disposition,
            announced_total: entry.collection.announced_item_count,
            harvested: 0,
            passes: 0,
            downloaded: 0,
            skipped: 0,
            failed: 0,
            unrecoverable: 0,
            faulted_passes: 0,
            failures: BTreeMap::new(),
        }
    }

    /// Announced items no pass could retrieve.
    #[must_use]
    pub fn shortfall(&self) -> u64 {
        self.announced_total.saturating_sub(self.harvested as u64)
    }

    /// Returns true if the collection was not harvested.
    #[must_use]
    pub fn was_skipped(&self) -> bool {
        matches!(self.disposition, CollectionDisposition::Skipped(_))
    }

    pub(crate) fn record_failure(&mut self, category: &'static str) {
        self.failed += 1;
        *self.failures.entry(category).or_insert(0) += 1;
    }
}

/// Outcome of a whole run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Collections in processing order, skipped ones included.
    pub collections: Vec<CollectionReport>,
    /// Collections returned by the listing.
    pub listed: usize,
    /// Listing failure, if any.
    pub listing_error: Option<String>,
    /// The run stopped on an interrupt.
    pub interrupted: bool,
    /// The run stopped on the per-run item cap.
    pub budget_exhausted: bool,
    /// Wall time of the run.
    pub elapsed: Duration,
}

impl RunReport {
    /// Items downloaded across all collections.
    #[must_use]
    pub fn downloaded(&self) -> usize {
        self.collections.iter().map(|c| c.downloaded).sum()
    }

    /// Items skipped as already done.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.collections.iter().map(|c| c.skipped).sum()
    }

    /// Items that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.collections.iter().map(|c| c.failed).sum()
    }

    /// Entries dropped for lacking an identity or locator.
    #[must_use]
    pub fn unrecoverable(&self) -> usize {
        self.collections.iter().map(|c| c.unrecoverable).sum()
    }

    /// Items that reached a decision: downloaded, skipped or failed.
    #[must_use]
    pub fn processed(&self) -> usize {
        self.downloaded() + self.skipped() + self.failed()
    }

    /// Collections that were harvested rather than skipped.
    #[must_use]
    pub fn harvested_collections(&self) -> usize {
        self.collections.iter().filter(|c| !c.was_skipped()).count()
    }

    /// Collections whose harvest fell short of the announced total.
    pub fn short_collections(&self) -> impl Iterator<Item = &CollectionReport> {
        self.collections
            .iter()
            .filter(|c| !c.was_skipped() && c.shortfall() > 0)
    }

    /// Mean wall time per downloaded item, in seconds.
    #[must_use]
    pub fn average_secs_per_download(&self) -> Option<f64> {
        let downloaded = self.downloaded();
        if downloaded == 0 {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        Some(self.elapsed.as_secs_f64() / downloaded as f64)
    }

    /// Returns true if any collection could not be processed.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.listing_error.is_some()
            || self
                .collections
                .iter()
                .any(|c| matches!(c.disposition, CollectionDisposition::Errored(_)))
    }
}

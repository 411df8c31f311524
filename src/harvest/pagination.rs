//! Multi-pass pagination around the upstream result-window cap.
//!
//! The remote listing silently stops returning results past a fixed window
//! for any single ordered query. Re-running the same logical query under other
//! orderings, and then under narrower filters, exposes different windows of
//! the same collection. Results are merged by identity.
//!
//! The schedule is:
//!
//! 1. full filters, creation order ascending (sets the announced total)
//! 2. full filters, creation order descending
//! 3. full filters, display name ascending
//! 4. full filters, display name descending
//! 5. only when the shortfall exceeds [`LARGE_SHORTFALL_THRESHOLD`]: every
//!    single filter category × both sort keys × both directions
//!
//! The schedule stops as soon as the merged count reaches the announced
//! total. This is a best-effort strategy; a residual shortfall is reported,
//! never treated as failure.

use std::fmt;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use super::dedup::Deduplicator;
use crate::model::{Collection, FilterSet, Item, Page, SortDirection, SortKey};
use crate::transport::{CollectionSource, PageRequest, TransportError};

/// Items requested per page.
pub const PAGE_SIZE: u64 = 100;

/// Shortfall above which the per-category passes run.
pub const LARGE_SHORTFALL_THRESHOLD: u64 = 1000;

/// Query shape of one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassSpec {
    /// Categories included.
    pub filters: FilterSet,
    /// Ordering key.
    pub sort_key: SortKey,
    /// Ordering direction.
    pub direction: SortDirection,
}

impl PassSpec {
    /// Creates a pass spec.
    #[must_use]
    pub fn new(filters: FilterSet, sort_key: SortKey, direction: SortDirection) -> Self {
        Self {
            filters,
            sort_key,
            direction,
        }
    }
}

impl fmt::Display for PassSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} {}", self.filters, self.sort_key, self.direction)
    }
}

/// Raw result of one pass.
#[derive(Debug, Default)]
pub struct PassOutcome {
    /// Pages in fetch order, including a final empty page if one was returned.
    pub pages: Vec<Page>,
    /// Transport fault that ended the pass early, if any.
    pub fault: Option<TransportError>,
}

impl PassOutcome {
    /// Total announced by the first page of the pass.
    #[must_use]
    pub fn announced_total(&self) -> Option<u64> {
        self.pages.first().map(|p| p.announced_total)
    }

    /// Number of items fetched across all pages, duplicates included.
    #[must_use]
    pub fn fetched(&self) -> usize {
        self.pages.iter().map(|p| p.items.len()).sum()
    }
}

/// Summary of one executed pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassReport {
    /// Query shape.
    pub spec: PassSpec,
    /// Pages fetched.
    pub pages: usize,
    /// Items fetched, duplicates included.
    pub fetched: usize,
    /// Items new to the merged set.
    pub added: usize,
    /// Whether a transport fault ended the pass.
    pub faulted: bool,
}

/// Result of harvesting one collection.
#[derive(Debug)]
pub struct HarvestOutcome {
    /// Distinct items in first-seen order.
    pub items: Vec<Item>,
    /// Total announced by the listing.
    pub announced_total: u64,
    /// Executed passes, in order.
    pub passes: Vec<PassReport>,
    /// Distinct entries dropped for lacking an identity or locator.
    pub unrecoverable: usize,
}

impl HarvestOutcome {
    /// Announced items that no pass could retrieve.
    #[must_use]
    pub fn shortfall(&self) -> u64 {
        self.announced_total.saturating_sub(self.items.len() as u64)
    }

    /// Returns true when every announced item was retrieved.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.shortfall() == 0
    }

    /// Number of passes executed.
    #[must_use]
    pub fn passes_run(&self) -> usize {
        self.passes.len()
    }
}

/// Drives fetch passes against a [`CollectionSource`].
pub struct PaginationStrategy<'a> {
    source: &'a dyn CollectionSource,
    page_size: u64,
    shortfall_threshold: u64,
    page_delay: Duration,
}

impl<'a> PaginationStrategy<'a> {
    /// Creates a strategy with the default page size and threshold.
    #[must_use]
    pub fn new(source: &'a dyn CollectionSource) -> Self {
        Self {
            source,
            page_size: PAGE_SIZE,
            shortfall_threshold: LARGE_SHORTFALL_THRESHOLD,
            page_delay: Duration::ZERO,
        }
    }

    /// Sets the pause between consecutive page fetches of one pass.
    #[must_use]
    pub fn with_page_delay(mut self, page_delay: Duration) -> Self {
        self.page_delay = page_delay;
        self
    }

    /// Sets the shortfall above which per-category passes run.
    #[must_use]
    pub fn with_shortfall_threshold(mut self, threshold: u64) -> Self {
        self.shortfall_threshold = threshold;
        self
    }

    /// Runs one pass: pages through the listing until a short or empty page,
    /// a page reporting no more results, or a transport fault.
    #[instrument(level = "debug", skip(self), fields(pass = %spec))]
    pub async fn fetch_pass(&self, collection_id: &str, spec: &PassSpec) -> PassOutcome {
        let mut outcome = PassOutcome::default();
        let mut offset = 0u64;

        loop {
            let request = PageRequest {
                collection_id,
                offset,
                limit: self.page_size,
                filters: &spec.filters,
                sort_key: spec.sort_key,
                direction: spec.direction,
            };

            let page = match self.source.fetch_items_page(&request).await {
                Ok(page) => page,
                Err(error) => {
                    warn!(offset, %error, "page fetch failed, ending pass");
                    outcome.fault = Some(error);
                    break;
                }
            };

            let count = page.items.len() as u64;
            let last = count < self.page_size || !page.has_more;
            debug!(offset, count, has_more = page.has_more, "fetched page");
            outcome.pages.push(page);
            if last {
                break;
            }

            offset += self.page_size;
            if !self.page_delay.is_zero() {
                tokio::time::sleep(self.page_delay).await;
            }
        }

        outcome
    }

    /// Harvests every retrievable item of `collection` under `filters`.
    ///
    /// The announced total comes from the first page of the first pass, or
    /// from the collection listing if that page could not be fetched.
    #[instrument(skip(self, collection, filters), fields(collection = %collection.identity))]
    pub async fn harvest_collection(
        &self,
        collection: &Collection,
        filters: &FilterSet,
    ) -> HarvestOutcome {
        let mut merged = Deduplicator::new();
        let mut passes = Vec::new();

        let primary = PassSpec::new(
            filters.clone(),
            SortKey::CreationDate,
            SortDirection::Ascending,
        );
        let first = self.fetch_pass(&collection.identity, &primary).await;
        let announced_total = first
            .announced_total()
            .unwrap_or(collection.announced_item_count);
        passes.push(Self::merge_pass(&mut merged, primary, &first));

        let reordered = [
            (SortKey::CreationDate, SortDirection::Descending),
            (SortKey::DisplayName, SortDirection::Ascending),
            (SortKey::DisplayName, SortDirection::Descending),
        ];
        for (sort_key, direction) in reordered {
            if merged.len() as u64 >= announced_total {
                break;
            }
            let spec = PassSpec::new(filters.clone(), sort_key, direction);
            let outcome = self.fetch_pass(&collection.identity, &spec).await;
            passes.push(Self::merge_pass(&mut merged, spec, &outcome));
        }

        let shortfall = announced_total.saturating_sub(merged.len() as u64);
        if shortfall > self.shortfall_threshold {
            info!(
                shortfall,
                categories = filters.categories().len(),
                "large shortfall, running per-category passes"
            );
            'narrow: for single in filters.split() {
                for sort_key in SortKey::ALL {
                    for direction in SortDirection::ALL {
                        if merged.len() as u64 >= announced_total {
                            break 'narrow;
                        }
                        let spec = PassSpec::new(single.clone(), sort_key, direction);
                        let outcome = self.fetch_pass(&collection.identity, &spec).await;
                        passes.push(Self::merge_pass(&mut merged, spec, &outcome));
                    }
                }
            }
        }

        let unrecoverable = merged.unrecoverable();
        let items = merged.into_items();
        let result = HarvestOutcome {
            items,
            announced_total,
            passes,
            unrecoverable,
        };

        if result.is_complete() {
            info!(
                harvested = result.items.len(),
                announced_total,
                passes = result.passes_run(),
                "harvest complete"
            );
        } else {
            warn!(
                harvested = result.items.len(),
                announced_total,
                shortfall = result.shortfall(),
                passes = result.passes_run(),
                "harvest incomplete: listing exposes fewer items than announced"
            );
        }
        if unrecoverable > 0 {
            warn!(unrecoverable, "items without identity or locator were dropped");
        }

        result
    }

    fn merge_pass(merged: &mut Deduplicator, spec: PassSpec, outcome: &PassOutcome) -> PassReport {
        let mut added = 0;
        for page in &outcome.pages {
            added += merged.merge(page).added;
        }
        debug!(
            pass = %spec,
            fetched = outcome.fetched(),
            added,
            total = merged.len(),
            "pass merged"
        );
        PassReport {
            spec,
            pages: outcome.pages.len(),
            fetched: outcome.fetched(),
            added,
            faulted: outcome.fault.is_some(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::model::CollectionStatus;

    /// Serves a fixed number of full pages, then a short one.
    struct PagedSource {
        full_pages: u64,
        tail: u64,
        fail_at_offset: Option<u64>,
        calls: Mutex<Vec<u64>>,
    }

    #[async_trait]
    impl CollectionSource for PagedSource {
        async fn list_collections(
            &self,
            _statuses: &[CollectionStatus],
        ) -> Result<Vec<Collection>, TransportError> {
            Ok(Vec::new())
        }

        async fn fetch_items_page(
            &self,
            request: &PageRequest<'_>,
        ) -> Result<Page, TransportError> {
            self.calls.lock().unwrap().push(request.offset);
            if self.fail_at_offset == Some(request.offset) {
                return Err(TransportError::fault("fetch page", "boom"));
            }
            let index = request.offset / PAGE_SIZE;
            let count = if index < self.full_pages {
                PAGE_SIZE
            } else if index == self.full_pages {
                self.tail
            } else {
                0
            };
            let items = (0..count)
                .map(|n| {
                    let id = format!("{}-{}", request.offset, n);
                    Item::new(id.clone(), id, "loc")
                })
                .collect();
            Ok(Page {
                items,
                has_more: count == PAGE_SIZE,
                announced_total: self.full_pages * PAGE_SIZE + self.tail,
            })
        }
    }

    fn paged(full_pages: u64, tail: u64, fail_at_offset: Option<u64>) -> PagedSource {
        PagedSource {
            full_pages,
            tail,
            fail_at_offset,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn spec() -> PassSpec {
        PassSpec::new(
            FilterSet::default(),
            SortKey::CreationDate,
            SortDirection::Ascending,
        )
    }

    #[tokio::test]
    async fn test_fetch_pass_stops_on_short_page() {
        let source = paged(2, 30, None);
        let strategy = PaginationStrategy::new(&source);
        let outcome = strategy.fetch_pass("job", &spec()).await;

        assert_eq!(outcome.pages.len(), 3);
        assert_eq!(outcome.fetched(), 230);
        assert_eq!(outcome.announced_total(), Some(230));
        assert_eq!(*source.calls.lock().unwrap(), [0, 100, 200]);
    }

    #[tokio::test]
    async fn test_fetch_pass_stops_on_empty_page() {
        let source = paged(1, 0, None);
        let strategy = PaginationStrategy::new(&source);
        let outcome = strategy.fetch_pass("job", &spec()).await;

        assert_eq!(outcome.fetched(), 100);
        assert!(outcome.fault.is_none());
    }

    #[tokio::test]
    async fn test_fetch_pass_fault_ends_pass_and_keeps_collected_pages() {
        let source = paged(5, 0, Some(200));
        let strategy = PaginationStrategy::new(&source);
        let outcome = strategy.fetch_pass("job", &spec()).await;

        assert_eq!(outcome.fetched(), 200);
        assert!(outcome.fault.is_some());
        assert_eq!(*source.calls.lock().unwrap(), [0, 100, 200]);
    }

    /// Serves one capped page per ordering, each a window of identities.
    struct ScriptedSource {
        announced_total: u64,
        windows: Vec<((SortKey, SortDirection), std::ops::Range<u64>)>,
        orderings: Mutex<Vec<(SortKey, SortDirection)>>,
    }

    #[async_trait]
    impl CollectionSource for ScriptedSource {
        async fn list_collections(
            &self,
            _statuses: &[CollectionStatus],
        ) -> Result<Vec<Collection>, TransportError> {
            Ok(Vec::new())
        }

        async fn fetch_items_page(
            &self,
            request: &PageRequest<'_>,
        ) -> Result<Page, TransportError> {
            let ordering = (request.sort_key, request.direction);
            self.orderings.lock().unwrap().push(ordering);
            let window = self
                .windows
                .iter()
                .find(|(o, _)| *o == ordering)
                .map(|(_, w)| w.clone())
                .unwrap_or(0..0);
            let items = window
                .map(|n| Item::new(format!("c-{n}"), format!("Candidate {n}"), "loc"))
                .collect();
            Ok(Page {
                items,
                has_more: false,
                announced_total: self.announced_total,
            })
        }
    }

    fn collection(announced: u64) -> Collection {
        Collection {
            identity: "job".to_string(),
            title: "Job".to_string(),
            status: CollectionStatus::Active,
            created_date: None,
            announced_item_count: announced,
        }
    }

    #[tokio::test]
    async fn test_harvest_halts_once_announced_total_is_reached() {
        let source = ScriptedSource {
            announced_total: 250,
            windows: vec![
                ((SortKey::CreationDate, SortDirection::Ascending), 0..100),
                ((SortKey::CreationDate, SortDirection::Descending), 80..180),
                ((SortKey::DisplayName, SortDirection::Ascending), 150..250),
                ((SortKey::DisplayName, SortDirection::Descending), 0..100),
            ],
            orderings: Mutex::new(Vec::new()),
        };
        let outcome = PaginationStrategy::new(&source)
            .harvest_collection(&collection(250), &FilterSet::default())
            .await;

        assert_eq!(outcome.items.len(), 250);
        assert!(outcome.is_complete());
        let added: Vec<usize> = outcome.passes.iter().map(|p| p.added).collect();
        assert_eq!(added, [100, 80, 70]);
        assert_eq!(source.orderings.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_harvest_reports_residual_shortfall_without_category_passes() {
        let source = ScriptedSource {
            announced_total: 400,
            windows: vec![((SortKey::CreationDate, SortDirection::Ascending), 0..100)],
            orderings: Mutex::new(Vec::new()),
        };
        let outcome = PaginationStrategy::new(&source)
            .harvest_collection(&collection(400), &FilterSet::default())
            .await;

        assert_eq!(outcome.items.len(), 100);
        assert_eq!(outcome.shortfall(), 300);
        assert_eq!(outcome.passes_run(), 4);
    }

    #[tokio::test]
    async fn test_harvest_falls_back_to_listed_count_when_first_page_fails() {
        let source = paged(0, 0, Some(0));
        let outcome = PaginationStrategy::new(&source)
            .harvest_collection(&collection(12), &FilterSet::default())
            .await;

        assert_eq!(outcome.announced_total, 12);
        assert!(outcome.items.is_empty());
        assert!(outcome.passes.iter().all(|p| p.faulted));
    }

    #[test]
    fn test_harvest_outcome_shortfall() {
        let outcome = HarvestOutcome {
            items: vec![Item::new("a", "A", "l")],
            announced_total: 3,
            passes: Vec::new(),
            unrecoverable: 0,
        };
        assert_eq!(outcome.shortfall(), 2);
        assert!(!outcome.is_complete());
    }

    #[test]
    fn test_pass_spec_display() {
        let spec = PassSpec::new(
            FilterSet::single("NEW"),
            SortKey::DisplayName,
            SortDirection::Descending,
        );
        assert_eq!(spec.to_string(), "[NEW] display_name desc");
    }
}

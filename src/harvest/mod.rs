//! Harvesting: paged fetch passes merged into one deduplicated item set.
//!
//! - [`Deduplicator`] - identity-keyed, first-seen-wins merge
//! - [`PaginationStrategy`] - pass schedule around the listing-window cap

mod dedup;
mod pagination;

pub use dedup::{Deduplicator, MergeOutcome};
pub use pagination::{
    HarvestOutcome, LARGE_SHORTFALL_THRESHOLD, PAGE_SIZE, PaginationStrategy, PassOutcome,
    PassReport, PassSpec,
};

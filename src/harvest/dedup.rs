//! Identity-keyed merge of pages across fetch passes.

use std::collections::HashSet;

use crate::model::{Item, Page};

/// Counts produced by one merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Items seen for the first time.
    pub added: usize,
    /// Items whose identity was already present.
    pub duplicates: usize,
    /// Items discarded for lacking an identity or locator.
    pub unrecoverable: usize,
}

/// Insertion-ordered set of items keyed by identity. First occurrence wins.
#[derive(Debug, Default)]
pub struct Deduplicator {
    items: Vec<Item>,
    seen: HashSet<String>,
    unrecoverable: HashSet<(String, String)>,
}

impl Deduplicator {
    /// Creates an empty merge set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges every item of `page`.
    pub fn merge(&mut self, page: &Page) -> MergeOutcome {
        self.merge_items(&page.items)
    }

    /// Merges a slice of items in order.
    pub fn merge_items(&mut self, items: &[Item]) -> MergeOutcome {
        let mut outcome = MergeOutcome::default();
        for item in items {
            if !item.is_recoverable() {
                outcome.unrecoverable += 1;
                self.unrecoverable
                    .insert((item.display_name.clone(), item.artifact_locator.clone()));
                continue;
            }
            if self.seen.insert(item.identity.clone()) {
                self.items.push(item.clone());
                outcome.added += 1;
            } else {
                outcome.duplicates += 1;
            }
        }
        outcome
    }

    /// Number of distinct items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true when nothing has been merged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns true if `identity` is already present.
    #[must_use]
    pub fn contains(&self, identity: &str) -> bool {
        self.seen.contains(identity)
    }

    /// Distinct unrecoverable entries seen across all merges.
    ///
    /// Entries are told apart by display name and locator, so the same
    /// identity-less item listed by several passes counts once.
    #[must_use]
    pub fn unrecoverable(&self) -> usize {
        self.unrecoverable.len()
    }

    /// Items in first-seen order.
    #[must_use]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Consumes the set, returning items in first-seen order.
    #[must_use]
    pub fn into_items(self) -> Vec<Item> {
        self.items
    }
}

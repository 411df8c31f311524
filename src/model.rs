//! Core data model shared by the harvesting pipeline.
//!
//! - [`Item`] - one candidate submission and the locator of its artifact
//! - [`Collection`] - one job posting; maps to exactly one local folder
//! - [`Page`] - one fetch result from a paged listing
//! - [`FilterSet`], [`SortKey`], [`SortDirection`] - listing query shape

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One candidate submission and its associated artifact.
///
/// `identity` is the sole deduplication key. An empty identity or locator
/// marks the item as unrecoverable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Stable upstream identifier.
    #[serde(default)]
    pub identity: String,
    /// Human-readable name used for artifact naming and name matching.
    #[serde(default)]
    pub display_name: String,
    /// Opaque locator handed back to the artifact transport.
    #[serde(default)]
    pub artifact_locator: String,
}

impl Item {
    /// Creates an item from its three parts.
    pub fn new(
        identity: impl Into<String>,
        display_name: impl Into<String>,
        artifact_locator: impl Into<String>,
    ) -> Self {
        Self {
            identity: identity.into(),
            display_name: display_name.into(),
            artifact_locator: artifact_locator.into(),
        }
    }

    /// Returns true when both identity and locator are present.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !self.identity.trim().is_empty() && !self.artifact_locator.trim().is_empty()
    }
}

/// Lifecycle status of a remote collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CollectionStatus {
    /// Open posting.
    Active,
    /// Suspended posting.
    Paused,
    /// Closed posting.
    Closed,
}

impl CollectionStatus {
    /// Every status, in listing order.
    pub const ALL: [Self; 3] = [Self::Active, Self::Paused, Self::Closed];

    /// Returns the stable lowercase label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for CollectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollectionStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "active" | "open" => Ok(Self::Active),
            "paused" | "suspended" => Ok(Self::Paused),
            "closed" => Ok(Self::Closed),
            other => Err(format!(
                "unknown collection status '{other}' (expected active, paused or closed)"
            )),
        }
    }
}

/// One job posting as listed by the remote system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    /// Upstream identifier.
    pub identity: String,
    /// Raw posting title.
    pub title: String,
    /// Posting status.
    pub status: CollectionStatus,
    /// Creation date, when the listing exposes one.
    #[serde(default)]
    pub created_date: Option<NaiveDate>,
    /// Item count advertised by the listing. May exceed what is retrievable.
    #[serde(default)]
    pub announced_item_count: u64,
}

/// Ordering key of a listing pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortKey {
    /// Submission creation order.
    CreationDate,
    /// Candidate display name.
    DisplayName,
}

impl SortKey {
    /// Both keys, in pass-schedule order.
    pub const ALL: [Self; 2] = [Self::CreationDate, Self::DisplayName];
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CreationDate => "creation_date",
            Self::DisplayName => "display_name",
        })
    }
}

/// Direction of a listing pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortDirection {
    /// Oldest / A first.
    Ascending,
    /// Newest / Z first.
    Descending,
}

impl SortDirection {
    /// Both directions, in pass-schedule order.
    pub const ALL: [Self; 2] = [Self::Ascending, Self::Descending];
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ascending => "asc",
            Self::Descending => "desc",
        })
    }
}

/// Filter categories applied to a listing query (candidate dispositions upstream).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilterSet {
    categories: Vec<String>,
}

impl FilterSet {
    /// Creates a filter set from category labels. Duplicates are dropped.
    pub fn new<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for category in categories {
            let category = category.into();
            if !unique.contains(&category) {
                unique.push(category);
            }
        }
        Self { categories: unique }
    }

    /// Filter set holding a single category.
    pub fn single(category: impl Into<String>) -> Self {
        Self {
            categories: vec![category.into()],
        }
    }

    /// Category labels in declaration order.
    #[must_use]
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Returns true when `category` is part of this set.
    #[must_use]
    pub fn contains(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }

    /// Splits the set into one single-category set per category.
    #[must_use]
    pub fn split(&self) -> Vec<Self> {
        self.categories.iter().map(Self::single).collect()
    }
}

impl Default for FilterSet {
    fn default() -> Self {
        Self::new(DEFAULT_FILTER_CATEGORIES)
    }
}

impl fmt::Display for FilterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.categories.join(","))
    }
}

/// Candidate dispositions queried when no explicit filter set is configured.
pub const DEFAULT_FILTER_CATEGORIES: [&str; 6] = [
    "NEW",
    "PENDING",
    "PHONE_SCREENED",
    "INTERVIEWED",
    "OFFER_MADE",
    "REVIEWED",
];

/// One fetch result from a paged listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    /// Items in listing order.
    pub items: Vec<Item>,
    /// Whether the listing reports more results after this page.
    pub has_more: bool,
    /// Total advertised by the listing for the query.
    pub announced_total: u64,
}

impl Page {
    /// Empty page that terminates the current pass.
    #[must_use]
    pub fn end_of_pass() -> Self {
        Self::default()
    }
}

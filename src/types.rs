//! Core types for ugc-dl

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::error::Error;

/// Unique identifier for a content item on the remote service
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Deduplicated identifiers handed from the scan phase to the download phase.
///
/// Ordered so that the download backlog is handed out in ascending id order.
pub type IdentifierSet = BTreeSet<ItemId>;

/// Positive numeric account identifier (e.g. a 64-bit profile id)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(u64);

impl AccountId {
    /// Create an AccountId, rejecting zero
    pub fn new(id: u64) -> Option<Self> {
        (id > 0).then_some(Self(id))
    }

    /// Get the inner u64 value
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for AccountId {
    type Err = Error;

    /// Parses trimmed decimal input; anything that is not a positive integer is rejected
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        trimmed
            .parse::<u64>()
            .ok()
            .and_then(AccountId::new)
            .ok_or_else(|| Error::InvalidAccountId(trimmed.to_string()))
    }
}

/// A listing tab on the profile (screenshots, artwork, ...)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Category {
    /// URL path segment of the listing, e.g. `screenshots`
    pub path: String,

    /// Output folder name for this tab, e.g. `Screenshots`
    pub dir_name: String,
}

impl Category {
    /// Create a category from its URL segment and output folder name
    pub fn new(path: impl Into<String>, dir_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            dir_name: dir_name.into(),
        }
    }

    /// The screenshots tab
    pub fn screenshots() -> Self {
        Self::new("screenshots", "Screenshots")
    }

    /// The artwork tab (served under `images`)
    pub fn artwork() -> Self {
        Self::new("images", "Artwork")
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path)
    }
}

/// Failure reason for a detail page without an asset link
pub const REASON_NO_ASSET_LINK: &str = "no asset link found";

/// Failure reason once the per-item attempt budget is spent
pub const REASON_MAX_RETRIES: &str = "max retries exceeded";

/// Skip reason for items never admitted because the run was cancelled
pub const REASON_CANCELLED: &str = "cancelled";

/// Terminal result of one item's download
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum DownloadOutcome {
    /// File written; carries the number of bytes written
    Succeeded(u64),
    /// Gave up on the item; carries the reason
    FailedPermanently(String),
    /// Never attempted; carries the reason
    Skipped(String),
}

impl DownloadOutcome {
    /// True for [`DownloadOutcome::Succeeded`]
    pub fn is_success(&self) -> bool {
        matches!(self, DownloadOutcome::Succeeded(_))
    }
}

/// Outcome paired with the item it belongs to
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemOutcome {
    /// The item
    pub id: ItemId,
    /// What happened to it
    pub outcome: DownloadOutcome,
}

/// Summary of one category crawl
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CategoryReport {
    /// The crawled category
    pub category: Category,
    /// Directory the files were written to
    pub output_dir: PathBuf,
    /// Number of distinct items discovered by the scan
    pub discovered: usize,
    /// Per-item outcomes, in completion order
    pub outcomes: Vec<ItemOutcome>,
}

impl CategoryReport {
    /// Number of items written to disk
    pub fn downloaded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.outcome.is_success())
            .count()
    }

    /// Items that failed permanently, with their reasons
    pub fn failed(&self) -> impl Iterator<Item = (ItemId, &str)> {
        self.outcomes.iter().filter_map(|o| match &o.outcome {
            DownloadOutcome::FailedPermanently(reason) => Some((o.id, reason.as_str())),
            _ => None,
        })
    }

    /// Number of items that were never attempted
    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.outcome, DownloadOutcome::Skipped(_)))
            .count()
    }
}

/// Progress events emitted during a crawl
///
/// Subscribe via [`Crawler::subscribe`](crate::Crawler::subscribe).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Pagination of a category started
    ScanStarted {
        /// Category path
        category: String,
    },

    /// A listing page yielded identifiers
    PageScanned {
        /// Category path
        category: String,
        /// Page number (1-based)
        page: u32,
        /// Identifiers found on this page
        found: usize,
        /// Identifiers accumulated so far (duplicates included)
        total: usize,
    },

    /// A listing page was empty or failed and will be fetched again
    PageRetry {
        /// Category path
        category: String,
        /// Page number (1-based)
        page: u32,
        /// Consecutive empty/failed fetches so far
        failures: u32,
        /// Error message when the fetch itself failed
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    /// Pagination of a category ended
    ScanFinished {
        /// Category path
        category: String,
        /// Last page that yielded identifiers (0 if none did)
        last_page: u32,
        /// Identifiers accumulated (duplicates included)
        total: usize,
    },

    /// An item download was admitted
    ItemStarted {
        /// The item
        id: ItemId,
    },

    /// An item was written to disk
    ItemCompleted {
        /// The item
        id: ItemId,
        /// Path of the written file
        path: PathBuf,
        /// Bytes written
        bytes: u64,
    },

    /// An item failed permanently
    ItemFailed {
        /// The item
        id: ItemId,
        /// Failure reason
        reason: String,
    },

    /// An item was never attempted
    ItemSkipped {
        /// The item
        id: ItemId,
        /// Skip reason
        reason: String,
    },

    /// A category finished downloading
    CategoryFinished {
        /// Category path
        category: String,
        /// Distinct items discovered
        discovered: usize,
        /// Items written to disk
        downloaded: usize,
    },
}

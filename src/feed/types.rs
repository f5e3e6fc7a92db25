use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One item of a fetched feed.
///
/// Entries only live inside a [`FeedSnapshot`] and are never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub title: String,
    /// Short description of the entry (RSS `description` / Atom `summary`).
    pub summary: String,
    /// Full rendered content (RSS `content:encoded` / Atom `content`).
    pub content: String,
    pub link: Option<String>,
    /// Publication time, falling back to the entry's updated time.
    pub published: Option<DateTime<Utc>>,
    pub guid: String,
}

/// Result of a live fetch: the feed's metadata plus its current entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedSnapshot {
    /// The subscription URL exactly as it was requested.
    pub url: String,
    pub title: String,
    pub description: String,
    pub fetched_at: DateTime<Utc>,
    pub entries: Vec<Entry>,
}

impl FeedSnapshot {
    /// Snapshot with metadata only, stamped with the current time.
    pub fn new(
        url: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            description: description.into(),
            fetched_at: Utc::now(),
            entries: Vec::new(),
        }
    }

    pub fn with_entries(mut self, entries: Vec<Entry>) -> Self {
        self.entries = entries;
        self
    }
}

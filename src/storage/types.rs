use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::feed::{ExportError, FetchError};

// ============================================================================
// Error Types
// ============================================================================

/// Errors surfaced by the registry, its file store, and the operations
/// built on top of them.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Caller passed something unusable (an empty URL); never retried
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The URL is not subscribed
    #[error("Feed not found: {0}")]
    NotFound(String),

    /// The fetcher failed; passed through unchanged
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The feeds file exists and is non-empty but is not a subscription list
    #[error("Feeds file {path} is corrupt: {source}")]
    CorruptState {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Reading or writing the feeds file failed
    #[error("Failed to persist feeds to {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Export(#[from] ExportError),
}

// ============================================================================
// Data Structures
// ============================================================================

/// A subscribed feed as stored by the registry and written to the feeds file.
///
/// Only metadata lives here; entries are always fetched live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subscription {
    pub url: String,
    pub title: String,
    pub description: String,
    /// When the URL was first subscribed. Never changes afterwards.
    pub added_at: DateTime<Utc>,
    /// Last time title/description were written.
    pub updated_at: DateTime<Utc>,
}

/// On-disk shape of a record. Older files carry only `added_at`, and may
/// omit the text fields entirely.
#[derive(Deserialize)]
struct SubscriptionRecord {
    #[serde(default)]
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default = "Utc::now")]
    added_at: DateTime<Utc>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

impl<'de> Deserialize<'de> for Subscription {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let record = SubscriptionRecord::deserialize(deserializer)?;
        Ok(Subscription {
            updated_at: record.updated_at.unwrap_or(record.added_at),
            url: record.url,
            title: record.title,
            description: record.description,
            added_at: record.added_at,
        })
    }
}

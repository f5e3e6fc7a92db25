//! Feed fetching, parsing and re-serialization.
//!
//! - [`parser`] - RSS/Atom parsing using the `feed-rs` crate
//! - [`fetcher`] - the [`Fetcher`] contract and its HTTP implementation
//! - [`export`] - RSS 2.0 output for a fetched snapshot
//!
//! Snapshots and their entries are transient: they are produced by a fetch,
//! handed to the caller, and dropped. Only subscription metadata is stored.
//!
//! # Example
//!
//! ```ignore
//! use feedroom::feed::{export_rss, Fetcher, HttpFetcher};
//!
//! let fetcher = HttpFetcher::new(reqwest::Client::new());
//! let snapshot = fetcher.fetch("https://example.com/feed.xml").await?;
//! let xml = export_rss(&snapshot)?;
//! ```

mod export;
mod fetcher;
mod parser;
mod types;

pub use export::{export_rss, ExportError};
pub use fetcher::{FetchError, Fetcher, HttpFetcher};
pub use parser::parse_feed;
pub use types::{Entry, FeedSnapshot};

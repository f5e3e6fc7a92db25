use chrono::Utc;
use feed_rs::parser;
use sha2::{Digest, Sha256};

use super::types::{Entry, FeedSnapshot};

/// Parses RSS/Atom bytes into a snapshot for `url`.
///
/// Missing feed metadata becomes an empty string. Entry fields are filled on a
/// best-effort basis: `published` falls back to `updated`, `summary` and
/// `content` fall back to each other, and a stable `guid` is synthesized when
/// the feed does not provide one.
pub fn parse_feed(url: &str, bytes: &[u8]) -> Result<FeedSnapshot, parser::ParseFeedError> {
    let feed = parser::parse(bytes)?;

    let entries: Vec<Entry> = feed
        .entries
        .into_iter()
        .map(|entry| {
            let link = entry.links.first().map(|l| l.href.clone());
            let published = entry.published.or(entry.updated);
            let summary = entry.summary.map(|s| s.content);
            let content = entry.content.and_then(|c| c.body);
            let title = entry
                .title
                .map(|t| t.content)
                .unwrap_or_else(|| "Untitled".to_string());

            let existing_id = if entry.id.is_empty() {
                None
            } else {
                Some(entry.id.as_str())
            };
            let guid = generate_guid(
                existing_id,
                link.as_deref(),
                &title,
                published.map(|dt| dt.timestamp()),
            );

            Entry {
                title,
                summary: summary.clone().or_else(|| content.clone()).unwrap_or_default(),
                content: content.or(summary).unwrap_or_default(),
                link,
                published,
                guid,
            }
        })
        .collect();

    Ok(FeedSnapshot {
        url: url.to_string(),
        title: feed.title.map(|t| t.content).unwrap_or_default(),
        description: feed.description.map(|d| d.content).unwrap_or_default(),
        fetched_at: Utc::now(),
        entries,
    })
}

fn generate_guid(
    existing: Option<&str>,
    link: Option<&str>,
    title: &str,
    published: Option<i64>,
) -> String {
    if let Some(guid) = existing {
        let trimmed = guid.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let input = format!(
        "{}|{}|{}",
        link.unwrap_or(""),
        title,
        published.map(|p| p.to_string()).unwrap_or_default()
    );
    let hash = Sha256::digest(input.as_bytes());
    format!("{:x}", hash)
}

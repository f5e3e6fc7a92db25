//! Integration tests for the subscription lifecycle: add, read, remove,
//! persist, reopen.
//!
//! Each test works in its own temporary data directory with a stub fetcher,
//! so nothing touches the network.

mod common;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use common::{open_app, test_config, StubFetcher};
use feedroom::app::App;
use feedroom::feed::{FeedSnapshot, FetchError, Fetcher};
use feedroom::storage::RegistryError;

const FEED_A: &str = "https://a/feed.xml";
const FEED_B: &str = "https://b/feed.xml";

// ============================================================================
// Add / Get / List
// ============================================================================

#[tokio::test]
async fn test_add_then_get_refetches_entries() {
    let dir = TempDir::new().unwrap();
    let fetcher = StubFetcher::new();
    fetcher.set_feed(FEED_A, "A", &["x", "y"]);
    let app = open_app(&dir, fetcher.clone());

    let stored = app.add_subscription(FEED_A).await.unwrap();
    assert_eq!(stored.url, FEED_A);
    assert_eq!(stored.title, "A");

    let listed = app.list_subscriptions();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].title, "A");
    let listed_json = serde_json::to_value(&listed).unwrap();
    assert!(listed_json[0].get("entries").is_none());

    let snapshot = app.get_subscription_content(FEED_A).await.unwrap();
    assert_eq!(snapshot.entries.len(), 2);
    assert_eq!(snapshot.entries[0].title, "x");
    assert_eq!(fetcher.calls(), 2);
}

#[tokio::test]
async fn test_every_read_goes_to_the_network() {
    let dir = TempDir::new().unwrap();
    let fetcher = StubFetcher::new();
    fetcher.set_feed(FEED_A, "A", &["x"]);
    let app = open_app(&dir, fetcher.clone());
    app.add_subscription(FEED_A).await.unwrap();

    fetcher.set_feed(FEED_A, "A", &["x", "y", "z"]);
    let snapshot = app.get_subscription_content(FEED_A).await.unwrap();
    assert_eq!(snapshot.entries.len(), 3);
}

#[tokio::test]
async fn test_get_refreshes_stored_metadata() {
    let dir = TempDir::new().unwrap();
    let fetcher = StubFetcher::new();
    fetcher.set_feed(FEED_A, "Old title", &[]);
    let app = open_app(&dir, fetcher.clone());
    let added = app.add_subscription(FEED_A).await.unwrap();

    fetcher.set_feed(FEED_A, "New title", &[]);
    app.get_subscription_content(FEED_A).await.unwrap();

    let stored = app.registry().get(FEED_A).unwrap();
    assert_eq!(stored.title, "New title");
    assert_eq!(stored.description, "New title description");
    assert_eq!(stored.added_at, added.added_at);
    assert!(stored.updated_at >= added.updated_at);
}

#[tokio::test]
async fn test_read_with_unchanged_metadata_needs_no_save() {
    let dir = TempDir::new().unwrap();
    let fetcher = StubFetcher::new();
    fetcher.set_feed(FEED_A, "A", &["x"]);
    let app = open_app(&dir, fetcher.clone());
    let added = app.add_subscription(FEED_A).await.unwrap();
    assert!(app.save_if_needed().unwrap());

    fetcher.set_feed(FEED_A, "A", &["x", "y"]);
    app.get_subscription_content(FEED_A).await.unwrap();

    assert!(!app.registry().has_pending_changes());
    assert_eq!(app.registry().get(FEED_A).unwrap(), added);
}

#[tokio::test]
async fn test_readding_updates_instead_of_duplicating() {
    let dir = TempDir::new().unwrap();
    let fetcher = StubFetcher::new();
    fetcher.set_feed(FEED_A, "A", &[]);
    let app = open_app(&dir, fetcher.clone());

    app.add_subscription(FEED_A).await.unwrap();
    fetcher.set_feed(FEED_A, "A again", &[]);
    app.add_subscription(FEED_A).await.unwrap();

    let listed = app.list_subscriptions();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].title, "A again");
}

// ============================================================================
// Error paths
// ============================================================================

#[tokio::test]
async fn test_add_empty_url_is_invalid_input() {
    let dir = TempDir::new().unwrap();
    let fetcher = StubFetcher::new();
    let app = open_app(&dir, fetcher.clone());

    assert!(matches!(
        app.add_subscription("").await,
        Err(RegistryError::InvalidInput(_))
    ));
    assert_eq!(fetcher.calls(), 0);
}

#[tokio::test]
async fn test_add_failed_fetch_stores_nothing() {
    let dir = TempDir::new().unwrap();
    let app = open_app(&dir, StubFetcher::new());

    let result = app.add_subscription(FEED_A).await;
    assert!(matches!(
        result,
        Err(RegistryError::Fetch(FetchError::HttpStatus(404)))
    ));
    assert!(app.list_subscriptions().is_empty());
    assert!(!app.registry().has_pending_changes());
}

#[tokio::test]
async fn test_get_unknown_or_empty_url_is_not_found() {
    let dir = TempDir::new().unwrap();
    let fetcher = StubFetcher::new();
    fetcher.set_feed(FEED_A, "A", &[]);
    let app = open_app(&dir, fetcher.clone());

    assert!(matches!(
        app.get_subscription_content(FEED_A).await,
        Err(RegistryError::NotFound(_))
    ));
    assert!(matches!(
        app.get_subscription_content("").await,
        Err(RegistryError::NotFound(_))
    ));
    // Unsubscribed URLs are never fetched
    assert_eq!(fetcher.calls(), 0);
}

#[tokio::test]
async fn test_get_fetch_failure_leaves_record_untouched() {
    let dir = TempDir::new().unwrap();
    let fetcher = StubFetcher::new();
    fetcher.set_feed(FEED_A, "A", &[]);
    let app = open_app(&dir, fetcher.clone());
    let added = app.add_subscription(FEED_A).await.unwrap();

    fetcher.unset_feed(FEED_A);
    assert!(matches!(
        app.get_subscription_content(FEED_A).await,
        Err(RegistryError::Fetch(_))
    ));
    assert_eq!(app.registry().get(FEED_A).unwrap(), added);
}

#[tokio::test]
async fn test_remove_unknown_url_is_not_found_and_changes_nothing() {
    let dir = TempDir::new().unwrap();
    let fetcher = StubFetcher::new();
    fetcher.set_feed(FEED_A, "A", &[]);
    let app = open_app(&dir, fetcher.clone());
    app.add_subscription(FEED_A).await.unwrap();
    app.save_if_needed().unwrap();
    let before = app.list_subscriptions();

    assert!(matches!(
        app.remove_subscription(FEED_B),
        Err(RegistryError::NotFound(_))
    ));
    assert!(matches!(
        app.remove_subscription(""),
        Err(RegistryError::NotFound(_))
    ));
    assert_eq!(app.list_subscriptions(), before);
    assert!(!app.registry().has_pending_changes());
}

// ============================================================================
// Concurrency
// ============================================================================

/// Returns a different title on every call, after a short delay, so
/// concurrent adds of one URL race on the write lock.
struct RacingFetcher {
    calls: AtomicUsize,
}

#[async_trait]
impl Fetcher for RacingFetcher {
    async fn fetch(&self, url: &str) -> Result<FeedSnapshot, FetchError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(5)).await;
        Ok(FeedSnapshot::new(url, format!("version {}", n), ""))
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_adds_of_same_url_leave_one_record() {
    let dir = TempDir::new().unwrap();
    let app = Arc::new(open_app(
        &dir,
        Arc::new(RacingFetcher {
            calls: AtomicUsize::new(0),
        }),
    ));

    let first = tokio::spawn({
        let app = Arc::clone(&app);
        async move { app.add_subscription(FEED_A).await }
    });
    let second = tokio::spawn({
        let app = Arc::clone(&app);
        async move { app.add_subscription(FEED_A).await }
    });
    let a = first.await.unwrap().unwrap();
    let b = second.await.unwrap().unwrap();

    let listed = app.list_subscriptions();
    assert_eq!(listed.len(), 1);
    assert!(listed[0].title == a.title || listed[0].title == b.title);
    assert_eq!(listed[0].added_at, a.added_at.min(b.added_at));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_mixed_operations_end_consistent() {
    let dir = TempDir::new().unwrap();
    let fetcher = StubFetcher::new();
    let urls: Vec<String> = (0..20).map(|i| format!("https://feeds/{}.xml", i)).collect();
    for url in &urls {
        fetcher.set_feed(url, "t", &[]);
    }
    let app = Arc::new(open_app(&dir, fetcher.clone()));

    let mut tasks = Vec::new();
    for (i, url) in urls.iter().cloned().enumerate() {
        let app = Arc::clone(&app);
        tasks.push(tokio::spawn(async move {
            app.add_subscription(&url).await.unwrap();
            if i % 3 == 0 {
                app.remove_subscription(&url).unwrap();
            } else {
                app.get_subscription_content(&url).await.unwrap();
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let mut listed: Vec<String> = app.list_subscriptions().into_iter().map(|s| s.url).collect();
    listed.sort();
    let mut expected: Vec<String> = urls
        .iter()
        .enumerate()
        .filter(|(i, _)| i % 3 != 0)
        .map(|(_, u)| u.clone())
        .collect();
    expected.sort();
    assert_eq!(listed, expected);
}

// ============================================================================
// Persistence through the app
// ============================================================================

#[tokio::test]
async fn test_subscriptions_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let fetcher = StubFetcher::new();
    fetcher.set_feed(FEED_A, "A", &["x"]);
    fetcher.set_feed(FEED_B, "B", &["y"]);

    let before = {
        let app = open_app(&dir, fetcher.clone());
        app.add_subscription(FEED_A).await.unwrap();
        app.add_subscription(FEED_B).await.unwrap();
        assert!(app.shutdown().await.unwrap());
        app.list_subscriptions()
    };

    let reopened = open_app(&dir, fetcher.clone());
    assert_eq!(reopened.list_subscriptions(), before);
    assert!(!reopened.registry().has_pending_changes());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_auto_save_writes_without_explicit_save() {
    let dir = TempDir::new().unwrap();
    let fetcher = StubFetcher::new();
    fetcher.set_feed(FEED_A, "A", &[]);
    let app = App::open(&test_config(&dir, true), fetcher.clone()).unwrap();

    app.add_subscription(FEED_A).await.unwrap();
    for _ in 0..200 {
        if !app.registry().has_pending_changes() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(app.store().load().unwrap().len(), 1);

    assert!(!app.shutdown().await.unwrap());
}

#[tokio::test]
async fn test_corrupt_file_starts_empty_and_is_kept_aside() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, false);
    std::fs::write(config.feeds_path(), "[{ definitely not json").unwrap();

    let app = App::open(&config, StubFetcher::new()).unwrap();
    assert!(app.list_subscriptions().is_empty());

    let backups: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().contains(".corrupt."))
        .collect();
    assert_eq!(backups.len(), 1);
}

#[tokio::test]
async fn test_empty_file_starts_empty() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, false);
    std::fs::write(config.feeds_path(), "").unwrap();

    let app = App::open(&config, StubFetcher::new()).unwrap();
    assert!(app.list_subscriptions().is_empty());
    assert!(!app.registry().has_pending_changes());
}

// ============================================================================
// Default feeds and export
// ============================================================================

#[tokio::test]
async fn test_seed_defaults_skips_failures() {
    let dir = TempDir::new().unwrap();
    let fetcher = StubFetcher::new();
    fetcher.set_feed(FEED_A, "A", &[]);
    let app = open_app(&dir, fetcher.clone());

    let added = app
        .seed_defaults(&[FEED_A.to_string(), "https://broken/feed.xml".to_string()])
        .await;
    assert_eq!(added, 1);
    assert!(app.registry().contains(FEED_A));
}

#[tokio::test]
async fn test_seed_defaults_only_on_first_run() {
    let dir = TempDir::new().unwrap();
    let fetcher = StubFetcher::new();
    fetcher.set_feed(FEED_A, "A", &[]);
    fetcher.set_feed(FEED_B, "B", &[]);
    let app = open_app(&dir, fetcher.clone());
    app.add_subscription(FEED_A).await.unwrap();

    assert_eq!(app.seed_defaults(&[FEED_B.to_string()]).await, 0);
    assert!(!app.registry().contains(FEED_B));
}

#[tokio::test]
async fn test_export_as_feed() {
    let dir = TempDir::new().unwrap();
    let fetcher = StubFetcher::new();
    fetcher.set_feed(FEED_A, "A", &["x", "y"]);
    let app = open_app(&dir, fetcher.clone());
    app.add_subscription(FEED_A).await.unwrap();

    let rss = app.export_as_feed(FEED_A).await.unwrap();
    assert!(rss.contains("<title>A</title>"));
    assert_eq!(rss.matches("<item>").count(), 2);

    assert!(matches!(
        app.export_as_feed(FEED_B).await,
        Err(RegistryError::NotFound(_))
    ));
}

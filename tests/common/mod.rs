#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use feedroom::app::App;
use feedroom::config::Config;
use feedroom::feed::{Entry, FeedSnapshot, FetchError, Fetcher};

/// In-memory fetcher: URLs map to canned snapshots, anything else is a 404.
#[derive(Default)]
pub struct StubFetcher {
    feeds: Mutex<HashMap<String, FeedSnapshot>>,
    calls: AtomicUsize,
}

impl StubFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_feed(&self, url: &str, title: &str, entry_titles: &[&str]) {
        let entries = entry_titles.iter().map(|t| entry(t)).collect();
        let snapshot = FeedSnapshot::new(url, title, format!("{} description", title))
            .with_entries(entries);
        self.feeds.lock().unwrap().insert(url.to_string(), snapshot);
    }

    pub fn unset_feed(&self, url: &str) {
        self.feeds.lock().unwrap().remove(url);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> Result<FeedSnapshot, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.feeds
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or(FetchError::HttpStatus(404))
    }
}

pub fn entry(title: &str) -> Entry {
    Entry {
        title: title.to_string(),
        summary: format!("{} summary", title),
        content: format!("<p>{}</p>", title),
        link: Some(format!("https://example.com/{}", title)),
        published: None,
        guid: title.to_string(),
    }
}

pub fn test_config(dir: &TempDir, auto_save: bool) -> Config {
    Config {
        data_dir: dir.path().to_path_buf(),
        auto_save,
        ..Config::default()
    }
}

pub fn open_app(dir: &TempDir, fetcher: Arc<dyn Fetcher>) -> App {
    App::open(&test_config(dir, false), fetcher).unwrap()
}

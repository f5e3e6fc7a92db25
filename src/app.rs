//! Application state shared by the HTTP layer.
//!
//! [`App`] owns the registry, the feeds file and the fetcher. It is built once
//! at startup and handed to the server behind an `Arc`; nothing here is a
//! global.

use chrono::Utc;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::feed::{export_rss, FeedSnapshot, FetchError, Fetcher};
use crate::storage::{AutoSave, FeedStore, Registry, RegistryError, SaveTrigger, Subscription};

pub struct App {
    registry: Arc<Registry>,
    store: Arc<FeedStore>,
    fetcher: Arc<dyn Fetcher>,
    autosave: Mutex<Option<AutoSave>>,
}

impl App {
    /// Opens the feeds file named by `config` and, when `auto_save` is on,
    /// starts the background save task.
    ///
    /// A corrupt feeds file is copied aside and the registry starts empty.
    /// Must be called from within a tokio runtime when `auto_save` is set.
    pub fn open(config: &Config, fetcher: Arc<dyn Fetcher>) -> Result<Self, RegistryError> {
        let store = Arc::new(FeedStore::new(config.feeds_path()));

        let (registry, trigger) = if config.auto_save {
            let trigger = SaveTrigger::new();
            (Registry::with_save_trigger(trigger.clone()), Some(trigger))
        } else {
            (Registry::new(), None)
        };
        let registry = Arc::new(registry);

        match store.load_into(&registry) {
            Ok(_) => {}
            Err(RegistryError::CorruptState { path, source }) => {
                tracing::error!(
                    path = %path.display(),
                    error = %source,
                    "Feeds file is corrupt, starting with empty registry"
                );
                preserve_corrupt_file(&path);
            }
            Err(e) => return Err(e),
        }

        let autosave = trigger
            .map(|trigger| AutoSave::spawn(Arc::clone(&registry), Arc::clone(&store), trigger));

        Ok(Self {
            registry,
            store,
            fetcher,
            autosave: Mutex::new(autosave),
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn store(&self) -> &FeedStore {
        &self.store
    }

    /// Fetches `url` once to learn its metadata and stores the subscription.
    pub async fn add_subscription(&self, url: &str) -> Result<Subscription, RegistryError> {
        if url.is_empty() {
            return Err(RegistryError::InvalidInput(
                "feed URL cannot be empty".to_string(),
            ));
        }

        tracing::info!(url = %url, "Adding feed");
        let mut snapshot = self.fetcher.fetch(url).await.map_err(|e| {
            tracing::warn!(url = %url, error = %e, "Failed to fetch new feed");
            match e {
                // The caller's URL was refused before any request went out
                FetchError::InvalidUrl(e) => RegistryError::InvalidInput(e.to_string()),
                other => RegistryError::Fetch(other),
            }
        })?;
        snapshot.url = url.to_string();

        let existed = self.registry.contains(url);
        let stored = self.registry.add(&snapshot)?;
        tracing::info!(
            url = %url,
            title = %stored.title,
            total = self.registry.len(),
            resubscribed = existed,
            "Feed added"
        );
        Ok(stored)
    }

    /// Live content of a subscribed feed.
    ///
    /// Reads the stored record, fetches without holding any lock, then writes
    /// the fresh title/description back. The returned snapshot is never
    /// stored.
    pub async fn get_subscription_content(&self, url: &str) -> Result<FeedSnapshot, RegistryError> {
        self.registry.get(url)?;

        tracing::debug!(url = %url, "Fetching fresh content for feed");
        let mut snapshot = self.fetcher.fetch(url).await.map_err(|e| {
            tracing::warn!(url = %url, error = %e, "Failed to refresh feed");
            e
        })?;
        snapshot.url = url.to_string();

        if self.registry.refresh_metadata(&snapshot).is_none() {
            tracing::debug!(url = %url, "Feed removed while it was being fetched");
        }
        Ok(snapshot)
    }

    pub fn list_subscriptions(&self) -> Vec<Subscription> {
        self.registry.list()
    }

    pub fn remove_subscription(&self, url: &str) -> Result<(), RegistryError> {
        self.registry.remove(url)?;
        tracing::info!(url = %url, "Feed removed");
        Ok(())
    }

    /// Fresh content of a subscribed feed as an RSS 2.0 document.
    pub async fn export_as_feed(&self, url: &str) -> Result<String, RegistryError> {
        let snapshot = self.get_subscription_content(url).await?;
        Ok(export_rss(&snapshot)?)
    }

    /// Subscribes to `urls` when the registry is empty (first run).
    ///
    /// Failures are logged and skipped. Returns how many feeds were added.
    pub async fn seed_defaults(&self, urls: &[String]) -> usize {
        if urls.is_empty() || !self.registry.is_empty() {
            return 0;
        }

        tracing::info!(count = urls.len(), "Adding default feeds");
        let mut added = 0;
        for url in urls {
            match self.add_subscription(url).await {
                Ok(_) => added += 1,
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "Skipping default feed");
                }
            }
        }
        added
    }

    pub fn save_if_needed(&self) -> Result<bool, RegistryError> {
        self.store.save_if_needed(&self.registry)
    }

    /// Stops background saving and flushes anything still pending.
    pub async fn shutdown(&self) -> Result<bool, RegistryError> {
        let autosave = self.autosave.lock().take();
        if let Some(autosave) = autosave {
            autosave.shutdown().await;
        }

        let registry = Arc::clone(&self.registry);
        let store = Arc::clone(&self.store);
        let saved = match tokio::task::spawn_blocking(move || store.save_if_needed(&registry)).await {
            Ok(result) => result,
            // Only reachable if the save panicked; retry inline
            Err(_) => self.save_if_needed(),
        }?;

        match self.registry.last_saved() {
            Some(at) => tracing::info!(last_saved = %at, feeds = self.registry.len(), "Feeds file is up to date"),
            None => tracing::debug!("Feeds file was not written during this run"),
        }
        Ok(saved)
    }
}

/// Copies a feeds file that failed to parse to `<name>.corrupt.<timestamp>`
/// before the next save replaces it.
fn preserve_corrupt_file(path: &Path) {
    let mut backup = path.as_os_str().to_owned();
    backup.push(format!(".corrupt.{}", Utc::now().format("%Y%m%d_%H%M%S")));

    match std::fs::copy(path, &backup) {
        Ok(_) => tracing::warn!(
            backup = %Path::new(&backup).display(),
            "Kept a copy of the corrupt feeds file"
        ),
        Err(e) => tracing::warn!(
            path = %path.display(),
            error = %e,
            "Failed to keep a copy of the corrupt feeds file"
        ),
    }
}

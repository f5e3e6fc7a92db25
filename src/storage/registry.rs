//! In-memory subscription registry.
//!
//! One reader/writer lock covers the whole map. Nothing here performs I/O:
//! fetching happens in the caller between [`Registry::get`] and
//! [`Registry::refresh_metadata`], and persistence reads the map through
//! [`Registry::snapshot`].

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;

use super::autosave::SaveTrigger;
use super::types::{RegistryError, Subscription};
use crate::feed::FeedSnapshot;

#[derive(Debug, Default)]
struct State {
    subscriptions: HashMap<String, Subscription>,
    /// Bumped by every mutation.
    generation: u64,
    /// Highest generation known to be on disk.
    saved_generation: u64,
    last_saved: Option<DateTime<Utc>>,
}

impl State {
    fn touch(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }
}

/// Thread-safe map from feed URL to [`Subscription`].
///
/// Mutations mark the registry dirty and, when a [`SaveTrigger`] is attached,
/// request a background save. The trigger is poked after the write lock is
/// released.
#[derive(Debug, Default)]
pub struct Registry {
    state: RwLock<State>,
    save_trigger: Option<SaveTrigger>,
}

impl Registry {
    /// Registry without background persistence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry that requests a save through `trigger` after each mutation.
    pub fn with_save_trigger(trigger: SaveTrigger) -> Self {
        Self {
            state: RwLock::default(),
            save_trigger: Some(trigger),
        }
    }

    /// Inserts or updates the subscription for `feed.url`.
    ///
    /// An existing record keeps its `added_at`; title, description and
    /// `updated_at` are overwritten. Entries in `feed` are ignored.
    pub fn add(&self, feed: &FeedSnapshot) -> Result<Subscription, RegistryError> {
        if feed.url.is_empty() {
            return Err(RegistryError::InvalidInput(
                "feed URL cannot be empty".to_string(),
            ));
        }

        let stored = {
            let mut state = self.state.write();
            let now = Utc::now();
            let stored = match state.subscriptions.get_mut(&feed.url) {
                Some(existing) => {
                    existing.title.clone_from(&feed.title);
                    existing.description.clone_from(&feed.description);
                    existing.updated_at = now;
                    existing.clone()
                }
                None => {
                    let subscription = Subscription {
                        url: feed.url.clone(),
                        title: feed.title.clone(),
                        description: feed.description.clone(),
                        added_at: now,
                        updated_at: now,
                    };
                    state
                        .subscriptions
                        .insert(feed.url.clone(), subscription.clone());
                    subscription
                }
            };
            state.touch();
            stored
        };

        tracing::debug!(url = %stored.url, title = %stored.title, "Stored subscription");
        self.request_save();
        Ok(stored)
    }

    /// Stored metadata for `url`.
    pub fn get(&self, url: &str) -> Result<Subscription, RegistryError> {
        if url.is_empty() {
            return Err(RegistryError::NotFound("URL cannot be empty".to_string()));
        }

        self.state
            .read()
            .subscriptions
            .get(url)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(url.to_string()))
    }

    /// Writes freshly fetched metadata onto an existing record.
    ///
    /// Returns `None` without touching anything if the URL was removed while
    /// the fetch was in flight. Unchanged metadata leaves the record and the
    /// dirty state alone, so plain reads never rewrite the feeds file.
    pub fn refresh_metadata(&self, feed: &FeedSnapshot) -> Option<Subscription> {
        let updated = {
            let mut state = self.state.write();
            let existing = state.subscriptions.get_mut(&feed.url)?;
            if existing.title == feed.title && existing.description == feed.description {
                return Some(existing.clone());
            }
            existing.title.clone_from(&feed.title);
            existing.description.clone_from(&feed.description);
            existing.updated_at = Utc::now();
            let updated = existing.clone();
            state.touch();
            updated
        };

        self.request_save();
        Some(updated)
    }

    /// All subscriptions, oldest first.
    ///
    /// The order is a convenience for display; callers must not rely on it.
    pub fn list(&self) -> Vec<Subscription> {
        let mut subscriptions: Vec<Subscription> =
            self.state.read().subscriptions.values().cloned().collect();
        subscriptions.sort_by(|a, b| a.added_at.cmp(&b.added_at).then_with(|| a.url.cmp(&b.url)));
        subscriptions
    }

    pub fn remove(&self, url: &str) -> Result<(), RegistryError> {
        if url.is_empty() {
            return Err(RegistryError::NotFound("URL cannot be empty".to_string()));
        }

        {
            let mut state = self.state.write();
            if state.subscriptions.remove(url).is_none() {
                return Err(RegistryError::NotFound(url.to_string()));
            }
            state.touch();
        }

        tracing::debug!(url = %url, "Removed subscription");
        self.request_save();
        Ok(())
    }

    pub fn contains(&self, url: &str) -> bool {
        self.state.read().subscriptions.contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.state.read().subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().subscriptions.is_empty()
    }

    /// True if a mutation happened since the last successful save.
    pub fn has_pending_changes(&self) -> bool {
        let state = self.state.read();
        state.generation != state.saved_generation
    }

    pub fn last_saved(&self) -> Option<DateTime<Utc>> {
        self.state.read().last_saved
    }

    /// Replaces the whole map with `subscriptions`, as read from disk.
    ///
    /// Records with an empty URL are skipped; a repeated URL keeps the last
    /// record. The result counts as saved. Returns the number of records kept.
    pub fn replace_all(&self, subscriptions: Vec<Subscription>) -> usize {
        let mut map = HashMap::with_capacity(subscriptions.len());
        for subscription in subscriptions {
            if subscription.url.is_empty() {
                tracing::warn!("Skipping stored subscription with empty URL");
                continue;
            }
            map.insert(subscription.url.clone(), subscription);
        }

        let mut state = self.state.write();
        state.subscriptions = map;
        state.touch();
        state.saved_generation = state.generation;
        state.subscriptions.len()
    }

    /// Copy of every subscription together with the generation it reflects.
    pub(crate) fn snapshot(&self) -> (Vec<Subscription>, u64) {
        let state = self.state.read();
        (
            state.subscriptions.values().cloned().collect(),
            state.generation,
        )
    }

    /// Records that everything up to `generation` is on disk.
    pub(crate) fn mark_saved(&self, generation: u64, at: DateTime<Utc>) {
        let mut state = self.state.write();
        // A slower save of older state must not roll the marker back
        if generation > state.saved_generation {
            state.saved_generation = generation;
        }
        state.last_saved = Some(at);
    }

    fn request_save(&self) {
        if let Some(trigger) = &self.save_trigger {
            trigger.request();
        }
    }
}

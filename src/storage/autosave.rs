//! Background persistence.
//!
//! Mutations poke a [`SaveTrigger`]; one task owned by [`AutoSave`] waits on
//! it and runs [`FeedStore::save_if_needed`] on the blocking pool. The
//! trigger holds at most one pending request, so a burst of mutations costs
//! one or two saves, never one writer per mutation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{oneshot, Notify};
use tokio::task::JoinHandle;

use super::persist::FeedStore;
use super::registry::Registry;

/// Single-slot "please save" flag shared by the registry and the save task.
#[derive(Debug, Clone, Default)]
pub struct SaveTrigger {
    notify: Arc<Notify>,
    requested: Arc<AtomicBool>,
}

impl SaveTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a save. Repeated requests before the next save coalesce.
    pub fn request(&self) {
        self.requested.store(true, Ordering::Release);
        self.notify.notify_one();
    }

    /// Whether a request is waiting to be picked up.
    #[cfg(test)]
    pub(crate) fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    #[cfg(test)]
    pub(crate) fn clear(&self) {
        self.requested.store(false, Ordering::Release);
    }

    async fn wait(&self) {
        self.notify.notified().await;
        self.requested.store(false, Ordering::Release);
    }
}

/// Handle to the background save task.
pub struct AutoSave {
    shutdown_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl AutoSave {
    /// Spawns the save task on the current tokio runtime.
    ///
    /// `trigger` must be the one the registry was built with.
    pub fn spawn(registry: Arc<Registry>, store: Arc<FeedStore>, trigger: SaveTrigger) -> Self {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = trigger.wait() => {}
                }

                let registry = Arc::clone(&registry);
                let store = Arc::clone(&store);
                let result =
                    tokio::task::spawn_blocking(move || store.save_if_needed(&registry)).await;

                match result {
                    Ok(Ok(_)) => {}
                    Ok(Err(e)) => {
                        tracing::warn!(error = %e, "Background save failed, will retry on next change");
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Background save task panicked");
                    }
                }
            }
            tracing::debug!("Autosave task stopped");
        });

        Self {
            shutdown_tx,
            handle,
        }
    }

    /// Stops the task after any save in progress completes.
    ///
    /// Pending changes are not flushed here; callers follow up with a
    /// synchronous [`FeedStore::save_if_needed`].
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.handle.await {
            tracing::warn!(error = %e, "Autosave task ended abnormally");
        }
    }
}

//! JSON file mirror of the registry.
//!
//! The file is an array of subscription objects. Writes go through
//! [`write_atomic`]: the bytes land in a `.tmp` sibling which is then renamed
//! over the target, so the canonical path only ever holds a complete file.
//! When the rename is refused (some network and FUSE filesystems, odd
//! permission setups) the same bytes are written in place instead. That
//! fallback gives up atomicity to keep saving at all, and it is logged.

use chrono::Utc;
use parking_lot::Mutex;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::registry::Registry;
use super::types::{RegistryError, Subscription};

/// Owner of the feeds file.
#[derive(Debug)]
pub struct FeedStore {
    path: PathBuf,
    /// Serializes writers so two saves never share the temp file.
    write_lock: Mutex<()>,
}

impl FeedStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the feeds file.
    ///
    /// - Missing file → `Ok(vec![])`
    /// - Empty or whitespace-only file, or a JSON `null` → `Ok(vec![])`
    /// - Anything else that is not a subscription array → `Err(CorruptState)`
    pub fn load(&self) -> Result<Vec<Subscription>, RegistryError> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "Feeds file doesn't exist, starting with empty registry");
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(RegistryError::Persistence {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        if data.iter().all(u8::is_ascii_whitespace) {
            tracing::info!(path = %self.path.display(), "Feeds file is empty, starting with empty registry");
            return Ok(Vec::new());
        }

        // `null` reads as an empty list
        let subscriptions: Option<Vec<Subscription>> =
            serde_json::from_slice(&data).map_err(|source| RegistryError::CorruptState {
                path: self.path.clone(),
                source,
            })?;
        Ok(subscriptions.unwrap_or_default())
    }

    /// Loads the file and replaces the registry's contents with it.
    ///
    /// Returns the number of subscriptions kept after dropping records
    /// without a URL.
    pub fn load_into(&self, registry: &Registry) -> Result<usize, RegistryError> {
        let subscriptions = self.load()?;
        let read = subscriptions.len();
        let kept = registry.replace_all(subscriptions);
        tracing::info!(
            path = %self.path.display(),
            read = read,
            kept = kept,
            "Loaded feed subscriptions"
        );
        Ok(kept)
    }

    /// Writes every subscription to the feeds file and marks the registry
    /// clean up to the state that was written.
    ///
    /// On failure the registry stays dirty so a later save can retry.
    pub fn save(&self, registry: &Registry) -> Result<usize, RegistryError> {
        let _guard = self.write_lock.lock();

        let (mut subscriptions, generation) = registry.snapshot();
        subscriptions.sort_by(|a, b| a.added_at.cmp(&b.added_at).then_with(|| a.url.cmp(&b.url)));

        let data = serde_json::to_vec_pretty(&subscriptions).map_err(|e| {
            RegistryError::Persistence {
                path: self.path.clone(),
                source: io::Error::other(e),
            }
        })?;

        write_atomic(&self.path, &data).map_err(|source| RegistryError::Persistence {
            path: self.path.clone(),
            source,
        })?;

        registry.mark_saved(generation, Utc::now());
        tracing::debug!(
            path = %self.path.display(),
            count = subscriptions.len(),
            "Saved feed subscriptions"
        );
        Ok(subscriptions.len())
    }

    /// Saves only when the registry has unsaved changes. Returns whether a
    /// save happened.
    pub fn save_if_needed(&self, registry: &Registry) -> Result<bool, RegistryError> {
        if !registry.has_pending_changes() {
            return Ok(false);
        }
        self.save(registry)?;
        Ok(true)
    }
}

/// Replaces `path` with `data` via a `.tmp` sibling and a rename, falling back
/// to an in-place write if the rename fails.
fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    write_atomic_with(path, data, |from, to| fs::rename(from, to))
}

fn write_atomic_with<R>(path: &Path, data: &[u8], rename: R) -> io::Result<()>
where
    R: FnOnce(&Path, &Path) -> io::Result<()>,
{
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }

    let temp_path = temp_path_for(path);

    let mut file = fs::File::create(&temp_path)?;
    if let Err(e) = file.write_all(data).and_then(|()| file.sync_all()) {
        drop(file);
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }
    drop(file);

    if let Err(rename_err) = rename(&temp_path, path) {
        tracing::warn!(
            path = %path.display(),
            error = %rename_err,
            "Rename of temporary feeds file failed, writing in place (not atomic)"
        );
        let _ = fs::remove_file(&temp_path);
        fs::write(path, data)?;
    }

    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

//! Subscription handles and the per-watcher registry
//!
//! A `WatchBackend` is the OS primitive: it subscribes to and cancels
//! exactly one path at a time. The registry owns one `Subscription` per
//! watched path and is the only record of what is under watch.

use crate::error::WatchError;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// OS path-subscription primitive
pub trait WatchBackend {
    /// Ask for notifications on changes directly under `path`
    fn subscribe(&mut self, path: &Path) -> Result<(), WatchError>;

    /// Drop the notifications for `path`
    fn cancel(&mut self, path: &Path) -> Result<(), WatchError>;
}

/// A live subscription on one path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    path: PathBuf,
    cancelled: bool,
}

impl Subscription {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            cancelled: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Cancel the subscription
    ///
    /// Cancelling twice is a no-op. Returns whether the backend was asked to
    /// cancel. The handle is marked cancelled even when the backend refuses,
    /// since the OS usually drops watches on deleted paths by itself.
    pub fn cancel(&mut self, backend: &mut dyn WatchBackend) -> Result<bool, WatchError> {
        if self.cancelled {
            debug!(path = %self.path.display(), "file monitor already cancelled");
            return Ok(false);
        }

        self.cancelled = true;
        backend.cancel(&self.path)?;
        debug!(path = %self.path.display(), "file monitor cancelled");
        Ok(true)
    }
}

/// Active subscriptions of one watcher, keyed by path
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    entries: BTreeMap<PathBuf, Subscription>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscription for `path`, returning the one it replaces
    pub fn insert(&mut self, path: PathBuf) -> Option<Subscription> {
        self.entries.insert(path.clone(), Subscription::new(path))
    }

    pub fn remove(&mut self, path: &Path) -> Option<Subscription> {
        self.entries.remove(path)
    }

    pub fn get(&self, path: &Path) -> Option<&Subscription> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered paths in sorted order
    pub fn paths(&self) -> Vec<PathBuf> {
        self.entries.keys().cloned().collect()
    }

    /// Registered paths equal to or below `base`, compared by component
    pub fn paths_within(&self, base: &Path) -> Vec<PathBuf> {
        self.entries
            .range(base.to_path_buf()..)
            .map(|(path, _)| path)
            .take_while(|path| path.starts_with(base))
            .cloned()
            .collect()
    }

    /// Whether `path` equals or descends from any registered path
    pub fn covers(&self, path: &Path) -> bool {
        path.ancestors().any(|ancestor| self.entries.contains_key(ancestor))
    }
}

//! Watch tree management
//!
//! A `Watcher` pairs an immutable `WatcherSpec` with the live subscriptions
//! installed for it. Installation walks the directory tree with `walkdir`
//! and stops at the watcher's maximum depth. Depth is counted in path
//! components below the watcher root, so the root itself is depth 0 and its
//! immediate children are depth 1.

use crate::error::WatchError;
use crate::subscription::{SubscriptionRegistry, WatchBackend};
use fmon_core::WatcherSpec;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};
use walkdir::WalkDir;

/// A watcher rule and its active subscriptions
pub struct Watcher {
    spec: WatcherSpec,
    registry: SubscriptionRegistry,
    backend: Box<dyn WatchBackend>,
    running: bool,
    /// Watched directories already reported deleted once
    deleted: BTreeSet<PathBuf>,
}

impl Watcher {
    pub fn new(spec: WatcherSpec, backend: Box<dyn WatchBackend>) -> Self {
        Self {
            spec,
            registry: SubscriptionRegistry::new(),
            backend,
            running: false,
            deleted: BTreeSet::new(),
        }
    }

    pub fn spec(&self) -> &WatcherSpec {
        &self.spec
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn root(&self) -> &Path {
        &self.spec.path
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    /// Sorted list of watched paths
    pub fn active_paths(&self) -> Vec<PathBuf> {
        self.registry.paths()
    }

    /// Install the watch tree from the root
    ///
    /// Fails only when the root itself cannot be subscribed.
    pub fn start(&mut self) -> Result<(), WatchError> {
        if self.running {
            return Ok(());
        }

        let root = self.spec.path.clone();
        let count = self.install_subtree(&root, 0)?;
        self.running = true;

        info!(watcher = %self.spec.name, path = %root.display(), monitors = count, "watcher started");
        Ok(())
    }

    /// Cancel every subscription
    pub fn stop(&mut self) {
        if !self.running && self.registry.is_empty() {
            return;
        }

        let count = self.teardown();
        self.running = false;
        info!(watcher = %self.spec.name, monitors = count, "watcher stopped");
    }

    /// Subscribe to `path` and, for recursive watchers, to every directory
    /// below it down to the maximum depth
    ///
    /// `depth` is the depth of `path` itself. Returns the number of
    /// subscriptions installed. Failing to subscribe `path` is an error;
    /// failures further down only leave that branch unwatched.
    pub fn install_subtree(&mut self, path: &Path, depth: u32) -> Result<usize, WatchError> {
        self.subscribe(path)?;
        let mut installed = 1;

        if !self.spec.recursive {
            return Ok(installed);
        }
        if !self.spec.within_depth(depth + 1) {
            debug!(watcher = %self.spec.name, path = %path.display(), "maximum depth of recursion reached");
            return Ok(installed);
        }

        let mut walk = WalkDir::new(path).min_depth(1).follow_links(false).sort_by_file_name();
        if self.spec.max_depth > 0 {
            walk = walk.max_depth((self.spec.max_depth - depth) as usize);
        }

        let mut entries = walk.into_iter();
        while let Some(entry) = entries.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    // only the unreadable entry is lost
                    let failed = e.path().unwrap_or(path).to_path_buf();
                    error!(watcher = %self.spec.name, "{}", WatchError::Enumerate { path: failed, source: e.into() });
                    continue;
                }
            };
            if !entry.file_type().is_dir() {
                continue;
            }

            match self.subscribe(entry.path()) {
                Ok(()) => installed += 1,
                Err(e) => {
                    error!(watcher = %self.spec.name, "{}", e);
                    entries.skip_current_dir();
                }
            }
        }

        Ok(installed)
    }

    /// Forget the watch subtree of a deleted directory
    ///
    /// A watched directory reports its own removal and its parent reports it
    /// again. Returns false for whichever report arrives second, so the
    /// deletion is acted on once.
    pub fn directory_deleted(&mut self, path: &Path) -> bool {
        if self.deleted.remove(path) {
            debug!(watcher = %self.spec.name, path = %path.display(), "repeated deletion ignored");
            return false;
        }
        if self.registry.contains(path) {
            self.deleted.insert(path.to_path_buf());
        }

        let removed = self.remove_subtree(path);
        if removed > 0 {
            debug!(watcher = %self.spec.name, path = %path.display(), removed, "watch subtree removed");
        }
        true
    }

    /// Cancel and forget every subscription at or below `path`
    ///
    /// The watcher root entry is kept even when `path` is the root.
    /// Returns the number of entries removed.
    pub fn remove_subtree(&mut self, path: &Path) -> usize {
        let doomed: Vec<PathBuf> = self
            .registry
            .paths_within(path)
            .into_iter()
            .filter(|p| p != &self.spec.path)
            .collect();

        for p in &doomed {
            self.cancel(p);
        }

        doomed.len()
    }

    /// Cancel and forget the single subscription for `path`
    pub fn remove_path(&mut self, path: &Path) -> bool {
        self.cancel(path)
    }

    /// Cancel and forget every subscription
    pub fn teardown(&mut self) -> usize {
        self.deleted.clear();
        let all = self.registry.paths();
        for p in &all {
            self.cancel(p);
        }
        all.len()
    }

    fn subscribe(&mut self, path: &Path) -> Result<(), WatchError> {
        // a second subscription on the same path replaces the first
        self.cancel(path);
        self.deleted.remove(path);

        self.backend.subscribe(path)?;
        self.registry.insert(path.to_path_buf());
        debug!(watcher = %self.spec.name, path = %path.display(), "file monitor created");
        Ok(())
    }

    fn cancel(&mut self, path: &Path) -> bool {
        let Some(mut subscription) = self.registry.remove(path) else {
            return false;
        };

        if let Err(e) = subscription.cancel(self.backend.as_mut()) {
            debug!(watcher = %self.spec.name, "{}", e);
        }
        true
    }
}

/// Number of path components from `root` down to `path`
///
/// `None` when `path` is not at or below `root`.
pub fn depth_below(root: &Path, path: &Path) -> Option<u32> {
    path.strip_prefix(root)
        .ok()
        .map(|rel| rel.components().count() as u32)
}

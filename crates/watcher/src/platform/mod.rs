//! Platform-specific primitives
//!
//! Path subscriptions go through `notify`, one OS watcher per fmon watcher,
//! each path registered non-recursively so the watch tree stays in charge
//! of what is subscribed. Mount tables are read per platform.

#[cfg(target_os = "linux")]
pub mod linux;

use crate::error::WatchError;
use crate::event_loop::{BackendFactory, LoopEvent, LoopSender, WatcherId};
use crate::mount::MountSnapshot;
use crate::subscription::WatchBackend;
use notify::{RecommendedWatcher, RecursiveMode, Watcher as _};
use std::io;
use std::path::Path;

/// `notify`-backed subscription primitive
pub struct NotifyBackend {
    watcher: RecommendedWatcher,
}

impl NotifyBackend {
    /// Create a backend whose notifications are tagged with `id`
    pub fn new(id: WatcherId, tx: LoopSender) -> Result<Self, WatchError> {
        let watcher = RecommendedWatcher::new(
            move |result: notify::Result<notify::Event>| {
                // the loop is gone during shutdown
                let _ = tx.send(LoopEvent::Fs { id, result });
            },
            notify::Config::default(),
        )
        .map_err(WatchError::Backend)?;

        Ok(Self { watcher })
    }
}

impl WatchBackend for NotifyBackend {
    fn subscribe(&mut self, path: &Path) -> Result<(), WatchError> {
        self.watcher
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(|source| WatchError::Subscribe {
                path: path.to_path_buf(),
                source,
            })
    }

    fn cancel(&mut self, path: &Path) -> Result<(), WatchError> {
        self.watcher.unwatch(path).map_err(|source| WatchError::Cancel {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Creates one `NotifyBackend` per watcher, all feeding the same loop
#[derive(Clone)]
pub struct NotifyBackendFactory {
    tx: LoopSender,
}

impl NotifyBackendFactory {
    pub fn new(tx: LoopSender) -> Self {
        Self { tx }
    }
}

impl BackendFactory for NotifyBackendFactory {
    fn create(&mut self, id: WatcherId) -> Result<Box<dyn WatchBackend>, WatchError> {
        Ok(Box::new(NotifyBackend::new(id, self.tx.clone())?))
    }
}

/// Current mount table of the running system
#[cfg(target_os = "linux")]
pub fn read_mount_table() -> io::Result<MountSnapshot> {
    linux::read_mount_table()
}

/// Current mount table of the running system
///
/// No mount table is read here, so mount reconciliation stays inert.
#[cfg(not(target_os = "linux"))]
pub fn read_mount_table() -> io::Result<MountSnapshot> {
    Ok(MountSnapshot::new())
}

//! In-memory doubles for the OS primitives

use crate::dispatch::Spawner;
use crate::error::WatchError;
use crate::event_loop::{BackendFactory, WatcherId};
use crate::mount::{MountSnapshot, MountTable};
use crate::subscription::WatchBackend;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Default)]
struct BackendState {
    subscribed: BTreeSet<PathBuf>,
    cancelled: Vec<PathBuf>,
    failing: BTreeSet<PathBuf>,
}

/// Records subscriptions instead of asking the OS
#[derive(Debug, Default, Clone)]
pub struct MemoryBackend {
    state: Arc<Mutex<BackendState>>,
}

impl MemoryBackend {
    /// Refuse future subscriptions on `path`
    pub fn fail_on(&self, path: &Path) {
        self.state.lock().failing.insert(path.to_path_buf());
    }

    pub fn subscribed(&self) -> BTreeSet<PathBuf> {
        self.state.lock().subscribed.clone()
    }

    pub fn cancelled(&self) -> Vec<PathBuf> {
        self.state.lock().cancelled.clone()
    }
}

impl WatchBackend for MemoryBackend {
    fn subscribe(&mut self, path: &Path) -> Result<(), WatchError> {
        let mut state = self.state.lock();
        if state.failing.contains(path) {
            return Err(WatchError::Subscribe {
                path: path.to_path_buf(),
                source: notify::Error::path_not_found(),
            });
        }
        state.subscribed.insert(path.to_path_buf());
        Ok(())
    }

    fn cancel(&mut self, path: &Path) -> Result<(), WatchError> {
        let mut state = self.state.lock();
        state.subscribed.remove(path);
        state.cancelled.push(path.to_path_buf());
        Ok(())
    }
}

/// Hands out `MemoryBackend`s sharing one record
#[derive(Debug, Default, Clone)]
pub struct MemoryFactory {
    backend: MemoryBackend,
    failing: bool,
}

impl MemoryFactory {
    pub fn failing() -> Self {
        Self {
            backend: MemoryBackend::default(),
            failing: true,
        }
    }

    pub fn subscribed(&self) -> BTreeSet<PathBuf> {
        self.backend.subscribed()
    }
}

impl BackendFactory for MemoryFactory {
    fn create(&mut self, _id: WatcherId) -> Result<Box<dyn WatchBackend>, WatchError> {
        if self.failing {
            return Err(WatchError::Backend(notify::Error::generic("backend unavailable")));
        }
        Ok(Box::new(self.backend.clone()))
    }
}

/// Mount table whose contents the test controls
#[derive(Debug, Default, Clone)]
pub struct StaticMounts {
    snapshot: Arc<Mutex<MountSnapshot>>,
}

impl StaticMounts {
    pub fn set(&self, snapshot: MountSnapshot) {
        *self.snapshot.lock() = snapshot;
    }
}

impl MountTable for StaticMounts {
    fn snapshot(&self) -> io::Result<MountSnapshot> {
        Ok(self.snapshot.lock().clone())
    }
}

/// Records command lines instead of running them
#[derive(Debug, Default, Clone)]
pub struct RecordingSpawner {
    calls: Arc<Mutex<Vec<Vec<String>>>>,
    failing: bool,
}

impl RecordingSpawner {
    pub fn failing() -> Self {
        Self {
            calls: Arc::default(),
            failing: true,
        }
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().clone()
    }
}

impl Spawner for RecordingSpawner {
    fn spawn(&self, argv: &[String]) -> io::Result<()> {
        self.calls.lock().push(argv.to_vec());
        if self.failing {
            return Err(io::Error::new(io::ErrorKind::NotFound, "no such program"));
        }
        Ok(())
    }
}

/// Output buffer readable after being handed to a dispatcher
#[derive(Debug, Default, Clone)]
pub struct SharedBuf {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuf {
    pub fn contents(&self) -> Vec<u8> {
        self.bytes.lock().clone()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

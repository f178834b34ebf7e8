//! Event normalization
//!
//! Raw `notify` kinds are folded into the watcher event vocabulary.
//! Anything without a counterpart is dropped before filtering.

use fmon_core::{EventKind, WatcherSpec};
use notify::event::{AccessKind, AccessMode, ModifyKind, RenameMode};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A normalized event for one watcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Originating watcher name
    pub watcher: String,
    pub kind: EventKind,
    /// Absolute path of the changed file
    pub file: PathBuf,
    /// Path relative to the watcher root, empty for the root itself
    pub rfile: String,
}

impl Event {
    pub fn new(spec: &WatcherSpec, kind: EventKind, file: PathBuf) -> Self {
        let rfile = relative_path(&spec.path, &file);
        Self {
            watcher: spec.name.clone(),
            kind,
            file,
            rfile,
        }
    }
}

/// Express `file` relative to `root`
pub fn relative_path(root: &Path, file: &Path) -> String {
    match file.strip_prefix(root) {
        Ok(rel) => rel.to_string_lossy().into_owned(),
        Err(_) => file.to_string_lossy().into_owned(),
    }
}

/// Map a raw notification kind for `path` to an event kind
pub fn classify(kind: &notify::EventKind, path: &Path) -> Option<EventKind> {
    use notify::EventKind as Raw;

    let mapped = match kind {
        Raw::Create(_) => Some(EventKind::Created),
        Raw::Remove(_) => Some(EventKind::Deleted),
        Raw::Modify(ModifyKind::Data(_)) | Raw::Modify(ModifyKind::Any) => Some(EventKind::Changed),
        Raw::Modify(ModifyKind::Metadata(_)) => Some(EventKind::AttributeChanged),
        Raw::Modify(ModifyKind::Name(RenameMode::From)) => Some(EventKind::Deleted),
        Raw::Modify(ModifyKind::Name(RenameMode::To)) => Some(EventKind::Created),
        Raw::Modify(ModifyKind::Name(RenameMode::Any)) => {
            if path.symlink_metadata().is_ok() {
                Some(EventKind::Created)
            } else {
                Some(EventKind::Deleted)
            }
        }
        Raw::Access(AccessKind::Close(AccessMode::Write)) => Some(EventKind::Changing),
        _ => None,
    };

    if mapped.is_none() {
        debug!(path = %path.display(), kind = ?kind, "unhandled notification");
    }
    mapped
}

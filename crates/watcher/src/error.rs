//! Watcher runtime errors

use fmon_core::ConfigError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("{path}: unable to create file monitor: {source}")]
    Subscribe {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("{path}: unable to cancel file monitor: {source}")]
    Cancel {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("{path}: unable to enumerate directory: {source}")]
    Enumerate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to create file monitor backend: {0}")]
    Backend(#[source] notify::Error),

    #[error("reload aborted: {0}")]
    Reload(#[from] ConfigError),
}

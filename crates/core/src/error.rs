//! Configuration errors

use std::path::PathBuf;
use thiserror::Error;

/// Everything that can be wrong with a configuration file or watcher rule
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{path}: failed to read configuration file: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error in configuration file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("error in configuration file: no watcher defined")]
    NoWatchers,

    #[error("{watcher}: invalid path")]
    MissingPath { watcher: String },

    #[error("{watcher}: file/path doesn't exist ({path})")]
    PathNotFound { watcher: String, path: PathBuf },

    #[error("{watcher}: bad permissions on {path}")]
    BadPermissions { watcher: String, path: PathBuf },

    #[error("{watcher}: recursion is enabled but path is not a directory")]
    NotADirectory { watcher: String },

    #[error("{watcher}: invalid event '{event}'")]
    InvalidEvent { watcher: String, event: String },

    #[error("{watcher}: invalid type '{value}'")]
    InvalidType { watcher: String, value: String },

    #[error("{watcher}: invalid size '{value}'")]
    InvalidSize { watcher: String, value: String },

    #[error("{watcher}: invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        watcher: String,
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

impl ConfigError {
    /// True when the fault lies in the file itself rather than in a watcher
    pub fn is_file_error(&self) -> bool {
        matches!(self, Self::Read { .. } | Self::Parse(_))
    }
}

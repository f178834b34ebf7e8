//! Watcher definitions for fmon
//!
//! This crate provides:
//! - The validated, immutable watcher rule (`WatcherSpec`)
//! - The event vocabulary and filter predicates (size, type, globs)
//! - The TOML configuration model and its validation

pub mod config;
pub mod error;
pub mod patterns;
pub mod spec;

// Re-exports
pub use config::{Config, LogLevel, MainConfig, SyslogFacility, WatcherConfig};
pub use error::ConfigError;
pub use patterns::PatternList;
pub use spec::{Action, EventKind, FileType, SizeCmp, SizePredicate, SizeUnit, WatcherSpec};

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

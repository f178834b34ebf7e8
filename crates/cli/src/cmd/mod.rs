//! CLI command implementations

pub mod config;
pub mod signal;
pub mod start;
pub mod status;
pub mod watch;

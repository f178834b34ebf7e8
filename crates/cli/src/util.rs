//! Shared utilities for CLI commands

use crate::error::CliError;
use anyhow::{Context, Result};
use fmon_core::config::{default_config_file, CONFIG_FILE, HOME_DIR, SYSCONF_DIR};
use std::path::{Path, PathBuf};

/// Resolve the configuration file for a command
///
/// A relative `-f` argument is made absolute so the detached child and
/// later reloads read the same file regardless of working directory.
pub fn resolve_config_file(explicit: Option<&Path>) -> Result<PathBuf> {
    let explicit = match explicit {
        Some(p) if p.is_relative() => Some(
            std::env::current_dir()
                .context("Failed to get current directory")?
                .join(p),
        ),
        other => other.map(Path::to_path_buf),
    };
    let home = dirs::home_dir();

    if let Some(file) = default_config_file(explicit.as_deref(), home.as_deref()) {
        return Ok(file);
    }

    let tried = match explicit {
        Some(file) => vec![file],
        None => {
            let mut tried = Vec::new();
            if let Some(home) = home {
                tried.push(home.join(HOME_DIR).join(CONFIG_FILE));
            }
            tried.push(Path::new(SYSCONF_DIR).join(CONFIG_FILE));
            tried
        }
    };
    Err(CliError::NoConfigFile(tried).into())
}

/// Uptime of a daemon started at `started_at`, both in Unix milliseconds
///
/// Shows the two most significant units, e.g. `2d 4h`, `3h 12m` or `45s`.
pub fn format_uptime(started_at: u64, now: u64) -> String {
    let secs = now.saturating_sub(started_at) / 1000;
    let (days, hours, mins) = (secs / 86_400, secs % 86_400 / 3600, secs % 3600 / 60);

    match (days, hours, mins) {
        (0, 0, 0) => format!("{}s", secs),
        (0, 0, m) => format!("{}m {}s", m, secs % 60),
        (0, h, m) => format!("{}h {}m", h, m),
        (d, h, _) => format!("{}d {}h", d, h),
    }
}

/// Current Unix time in milliseconds
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

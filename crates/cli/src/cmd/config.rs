//! Inspect the configuration file

use crate::util;
use anyhow::{Context, Result};
use clap::Subcommand;
use fmon_core::config::example_config;
use fmon_core::{Config, WatcherSpec};
use owo_colors::OwoColorize;
use std::path::PathBuf;

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Validate the configuration and summarise each watcher
    Check,
    /// Print an example configuration
    Example,
    /// Print the configuration file that would be used
    Path,
}

pub async fn run(command: ConfigCommand, file: Option<PathBuf>) -> Result<()> {
    match command {
        ConfigCommand::Example => {
            print!("{}", example_config());
            Ok(())
        }
        ConfigCommand::Path => {
            let file = util::resolve_config_file(file.as_deref())?;
            println!("{}", file.display());
            Ok(())
        }
        ConfigCommand::Check => {
            let file = util::resolve_config_file(file.as_deref())?;
            let config = Config::load(&file).with_context(|| format!("Failed to load {}", file.display()))?;

            println!("{} {}", "Configuration OK:".green(), file.display());
            for spec in &config.watchers {
                println!("  {}", summary(spec));
            }
            Ok(())
        }
    }
}

fn summary(spec: &WatcherSpec) -> String {
    let mut line = format!("{} {}", spec.name.bold(), spec.path.display());

    if spec.recursive {
        match spec.max_depth {
            0 => line.push_str(" (recursive)"),
            depth => line.push_str(&format!(" (recursive, depth {})", depth)),
        }
    }

    if !spec.events.is_empty() {
        let events: Vec<&str> = spec.events.iter().map(|e| e.as_str()).collect();
        line.push_str(&format!(" events={}", events.join(",")));
    }

    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use fmon_core::EventKind;

    #[test]
    fn test_summary() {
        let mut spec = WatcherSpec::new("uploads", "/srv/upload");
        spec.recursive = true;
        spec.max_depth = 3;
        spec.events = vec![EventKind::Created, EventKind::Deleted];

        let line = summary(&spec);
        assert!(line.contains("uploads"));
        assert!(line.ends_with("/srv/upload (recursive, depth 3) events=created,deleted"));
    }
}
